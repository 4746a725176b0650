//! The fixed login-copy-publish sequence.
//!
//! The selectors below belong to two third-party pages we do not control:
//! the Microsoft identity-provider login form and the Confluence page UI.
//! They are configuration, not engineering; keep them in one place.

use crate::config::{Credentials, Settings};
use anyhow::{Context, Result, anyhow};
use pagecopy_browser::{
    BrowserService, NewSessionRequest, PageAction, PlanExecutionResult, RunPlanRequest,
};
use serde_json::Value;

pub mod selectors {
    /// Microsoft login: email field.
    pub const LOGIN_USERNAME: &str = "#i0116";
    /// Microsoft login: "Next" / "Sign in" button.
    pub const LOGIN_SUBMIT: &str = "#idSIButton9";
    /// Microsoft login: password field.
    pub const LOGIN_PASSWORD: &str = "#i0118";
    /// Confluence page actions menu.
    pub const ACTION_MENU: &str = "#action-menu-link";
    /// Confluence "Copy" entry in the actions menu.
    pub const COPY_PAGE: &str = "#action-copy-page-link";
    /// "Next" button of the copy dialog.
    pub const COPY_DIALOG_NEXT: &str = "#copy-dialog-next";
    /// Publish button of the rich-text editor.
    pub const PUBLISH: &str = "#rte-button-publish";
}

/// A freshly published page always lands on the viewpage action.
pub const PUBLISHED_URL_PATTERN: &str = "**/pages/viewpage.action**";

const PASSWORD_FIELD_TIMEOUT_MS: u64 = 15_000;
const ACTION_MENU_TIMEOUT_MS: u64 = 10_000;
const PUBLISH_TIMEOUT_MS: u64 = 20_000;
const PUBLISHED_URL_TIMEOUT_MS: u64 = 30_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedPage {
    pub url: String,
}

/// Builds the action plan for one copy-page run against `url`.
pub fn copy_page_plan(url: &str, credentials: &Credentials) -> Vec<PageAction> {
    vec![
        PageAction::Navigate {
            url: url.to_string(),
            wait_until: Some("domcontentloaded".to_string()),
        },
        PageAction::Pause { ms: 1000 },
        // Identity-provider login, two steps with the same submit button.
        PageAction::Fill {
            selector: selectors::LOGIN_USERNAME.to_string(),
            text: credentials.username.clone(),
        },
        PageAction::Pause { ms: 500 },
        PageAction::Click {
            selector: selectors::LOGIN_SUBMIT.to_string(),
            timeout_ms: None,
        },
        PageAction::WaitForSelector {
            selector: selectors::LOGIN_PASSWORD.to_string(),
            state: None,
            timeout_ms: Some(PASSWORD_FIELD_TIMEOUT_MS),
        },
        PageAction::Fill {
            selector: selectors::LOGIN_PASSWORD.to_string(),
            text: credentials.password.clone(),
        },
        PageAction::Pause { ms: 500 },
        PageAction::Click {
            selector: selectors::LOGIN_SUBMIT.to_string(),
            timeout_ms: None,
        },
        PageAction::WaitForLoadState {
            state: "networkidle".to_string(),
        },
        // Confluence re-renders parts of the header after the redirect.
        PageAction::Pause { ms: 3000 },
        PageAction::WaitForSelector {
            selector: selectors::ACTION_MENU.to_string(),
            state: None,
            timeout_ms: Some(ACTION_MENU_TIMEOUT_MS),
        },
        PageAction::WaitForSelector {
            selector: selectors::COPY_PAGE.to_string(),
            state: Some("visible".to_string()),
            timeout_ms: Some(ACTION_MENU_TIMEOUT_MS),
        },
        PageAction::Click {
            selector: selectors::COPY_PAGE.to_string(),
            timeout_ms: None,
        },
        PageAction::WaitForSelector {
            selector: selectors::COPY_DIALOG_NEXT.to_string(),
            state: Some("visible".to_string()),
            timeout_ms: None,
        },
        PageAction::Click {
            selector: selectors::COPY_DIALOG_NEXT.to_string(),
            timeout_ms: None,
        },
        PageAction::WaitForLoadState {
            state: "networkidle".to_string(),
        },
        PageAction::WaitForSelector {
            selector: selectors::PUBLISH.to_string(),
            state: Some("visible".to_string()),
            timeout_ms: Some(PUBLISH_TIMEOUT_MS),
        },
        PageAction::Click {
            selector: selectors::PUBLISH.to_string(),
            timeout_ms: None,
        },
        PageAction::WaitForUrl {
            pattern: PUBLISHED_URL_PATTERN.to_string(),
            timeout_ms: Some(PUBLISHED_URL_TIMEOUT_MS),
        },
    ]
}

/// Runs the copy-page flow once and returns the published page URL.
///
/// The session is closed (and its directory removed) on success. On failure
/// the session directory is kept so the failure screenshot in `artifacts/`
/// survives for inspection.
pub async fn run_copy_flow(
    service: &BrowserService,
    settings: &Settings,
) -> Result<PublishedPage> {
    let session = service
        .new_session(NewSessionRequest {
            headless: settings.headless,
        })
        .await?;
    tracing::info!(session = %session.id, url = %settings.target_url, "starting copy-page run");

    let request = RunPlanRequest {
        session_id: session.id.clone(),
        actions: copy_page_plan(&settings.target_url, &settings.credentials),
        timeout_secs: settings.run_timeout_secs,
    };

    let result = match service.run_plan(&request).await {
        Ok(result) => result,
        Err(err) => {
            tracing::error!(session = %session.id, error = %err, "browser run did not complete");
            return Err(err);
        }
    };

    if !result.succeeded() {
        let mut message = result.failed_message();
        if let Some(screenshot) = result.failure_screenshot() {
            message = format!("{message} (screenshot: {screenshot})");
        }
        tracing::error!(session = %session.id, "copy-page run failed: {message}");
        return Err(anyhow!("Copy-page run failed: {message}"));
    }

    let url = published_url(&result)
        .context("runner reported success without a published page URL")?;

    if let Err(err) = service.close_session(&session.id).await {
        tracing::warn!(session = %session.id, error = %err, "failed to clean up browser session");
    }

    tracing::info!(session = %session.id, url = %url, "page published");
    Ok(PublishedPage { url })
}

fn published_url(result: &PlanExecutionResult) -> Option<String> {
    let outputs = result.payload.as_ref()?.get("result")?.as_array()?;
    outputs.iter().rev().find_map(|output| {
        if output.get("type").and_then(Value::as_str) == Some("wait_for_url") {
            output
                .get("url")
                .and_then(Value::as_str)
                .map(str::to_string)
        } else {
            None
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use pagecopy_browser::{PageActionExecutor, PageSession, RuntimeProbe};
    use serde_json::json;
    use std::path::Path;
    use std::sync::Arc;
    use tempfile::tempdir;

    fn settings() -> Settings {
        Settings {
            target_url: "https://wiki.example.com/pages/viewpage.action?pageId=1".to_string(),
            credentials: Credentials {
                username: "user@example.com".to_string(),
                password: "hunter2".to_string(),
            },
            headless: true,
            run_timeout_secs: 120,
        }
    }

    struct FixedExecutor {
        payload: Value,
    }

    #[async_trait]
    impl PageActionExecutor for FixedExecutor {
        async fn probe_runtime(&self) -> anyhow::Result<RuntimeProbe> {
            unimplemented!("not used by flow tests")
        }

        async fn run_plan(
            &self,
            _session: &PageSession,
            _request: &RunPlanRequest,
        ) -> anyhow::Result<PlanExecutionResult> {
            Ok(PlanExecutionResult {
                exit_code: 0,
                duration_ms: 5,
                stdout: String::new(),
                stderr: String::new(),
                payload: Some(self.payload.clone()),
            })
        }
    }

    fn service_with_payload(root: &Path, payload: Value) -> BrowserService {
        BrowserService::new_with_executor(root.to_path_buf(), Arc::new(FixedExecutor { payload }))
            .unwrap()
    }

    #[test]
    fn plan_logs_in_before_touching_the_page_menu() {
        let credentials = settings().credentials;
        let plan = copy_page_plan("https://wiki.example.com/page", &credentials);

        let selector_sequence: Vec<&str> = plan
            .iter()
            .filter_map(|action| match action {
                PageAction::Fill { selector, .. } | PageAction::Click { selector, .. } => {
                    Some(selector.as_str())
                }
                _ => None,
            })
            .collect();

        assert_eq!(
            selector_sequence,
            vec![
                selectors::LOGIN_USERNAME,
                selectors::LOGIN_SUBMIT,
                selectors::LOGIN_PASSWORD,
                selectors::LOGIN_SUBMIT,
                selectors::COPY_PAGE,
                selectors::COPY_DIALOG_NEXT,
                selectors::PUBLISH,
            ]
        );
    }

    #[test]
    fn plan_starts_with_navigation_and_ends_on_published_url() {
        let credentials = settings().credentials;
        let plan = copy_page_plan("https://wiki.example.com/page", &credentials);

        assert!(matches!(
            plan.first(),
            Some(PageAction::Navigate { url, wait_until })
                if url == "https://wiki.example.com/page"
                    && wait_until.as_deref() == Some("domcontentloaded")
        ));
        assert!(matches!(
            plan.last(),
            Some(PageAction::WaitForUrl { pattern, timeout_ms })
                if pattern == PUBLISHED_URL_PATTERN && *timeout_ms == Some(30_000)
        ));
    }

    #[test]
    fn plan_fills_the_credentials_it_was_given() {
        let credentials = Credentials {
            username: "someone@example.com".to_string(),
            password: "s3cret".to_string(),
        };
        let plan = copy_page_plan("https://wiki.example.com/page", &credentials);

        let filled: Vec<&str> = plan
            .iter()
            .filter_map(|action| match action {
                PageAction::Fill { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(filled, vec!["someone@example.com", "s3cret"]);
    }

    #[tokio::test]
    async fn successful_run_returns_last_captured_url() {
        let temp = tempdir().unwrap();
        let payload = json!({
            "success": true,
            "result": [
                {"type": "navigate", "url": "https://wiki.example.com/page"},
                {"type": "wait_for_url", "url": "https://wiki.example.com/pages/viewpage.action?pageId=99"},
            ],
        });
        let service = service_with_payload(temp.path(), payload);

        let page = run_copy_flow(&service, &settings()).await.unwrap();
        assert_eq!(
            page.url,
            "https://wiki.example.com/pages/viewpage.action?pageId=99"
        );
    }

    #[tokio::test]
    async fn successful_run_removes_the_session_directory() {
        let temp = tempdir().unwrap();
        let payload = json!({
            "success": true,
            "result": [{"type": "wait_for_url", "url": "https://wiki.example.com/pages/viewpage.action?pageId=2"}],
        });
        let service = service_with_payload(temp.path(), payload);

        run_copy_flow(&service, &settings()).await.unwrap();

        let entries: Vec<_> = std::fs::read_dir(temp.path()).unwrap().collect();
        assert!(entries.is_empty(), "session directory should be removed");
    }

    #[tokio::test]
    async fn failed_run_reports_error_and_screenshot() {
        let temp = tempdir().unwrap();
        let payload = json!({
            "success": false,
            "error": "Timeout 15000ms exceeded waiting for #i0118",
            "screenshot": "/tmp/artifacts/failure.png",
        });
        let service = service_with_payload(temp.path(), payload);

        let err = run_copy_flow(&service, &settings()).await.unwrap_err();
        let message = err.to_string();
        assert!(message.contains("Timeout 15000ms exceeded"));
        assert!(message.contains("failure.png"));
    }

    #[tokio::test]
    async fn failed_run_keeps_the_session_directory() {
        let temp = tempdir().unwrap();
        let payload = json!({"success": false, "error": "boom"});
        let service = service_with_payload(temp.path(), payload);

        run_copy_flow(&service, &settings()).await.unwrap_err();

        let entries: Vec<_> = std::fs::read_dir(temp.path()).unwrap().collect();
        assert_eq!(entries.len(), 1, "session directory should survive failure");
    }

    #[tokio::test]
    async fn success_without_captured_url_is_an_error() {
        let temp = tempdir().unwrap();
        let payload = json!({"success": true, "result": [{"type": "navigate", "url": "x"}]});
        let service = service_with_payload(temp.path(), payload);

        let err = run_copy_flow(&service, &settings()).await.unwrap_err();
        assert!(err.to_string().contains("without a published page URL"));
    }
}

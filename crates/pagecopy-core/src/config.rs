//! Run configuration resolved from the process environment.
//!
//! Everything is keyed by environment variables so the same binary works as
//! a one-shot CLI, a container entrypoint, or behind the HTTP service.
//! Resolution is written against an injectable lookup function; only
//! [`Settings::from_env`] touches the real environment.

use std::env;
use std::fmt;
use thiserror::Error;

pub const PAGE_URL_VAR: &str = "CONFLUENCE_PAGE_URL";
pub const USERNAME_VAR: &str = "CONFLUENCE_USERNAME";
pub const PASSWORD_VAR: &str = "CONFLUENCE_PASSWORD";
pub const PROJECT_VAR: &str = "CONFLUENCE_PROJECT_NAME";
pub const ENVIRONMENT_VAR: &str = "CONFLUENCE_ENVIRONMENT";
pub const HEADLESS_VAR: &str = "PLAYWRIGHT_HEADLESS";
pub const RUN_TIMEOUT_VAR: &str = "PAGECOPY_RUN_TIMEOUT_SECS";

const DEFAULT_RUN_TIMEOUT_SECS: u64 = 120;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("CONFLUENCE_USERNAME and CONFLUENCE_PASSWORD must be set")]
    MissingCredentials,
    #[error("{0} must be set")]
    MissingVar(&'static str),
    #[error("CONFLUENCE_ENVIRONMENT must be UAT or PRO, got {0:?}")]
    UnknownEnvironment(String),
    #[error("CONFLUENCE_PROJECT_NAME must be dSOC, Firesoc, AlarmControl, or Video, got {0:?}")]
    UnknownProject(String),
    #[error("no target page: set CONFLUENCE_PAGE_URL or CONFLUENCE_PROJECT_NAME")]
    MissingTarget,
}

/// Deployment environment a project URL is resolved for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    Uat,
    #[default]
    Pro,
}

impl Environment {
    pub fn parse(value: &str) -> Result<Self, ConfigError> {
        match value.to_uppercase().as_str() {
            "UAT" => Ok(Self::Uat),
            "PRO" => Ok(Self::Pro),
            _ => Err(ConfigError::UnknownEnvironment(value.to_string())),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Uat => "UAT",
            Self::Pro => "PRO",
        }
    }
}

/// Projects with a per-environment Confluence page. The accepted names are
/// the exact spellings used by the deployment tooling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Project {
    Dsoc,
    Firesoc,
    AlarmControl,
    Video,
}

impl Project {
    pub fn parse(value: &str) -> Result<Self, ConfigError> {
        match value {
            "dSOC" => Ok(Self::Dsoc),
            "Firesoc" => Ok(Self::Firesoc),
            "AlarmControl" => Ok(Self::AlarmControl),
            "Video" => Ok(Self::Video),
            _ => Err(ConfigError::UnknownProject(value.to_string())),
        }
    }

    /// Environment variable holding this project's page URL.
    pub fn url_var(self, environment: Environment) -> &'static str {
        match (self, environment) {
            (Self::Dsoc, Environment::Uat) => "DSOC_UAT_URL",
            (Self::Dsoc, Environment::Pro) => "DSOC_PRO_URL",
            (Self::Firesoc, Environment::Uat) => "FIRESOC_UAT_URL",
            (Self::Firesoc, Environment::Pro) => "FIRESOC_PRO_URL",
            (Self::AlarmControl, Environment::Uat) => "ALARMCONTROL_UAT_URL",
            (Self::AlarmControl, Environment::Pro) => "ALARMCONTROL_PRO_URL",
            (Self::Video, Environment::Uat) => "VIDEO_UAT_URL",
            (Self::Video, Environment::Pro) => "VIDEO_PRO_URL",
        }
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Caller-supplied overrides (CLI flags, HTTP query parameters). Anything
/// left as `None` falls back to the environment.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub url: Option<String>,
    pub project: Option<String>,
    pub environment: Option<String>,
    pub headless: Option<bool>,
}

/// Fully resolved inputs for one copy-page run.
#[derive(Debug, Clone)]
pub struct Settings {
    pub target_url: String,
    pub credentials: Credentials,
    pub headless: bool,
    pub run_timeout_secs: u64,
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::resolve(|key| env::var(key).ok(), &Overrides::default())
    }

    pub fn from_env_with(overrides: &Overrides) -> Result<Self, ConfigError> {
        Self::resolve(|key| env::var(key).ok(), overrides)
    }

    pub fn resolve(
        lookup: impl Fn(&str) -> Option<String>,
        overrides: &Overrides,
    ) -> Result<Self, ConfigError> {
        let username = non_empty(lookup(USERNAME_VAR));
        let password = non_empty(lookup(PASSWORD_VAR));
        let (Some(username), Some(password)) = (username, password) else {
            return Err(ConfigError::MissingCredentials);
        };

        let project = overrides
            .project
            .clone()
            .or_else(|| non_empty(lookup(PROJECT_VAR)));

        // A project selection takes precedence over an explicit page URL.
        let target_url = if let Some(project) = project {
            let project = Project::parse(&project)?;
            let environment = overrides
                .environment
                .clone()
                .or_else(|| non_empty(lookup(ENVIRONMENT_VAR)))
                .map(|value| Environment::parse(&value))
                .transpose()?
                .unwrap_or_default();
            let var = project.url_var(environment);
            non_empty(lookup(var)).ok_or(ConfigError::MissingVar(var))?
        } else {
            overrides
                .url
                .clone()
                .or_else(|| non_empty(lookup(PAGE_URL_VAR)))
                .ok_or(ConfigError::MissingTarget)?
        };

        let headless = overrides
            .headless
            .unwrap_or_else(|| parse_flag(lookup(HEADLESS_VAR)));

        let run_timeout_secs = lookup(RUN_TIMEOUT_VAR)
            .and_then(|value| value.trim().parse::<u64>().ok())
            .unwrap_or(DEFAULT_RUN_TIMEOUT_SECS);

        Ok(Self {
            target_url,
            credentials: Credentials { username, password },
            headless,
            run_timeout_secs,
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.trim().is_empty())
}

fn parse_flag(value: Option<String>) -> bool {
    value
        .map(|value| matches!(value.trim().to_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    fn base_env() -> Vec<(&'static str, &'static str)> {
        vec![
            (USERNAME_VAR, "user@example.com"),
            (PASSWORD_VAR, "hunter2"),
        ]
    }

    #[test]
    fn explicit_url_is_used_without_project() {
        let mut pairs = base_env();
        pairs.push((PAGE_URL_VAR, "https://wiki.example.com/page"));

        let settings = Settings::resolve(env(&pairs), &Overrides::default()).unwrap();
        assert_eq!(settings.target_url, "https://wiki.example.com/page");
        assert!(!settings.headless);
        assert_eq!(settings.run_timeout_secs, 120);
    }

    #[test]
    fn project_selection_takes_precedence_over_url() {
        let mut pairs = base_env();
        pairs.push((PAGE_URL_VAR, "https://wiki.example.com/ignored"));
        pairs.push((PROJECT_VAR, "dSOC"));
        pairs.push(("DSOC_PRO_URL", "https://wiki.example.com/dsoc-pro"));

        let settings = Settings::resolve(env(&pairs), &Overrides::default()).unwrap();
        assert_eq!(settings.target_url, "https://wiki.example.com/dsoc-pro");
    }

    #[test]
    fn environment_defaults_to_pro() {
        let mut pairs = base_env();
        pairs.push((PROJECT_VAR, "Video"));
        pairs.push(("VIDEO_PRO_URL", "https://wiki.example.com/video-pro"));
        pairs.push(("VIDEO_UAT_URL", "https://wiki.example.com/video-uat"));

        let settings = Settings::resolve(env(&pairs), &Overrides::default()).unwrap();
        assert_eq!(settings.target_url, "https://wiki.example.com/video-pro");
    }

    #[test]
    fn uat_environment_selects_uat_variable() {
        let mut pairs = base_env();
        pairs.push((PROJECT_VAR, "Firesoc"));
        pairs.push((ENVIRONMENT_VAR, "uat"));
        pairs.push(("FIRESOC_UAT_URL", "https://wiki.example.com/firesoc-uat"));

        let settings = Settings::resolve(env(&pairs), &Overrides::default()).unwrap();
        assert_eq!(settings.target_url, "https://wiki.example.com/firesoc-uat");
    }

    #[test]
    fn overrides_win_over_environment_variables() {
        let mut pairs = base_env();
        pairs.push((PROJECT_VAR, "dSOC"));
        pairs.push((ENVIRONMENT_VAR, "PRO"));
        pairs.push(("ALARMCONTROL_UAT_URL", "https://wiki.example.com/ac-uat"));

        let overrides = Overrides {
            project: Some("AlarmControl".to_string()),
            environment: Some("UAT".to_string()),
            ..Overrides::default()
        };
        let settings = Settings::resolve(env(&pairs), &overrides).unwrap();
        assert_eq!(settings.target_url, "https://wiki.example.com/ac-uat");
    }

    #[test]
    fn missing_credentials_is_an_error() {
        let pairs = vec![(PAGE_URL_VAR, "https://wiki.example.com/page")];
        let err = Settings::resolve(env(&pairs), &Overrides::default()).unwrap_err();
        assert_eq!(err, ConfigError::MissingCredentials);
    }

    #[test]
    fn empty_credentials_count_as_missing() {
        let pairs = vec![
            (USERNAME_VAR, "user@example.com"),
            (PASSWORD_VAR, "  "),
            (PAGE_URL_VAR, "https://wiki.example.com/page"),
        ];
        let err = Settings::resolve(env(&pairs), &Overrides::default()).unwrap_err();
        assert_eq!(err, ConfigError::MissingCredentials);
    }

    #[test]
    fn unknown_project_is_an_error() {
        let mut pairs = base_env();
        pairs.push((PROJECT_VAR, "Intruder"));

        let err = Settings::resolve(env(&pairs), &Overrides::default()).unwrap_err();
        assert_eq!(err, ConfigError::UnknownProject("Intruder".to_string()));
    }

    #[test]
    fn unknown_environment_is_an_error() {
        let mut pairs = base_env();
        pairs.push((PROJECT_VAR, "dSOC"));
        pairs.push((ENVIRONMENT_VAR, "STAGING"));

        let err = Settings::resolve(env(&pairs), &Overrides::default()).unwrap_err();
        assert_eq!(err, ConfigError::UnknownEnvironment("STAGING".to_string()));
    }

    #[test]
    fn missing_project_url_names_the_variable() {
        let mut pairs = base_env();
        pairs.push((PROJECT_VAR, "Firesoc"));
        pairs.push((ENVIRONMENT_VAR, "UAT"));

        let err = Settings::resolve(env(&pairs), &Overrides::default()).unwrap_err();
        assert_eq!(err, ConfigError::MissingVar("FIRESOC_UAT_URL"));
    }

    #[test]
    fn no_url_and_no_project_is_an_error() {
        let err = Settings::resolve(env(&base_env()), &Overrides::default()).unwrap_err();
        assert_eq!(err, ConfigError::MissingTarget);
    }

    #[test]
    fn headless_flag_accepts_truthy_spellings() {
        for value in ["1", "true", "TRUE", "yes", "Yes"] {
            let mut pairs = base_env();
            pairs.push((PAGE_URL_VAR, "https://wiki.example.com/page"));
            pairs.push((HEADLESS_VAR, value));
            let settings = Settings::resolve(env(&pairs), &Overrides::default()).unwrap();
            assert!(settings.headless, "expected {value:?} to enable headless");
        }

        let mut pairs = base_env();
        pairs.push((PAGE_URL_VAR, "https://wiki.example.com/page"));
        pairs.push((HEADLESS_VAR, "no"));
        let settings = Settings::resolve(env(&pairs), &Overrides::default()).unwrap();
        assert!(!settings.headless);
    }

    #[test]
    fn run_timeout_parses_from_environment() {
        let mut pairs = base_env();
        pairs.push((PAGE_URL_VAR, "https://wiki.example.com/page"));
        pairs.push((RUN_TIMEOUT_VAR, "300"));

        let settings = Settings::resolve(env(&pairs), &Overrides::default()).unwrap();
        assert_eq!(settings.run_timeout_secs, 300);
    }

    #[test]
    fn credentials_debug_redacts_password() {
        let credentials = Credentials {
            username: "user@example.com".to_string(),
            password: "hunter2".to_string(),
        };
        let rendered = format!("{credentials:?}");
        assert!(rendered.contains("user@example.com"));
        assert!(!rendered.contains("hunter2"));
    }
}

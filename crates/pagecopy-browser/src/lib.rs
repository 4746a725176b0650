//! Playwright-backed browser runtime for PageCopy.
//!
//! Rust owns the plan (a fixed sequence of page actions) and the process
//! lifecycle; the browser itself is driven by Playwright running under
//! Node.js. For every run this crate generates a self-contained ES-module
//! runner script, executes it with `node` under a wall-clock timeout, and
//! parses a marked stdout line back into a structured payload.

use anyhow::{Result, anyhow, bail};
use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::process::Command;
use tokio::sync::RwLock;
use tokio::time::timeout;
use uuid::Uuid;

const RESULT_MARKER: &str = "__PAGECOPY_RESULT__=";
const DEFAULT_TIMEOUT_SECS: u64 = 120;
const FAILURE_SCREENSHOT: &str = "failure.png";

/// One step of a page plan. Serialized to JSON and interpreted by the
/// generated Playwright runner.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PageAction {
    Navigate {
        url: String,
        #[serde(default)]
        wait_until: Option<String>,
    },
    Fill {
        selector: String,
        text: String,
    },
    Click {
        selector: String,
        #[serde(default)]
        timeout_ms: Option<u64>,
    },
    WaitForSelector {
        selector: String,
        #[serde(default)]
        state: Option<String>,
        #[serde(default)]
        timeout_ms: Option<u64>,
    },
    WaitForLoadState {
        state: String,
    },
    /// Waits until the page URL matches a Playwright glob, then reports the
    /// URL it landed on.
    WaitForUrl {
        pattern: String,
        #[serde(default)]
        timeout_ms: Option<u64>,
    },
    Pause {
        ms: u64,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeProbe {
    pub node_available: bool,
    pub node_version: Option<String>,
    pub playwright_package_available: bool,
    pub chromium_cache_detected: bool,
    pub ready: bool,
    pub notes: Vec<String>,
}

impl RuntimeProbe {
    fn empty() -> Self {
        Self {
            node_available: false,
            node_version: None,
            playwright_package_available: false,
            chromium_cache_detected: false,
            ready: false,
            notes: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSessionRequest {
    #[serde(default = "default_headless")]
    pub headless: bool,
}

impl Default for NewSessionRequest {
    fn default() -> Self {
        Self { headless: true }
    }
}

/// A single browser run. Each session gets a fresh profile directory, so no
/// cookie or storage state survives between runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageSession {
    pub id: String,
    pub headless: bool,
    pub created_at_ms: i64,
    pub session_dir: String,
    pub profile_dir: String,
    pub artifacts_dir: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunPlanRequest {
    pub session_id: String,
    pub actions: Vec<PageAction>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanExecutionResult {
    pub exit_code: i32,
    pub duration_ms: u64,
    pub stdout: String,
    pub stderr: String,
    pub payload: Option<Value>,
}

impl PlanExecutionResult {
    pub fn succeeded(&self) -> bool {
        self.payload
            .as_ref()
            .and_then(|payload| payload.get("success"))
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    pub fn failed_message(&self) -> String {
        if let Some(payload) = &self.payload
            && let Some(error) = payload.get("error").and_then(Value::as_str)
        {
            return error.to_string();
        }

        let stderr = self.stderr.trim();
        if !stderr.is_empty() {
            return stderr.to_string();
        }

        format!("Browser run failed with exit code {}", self.exit_code)
    }

    /// Path of the failure screenshot, when the runner managed to take one.
    pub fn failure_screenshot(&self) -> Option<&str> {
        self.payload
            .as_ref()
            .and_then(|payload| payload.get("screenshot"))
            .and_then(Value::as_str)
    }
}

#[async_trait]
pub trait PageActionExecutor: Send + Sync {
    async fn probe_runtime(&self) -> Result<RuntimeProbe>;

    async fn run_plan(
        &self,
        session: &PageSession,
        request: &RunPlanRequest,
    ) -> Result<PlanExecutionResult>;
}

/// Session lifecycle plus executor delegation.
pub struct BrowserService {
    root_dir: PathBuf,
    sessions: RwLock<HashMap<String, PageSession>>,
    executor: Arc<dyn PageActionExecutor>,
}

impl BrowserService {
    pub fn new() -> Result<Self> {
        let root = resolve_default_root_dir();
        Self::new_with_executor(root, Arc::new(PlaywrightExecutor::new()))
    }

    pub fn new_with_executor(
        root_dir: PathBuf,
        executor: Arc<dyn PageActionExecutor>,
    ) -> Result<Self> {
        std::fs::create_dir_all(&root_dir)?;
        Ok(Self {
            root_dir,
            sessions: RwLock::new(HashMap::new()),
            executor,
        })
    }

    pub async fn probe_runtime(&self) -> Result<RuntimeProbe> {
        self.executor.probe_runtime().await
    }

    pub async fn new_session(&self, request: NewSessionRequest) -> Result<PageSession> {
        let id = Uuid::new_v4().to_string();
        let session_dir = self.root_dir.join(&id);
        let profile_dir = session_dir.join("profile");
        let artifacts_dir = session_dir.join("artifacts");

        std::fs::create_dir_all(&profile_dir)?;
        std::fs::create_dir_all(&artifacts_dir)?;

        let session = PageSession {
            id: id.clone(),
            headless: request.headless,
            created_at_ms: Utc::now().timestamp_millis(),
            session_dir: session_dir.display().to_string(),
            profile_dir: profile_dir.display().to_string(),
            artifacts_dir: artifacts_dir.display().to_string(),
        };

        let mut sessions = self.sessions.write().await;
        sessions.insert(id, session.clone());

        Ok(session)
    }

    pub async fn close_session(&self, session_id: &str) -> Result<bool> {
        let mut sessions = self.sessions.write().await;
        let Some(session) = sessions.remove(session_id) else {
            return Ok(false);
        };

        let session_dir = PathBuf::from(session.session_dir);
        if session_dir.exists() {
            std::fs::remove_dir_all(session_dir)?;
        }

        Ok(true)
    }

    pub async fn run_plan(&self, request: &RunPlanRequest) -> Result<PlanExecutionResult> {
        let session = self.get_session(&request.session_id).await?;
        self.executor.run_plan(&session, request).await
    }

    async fn get_session(&self, session_id: &str) -> Result<PageSession> {
        let sessions = self.sessions.read().await;
        sessions
            .get(session_id)
            .cloned()
            .ok_or_else(|| anyhow!("Session not found: {}", session_id))
    }
}

#[derive(Default)]
pub struct PlaywrightExecutor;

impl PlaywrightExecutor {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl PageActionExecutor for PlaywrightExecutor {
    async fn probe_runtime(&self) -> Result<RuntimeProbe> {
        let mut probe = RuntimeProbe::empty();

        let node_probe = run_command_capture("node", &["--version".to_string()], None, 10).await;

        if let Ok(output) = node_probe
            && output.exit_code == 0
        {
            probe.node_available = true;
            probe.node_version = Some(output.stdout.trim().to_string());
        }

        if probe.node_available {
            let playwright_probe = run_command_capture(
                "node",
                &[
                    "--input-type=module".to_string(),
                    "-e".to_string(),
                    "import('playwright').then(() => process.exit(0)).catch(() => process.exit(1));"
                        .to_string(),
                ],
                None,
                15,
            )
            .await;
            probe.playwright_package_available = playwright_probe
                .map(|output| output.exit_code == 0)
                .unwrap_or(false);
        }

        probe.chromium_cache_detected = detect_chromium_cache();
        probe.ready = probe.node_available && probe.playwright_package_available;

        if !probe.node_available {
            probe.notes.push(
                "Node.js not found. Install Node.js 20+ to enable the browser runtime.".to_string(),
            );
        }

        if probe.node_available && !probe.playwright_package_available {
            probe
                .notes
                .push("Playwright npm package not found. Run: npm i -D playwright".to_string());
        }

        if probe.ready && !probe.chromium_cache_detected {
            probe.notes.push(
                "Chromium browser binary not found in Playwright cache. Run: npx playwright install chromium".to_string(),
            );
        }

        Ok(probe)
    }

    async fn run_plan(
        &self,
        session: &PageSession,
        request: &RunPlanRequest,
    ) -> Result<PlanExecutionResult> {
        let probe = self.probe_runtime().await?;
        ensure_probe_ready(&probe)?;
        run_node_job(build_plan_runner(session, request)?, request.timeout_secs).await
    }
}

fn ensure_probe_ready(probe: &RuntimeProbe) -> Result<()> {
    if !probe.node_available {
        bail!("Node.js is required for browser execution");
    }
    if !probe.playwright_package_available {
        bail!("Playwright npm package is not available. Install it with: npm i -D playwright");
    }
    Ok(())
}

/// Generates the ES-module runner for a plan. The script launches a
/// persistent Chromium context against the session's fresh profile
/// directory, interprets the serialized actions one by one, and writes the
/// result payload behind [`RESULT_MARKER`] on stdout. On failure it attempts
/// a screenshot into the session's artifacts directory before reporting.
fn build_plan_runner(session: &PageSession, request: &RunPlanRequest) -> Result<String> {
    let session_literal = serde_json::json!({
        "id": session.id,
        "headless": session.headless,
        "profileDir": session.profile_dir,
        "artifactsDir": session.artifacts_dir,
    })
    .to_string();

    let actions_literal = serde_json::to_string(&request.actions)?;

    let mut script = String::new();
    script.push_str("import fs from 'node:fs';\n");
    script.push_str("import path from 'node:path';\n\n");
    script.push_str("const RESULT_MARKER = '__PAGECOPY_RESULT__=';\n");
    script.push_str(&format!("const session = {};%n", session_literal).replace("%n", "\n"));
    script.push_str(&format!("const actions = {};%n", actions_literal).replace("%n", "\n"));
    script.push_str("await fs.promises.mkdir(session.profileDir, { recursive: true });\n");
    script.push_str("await fs.promises.mkdir(session.artifactsDir, { recursive: true });\n\n");

    script.push_str("let chromium;\n");
    script.push_str("try {\n");
    script.push_str("  ({ chromium } = await import('playwright'));\n");
    script.push_str("} catch (error) {\n");
    script.push_str("  const message = error && error.stack ? error.stack : String(error);\n");
    script.push_str("  process.stderr.write(message + '\\n');\n");
    script.push_str("  process.stdout.write(`${RESULT_MARKER}${JSON.stringify({ success: false, error: message })}\\n`);\n");
    script.push_str("  process.exitCode = 1;\n");
    script.push_str("  process.exit();\n");
    script.push_str("}\n\n");

    script.push_str("const context = await chromium.launchPersistentContext(session.profileDir, { headless: session.headless });\n");
    script.push_str("const page = context.pages()[0] ?? await context.newPage();\n\n");

    script.push_str("async function executeAction(action) {\n");
    script.push_str("  const timeoutMs = action.timeout_ms ?? 10000;\n");
    script.push_str("  switch (action.type) {\n");
    script.push_str("    case 'navigate': {\n");
    script.push_str(
        "      await page.goto(action.url, { waitUntil: action.wait_until ?? 'load' });\n",
    );
    script.push_str("      return { type: action.type, url: action.url };\n");
    script.push_str("    }\n");
    script.push_str("    case 'fill': {\n");
    script.push_str("      const locator = page.locator(action.selector).first();\n");
    script.push_str("      await locator.waitFor({ state: 'visible', timeout: timeoutMs });\n");
    script.push_str("      await locator.fill(action.text, { timeout: timeoutMs });\n");
    script.push_str("      return { type: action.type, selector: action.selector };\n");
    script.push_str("    }\n");
    script.push_str("    case 'click': {\n");
    script.push_str("      const locator = page.locator(action.selector).first();\n");
    script.push_str("      await locator.waitFor({ state: 'visible', timeout: timeoutMs });\n");
    script.push_str("      await locator.click({ timeout: timeoutMs });\n");
    script.push_str("      return { type: action.type, selector: action.selector };\n");
    script.push_str("    }\n");
    script.push_str("    case 'wait_for_selector': {\n");
    script.push_str("      const locator = page.locator(action.selector).first();\n");
    script.push_str(
        "      await locator.waitFor({ state: action.state ?? 'visible', timeout: timeoutMs });\n",
    );
    script.push_str("      return { type: action.type, selector: action.selector };\n");
    script.push_str("    }\n");
    script.push_str("    case 'wait_for_load_state': {\n");
    script.push_str("      await page.waitForLoadState(action.state);\n");
    script.push_str("      return { type: action.type, state: action.state };\n");
    script.push_str("    }\n");
    script.push_str("    case 'wait_for_url': {\n");
    script.push_str("      await page.waitForURL(action.pattern, { timeout: timeoutMs });\n");
    script.push_str("      return { type: action.type, url: page.url() };\n");
    script.push_str("    }\n");
    script.push_str("    case 'pause': {\n");
    script.push_str("      await page.waitForTimeout(action.ms);\n");
    script.push_str("      return { type: action.type, ms: action.ms };\n");
    script.push_str("    }\n");
    script.push_str("    default:\n");
    script.push_str("      throw new Error(`Unsupported action type: ${action.type}`);\n");
    script.push_str("  }\n");
    script.push_str("}\n\n");

    script.push_str("const outputs = [];\n");
    script.push_str("try {\n");
    script.push_str("  for (const action of actions) {\n");
    script.push_str("    const value = await executeAction(action);\n");
    script.push_str("    outputs.push(value);\n");
    script.push_str("  }\n");
    script.push_str("  process.stdout.write(`${RESULT_MARKER}${JSON.stringify({ success: true, result: outputs })}\\n`);\n");
    script.push_str("} catch (error) {\n");
    script.push_str("  const message = error && error.stack ? error.stack : String(error);\n");
    script.push_str("  process.stderr.write(message + '\\n');\n");
    script.push_str(&format!(
        "  const screenshotPath = path.join(session.artifactsDir, '{}');\n",
        FAILURE_SCREENSHOT
    ));
    script.push_str("  let screenshot = null;\n");
    script.push_str("  try {\n");
    script.push_str("    await page.screenshot({ path: screenshotPath, fullPage: true });\n");
    script.push_str("    screenshot = screenshotPath;\n");
    script.push_str("  } catch (_) {}\n");
    script.push_str("  process.stdout.write(`${RESULT_MARKER}${JSON.stringify({ success: false, error: message, screenshot })}\\n`);\n");
    script.push_str("  process.exitCode = 1;\n");
    script.push_str("} finally {\n");
    script.push_str("  await context.close().catch(() => {});\n");
    script.push_str("}\n");

    Ok(script)
}

async fn run_node_job(script_content: String, timeout_secs: u64) -> Result<PlanExecutionResult> {
    let timeout_secs = timeout_secs.max(1);

    let temp_dir = tempfile::Builder::new()
        .prefix("pagecopy-runner-")
        .tempdir()?;

    let script_path = temp_dir.path().join("runner.mjs");
    std::fs::write(&script_path, script_content)?;
    tracing::debug!(script = %script_path.display(), "executing plan runner");

    let args = vec![script_path.display().to_string()];

    let started = Instant::now();
    let output = run_command_capture("node", &args, None, timeout_secs).await?;
    let duration_ms = started.elapsed().as_millis() as u64;
    let (stdout, payload) = extract_result_payload(&output.stdout);

    Ok(PlanExecutionResult {
        exit_code: output.exit_code,
        duration_ms,
        stdout,
        stderr: output.stderr,
        payload,
    })
}

fn extract_result_payload(stdout: &str) -> (String, Option<Value>) {
    let mut payload: Option<Value> = None;
    let mut clean_lines = Vec::new();

    for line in stdout.lines() {
        if let Some(rest) = line.strip_prefix(RESULT_MARKER) {
            if let Ok(value) = serde_json::from_str::<Value>(rest.trim()) {
                payload = Some(value);
            }
            continue;
        }
        clean_lines.push(line.to_string());
    }

    (clean_lines.join("\n"), payload)
}

struct CommandCapture {
    exit_code: i32,
    stdout: String,
    stderr: String,
}

async fn run_command_capture(
    program: &str,
    args: &[String],
    cwd: Option<&Path>,
    timeout_secs: u64,
) -> Result<CommandCapture> {
    let mut command = Command::new(program);
    command
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    if let Some(cwd) = cwd {
        command.current_dir(cwd);
    }

    let output = match timeout(Duration::from_secs(timeout_secs), command.output()).await {
        Ok(result) => result?,
        Err(_) => bail!("Command timed out after {} seconds", timeout_secs),
    };

    Ok(CommandCapture {
        exit_code: output.status.code().unwrap_or(-1),
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
    })
}

fn detect_chromium_cache() -> bool {
    if let Ok(path) = std::env::var("PLAYWRIGHT_BROWSERS_PATH") {
        let parsed = PathBuf::from(path);
        if parsed.exists() {
            return true;
        }
    }

    let mut candidates = Vec::new();

    if let Ok(home) = std::env::var("HOME") {
        candidates.push(PathBuf::from(&home).join(".cache/ms-playwright"));
        candidates.push(PathBuf::from(&home).join("Library/Caches/ms-playwright"));
    }

    if let Ok(user_profile) = std::env::var("USERPROFILE") {
        candidates.push(PathBuf::from(user_profile).join("AppData/Local/ms-playwright"));
    }

    candidates.into_iter().any(|path| path.exists())
}

fn resolve_default_root_dir() -> PathBuf {
    if let Ok(path) = std::env::var("PAGECOPY_BROWSER_DIR")
        && !path.trim().is_empty()
    {
        return PathBuf::from(path);
    }

    dirs::home_dir()
        .map(|home| home.join(".pagecopy").join("browser"))
        .unwrap_or_else(|| std::env::temp_dir().join("pagecopy-browser"))
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_headless() -> bool {
    true
}

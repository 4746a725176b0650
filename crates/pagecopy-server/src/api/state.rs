use pagecopy_browser::BrowserService;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Environment lookup used to resolve run settings. Injectable so router
/// tests never depend on process environment.
pub type EnvLookup = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

pub struct AppState {
    pub browser: BrowserService,
    /// One browser run at a time; concurrent requests queue here.
    pub run_lock: Mutex<()>,
    pub lookup: EnvLookup,
}

pub type SharedState = Arc<AppState>;

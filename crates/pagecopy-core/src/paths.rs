use anyhow::Result;
use std::path::PathBuf;

const PAGECOPY_DIR: &str = ".pagecopy";
const LOGS_DIR: &str = "logs";

/// Environment variable to override the PageCopy directory.
const PAGECOPY_DIR_ENV: &str = "PAGECOPY_DIR";

/// Resolve the PageCopy application directory.
/// Priority: PAGECOPY_DIR env var > ~/.pagecopy/
pub fn resolve_app_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var(PAGECOPY_DIR_ENV)
        && !dir.trim().is_empty()
    {
        return Ok(PathBuf::from(dir));
    }
    dirs::home_dir()
        .map(|home| home.join(PAGECOPY_DIR))
        .ok_or_else(|| anyhow::anyhow!("Failed to determine home directory"))
}

/// Ensure the application directory exists and return its path.
pub fn ensure_app_dir() -> Result<PathBuf> {
    let dir = resolve_app_dir()?;
    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}

/// Get the logs directory: ~/.pagecopy/logs/
pub fn logs_dir() -> Result<PathBuf> {
    let dir = resolve_app_dir()?.join(LOGS_DIR);
    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}

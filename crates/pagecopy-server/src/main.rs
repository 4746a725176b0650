mod api;
mod auth;
mod config;

use config::ServerConfig;
use pagecopy_browser::BrowserService;
use std::env;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing logger
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,pagecopy_server=debug".into()),
        )
        .with_target(false)
        .with_thread_ids(true)
        .with_line_number(true)
        .init();

    tracing::info!("Starting PageCopy server");

    let config = ServerConfig::load()?;
    let browser = BrowserService::new()?;

    let state = Arc::new(api::state::AppState {
        browser,
        run_lock: tokio::sync::Mutex::new(()),
        lookup: Arc::new(|key| env::var(key).ok()),
    });

    let app = api::app(state, config.api.clone());

    let listener = tokio::net::TcpListener::bind(format!("{}:{}", config.host, config.port))
        .await
        .map_err(|err| anyhow::anyhow!("Failed to bind {}:{}: {}", config.host, config.port, err))?;

    tracing::info!("PageCopy running on http://{}:{}", config.host, config.port);

    axum::serve(listener, app).await?;
    Ok(())
}

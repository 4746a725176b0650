use anyhow::Result;
use pagecopy_browser::BrowserService;
use pagecopy_core::{Overrides, Settings, run_copy_flow};
use serde_json::json;

use crate::cli::RunArgs;

pub async fn run(args: RunArgs) -> Result<()> {
    let overrides = Overrides {
        url: args.url,
        project: args.project,
        environment: args.environment,
        // The flag can only force headless on; leaving it off defers to
        // PLAYWRIGHT_HEADLESS.
        headless: args.headless.then_some(true),
    };
    let settings = Settings::from_env_with(&overrides)?;

    let service = BrowserService::new()?;
    let page = run_copy_flow(&service, &settings).await?;

    if args.format.is_json() {
        println!("{}", json!({ "newUrlPublished": page.url }));
    } else {
        println!("{}", page.url);
    }

    Ok(())
}

use anyhow::{Result, bail};
use pagecopy_browser::BrowserService;

use crate::cli::ProbeArgs;

pub async fn run(args: ProbeArgs) -> Result<()> {
    let service = BrowserService::new()?;
    let probe = service.probe_runtime().await?;

    if args.format.is_json() {
        println!("{}", serde_json::to_string_pretty(&probe)?);
    } else {
        println!("Browser runtime");
        match &probe.node_version {
            Some(version) => println!("Node.js: {version}"),
            None => println!("Node.js: not found"),
        }
        println!(
            "Playwright package: {}",
            if probe.playwright_package_available {
                "available"
            } else {
                "missing"
            }
        );
        println!(
            "Chromium cache: {}",
            if probe.chromium_cache_detected {
                "detected"
            } else {
                "not detected"
            }
        );

        for note in &probe.notes {
            println!("  - {note}");
        }
    }

    if !probe.ready {
        bail!("Browser runtime is not ready");
    }

    Ok(())
}

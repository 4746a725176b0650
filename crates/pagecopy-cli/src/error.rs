use colored::Colorize;

pub fn handle_error(err: anyhow::Error) -> ! {
    eprintln!("{} {}", "Error:".red().bold(), err);

    let msg = err.to_string().to_lowercase();

    if msg.contains("confluence_username") || msg.contains("confluence_password") {
        eprintln!("\n{}", "Suggestion:".yellow().bold());
        eprintln!("  Export your wiki credentials first:");
        eprintln!("  {} export CONFLUENCE_USERNAME=<user>", "$".dimmed());
        eprintln!("  {} export CONFLUENCE_PASSWORD=<password>", "$".dimmed());
    }

    if msg.contains("node.js") {
        eprintln!("\n{}", "Suggestion:".yellow().bold());
        eprintln!("  Install Node.js 20+ and verify with:");
        eprintln!("  {} node --version", "$".dimmed());
    }

    if msg.contains("playwright") {
        eprintln!("\n{}", "Suggestion:".yellow().bold());
        eprintln!("  Install Playwright and its Chromium binary:");
        eprintln!("  {} npm i -D playwright", "$".dimmed());
        eprintln!("  {} npx playwright install chromium", "$".dimmed());
    }

    std::process::exit(1);
}

use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;

/// Output format for CLI commands
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl OutputFormat {
    pub fn is_json(self) -> bool {
        matches!(self, OutputFormat::Json)
    }
}

#[derive(Parser)]
#[command(name = "pagecopy")]
#[command(version, about = "PageCopy - copy and publish a Confluence page")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },

    /// Run the login-copy-publish flow once and print the published URL
    Run(RunArgs),

    /// Check the local browser runtime (Node.js, Playwright, Chromium)
    Probe(ProbeArgs),
}

#[derive(Args)]
pub struct RunArgs {
    /// Target page URL
    #[arg(long, env = "CONFLUENCE_PAGE_URL")]
    pub url: Option<String>,

    /// Project whose page is copied (dSOC, Firesoc, AlarmControl, Video);
    /// takes precedence over --url
    #[arg(long, env = "CONFLUENCE_PROJECT_NAME")]
    pub project: Option<String>,

    /// Target environment for the project page (UAT or PRO)
    #[arg(long, env = "CONFLUENCE_ENVIRONMENT")]
    pub environment: Option<String>,

    /// Run the browser headless (otherwise PLAYWRIGHT_HEADLESS decides)
    #[arg(long)]
    pub headless: bool,

    /// Output format
    #[arg(long, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Args)]
pub struct ProbeArgs {
    /// Output format
    #[arg(long, default_value = "text")]
    pub format: OutputFormat,
}

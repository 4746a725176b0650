mod cli;
mod commands;
mod completions;
mod error;

use clap::Parser;
use cli::{Cli, Commands};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Commands::Completions { shell } = &cli.command {
        completions::generate_completions(*shell);
        return;
    }

    // Log to a rolling file; stdout stays clean for command output.
    let _guard = match pagecopy_core::paths::logs_dir() {
        Ok(log_dir) => {
            let file_appender = tracing_appender::rolling::daily(log_dir, "pagecopy.log");
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

            tracing_subscriber::fmt()
                .with_env_filter(
                    tracing_subscriber::EnvFilter::try_from_default_env()
                        .unwrap_or_else(|_| "info".into()),
                )
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_target(false)
                .init();
            Some(guard)
        }
        Err(_) => None,
    };

    let result = match cli.command {
        Commands::Run(args) => commands::run::run(args).await,
        Commands::Probe(args) => commands::probe::run(args).await,
        Commands::Completions { .. } => unreachable!("handled above"),
    };

    if let Err(err) = result {
        error::handle_error(err);
    }
}

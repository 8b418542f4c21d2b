mod cli;
mod commands;
mod config;
mod report;
mod store;

use clap::Parser;
use config::ResolvedRunConfig;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("snapdiff=info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = cli::Cli::parse();

    match cli.command {
        cli::Command::Init { force } => {
            commands::init(force)?;
        }
        cli::Command::Compare {
            reference,
            candidate,
            scale,
            output,
            diff,
        } => {
            let config = ResolvedRunConfig::new(diff)?;
            let code = commands::compare(config, reference, candidate, scale, output).await?;
            std::process::exit(code);
        }
        cli::Command::Test { filter, diff } => {
            let config = ResolvedRunConfig::new(diff)?;
            let code = commands::test(config, filter.as_deref()).await?;
            std::process::exit(code);
        }
        cli::Command::Approve {
            filter,
            new,
            failed,
            all,
        } => {
            commands::approve(filter.as_deref(), new, failed, all)?;
        }
    }

    Ok(())
}

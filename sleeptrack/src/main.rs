//! Sleeptrack CLI entry point.

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use sleeptrack::cli::{execute, Cli};
use sleeptrack::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load()?;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level()))
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    execute(cli, &config).await
}

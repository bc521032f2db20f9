//! Playhead CLI - Command-line interface
//!
//! Watch, inspect and publish P2P-delivered media through the local
//! transfer daemon and the catalog backend.

mod commands;

use std::path::PathBuf;

use clap::Parser;
use playhead_core::tracing_setup::{CliLogLevel, init_tracing};

#[derive(Parser)]
#[command(name = "playhead")]
#[command(about = "A playback client for P2P-delivered media")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: commands::Commands,

    /// Console log level (full debug log always goes to the logs directory)
    #[arg(long, default_value = "warn")]
    log_level: CliLogLevel,

    /// Directory for debug logs
    #[arg(long)]
    logs_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.log_level.as_tracing_level(), cli.logs_dir.as_deref())
        .map_err(|e| anyhow::anyhow!("failed to initialize tracing: {e}"))?;

    commands::handle_command(cli.command).await?;

    Ok(())
}

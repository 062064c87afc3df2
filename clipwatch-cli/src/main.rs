//! Clipwatch CLI
//!
//! Terminal front end for the job tracker: submit prompts, follow jobs to
//! completion, and save the finished videos.

mod commands;
mod config;
mod display;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, handle_command};
use config::Config;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "clipwatch")]
#[command(about = "Generate videos and track them to completion", long_about = None)]
struct Cli {
    /// Directory finished videos are written to
    #[arg(long, global = true, env = "CLIPWATCH_OUTPUT_DIR", default_value = ".")]
    output_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "clipwatch=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = Config::load(cli.output_dir)?;

    handle_command(cli.command, &config).await
}

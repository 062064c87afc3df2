//! Commands module
//!
//! Defines all CLI commands and their handlers.

mod generate;
mod models;

pub use generate::GenerateArgs;

use anyhow::Result;
use clap::Subcommand;
use clipwatch_core::domain::request::Provider;

use crate::config::Config;

/// Top-level CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Submit a prompt and follow the job until the video is saved
    Generate(GenerateArgs),
    /// Follow a job that was created elsewhere
    Watch {
        /// Provider-assigned job id
        id: String,

        /// Provider that owns the job (openai or replicate)
        #[arg(long, default_value = "openai")]
        provider: Provider,
    },
    /// List the models each provider accepts
    Models,
}

/// Handle a CLI command
///
/// Routes the command to the appropriate handler module.
///
/// # Arguments
/// * `command` - The command to execute
/// * `config` - The CLI configuration
pub async fn handle_command(command: Commands, config: &Config) -> Result<()> {
    match command {
        Commands::Generate(args) => generate::handle_generate(args, config).await,
        Commands::Watch { id, provider } => generate::handle_watch(&id, provider, config).await,
        Commands::Models => {
            models::print_models();
            Ok(())
        }
    }
}

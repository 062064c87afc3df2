//! Configuration module
//!
//! Gathers provider credentials and tracker timings from the environment.

use anyhow::{Context, Result};
use clipwatch_client::ProviderConfig;
use clipwatch_tracker::TrackerConfig;
use std::path::PathBuf;
use tracing::debug;

/// CLI configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub providers: ProviderConfig,
    pub tracker: TrackerConfig,
    pub output_dir: PathBuf,
}

impl Config {
    pub fn load(output_dir: PathBuf) -> Result<Self> {
        let tracker = TrackerConfig::from_env();
        tracker
            .validate()
            .context("Invalid CLIPWATCH_* timing configuration")?;

        let providers = ProviderConfig::from_env();
        debug!(
            openai_base = %providers.openai_base_url,
            replicate_base = %providers.replicate_base_url,
            output_dir = %output_dir.display(),
            "Configuration loaded"
        );

        Ok(Self {
            providers,
            tracker,
            output_dir,
        })
    }
}

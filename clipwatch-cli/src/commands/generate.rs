//! Generate and watch command handlers
//!
//! Both commands end in the same follow loop: render job progress, the
//! countdown to the next check, and new log entries until the job either
//! holds a video (saved to disk) or fails (a retry command is printed).

use anyhow::{Context, Result, bail};
use clap::Args;
use clipwatch_client::HttpBackend;
use clipwatch_core::domain::log::LogEntry;
use clipwatch_core::domain::request::{GenerationRequest, Provider};
use clipwatch_tracker::Tracker;
use colored::*;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::RecvError};

use crate::config::Config;
use crate::display::{
    clear_status_line, print_log_entry, print_status_line, retry_command, watch_command,
};

/// Arguments for `clipwatch generate`
#[derive(Args)]
pub struct GenerateArgs {
    /// What the video should show
    pub prompt: String,

    /// Provider to generate with (openai or replicate)
    #[arg(long, default_value = "openai")]
    pub provider: Provider,

    /// Model id; defaults to the provider's flagship model
    #[arg(long)]
    pub model: Option<String>,

    /// Clip length in seconds
    #[arg(long)]
    pub seconds: Option<String>,

    /// Frame size (e.g. 1280x720) or resolution (e.g. 1080p)
    #[arg(long)]
    pub size: Option<String>,

    /// Existing OpenAI video to remix
    #[arg(long)]
    pub remix_video_id: Option<String>,

    /// Reference image URL or data URI
    #[arg(long)]
    pub input_reference: Option<String>,
}

impl GenerateArgs {
    fn into_request(self) -> GenerationRequest {
        let mut request = GenerationRequest::new(self.provider, self.prompt);
        if let Some(model) = self.model {
            request = request.with_model(model);
        }
        if let Some(seconds) = self.seconds {
            request = request.with_seconds(seconds);
        }
        if let Some(size) = self.size {
            request = request.with_size(size);
        }
        request.remix_video_id = self.remix_video_id;
        request.input_reference = self.input_reference;
        request
    }
}

fn build_tracker(config: &Config) -> Result<Tracker> {
    let backend = Arc::new(HttpBackend::new(config.providers.clone()));
    Tracker::new(backend, config.tracker.clone()).context("Failed to start the job tracker")
}

/// Submit a prompt and follow the resulting job
pub async fn handle_generate(args: GenerateArgs, config: &Config) -> Result<()> {
    let tracker = build_tracker(config)?;
    let events = tracker.subscribe_events();

    let id = match tracker.submit(args.into_request()).await {
        Ok(id) => id,
        Err(e) => {
            for entry in tracker.events().iter().rev() {
                print_log_entry(entry);
            }
            return Err(e).context("Could not submit the prompt");
        }
    };

    follow(&tracker, &id, events, &config.output_dir).await
}

/// Attach to an existing job and follow it
pub async fn handle_watch(id: &str, provider: Provider, config: &Config) -> Result<()> {
    let tracker = build_tracker(config)?;
    let events = tracker.subscribe_events();

    tracker
        .attach(id, provider)
        .await
        .with_context(|| format!("Could not attach to job {id}"))?;

    follow(&tracker, id, events, &config.output_dir).await
}

async fn follow(
    tracker: &Tracker,
    id: &str,
    mut events: broadcast::Receiver<LogEntry>,
    output_dir: &Path,
) -> Result<()> {
    let mut jobs = tracker.subscribe();
    let mut countdowns = tracker.countdowns();

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(entry) => {
                    clear_status_line();
                    print_log_entry(&entry);
                }
                Err(RecvError::Lagged(skipped)) => {
                    clear_status_line();
                    println!("{}", format!("… {skipped} log entries skipped").dimmed());
                }
                Err(RecvError::Closed) => bail!("Event stream closed unexpectedly"),
            },
            changed = jobs.changed() => changed.context("Job registry closed unexpectedly")?,
            changed = countdowns.changed() => {
                if changed.is_ok() {
                    let view = countdowns.borrow_and_update().clone();
                    if let (Some(job), Some(countdown)) =
                        (tracker.job(id), view.iter().find(|c| c.job_id == id))
                    {
                        print_status_line(&job, countdown);
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                clear_status_line();
                println!("{}", "Interrupted; the job keeps running at the provider.".yellow());
                if let Some(job) = tracker.job(id) {
                    println!("  Resume with: {}", watch_command(&job));
                }
                return Ok(());
            }
        }

        let Some(job) = tracker.job(id) else {
            bail!("Job {id} is no longer tracked");
        };

        if job.has_artifact() {
            // Let the success entry print before the summary
            while let Ok(entry) = events.try_recv() {
                clear_status_line();
                print_log_entry(&entry);
            }
            let path = tracker.save_artifact(id, output_dir).await?;
            println!("{} Saved {}", "✓".green(), path.display().to_string().cyan());
            return Ok(());
        }

        if job.is_terminal() {
            while let Ok(entry) = events.try_recv() {
                clear_status_line();
                print_log_entry(&entry);
            }
            if let Ok(request) = tracker.retry(id) {
                println!("{}", "Retry with:".bold());
                println!("  {}", retry_command(&request));
            }
            bail!(
                "Job {id} failed: {}",
                job.error_message.as_deref().unwrap_or("Unknown failure")
            );
        }
    }
}

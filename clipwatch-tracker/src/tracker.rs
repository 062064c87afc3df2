//! Tracker facade
//!
//! The surface the presentation layer talks to: submit prompts, observe jobs
//! and events, force checks, fetch artifacts, and shut the session down.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use clipwatch_client::VideoBackend;
use clipwatch_core::domain::job::{Job, JobStatus};
use clipwatch_core::domain::log::LogEntry;
use clipwatch_core::domain::request::{GenerationRequest, Provider};
use clipwatch_core::normalize::{NormalizedStatus, Normalizer};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::clock::Clock;
use crate::config::TrackerConfig;
use crate::countdown::{self, Countdown};
use crate::error::{Result, TrackerError};
use crate::scheduler::JobPoller;

/// One tracking session
///
/// Dropping the tracker cancels every pending poll and releases every held
/// artifact.
pub struct Tracker {
    poller: Arc<JobPoller>,
    countdowns: watch::Receiver<Vec<Countdown>>,
    countdown_task: JoinHandle<()>,
    shut_down: AtomicBool,
}

impl Tracker {
    /// Creates a tracker; must be called inside a tokio runtime
    pub fn new(backend: Arc<dyn VideoBackend>, config: TrackerConfig) -> Result<Self> {
        Self::with_clock(backend, config, Clock::new())
    }

    /// Creates a tracker reading time from `clock`
    pub fn with_clock(
        backend: Arc<dyn VideoBackend>,
        config: TrackerConfig,
        clock: Clock,
    ) -> Result<Self> {
        config.validate()?;

        let countdown_tick = config.countdown_tick;
        let poller = Arc::new(JobPoller::new(backend, config, clock));

        let (sender, countdowns) = watch::channel(Vec::new());
        let countdown_task =
            countdown::spawn(poller.registry().subscribe(), clock, countdown_tick, sender);

        Ok(Self {
            poller,
            countdowns,
            countdown_task,
            shut_down: AtomicBool::new(false),
        })
    }

    /// Submits a generation request and starts tracking it
    ///
    /// Returns the provider-assigned job id. Validation and configuration
    /// errors surface here and the job is never registered.
    pub async fn submit(&self, request: GenerationRequest) -> Result<String> {
        let events = self.poller.events();

        if let Err(e) = request.validate() {
            events.error(None, format!("Launch aborted: {e}"));
            return Err(e.into());
        }

        events.info(None, format!("Dispatching prompt: \"{}\"", request.prompt.trim()));

        let created = match self.poller.backend().create(&request).await {
            Ok(raw) => raw.normalize(self.poller.clock().now()).map_err(TrackerError::from),
            Err(e) => Err(e.into()),
        };
        let observed = match created {
            Ok(observed) => observed,
            Err(e) => {
                events.error(None, format!("Launch aborted: {e}"));
                return Err(e);
            }
        };

        let job = job_from_observation(request, &observed);
        let id = job.id.clone();
        self.register(job)?;

        events.info(Some(&id), format!("Job {id} queued. Tracking progress."));
        self.poller.start(&id);
        Ok(id)
    }

    /// Starts tracking a job created elsewhere
    ///
    /// The first observation comes from a status call, which also establishes
    /// the job's creation time.
    pub async fn attach(&self, id: &str, provider: Provider) -> Result<()> {
        let events = self.poller.events();

        let observed = match self.poller.backend().status(id, provider).await {
            Ok(raw) => raw.normalize(self.poller.clock().now()).map_err(TrackerError::from),
            Err(e) => Err(e.into()),
        };
        let observed = match observed {
            Ok(observed) => observed,
            Err(e) => {
                events.error(Some(id), format!("Could not attach to job {id}: {e}"));
                return Err(e);
            }
        };

        let mut request = GenerationRequest::new(provider, "");
        if let Some(model) = &observed.model {
            request.model = model.clone();
        }
        request.seconds = observed.seconds.clone();
        request.size = observed.size.clone();

        let job = job_from_observation(request, &observed);
        self.register(job)?;

        events.info(Some(id), format!("Job {id} attached. Tracking progress."));
        self.poller.start(id);
        Ok(())
    }

    fn register(&self, job: Job) -> Result<()> {
        let id = job.id.clone();
        if !self.poller.registry().register(job) {
            return Err(TrackerError::InvalidState(format!(
                "Job {id} is already being tracked"
            )));
        }
        info!(job_id = %id, "Tracking job");
        Ok(())
    }

    /// Snapshot of every job, newest first
    pub fn jobs(&self) -> Vec<Job> {
        self.poller.registry().all()
    }

    pub fn job(&self, id: &str) -> Option<Job> {
        self.poller.registry().get(id)
    }

    /// Receives a newest-first job snapshot after every change
    pub fn subscribe(&self) -> watch::Receiver<Vec<Job>> {
        self.poller.registry().subscribe()
    }

    /// Every event so far, newest first
    pub fn events(&self) -> Vec<LogEntry> {
        self.poller.events().entries()
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<LogEntry> {
        self.poller.events().subscribe()
    }

    /// Countdown views, refreshed every `countdown_tick`
    pub fn countdowns(&self) -> watch::Receiver<Vec<Countdown>> {
        self.countdowns.clone()
    }

    /// Returns the original request of a failed job for resubmission
    pub fn retry(&self, id: &str) -> Result<GenerationRequest> {
        let job = self.require(id)?;
        if job.status != JobStatus::Failed {
            return Err(TrackerError::InvalidState(format!(
                "Job {id} is {}; only failed jobs can be retried",
                job.status
            )));
        }
        if job.request.prompt.trim().is_empty() {
            return Err(TrackerError::InvalidState(format!(
                "Job {id} was attached without its original prompt"
            )));
        }

        self.poller
            .events()
            .info(Some(id), "Prompt loaded back for retry.");
        Ok(job.request)
    }

    /// Cancels the pending check for `id` and checks right away
    pub fn force_check(&self, id: &str) -> Result<()> {
        let job = self.require(id)?;
        if job.is_settled() {
            return Err(TrackerError::InvalidState(format!(
                "Job {id} is no longer being polled"
            )));
        }
        self.poller.force(id);
        Ok(())
    }

    /// Stops polling `id` without changing its status
    pub fn cancel(&self, id: &str) -> Result<()> {
        self.require(id)?;
        self.poller.cancel(id);
        Ok(())
    }

    /// Overrides when forced downloads may start for `id`
    pub fn set_fallback_deadline(&self, id: &str, deadline: DateTime<Utc>) -> Result<()> {
        self.poller
            .registry()
            .update(id, |job| job.fallback.deadline = Some(deadline))
            .ok_or_else(|| TrackerError::JobNotFound(id.to_string()))
    }

    /// Bytes of the artifact attached to `id`
    pub fn artifact_bytes(&self, id: &str) -> Result<Bytes> {
        let job = self.require(id)?;
        let artifact = job
            .artifact
            .ok_or_else(|| TrackerError::InvalidState(format!("Job {id} has no video yet")))?;
        self.poller
            .artifacts()
            .bytes(artifact.handle)
            .ok_or_else(|| TrackerError::InvalidState(format!("Video for job {id} was released")))
    }

    /// Writes the artifact of `id` to `dir/{id}.{ext}` and returns the path
    pub async fn save_artifact(&self, id: &str, dir: impl AsRef<Path>) -> Result<PathBuf> {
        let job = self.require(id)?;
        let extension = job
            .artifact
            .as_ref()
            .map(|a| a.file_extension())
            .unwrap_or("mp4");
        let bytes = self.artifact_bytes(id)?;

        let dir = dir.as_ref();
        tokio::fs::create_dir_all(dir).await?;
        let path = dir.join(format!("{}.{extension}", sanitize_file_stem(id)));
        tokio::fs::write(&path, &bytes).await?;

        debug!(job_id = %id, path = %path.display(), "Artifact saved");
        Ok(path)
    }

    /// Number of artifacts currently held in memory
    pub fn live_artifacts(&self) -> usize {
        self.poller.artifacts().live_count()
    }

    /// Number of jobs with a pending check
    pub fn pending_checks(&self) -> usize {
        self.poller.timers().armed_count()
    }

    /// Cancels every pending poll and releases every held artifact
    ///
    /// Safe to call more than once.
    pub fn shutdown(&self) {
        if self.shut_down.swap(true, Ordering::SeqCst) {
            return;
        }

        self.countdown_task.abort();
        let cancelled = self.poller.timers().close();
        self.poller
            .registry()
            .update_all(|job| job.next_poll_at = None);
        let released = self.poller.artifacts().release_all();

        info!(cancelled, released, "Tracker shut down");
    }

    fn require(&self, id: &str) -> Result<Job> {
        self.poller
            .registry()
            .get(id)
            .ok_or_else(|| TrackerError::JobNotFound(id.to_string()))
    }
}

impl Drop for Tracker {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn job_from_observation(request: GenerationRequest, observed: &NormalizedStatus) -> Job {
    let mut job = Job::new(
        observed.id.clone(),
        request,
        observed.status.clone(),
        observed.created_at,
    );
    job.progress = observed.progress;
    job.provider_status = Some(observed.raw_status.clone());
    job
}

/// Keeps provider ids from escaping the output directory
fn sanitize_file_stem(id: &str) -> String {
    id.chars()
        .map(|c| match c {
            'a'..='z' | 'A'..='Z' | '0'..='9' | '-' | '_' | '.' => c,
            _ => '_',
        })
        .collect()
}

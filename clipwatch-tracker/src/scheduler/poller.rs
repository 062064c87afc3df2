//! Job poller
//!
//! Runs one poll tick for a job: fetch the provider status, normalize it,
//! merge it into the registry, apply the stall and fallback policies, and
//! decide when the next tick should happen. Also owns the content download
//! shared by the completion and fallback paths.

use clipwatch_client::{ContentFetch, VideoBackend, VideoContent};
use clipwatch_core::domain::job::{Job, JobStatus};
use clipwatch_core::normalize::{NormalizedStatus, Normalizer};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::artifacts::ArtifactStore;
use crate::clock::{Clock, to_delta};
use crate::config::TrackerConfig;
use crate::countdown::humanize;
use crate::events::EventLog;
use crate::policy;
use crate::registry::JobRegistry;

use super::timers::Timers;

/// What the scheduler should do once a tick finishes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextPoll {
    After(Duration),
    Stop,
}

/// Why a content download is being attempted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadReason {
    /// The provider reported the job completed
    Completion,
    /// The job has been pending too long; try regardless of status
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadOutcome {
    Attached,
    NotReady,
    Failed(String),
}

/// Result of merging one observation into a job
struct Merge {
    job: Job,
    transitioned: bool,
    stalled: bool,
}

/// Polls providers and keeps the registry in step with them
pub struct JobPoller {
    backend: Arc<dyn VideoBackend>,
    config: TrackerConfig,
    clock: Clock,
    registry: JobRegistry,
    artifacts: ArtifactStore,
    events: EventLog,
    timers: Timers,
}

impl JobPoller {
    pub fn new(backend: Arc<dyn VideoBackend>, config: TrackerConfig, clock: Clock) -> Self {
        Self {
            backend,
            config,
            clock,
            registry: JobRegistry::new(),
            artifacts: ArtifactStore::new(),
            events: EventLog::new(clock),
            timers: Timers::new(),
        }
    }

    pub fn backend(&self) -> &Arc<dyn VideoBackend> {
        &self.backend
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    pub fn registry(&self) -> &JobRegistry {
        &self.registry
    }

    pub fn artifacts(&self) -> &ArtifactStore {
        &self.artifacts
    }

    pub fn events(&self) -> &EventLog {
        &self.events
    }

    pub fn timers(&self) -> &Timers {
        &self.timers
    }

    /// Arms an immediate first poll
    pub fn start(self: &Arc<Self>, job_id: &str) {
        self.timers.arm(self, job_id, Duration::ZERO);
    }

    /// Cancels any pending poll and polls right away
    pub fn force(self: &Arc<Self>, job_id: &str) {
        debug!(job_id, "Forcing immediate poll");
        self.timers.arm(self, job_id, Duration::ZERO);
    }

    /// Stops polling `job_id`
    pub fn cancel(&self, job_id: &str) {
        self.timers.cancel(job_id);
        self.mark_idle(job_id);
    }

    pub(crate) fn mark_scheduled(&self, job_id: &str, delay: Duration) {
        let at = self.clock.now().checked_add_signed(to_delta(delay));
        self.registry.update(job_id, |job| job.next_poll_at = at);
    }

    pub(crate) fn mark_idle(&self, job_id: &str) {
        self.registry.update(job_id, |job| job.next_poll_at = None);
    }

    /// Runs one poll tick
    pub async fn tick(&self, job_id: &str) -> NextPoll {
        let now = self.clock.now();
        let Some(job) = self.registry.update(job_id, |job| {
            job.next_poll_at = Some(now);
            job.clone()
        }) else {
            debug!(job_id, "Tick for untracked job");
            return NextPoll::Stop;
        };
        if job.is_settled() {
            return NextPoll::Stop;
        }

        debug!(job_id, provider = %job.provider, "Polling job status");
        let raw = match self.backend.status(job_id, job.provider).await {
            Ok(raw) => raw,
            Err(e) => {
                self.fail_job(
                    job_id,
                    e.to_string(),
                    format!("Lost contact with job {job_id}: {e}"),
                );
                return NextPoll::Stop;
            }
        };

        let now = self.clock.now();
        let observed = match raw.normalize(now) {
            Ok(observed) => observed,
            Err(e) => {
                self.fail_job(
                    job_id,
                    e.to_string(),
                    format!("Job {job_id} returned an unreadable status: {e}"),
                );
                return NextPoll::Stop;
            }
        };

        let stall_after = self.config.stall_after;
        let Some(merge) = self
            .registry
            .update(job_id, |job| merge_observation(job, &observed, now, stall_after))
        else {
            return NextPoll::Stop;
        };
        self.report(&merge);

        match observed.status {
            JobStatus::Completed => self.after_completed_status(job_id).await,
            JobStatus::Failed => NextPoll::Stop,
            _ => self.after_pending_status(&merge.job).await,
        }
    }

    /// Tries to fetch and attach the job's content
    pub async fn attempt_download(&self, job_id: &str, reason: DownloadReason) -> DownloadOutcome {
        let now = self.clock.now();
        let Some(job) = self.registry.get(job_id) else {
            return DownloadOutcome::Failed(format!("Job {job_id} is not tracked"));
        };

        let attempt = match reason {
            DownloadReason::Fallback => self.record_fallback_attempt(&job, now),
            DownloadReason::Completion => 0,
        };

        match self.backend.content(job_id, job.provider).await {
            Ok(ContentFetch::Ready(content)) => {
                if self.attach(job_id, content, reason) {
                    DownloadOutcome::Attached
                } else {
                    DownloadOutcome::Failed(format!("Video for job {job_id} was discarded"))
                }
            }
            Ok(ContentFetch::NotReady) => self.not_ready(job_id, reason, attempt),
            Err(e) if e.is_not_found() => self.not_ready(job_id, reason, attempt),
            Err(e) => {
                let message = e.to_string();
                match reason {
                    DownloadReason::Completion => {
                        self.fail_job(
                            job_id,
                            message.clone(),
                            format!("Job {job_id} download failed: {e}"),
                        );
                    }
                    DownloadReason::Fallback => {
                        self.registry.update(job_id, |job| {
                            job.fallback.last_error = Some(message.clone());
                        });
                        self.events.warning(
                            job_id,
                            format!("Direct download attempt {attempt} for job {job_id} failed: {e}"),
                        );
                    }
                }
                DownloadOutcome::Failed(message)
            }
        }
    }

    async fn after_completed_status(&self, job_id: &str) -> NextPoll {
        match self.attempt_download(job_id, DownloadReason::Completion).await {
            DownloadOutcome::Attached | DownloadOutcome::Failed(_) => NextPoll::Stop,
            DownloadOutcome::NotReady => {
                let retries = self
                    .registry
                    .update(job_id, |job| {
                        job.completion_retries += 1;
                        job.completion_retries
                    })
                    .unwrap_or_default();

                let exhausted = self
                    .config
                    .max_completion_retries
                    .is_some_and(|max| retries > max);
                if exhausted {
                    self.fail_job(
                        job_id,
                        format!("Content never became available after {retries} checks"),
                        format!("Job {job_id} failed: content never became available"),
                    );
                    return NextPoll::Stop;
                }

                NextPoll::After(self.config.completion_retry_delay())
            }
        }
    }

    async fn after_pending_status(&self, job: &Job) -> NextPoll {
        if !policy::fallback_due(job, self.clock.now(), &self.config) {
            return NextPoll::After(self.config.poll_interval);
        }
        match self.attempt_download(&job.id, DownloadReason::Fallback).await {
            DownloadOutcome::Attached => NextPoll::Stop,
            _ => NextPoll::After(self.config.fallback_retry_delay()),
        }
    }

    /// Counts a fallback attempt before it is made; returns its number
    fn record_fallback_attempt(&self, job: &Job, now: chrono::DateTime<chrono::Utc>) -> u32 {
        let recorded = self.registry.update(&job.id, |job| {
            let first = !job.fallback.triggered;
            job.fallback.triggered = true;
            job.fallback.attempt_count += 1;
            job.fallback.last_attempt_at = Some(now);
            (first, job.fallback.attempt_count)
        });
        let Some((first, attempt)) = recorded else {
            return 0;
        };

        if first {
            let waited = job.age(now).to_std().unwrap_or_default();
            self.events.info(
                Some(&job.id),
                format!(
                    "Job {} still {} after {}. Trying a direct download.",
                    job.id,
                    job.status,
                    humanize(waited)
                ),
            );
        }
        attempt
    }

    fn not_ready(&self, job_id: &str, reason: DownloadReason, attempt: u32) -> DownloadOutcome {
        match reason {
            DownloadReason::Fallback => self.events.info(
                Some(job_id),
                format!("Video for job {job_id} not available yet (direct attempt {attempt})."),
            ),
            DownloadReason::Completion => {
                debug!(job_id, "Content not ready after completion, retrying soon");
            }
        }
        DownloadOutcome::NotReady
    }

    /// Stores downloaded content and swaps it into the job
    ///
    /// Returns false when the session has shut down meanwhile; the content is
    /// dropped and the job keeps no artifact.
    fn attach(&self, job_id: &str, content: VideoContent, reason: DownloadReason) -> bool {
        let Some(artifact) = self.artifacts.materialize(content, self.clock.now()) else {
            debug!(job_id, "Tracker shut down before the download finished");
            return false;
        };
        let handle = artifact.handle;
        let mark_completed = reason == DownloadReason::Completion;

        let replaced = self.registry.update(job_id, |job| {
            let previous = job.artifact.replace(artifact);
            if mark_completed {
                job.advance_status(JobStatus::Completed);
            }
            job.progress = 100;
            job.next_poll_at = None;
            previous
        });

        let Some(previous) = replaced else {
            warn!(job_id, "Job disappeared before its artifact could be attached");
            self.artifacts.release(handle);
            return false;
        };
        if let Some(previous) = previous {
            self.artifacts.release(previous.handle);
        }

        // Shutdown may have released the new bytes between materialize and swap
        if self.artifacts.is_closed() {
            self.registry.update(job_id, |job| {
                if job.artifact.as_ref().is_some_and(|a| a.handle == handle) {
                    job.artifact = None;
                }
            });
            self.artifacts.release(handle);
            return false;
        }

        match reason {
            DownloadReason::Completion => {
                self.events
                    .success(job_id, format!("Job {job_id} completed. Video secured."))
            }
            DownloadReason::Fallback => self.events.success(
                job_id,
                format!("Job {job_id} video secured by direct download."),
            ),
        }
        true
    }

    /// Marks the job failed and logs `log_message` once
    fn fail_job(&self, job_id: &str, error_message: String, log_message: String) {
        let failed = self
            .registry
            .update(job_id, |job| job.fail(error_message))
            .unwrap_or(false);
        if failed {
            self.events.error(Some(job_id), log_message);
        }
    }

    fn report(&self, merge: &Merge) {
        let job = &merge.job;
        if merge.transitioned {
            match job.status {
                JobStatus::InProgress => self
                    .events
                    .info(Some(&job.id), format!("Job {} is in progress.", job.id)),
                JobStatus::Failed => self.events.error(
                    Some(&job.id),
                    format!(
                        "Job {} failed: {}",
                        job.id,
                        job.error_message.as_deref().unwrap_or("Unknown failure")
                    ),
                ),
                _ => {}
            }
        }
        if merge.stalled {
            self.events.warning(
                &job.id,
                format!(
                    "Job {} has been in progress for over {}.",
                    job.id,
                    humanize(self.config.stall_after)
                ),
            );
        }
    }
}

/// Folds one normalized observation into `job`
///
/// The creation time is never touched. A reported completion is recorded as
/// the provider status only; the canonical status becomes completed once the
/// content has been downloaded.
fn merge_observation(
    job: &mut Job,
    observed: &NormalizedStatus,
    now: chrono::DateTime<chrono::Utc>,
    stall_after: Duration,
) -> Merge {
    job.provider_status = Some(observed.raw_status.clone());
    job.progress = observed.progress;

    let mut transitioned = false;
    if observed.status != JobStatus::Completed {
        if observed.status == JobStatus::Failed && !job.is_terminal() {
            job.error_message = observed.error.clone();
        }
        transitioned = job.advance_status(observed.status.clone()).is_some();
    }

    let stalled = policy::stall_due(job, now, stall_after);
    if stalled {
        job.stall_notified = true;
    }

    Merge {
        job: job.clone(),
        transitioned,
        stalled,
    }
}

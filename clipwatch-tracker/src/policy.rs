//! Stall and fallback policy
//!
//! Pure decisions evaluated on every poll tick. Neither function mutates the
//! job; the poller records the outcome.

use chrono::{DateTime, Utc};
use clipwatch_core::domain::job::{Job, JobStatus};
use std::time::Duration;

use crate::clock::to_delta;
use crate::config::TrackerConfig;

/// Whether the one-time stall warning should fire now
///
/// True only for an in-progress job older than `stall_after` that has not
/// been warned about yet.
pub fn stall_due(job: &Job, now: DateTime<Utc>, stall_after: Duration) -> bool {
    job.status == JobStatus::InProgress
        && !job.stall_notified
        && job.age(now) > to_delta(stall_after)
}

/// When a forced download first becomes allowed for `job`
pub fn fallback_deadline(job: &Job, config: &TrackerConfig) -> DateTime<Utc> {
    job.fallback.deadline.unwrap_or_else(|| {
        job.created_at
            .checked_add_signed(to_delta(config.fallback_after))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    })
}

/// Whether a forced content download should be attempted now
///
/// Requires no artifact yet, a non-terminal job, the fallback deadline to
/// have passed, and enough spacing since the previous attempt.
pub fn fallback_due(job: &Job, now: DateTime<Utc>, config: &TrackerConfig) -> bool {
    if job.is_settled() || now < fallback_deadline(job, config) {
        return false;
    }
    match job.fallback.last_attempt_at {
        Some(last) => now - last >= to_delta(config.fallback_spacing),
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;
    use clipwatch_core::domain::job::ArtifactRef;
    use clipwatch_core::domain::request::{GenerationRequest, Provider};
    use uuid::Uuid;

    fn t0() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    fn job(status: JobStatus) -> Job {
        let mut job = Job::new(
            "job_1",
            GenerationRequest::new(Provider::OpenAi, "A"),
            JobStatus::Queued,
            t0(),
        );
        job.status = status;
        job
    }

    #[test]
    fn test_stall_requires_in_progress_past_threshold() {
        let stall_after = Duration::from_secs(600);
        let running = job(JobStatus::InProgress);

        assert!(!stall_due(&running, t0() + TimeDelta::seconds(600), stall_after));
        assert!(stall_due(&running, t0() + TimeDelta::seconds(601), stall_after));

        let queued = job(JobStatus::Queued);
        assert!(!stall_due(&queued, t0() + TimeDelta::hours(1), stall_after));
    }

    #[test]
    fn test_stall_fires_once() {
        let mut running = job(JobStatus::InProgress);
        running.stall_notified = true;
        assert!(!stall_due(&running, t0() + TimeDelta::hours(1), Duration::from_secs(600)));
    }

    #[test]
    fn test_fallback_never_before_deadline() {
        let config = TrackerConfig::default();
        let running = job(JobStatus::InProgress);

        assert!(!fallback_due(&running, t0() + TimeDelta::seconds(179), &config));
        assert!(fallback_due(&running, t0() + TimeDelta::seconds(180), &config));
    }

    #[test]
    fn test_fallback_attempts_are_spaced() {
        let config = TrackerConfig::default();
        let mut running = job(JobStatus::InProgress);
        running.fallback.last_attempt_at = Some(t0() + TimeDelta::seconds(181));

        assert!(!fallback_due(&running, t0() + TimeDelta::seconds(210), &config));
        assert!(fallback_due(&running, t0() + TimeDelta::seconds(211), &config));
    }

    #[test]
    fn test_fallback_respects_deadline_override() {
        let config = TrackerConfig::default();
        let mut running = job(JobStatus::Queued);
        running.fallback.deadline = Some(t0() + TimeDelta::seconds(30));

        assert!(fallback_due(&running, t0() + TimeDelta::seconds(30), &config));
    }

    #[test]
    fn test_fallback_skips_settled_jobs() {
        let config = TrackerConfig::default();
        let late = t0() + TimeDelta::hours(1);

        let failed = job(JobStatus::Failed);
        assert!(!fallback_due(&failed, late, &config));

        let mut downloaded = job(JobStatus::InProgress);
        downloaded.artifact = Some(ArtifactRef {
            handle: Uuid::new_v4(),
            content_type: "video/mp4".to_string(),
            size_bytes: 1,
            content_disposition: None,
            obtained_at: late,
        });
        assert!(!fallback_due(&downloaded, late, &config));
    }
}

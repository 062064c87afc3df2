//! Countdown presenter
//!
//! A fixed-cadence ticker that turns registry timestamps into "time until the
//! next check" for display. It only reads job snapshots and never touches
//! scheduling state.

use chrono::{DateTime, Utc};
use clipwatch_core::domain::job::{Job, JobStatus};
use serde::Serialize;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};

use crate::clock::Clock;

/// Display timing for one job
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Countdown {
    pub job_id: String,
    pub status: JobStatus,
    /// Time since the provider created the job
    pub elapsed: Duration,
    /// Time until the next scheduled check; `None` when nothing is scheduled
    pub next_check_in: Option<Duration>,
}

impl Countdown {
    /// Short label for the next check ("checking", "in 42s", or "-")
    pub fn label(&self) -> String {
        match self.next_check_in {
            Some(remaining) if remaining.is_zero() => "checking".to_string(),
            Some(remaining) => format!("in {}", humanize(remaining)),
            None => "-".to_string(),
        }
    }
}

/// Computes countdowns for `jobs` as of `now`, preserving their order
pub fn compute(jobs: &[Job], now: DateTime<Utc>) -> Vec<Countdown> {
    jobs.iter()
        .map(|job| Countdown {
            job_id: job.id.clone(),
            status: job.status.clone(),
            elapsed: job.age(now).to_std().unwrap_or_default(),
            next_check_in: job
                .next_poll_at
                .map(|at| (at - now).to_std().unwrap_or_default()),
        })
        .collect()
}

/// Starts the ticker, publishing to `sender` every `tick`
pub(crate) fn spawn(
    mut jobs: watch::Receiver<Vec<Job>>,
    clock: Clock,
    tick: Duration,
    sender: watch::Sender<Vec<Countdown>>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = time::interval(tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;
            let view = compute(&jobs.borrow_and_update(), clock.now());
            sender.send_replace(view);
        }
    })
}

/// Formats a duration as "45s", "3m", "3m 20s" or "1h 5m"
pub fn humanize(d: Duration) -> String {
    let secs = d.as_secs();
    let (hours, minutes, seconds) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    match (hours, minutes, seconds) {
        (0, 0, s) => format!("{s}s"),
        (0, m, 0) => format!("{m}m"),
        (0, m, s) => format!("{m}m {s}s"),
        (h, 0, _) => format!("{h}h"),
        (h, m, _) => format!("{h}h {m}m"),
    }
}

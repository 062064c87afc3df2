//! Scheduler layer for the tracker
//!
//! `Timers` owns every job's pending poll; `JobPoller` runs the tick body and
//! tells the timers whether and when to poll again.

pub mod poller;
mod timers;

pub use poller::{DownloadOutcome, DownloadReason, JobPoller, NextPoll};
pub use timers::Timers;

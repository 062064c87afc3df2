//! Clipwatch Tracker
//!
//! Client-side job-tracking engine for asynchronous video generation.
//!
//! Architecture:
//! - Registry: observable in-memory map of tracked jobs
//! - Scheduler: one pending poll per job; the poller runs each tick
//! - Policy: stall warnings and time-triggered fallback downloads
//! - Countdown: fixed-cadence "next check in" view, read-only
//! - Artifacts and events: downloaded media and the user-facing event log
//!
//! [`Tracker`] ties these together for the presentation layer.

pub mod artifacts;
pub mod clock;
pub mod config;
pub mod countdown;
pub mod error;
pub mod events;
pub mod policy;
pub mod registry;
pub mod scheduler;
mod tracker;

pub use clock::Clock;
pub use config::TrackerConfig;
pub use countdown::Countdown;
pub use error::{Result, TrackerError};
pub use tracker::Tracker;

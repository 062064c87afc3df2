//! Event log
//!
//! Append-only stream of human-readable status messages for the presentation
//! layer. Entries are read newest first, broadcast to live subscribers, and
//! mirrored to `tracing`.

use clipwatch_core::domain::log::{LogEntry, LogLevel};
use std::sync::{Mutex, PoisonError};
use tokio::sync::broadcast;
use tracing::{error, info, warn};

use crate::clock::Clock;

const BROADCAST_CAPACITY: usize = 256;

pub struct EventLog {
    clock: Clock,
    entries: Mutex<Vec<LogEntry>>,
    sender: broadcast::Sender<LogEntry>,
}

impl EventLog {
    pub fn new(clock: Clock) -> Self {
        let (sender, _) = broadcast::channel(BROADCAST_CAPACITY);
        Self {
            clock,
            entries: Mutex::new(Vec::new()),
            sender,
        }
    }

    /// Appends an entry stamped with the current time
    pub fn record(&self, level: LogLevel, job_id: Option<&str>, message: impl Into<String>) {
        let entry = LogEntry {
            timestamp: self.clock.now(),
            level,
            job_id: job_id.map(str::to_string),
            message: message.into(),
        };

        let job = entry.job_id.as_deref().unwrap_or("-");
        match level {
            LogLevel::Info | LogLevel::Success => info!(job_id = job, "{}", entry.message),
            LogLevel::Warning => warn!(job_id = job, "{}", entry.message),
            LogLevel::Error => error!(job_id = job, "{}", entry.message),
        }

        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(entry.clone());
        // No receivers is fine
        let _ = self.sender.send(entry);
    }

    pub fn info(&self, job_id: Option<&str>, message: impl Into<String>) {
        self.record(LogLevel::Info, job_id, message);
    }

    pub fn success(&self, job_id: &str, message: impl Into<String>) {
        self.record(LogLevel::Success, Some(job_id), message);
    }

    pub fn warning(&self, job_id: &str, message: impl Into<String>) {
        self.record(LogLevel::Warning, Some(job_id), message);
    }

    pub fn error(&self, job_id: Option<&str>, message: impl Into<String>) {
        self.record(LogLevel::Error, job_id, message);
    }

    /// Every entry so far, newest first
    pub fn entries(&self) -> Vec<LogEntry> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.iter().rev().cloned().collect()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LogEntry> {
        self.sender.subscribe()
    }
}

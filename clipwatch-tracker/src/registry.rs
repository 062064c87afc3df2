//! Job registry
//!
//! In-memory map of job id to tracked state and the single source of truth
//! for rendering. Every mutation is one read-modify-write step under the lock,
//! after which a fresh newest-first snapshot is published to subscribers.

use clipwatch_core::domain::job::Job;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use tokio::sync::watch;

struct Entry {
    seq: u64,
    job: Job,
}

#[derive(Default)]
struct Inner {
    jobs: HashMap<String, Entry>,
    next_seq: u64,
}

impl Inner {
    fn snapshot(&self) -> Vec<Job> {
        let mut entries: Vec<&Entry> = self.jobs.values().collect();
        entries.sort_by(|a, b| b.seq.cmp(&a.seq));
        entries.into_iter().map(|e| e.job.clone()).collect()
    }
}

/// Observable store of every tracked job
pub struct JobRegistry {
    inner: Mutex<Inner>,
    snapshots: watch::Sender<Vec<Job>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        let (snapshots, _) = watch::channel(Vec::new());
        Self {
            inner: Mutex::new(Inner::default()),
            snapshots,
        }
    }

    /// Starts tracking `job`
    ///
    /// Returns false, leaving the registry untouched, if the id is already tracked.
    pub fn register(&self, job: Job) -> bool {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        if inner.jobs.contains_key(&job.id) {
            return false;
        }
        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.jobs.insert(job.id.clone(), Entry { seq, job });
        self.snapshots.send_replace(inner.snapshot());
        true
    }

    pub fn get(&self, id: &str) -> Option<Job> {
        let inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        inner.jobs.get(id).map(|e| e.job.clone())
    }

    /// Applies `mutation` to the job if it exists
    ///
    /// Returns `None` without calling `mutation` for unknown ids.
    pub fn update<R>(&self, id: &str, mutation: impl FnOnce(&mut Job) -> R) -> Option<R> {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        let entry = inner.jobs.get_mut(id)?;
        let result = mutation(&mut entry.job);
        self.snapshots.send_replace(inner.snapshot());
        Some(result)
    }

    /// Applies `mutation` to every job in one step
    pub fn update_all(&self, mut mutation: impl FnMut(&mut Job)) {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        for entry in inner.jobs.values_mut() {
            mutation(&mut entry.job);
        }
        self.snapshots.send_replace(inner.snapshot());
    }

    /// All jobs, newest first
    pub fn all(&self) -> Vec<Job> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .snapshot()
    }

    pub fn len(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .jobs
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Receives a newest-first snapshot after every mutation
    pub fn subscribe(&self) -> watch::Receiver<Vec<Job>> {
        self.snapshots.subscribe()
    }
}

impl Default for JobRegistry {
    fn default() -> Self {
        Self::new()
    }
}

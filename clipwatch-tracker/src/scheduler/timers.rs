//! Per-job poll timers
//!
//! Owns at most one pending tick per job. Every arm bumps a generation
//! counter; a tick only runs, and only re-arms, while its generation is still
//! the current one. A per-job tick lock keeps an aborted tick from overlapping
//! with the tick that replaced it.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::debug;

use super::poller::{JobPoller, NextPoll};

struct Slot {
    generation: u64,
    handle: JoinHandle<()>,
}

/// Single owner of every job's pending poll
#[derive(Default)]
pub struct Timers {
    slots: Mutex<HashMap<String, Slot>>,
    tick_locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
    next_generation: AtomicU64,
    closed: AtomicBool,
}

impl Timers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces any pending tick for `job_id` with one firing after `delay`
    pub fn arm(&self, poller: &Arc<JobPoller>, job_id: &str, delay: Duration) {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        if self.closed.load(Ordering::SeqCst) {
            return;
        }
        if let Some(previous) = slots.remove(job_id) {
            previous.handle.abort();
        }
        let slot = self.spawn_tick(poller, job_id, delay);
        slots.insert(job_id.to_string(), slot);
    }

    /// Clears the pending tick for `job_id`, if any
    ///
    /// Returns whether a tick was pending.
    pub fn cancel(&self, job_id: &str) -> bool {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        match slots.remove(job_id) {
            Some(slot) => {
                slot.handle.abort();
                true
            }
            None => false,
        }
    }

    /// Aborts every pending tick and refuses further arming
    pub fn close(&self) -> usize {
        self.closed.store(true, Ordering::SeqCst);
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        let count = slots.len();
        for (_, slot) in slots.drain() {
            slot.handle.abort();
        }
        self.tick_locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        count
    }

    /// Number of jobs with a pending tick
    pub fn armed_count(&self) -> usize {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    fn is_current(&self, job_id: &str, generation: u64) -> bool {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(job_id)
            .is_some_and(|slot| slot.generation == generation)
    }

    fn tick_lock(&self, job_id: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.tick_locks.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(locks.entry(job_id.to_string()).or_default())
    }

    #[cfg(test)]
    pub(crate) fn tick_lock_count(&self) -> usize {
        self.tick_locks.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Follows up a finished tick, unless it was superseded meanwhile
    ///
    /// The finishing tick's own handle is dropped, not aborted.
    fn settle(&self, poller: &Arc<JobPoller>, job_id: &str, generation: u64, next: NextPoll) {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        if !slots.get(job_id).is_some_and(|slot| slot.generation == generation) {
            return;
        }
        match next {
            NextPoll::After(delay) if !self.closed.load(Ordering::SeqCst) => {
                let slot = self.spawn_tick(poller, job_id, delay);
                slots.insert(job_id.to_string(), slot);
            }
            _ => {
                slots.remove(job_id);
                // Waiting ticks hold their own clone and find themselves superseded
                self.tick_locks
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .remove(job_id);
                poller.mark_idle(job_id);
            }
        }
    }

    fn spawn_tick(&self, poller: &Arc<JobPoller>, job_id: &str, delay: Duration) -> Slot {
        let generation = self.next_generation.fetch_add(1, Ordering::SeqCst);
        poller.mark_scheduled(job_id, delay);

        let poller = Arc::clone(poller);
        let job_id = job_id.to_string();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;

            let lock = poller.timers().tick_lock(&job_id);
            let _guard = lock.lock().await;
            if !poller.timers().is_current(&job_id, generation) {
                debug!(job_id = %job_id, generation, "Skipping superseded tick");
                return;
            }

            let next = poller.tick(&job_id).await;
            poller.timers().settle(&poller, &job_id, generation, next);
        });

        Slot { generation, handle }
    }
}

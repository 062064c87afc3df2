//! Artifact store
//!
//! Holds downloaded media behind opaque handles until they are released.
//! Jobs carry only the [`ArtifactRef`]; the bytes stay here.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use clipwatch_client::VideoContent;
use clipwatch_core::domain::job::ArtifactRef;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::debug;
use uuid::Uuid;

#[derive(Default)]
struct Held {
    items: HashMap<Uuid, Bytes>,
    /// Set by `release_all`; nothing is stored afterwards
    closed: bool,
}

#[derive(Default)]
pub struct ArtifactStore {
    held: Mutex<Held>,
}

impl ArtifactStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn held(&self) -> MutexGuard<'_, Held> {
        self.held.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Takes ownership of downloaded content and returns a handle to it
    ///
    /// Returns `None` once the store has been closed by [`Self::release_all`];
    /// the content is dropped.
    pub fn materialize(
        &self,
        content: VideoContent,
        obtained_at: DateTime<Utc>,
    ) -> Option<ArtifactRef> {
        let mut held = self.held();
        if held.closed {
            debug!("Artifact store closed, dropping downloaded content");
            return None;
        }

        let handle = Uuid::new_v4();
        let artifact = ArtifactRef {
            handle,
            content_type: content.content_type,
            size_bytes: content.bytes.len() as u64,
            content_disposition: content.content_disposition,
            obtained_at,
        };
        held.items.insert(handle, content.bytes);
        debug!(%handle, size_bytes = artifact.size_bytes, "Artifact materialized");
        Some(artifact)
    }

    pub fn bytes(&self, handle: Uuid) -> Option<Bytes> {
        self.held().items.get(&handle).cloned()
    }

    /// Drops the bytes behind `handle`
    ///
    /// Returns false if the handle was unknown or already released.
    pub fn release(&self, handle: Uuid) -> bool {
        let released = self.held().items.remove(&handle).is_some();
        if released {
            debug!(%handle, "Artifact released");
        }
        released
    }

    /// Releases every held artifact and closes the store
    ///
    /// Returns how many artifacts were held.
    pub fn release_all(&self) -> usize {
        let mut held = self.held();
        held.closed = true;
        let count = held.items.len();
        held.items.clear();
        count
    }

    pub fn is_closed(&self) -> bool {
        self.held().closed
    }

    /// Number of artifacts currently held
    pub fn live_count(&self) -> usize {
        self.held().items.len()
    }
}

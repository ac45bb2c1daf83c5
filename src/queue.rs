//! In-memory request and result queues.
//!
//! Each queue owns its own lock, held only for the push/pop itself.
//! Neither queue is bounded and neither deduplicates.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

use crate::model::{ResolvedThumbnail, ResourceId};

/// Lock a queue mutex, recovering the data if a holder panicked.
///
/// The guarded `VecDeque` is never left half-updated, so a poisoned lock
/// still holds a consistent queue.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// FIFO of identifiers waiting to be thumbnailed.
#[derive(Debug, Default)]
pub struct RequestQueue {
    pending: Mutex<VecDeque<ResourceId>>,
}

impl RequestQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append to the tail. Never blocks beyond the lock, never fails.
    pub fn submit(&self, id: ResourceId) {
        lock(&self.pending).push_back(id);
    }

    /// Pop the head, or `None` when empty.
    pub fn try_take_next(&self) -> Option<ResourceId> {
        lock(&self.pending).pop_front()
    }

    pub fn len(&self) -> usize {
        lock(&self.pending).len()
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.pending).is_empty()
    }
}

/// Results waiting for the owning thread to drain them.
#[derive(Debug, Default)]
pub struct ResultQueue {
    ready: Mutex<VecDeque<ResolvedThumbnail>>,
}

impl ResultQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, resolved: ResolvedThumbnail) {
        lock(&self.ready).push_back(resolved);
    }

    /// Atomically take everything currently queued, in arrival order.
    pub fn drain_all(&self) -> Vec<ResolvedThumbnail> {
        let mut ready = lock(&self.ready);
        ready.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        lock(&self.ready).len()
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.ready).is_empty()
    }
}

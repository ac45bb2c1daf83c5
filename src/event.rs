//! Notifications raised on the owning thread when a thumbnail is drained.
//!
//! Events are the pipeline's only outbound voice. They are raised
//! synchronously inside `drain`, never from the worker.

use chrono::{DateTime, Utc};

use crate::model::{ResolvedThumbnail, ResourceId, Thumbnail};

/// A thumbnail has been delivered to the owning thread.
#[derive(Debug, Clone)]
pub struct ThumbnailReady {
    /// Monotonic per-pipeline sequence number. Consumers can detect gaps.
    pub seq: u64,
    /// When the owning thread drained it.
    pub timestamp: DateTime<Utc>,
    pub resource: ResourceId,
    pub image: Thumbnail,
}

impl ThumbnailReady {
    pub(crate) fn new(seq: u64, resolved: ResolvedThumbnail) -> Self {
        Self {
            seq,
            timestamp: Utc::now(),
            resource: resolved.resource,
            image: resolved.image,
        }
    }
}

/// Callback invoked for every [`ThumbnailReady`] during a drain.
pub type ReadyHandler = Box<dyn FnMut(&ThumbnailReady) + Send>;

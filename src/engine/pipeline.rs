//! The thumbnail pipeline: the public API for requesting and receiving thumbnails.
//!
//! Any thread may submit. Results come back only through [`ThumbnailPipeline::drain`],
//! called by the owning thread (the first one to submit) on its own polling
//! cadence, typically an idle or timer tick of a UI loop.

use crate::error::{Error, Result};
use crate::event::{ReadyHandler, ThumbnailReady};
use crate::model::ResourceId;
use crate::resolver::ResolverRegistry;
use crate::telemetry::metrics;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, OnceLock};
use std::thread::{self, ThreadId};
use tracing::{debug, info};

use super::worker::{self, Shared};

/// Background thumbnail resolution with owning-thread delivery.
///
/// Requests are resolved best-effort: an identifier no resolver can handle
/// is dropped without a result or an error. Identical identifiers are not
/// deduplicated and the request queue is unbounded.
pub struct ThumbnailPipeline {
    shared: Arc<Shared>,
    owner: OnceLock<ThreadId>,
    seq: AtomicU64,
    handlers: Mutex<Vec<ReadyHandler>>,
}

impl ThumbnailPipeline {
    pub fn new(registry: Arc<ResolverRegistry>) -> Self {
        Self {
            shared: Arc::new(Shared::new(registry)),
            owner: OnceLock::new(),
            seq: AtomicU64::new(0),
            handlers: Mutex::new(Vec::new()),
        }
    }

    /// The registry this pipeline resolves through.
    pub fn registry(&self) -> &ResolverRegistry {
        &self.shared.registry
    }

    /// Queue an identifier for thumbnailing. Never blocks on resolution.
    ///
    /// The first call fixes the owning thread. Starts a worker if none is
    /// running.
    pub fn submit(&self, id: impl Into<ResourceId>) {
        let id = id.into();
        self.owner.get_or_init(|| thread::current().id());
        debug!(resource = %id, "thumbnail requested");
        self.shared.requests.submit(id);
        metrics::requests_submitted().add(1, &[]);
        worker::ensure_running(&self.shared);
    }

    /// Register a callback raised for every thumbnail delivered by [`drain`].
    ///
    /// Handlers run on the owning thread, inside `drain`, in registration
    /// order. A handler may call `drain` or `subscribe`; a handler added
    /// while a drain is running is first called on the next drain.
    ///
    /// [`drain`]: ThumbnailPipeline::drain
    pub fn subscribe<F>(&self, handler: F)
    where
        F: FnMut(&ThumbnailReady) + Send + 'static,
    {
        self.lock_handlers().push(Box::new(handler));
    }

    /// Take every result currently available and notify subscribers.
    ///
    /// Non-blocking; returns an empty vec when nothing is ready or nothing
    /// has been submitted yet. Ownership of each image passes to the caller.
    ///
    /// # Errors
    ///
    /// [`Error::NotOwningThread`] when called from any thread other than the
    /// first submitter. Results stay queued for the owner.
    pub fn drain(&self) -> Result<Vec<ThumbnailReady>> {
        let Some(owner) = self.owner.get() else {
            return Ok(Vec::new());
        };
        if *owner != thread::current().id() {
            return Err(Error::NotOwningThread);
        }

        let resolved = self.shared.results.drain_all();
        if resolved.is_empty() {
            return Ok(Vec::new());
        }

        let events: Vec<ThumbnailReady> = resolved
            .into_iter()
            .map(|r| ThumbnailReady::new(self.seq.fetch_add(1, Ordering::Relaxed), r))
            .collect();

        // Handlers run unlocked so they can drain or subscribe themselves.
        let mut handlers = std::mem::take(&mut *self.lock_handlers());
        for event in &events {
            for handler in handlers.iter_mut() {
                handler(event);
            }
        }
        let mut registered = self.lock_handlers();
        handlers.append(&mut registered);
        *registered = handlers;

        metrics::thumbnails_delivered().add(events.len() as u64, &[]);
        info!(count = events.len(), "thumbnails delivered");
        Ok(events)
    }

    /// Requests not yet picked up by a worker.
    pub fn pending(&self) -> usize {
        self.shared.requests.len()
    }

    /// Results waiting for the next drain.
    pub fn ready(&self) -> usize {
        self.shared.results.len()
    }

    /// True when no worker is running and no request is queued.
    ///
    /// Results may still be waiting for a drain.
    pub fn is_idle(&self) -> bool {
        !self.shared.is_running() && self.shared.requests.is_empty()
    }

    /// Block until the current worker (and any it hands off to) has exited.
    ///
    /// Does not drain. A request submitted concurrently from another thread
    /// may start a new worker after this returns.
    pub fn wait_idle(&self) {
        worker::join_all(&self.shared);
    }

    fn lock_handlers(&self) -> std::sync::MutexGuard<'_, Vec<ReadyHandler>> {
        self.handlers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Drop for ThumbnailPipeline {
    fn drop(&mut self) {
        worker::join_all(&self.shared);
    }
}

//! Worker lifecycle: lazy spawn, drain-to-empty, exit.
//!
//! At most one worker is alive per pipeline. The spawn decision in
//! [`ensure_running`] and the worker's final empty-queue check both happen
//! under the [`WorkerSlot`] lock, so a request pushed while the worker is
//! exiting is either seen by that worker or triggers a fresh one.

use crate::model::{ResolvedThumbnail, ResourceId};
use crate::queue::{RequestQueue, ResultQueue};
use crate::resolver::ResolverRegistry;
use crate::telemetry::metrics;
use crate::telemetry::worker::{Resolution, record_resolution, start_worker_span};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use tracing::{Span, error, info};
use uuid::Uuid;

/// State shared between the pipeline handle and its worker thread.
pub(crate) struct Shared {
    pub(crate) requests: RequestQueue,
    pub(crate) results: ResultQueue,
    pub(crate) registry: Arc<ResolverRegistry>,
    slot: Mutex<WorkerSlot>,
}

/// Idle when `running` is false; `handle` may still hold a finished thread.
#[derive(Default)]
struct WorkerSlot {
    running: bool,
    handle: Option<JoinHandle<()>>,
}

impl Shared {
    pub(crate) fn new(registry: Arc<ResolverRegistry>) -> Self {
        Self {
            requests: RequestQueue::new(),
            results: ResultQueue::new(),
            registry,
            slot: Mutex::new(WorkerSlot::default()),
        }
    }

    fn slot(&self) -> MutexGuard<'_, WorkerSlot> {
        self.slot
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub(crate) fn is_running(&self) -> bool {
        self.slot().running
    }
}

/// Spawn a worker unless one is already running.
///
/// A spawn failure is logged and the requests stay queued; the next call
/// tries again.
pub(crate) fn ensure_running(shared: &Arc<Shared>) {
    let mut slot = shared.slot();
    if slot.running {
        return;
    }

    // A stopped worker never touches the slot again, so joining here is safe.
    if let Some(finished) = slot.handle.take() {
        reap(finished);
    }

    let worker_shared = Arc::clone(shared);
    let spawned = thread::Builder::new()
        .name("thumbnail-worker".to_string())
        .spawn(move || run(worker_shared));

    match spawned {
        Ok(handle) => {
            slot.running = true;
            slot.handle = Some(handle);
        }
        Err(e) => {
            error!(error = %e, pending = shared.requests.len(), "failed to spawn thumbnail worker");
        }
    }
}

/// Join whatever worker is or was running, repeating until none is left.
pub(crate) fn join_all(shared: &Shared) {
    loop {
        let handle = shared.slot().handle.take();
        match handle {
            Some(handle) => reap(handle),
            None => return,
        }
    }
}

fn reap(handle: JoinHandle<()>) {
    if handle.join().is_err() {
        error!("thumbnail worker panicked; in-flight request lost");
    }
}

/// Clears the running flag if the worker unwinds, so the next submit respawns.
struct RunGuard<'a> {
    shared: &'a Shared,
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        if thread::panicking() {
            self.shared.slot().running = false;
        }
    }
}

fn run(shared: Arc<Shared>) {
    let _guard = RunGuard { shared: &shared };
    let run_id = Uuid::new_v4();
    let span = start_worker_span(&run_id);
    let _entered = span.enter();
    info!("thumbnail worker started");

    let mut processed: u64 = 0;
    loop {
        let next = match shared.requests.try_take_next() {
            Some(id) => id,
            None => {
                let mut slot = shared.slot();
                match shared.requests.try_take_next() {
                    Some(id) => id,
                    None => {
                        slot.running = false;
                        break;
                    }
                }
            }
        };
        processed += 1;
        process(&shared, &span, next);
    }

    span.record("worker.processed", processed);
    info!(processed, "thumbnail worker idle, exiting");
}

fn process(shared: &Shared, span: &Span, id: ResourceId) {
    match shared.registry.resolve(&id) {
        Some(image) => {
            metrics::thumbnails_resolved().add(1, &[]);
            record_resolution(span, &id, Resolution::Resolved);
            shared.results.push(ResolvedThumbnail {
                resource: id,
                image,
            });
        }
        None => {
            metrics::thumbnails_dropped().add(1, &[]);
            record_resolution(span, &id, Resolution::Dropped);
        }
    }
}

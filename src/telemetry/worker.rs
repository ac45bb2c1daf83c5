//! Worker run span helpers.
//!
//! Every worker thread lifetime gets one span; each identifier it handles
//! records an outcome event inside it.

use crate::model::ResourceId;
use tracing::Span;
use uuid::Uuid;

/// How a single identifier left the worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Resolved,
    Dropped,
}

impl Resolution {
    pub fn as_str(self) -> &'static str {
        match self {
            Resolution::Resolved => "resolved",
            Resolution::Dropped => "dropped",
        }
    }
}

/// Start a span covering one worker run, from spawn to empty queue.
///
/// `worker.processed` is declared empty and filled in when the run ends.
pub fn start_worker_span(run_id: &Uuid) -> Span {
    tracing::info_span!(
        "thumbnail.worker",
        "worker.run_id" = %run_id,
        "worker.processed" = tracing::field::Empty,
    )
}

/// Record the outcome of one identifier on the given span.
pub fn record_resolution(span: &Span, resource: &ResourceId, outcome: Resolution) {
    span.in_scope(|| {
        tracing::debug!(resource = %resource, outcome = outcome.as_str(), "resolution");
    });
}

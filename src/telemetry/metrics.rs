//! Metric instrument factories for thumbq.
//!
//! Uses the OTel Meter API with the globally-registered `MeterProvider`.
//! Without one installed, every instrument is a no-op.

use opentelemetry::metrics::{Counter, Histogram, Meter};

/// Returns the shared meter for thumbq instruments.
fn meter() -> Meter {
    opentelemetry::global::meter("thumbq")
}

/// Counter: identifiers submitted to a pipeline.
pub fn requests_submitted() -> Counter<u64> {
    meter()
        .u64_counter("thumbq.requests.submitted")
        .with_description("Number of thumbnail requests submitted")
        .build()
}

/// Counter: identifiers some resolver produced a thumbnail for.
pub fn thumbnails_resolved() -> Counter<u64> {
    meter()
        .u64_counter("thumbq.thumbnails.resolved")
        .with_description("Number of thumbnails produced by a resolver")
        .build()
}

/// Counter: identifiers no resolver produced a thumbnail for.
pub fn thumbnails_dropped() -> Counter<u64> {
    meter()
        .u64_counter("thumbq.thumbnails.dropped")
        .with_description("Number of requests silently dropped after every resolver declined")
        .build()
}

/// Counter: thumbnails handed to the owning thread by a drain.
pub fn thumbnails_delivered() -> Counter<u64> {
    meter()
        .u64_counter("thumbq.thumbnails.delivered")
        .with_description("Number of thumbnails delivered on the owning thread")
        .build()
}

/// Counter: resolver errors caught at the registry boundary.
/// Labels: `resolver`.
pub fn resolver_failures() -> Counter<u64> {
    meter()
        .u64_counter("thumbq.resolver.failures")
        .with_description("Number of resolver errors treated as declines")
        .build()
}

/// Histogram: time spent inside one resolver call, in milliseconds.
/// Labels: `resolver`.
pub fn resolve_duration_ms() -> Histogram<f64> {
    meter()
        .f64_histogram("thumbq.resolve.duration_ms")
        .with_description("Resolver call duration in milliseconds")
        .with_unit("ms")
        .build()
}

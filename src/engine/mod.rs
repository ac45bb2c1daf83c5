//! Pipeline engine: request intake, the background worker, owning-thread drain.

pub mod pipeline;
mod worker;

pub use pipeline::ThumbnailPipeline;

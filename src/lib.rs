//! # thumbq
//!
//! Background thumbnail resolution for desktop tools.
//!
//! Callers submit resource identifiers from any thread; a single lazily
//! spawned worker asks an ordered list of resolvers for each one; results
//! are handed back on the owning thread when it drains, raising
//! [`event::ThumbnailReady`] notifications. Resolution is best-effort:
//! failures are logged, never surfaced.

pub mod config;
pub mod engine;
pub mod error;
pub mod event;
pub mod model;
pub mod queue;
pub mod resolver;
pub mod telemetry;

pub use engine::ThumbnailPipeline;
pub use error::{Error, ResolveError, Result};
pub use model::{ResolvedThumbnail, ResourceId, Thumbnail};
pub use resolver::{Resolver, ResolverRegistry, WarningSink};

//! Resolver capability and the ordered resolver registry.
//!
//! A resolver turns a resource identifier into a thumbnail, or declines.
//! The registry asks each resolver in registration order; the first image
//! wins. Resolver failures are reported to a warning sink and treated as a
//! decline, so one broken plugin never blocks the ones after it.

pub mod image;

pub use self::image::{ImageFileResolver, MAX_SOURCE_DIMENSION};

use crate::error::{Error, ResolveError, Result};
use crate::model::{ResourceId, Thumbnail};
use crate::telemetry::metrics;
use opentelemetry::KeyValue;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tracing::{debug, warn};

/// A pluggable thumbnail source.
pub trait Resolver: Send + Sync {
    /// Name used in logs and warnings.
    fn name(&self) -> &str;

    /// Produce a thumbnail for `id`, `Ok(None)` to decline.
    fn try_resolve(&self, id: &ResourceId) -> std::result::Result<Option<Thumbnail>, ResolveError>;
}

/// Receives resolver failure reports. Fire-and-forget.
pub trait WarningSink: Send + Sync {
    fn resolver_failed(&self, resolver: &str, id: &ResourceId, error: &ResolveError);
}

/// Default sink: a `tracing` warning per failure.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingWarningSink;

impl WarningSink for TracingWarningSink {
    fn resolver_failed(&self, resolver: &str, id: &ResourceId, error: &ResolveError) {
        warn!(resolver, resource = %id, %error, "resolver failed, trying next");
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Ordered, append-only list of resolvers.
pub struct ResolverRegistry {
    resolvers: Mutex<Vec<Arc<dyn Resolver>>>,
    warnings: Arc<dyn WarningSink>,
}

impl Default for ResolverRegistry {
    fn default() -> Self {
        Self::empty()
    }
}

impl ResolverRegistry {
    /// Create an empty registry with no resolvers.
    pub fn empty() -> Self {
        Self {
            resolvers: Mutex::new(Vec::new()),
            warnings: Arc::new(TracingWarningSink),
        }
    }

    /// Replace the sink that receives resolver failures.
    pub fn with_warning_sink(mut self, sink: Arc<dyn WarningSink>) -> Self {
        self.warnings = sink;
        self
    }

    /// Append a resolver. Waits for any in-flight resolution to finish.
    pub fn register(&self, resolver: Arc<dyn Resolver>) {
        debug!(resolver = resolver.name(), "resolver registered");
        self.lock().push(resolver);
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Resolver names in registration order.
    pub fn names(&self) -> Vec<String> {
        self.lock().iter().map(|r| r.name().to_string()).collect()
    }

    /// Ask each resolver in order; the first thumbnail wins.
    ///
    /// Holds the resolver-list lock for the whole walk, so a slow resolver
    /// stalls every resolution queued behind it.
    pub fn resolve(&self, id: &ResourceId) -> Option<Thumbnail> {
        let resolvers = self.lock();
        for resolver in resolvers.iter() {
            let start = Instant::now();
            let outcome = resolver.try_resolve(id);
            let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
            let labels = [KeyValue::new("resolver", resolver.name().to_string())];
            metrics::resolve_duration_ms().record(elapsed_ms, &labels);

            match outcome {
                Ok(Some(image)) => {
                    debug!(resolver = resolver.name(), resource = %id, "resolved");
                    return Some(image);
                }
                Ok(None) => {
                    debug!(resolver = resolver.name(), resource = %id, "declined");
                }
                Err(error) => {
                    metrics::resolver_failures().add(1, &labels);
                    self.warnings.resolver_failed(resolver.name(), id, &error);
                }
            }
        }
        None
    }

    /// Load every `.toml` resolver spec in `dir`, registered in file-name order.
    ///
    /// Specs that leave out `max_dimension` get `default_max_dimension`.
    pub fn load_from_dir(dir: &Path, default_max_dimension: u32) -> Result<Self> {
        let entries = std::fs::read_dir(dir).map_err(|e| {
            Error::Config(format!("cannot read resolver dir {}: {e}", dir.display()))
        })?;

        let mut paths = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == "toml") {
                paths.push(path);
            }
        }
        paths.sort();

        let registry = Self::empty();
        for path in paths {
            let content = std::fs::read_to_string(&path)?;
            let config: ResolverFile = toml::from_str(&content).map_err(|e| {
                Error::Config(format!("bad resolver config {}: {e}", path.display()))
            })?;
            registry.register(Arc::new(config.resolver.into_resolver(default_max_dimension)));
        }

        Ok(registry)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Arc<dyn Resolver>>> {
        self.resolvers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

// ---------------------------------------------------------------------------
// TOML resolver specs
// ---------------------------------------------------------------------------

/// Top-level TOML wrapper.
#[derive(Debug, Deserialize)]
struct ResolverFile {
    resolver: ResolverSpec,
}

/// An image-file resolver declared in TOML.
///
/// ```toml
/// [resolver]
/// name = "textures"
/// extensions = ["png", "tga"]
/// max_dimension = 128
/// roots = ["assets/textures"]
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct ResolverSpec {
    pub name: String,
    pub extensions: Vec<String>,
    #[serde(default)]
    pub max_dimension: Option<u32>,
    #[serde(default)]
    pub roots: Vec<PathBuf>,
}

impl ResolverSpec {
    pub fn into_resolver(self, default_max_dimension: u32) -> ImageFileResolver {
        ImageFileResolver::new(self.name, self.extensions)
            .with_roots(self.roots)
            .with_max_dimension(self.max_dimension.unwrap_or(default_max_dimension))
    }
}

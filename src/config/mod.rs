//! Typed configuration from environment variables.
//!
//! Loads once at startup, fails fast on malformed values. Every setting
//! has a default, so an empty environment is a valid configuration.

use crate::error::{Error, Result};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Default maximum thumbnail side, in pixels.
pub const DEFAULT_THUMBNAIL_SIZE: u32 = 96;

/// Default owning-thread poll cadence.
pub const DEFAULT_DRAIN_INTERVAL_MS: u64 = 50;

#[derive(Debug, Clone)]
pub struct Config {
    pub thumbnail_size: u32,
    pub resolver_dir: Option<PathBuf>,
    pub drain_interval: Duration,
    pub otel_endpoint: Option<String>,
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            thumbnail_size: DEFAULT_THUMBNAIL_SIZE,
            resolver_dir: None,
            drain_interval: Duration::from_millis(DEFAULT_DRAIN_INTERVAL_MS),
            otel_endpoint: None,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// In local dev, call `dotenvy::dotenv().ok()` before this.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let thumbnail_size: u32 =
            parsed_var(&lookup, "THUMBNAIL_SIZE")?.unwrap_or(DEFAULT_THUMBNAIL_SIZE);
        if thumbnail_size == 0 {
            return Err(Error::Config("THUMBNAIL_SIZE must be at least 1".to_string()));
        }
        let drain_ms: u64 =
            parsed_var(&lookup, "DRAIN_INTERVAL_MS")?.unwrap_or(DEFAULT_DRAIN_INTERVAL_MS);

        Ok(Self {
            thumbnail_size,
            resolver_dir: non_empty(&lookup, "RESOLVER_DIR").map(PathBuf::from),
            drain_interval: Duration::from_millis(drain_ms),
            otel_endpoint: non_empty(&lookup, "OTEL_ENDPOINT"),
            log_level: non_empty(&lookup, "LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
        })
    }
}

fn non_empty<F>(lookup: &F, name: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(name).filter(|v| !v.trim().is_empty())
}

fn parsed_var<F, T>(lookup: &F, name: &str) -> Result<Option<T>>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    non_empty(lookup, name)
        .map(|raw| {
            raw.trim()
                .parse()
                .map_err(|e| Error::Config(format!("invalid {name}={raw:?}: {e}")))
        })
        .transpose()
}

//! Core data model.
//!
//! A resource identifier names something to be thumbnailed. The pipeline
//! never interprets it; only resolvers do.

use image::{DynamicImage, ImageFormat};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use url::Url;

use crate::error::Result;

// ---------------------------------------------------------------------------
// Resource identifier
// ---------------------------------------------------------------------------

/// Opaque, immutable URI-like identifier of a resource.
///
/// Identical identifiers submitted twice are two independent requests.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceId(String);

const FILE_SCHEME: &str = "file://";

impl ResourceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Identifier for a local file.
    ///
    /// Absolute paths become percent-encoded `file://` URIs; relative paths
    /// are kept bare so resolvers can search their roots.
    pub fn from_path(path: &Path) -> Self {
        match Url::from_file_path(path) {
            Ok(url) => Self(url.into()),
            Err(()) => Self(path.to_string_lossy().into_owned()),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The local filesystem path this identifier names, if any.
    ///
    /// `file://` identifiers and bare paths (no scheme) are local;
    /// anything else (`http://`, `asset://`, ...) is not. `file://` escapes
    /// are decoded and an empty or `localhost` host is dropped; a file URI
    /// naming another host is not local.
    pub fn local_path(&self) -> Option<PathBuf> {
        if let Some(rest) = self.0.strip_prefix(FILE_SCHEME) {
            if rest.is_empty() {
                return None;
            }
            let url = Url::parse(&self.0).ok()?;
            return url.to_file_path().ok();
        }
        if self.0.is_empty() || self.0.contains("://") {
            return None;
        }
        Some(PathBuf::from(&self.0))
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ResourceId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for ResourceId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

// ---------------------------------------------------------------------------
// Thumbnail image
// ---------------------------------------------------------------------------

/// An owned thumbnail image.
#[derive(Debug, Clone)]
pub struct Thumbnail(DynamicImage);

impl Thumbnail {
    pub fn new(image: DynamicImage) -> Self {
        Self(image)
    }

    pub fn width(&self) -> u32 {
        self.0.width()
    }

    pub fn height(&self) -> u32 {
        self.0.height()
    }

    pub fn image(&self) -> &DynamicImage {
        &self.0
    }

    pub fn into_image(self) -> DynamicImage {
        self.0
    }

    /// Encode as PNG bytes.
    pub fn to_png(&self) -> Result<Vec<u8>> {
        let mut buffer = Cursor::new(Vec::new());
        self.0.write_to(&mut buffer, ImageFormat::Png)?;
        Ok(buffer.into_inner())
    }
}

impl From<DynamicImage> for Thumbnail {
    fn from(image: DynamicImage) -> Self {
        Self(image)
    }
}

// ---------------------------------------------------------------------------
// Resolved thumbnail
// ---------------------------------------------------------------------------

/// A resolver's output, waiting in the result queue for the owning thread.
#[derive(Debug, Clone)]
pub struct ResolvedThumbnail {
    pub resource: ResourceId,
    pub image: Thumbnail,
}

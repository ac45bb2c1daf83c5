//! Built-in resolver for image files on the local filesystem.

use crate::config::DEFAULT_THUMBNAIL_SIZE;
use crate::error::ResolveError;
use crate::model::{ResourceId, Thumbnail};
use ::image::imageops::FilterType;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Largest source image side accepted for decoding.
pub const MAX_SOURCE_DIMENSION: u32 = 16_384;

/// Decodes local image files and downsizes them to fit a square box.
///
/// Declines anything that is not a local path with an accepted extension,
/// or that cannot be found directly or under one of its search roots.
#[derive(Debug, Clone)]
pub struct ImageFileResolver {
    name: String,
    extensions: Vec<String>,
    max_dimension: u32,
    roots: Vec<PathBuf>,
}

impl ImageFileResolver {
    pub fn new<I, S>(name: impl Into<String>, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            name: name.into(),
            extensions: extensions
                .into_iter()
                .map(|e| e.as_ref().trim_start_matches('.').to_lowercase())
                .collect(),
            max_dimension: DEFAULT_THUMBNAIL_SIZE,
            roots: Vec::new(),
        }
    }

    /// Common raster formats the `image` crate decodes out of the box.
    pub fn standard() -> Self {
        Self::new("images", ["png", "jpg", "jpeg", "tif", "tiff", "bmp", "gif"])
    }

    pub fn with_max_dimension(mut self, max: u32) -> Self {
        self.max_dimension = max.max(1);
        self
    }

    /// Directories searched for relative identifiers that don't exist as given.
    pub fn with_roots(mut self, roots: Vec<PathBuf>) -> Self {
        self.roots = roots;
        self
    }

    pub fn max_dimension(&self) -> u32 {
        self.max_dimension
    }

    fn accepts(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .is_some_and(|ext| self.extensions.iter().any(|accepted| *accepted == ext))
    }

    fn locate(&self, path: &Path) -> Option<PathBuf> {
        if path.is_file() {
            return Some(path.to_path_buf());
        }
        if path.is_absolute() {
            return None;
        }
        self.roots
            .iter()
            .map(|root| root.join(path))
            .find(|candidate| candidate.is_file())
    }
}

impl super::Resolver for ImageFileResolver {
    fn name(&self) -> &str {
        &self.name
    }

    fn try_resolve(&self, id: &ResourceId) -> Result<Option<Thumbnail>, ResolveError> {
        let Some(path) = id.local_path() else {
            return Ok(None);
        };
        if !self.accepts(&path) {
            return Ok(None);
        }
        let Some(path) = self.locate(&path) else {
            debug!(resolver = %self.name, path = %path.display(), "file not found");
            return Ok(None);
        };

        let (width, height) = ::image::image_dimensions(&path)?;
        if width > MAX_SOURCE_DIMENSION || height > MAX_SOURCE_DIMENSION {
            return Err(ResolveError::TooLarge {
                width,
                height,
                max: MAX_SOURCE_DIMENSION,
            });
        }

        let img = ::image::open(&path)?;
        let max = self.max_dimension;
        let img = if width > max || height > max {
            img.resize(max, max, FilterType::Triangle)
        } else {
            img
        };
        Ok(Some(Thumbnail::new(img)))
    }
}

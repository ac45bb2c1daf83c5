//! Error types for thumbq.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("results can only be drained on the thread that first submitted work")]
    NotOwningThread,

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Failure raised by a single resolver while producing a thumbnail.
///
/// Caught at the registry boundary and reported as a warning; it never
/// reaches the caller of `submit`.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("decode error: {0}")]
    Decode(#[from] image::ImageError),

    #[error("image too large: {width}x{height} (max {max} per side)")]
    TooLarge { width: u32, height: u32, max: u32 },

    #[error("{0}")]
    Other(String),
}

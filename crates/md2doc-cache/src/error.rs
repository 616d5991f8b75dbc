//! Cache error types.

use std::path::PathBuf;

/// Image cache error.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("source image not found: {}", .0.display())]
    SourceNotFound(PathBuf),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("cache index error: {0}")]
    Index(#[from] serde_json::Error),
}

//! Top-level conversion errors.

use std::path::PathBuf;

/// Unrecoverable conversion failure.
///
/// Diagram and image problems never surface here; they are recovered inside
/// the document and reported through `ConversionResult::errors`.
#[derive(Debug, thiserror::Error)]
pub enum ConversionError {
    #[error("input file not found: {}", .0.display())]
    InputNotFound(PathBuf),

    #[error("input is not a file: {}", .0.display())]
    NotAFile(PathBuf),

    #[error("input is empty")]
    EmptyInput,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to write document: {0}")]
    Write(#[from] md2doc_docx::WriteError),

    #[error("invalid file pattern: {0}")]
    Pattern(#[from] glob::PatternError),

    #[error(transparent)]
    Config(#[from] md2doc_config::ConfigError),

    #[error("cache error: {0}")]
    Cache(#[from] md2doc_cache::CacheError),
}

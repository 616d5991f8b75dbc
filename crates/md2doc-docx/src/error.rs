//! Error types for the package writer.

/// Failure to write a `.docx` package.
#[derive(Debug, thiserror::Error)]
pub enum WriteError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("failed to format XML part")]
    Format(#[from] std::fmt::Error),
}

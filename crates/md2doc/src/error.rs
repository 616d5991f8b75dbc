//! CLI error types.

use md2doc_cache::CacheError;
use md2doc_config::ConfigError;
use md2doc_core::ConversionError;

#[derive(Debug, thiserror::Error)]
pub(crate) enum CliError {
    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Conversion(#[from] ConversionError),

    #[error("{0}")]
    Cache(#[from] CacheError),

    #[error("{0}")]
    Validation(String),
}

//! Cache key computation.
//!
//! Provides [`CacheKey`] for computing content-based keys.

use sha2::{Digest, Sha256};

use crate::config::RenderConfig;

/// Content-addressed key for a cached image.
///
/// Key format: `"{sha256(source)}_{sha256(canonical config)}"`, both hex encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheKey {
    pub source_hash: String,
    pub config_hash: String,
}

impl CacheKey {
    /// Compute the key for source bytes under a configuration.
    ///
    /// The source is the original image file for ordinary images and the
    /// diagram text for rendered diagrams.
    #[must_use]
    pub fn compute(source: &[u8], config: &RenderConfig) -> Self {
        Self {
            source_hash: sha256_hex(source),
            config_hash: sha256_hex(config.canonical().as_bytes()),
        }
    }

    /// Key string used in the index and as the cached file stem.
    #[must_use]
    pub fn as_string(&self) -> String {
        format!("{}_{}", self.source_hash, self.config_hash)
    }
}

fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

//! Content-addressed image cache for md2doc.
//!
//! Both ordinary embedded images and rendered diagrams pass through
//! [`ImageCache`], which resizes them to fit the page, re-encodes them with a
//! declared DPI and stores the result under a key derived from the source bytes
//! and the [`RenderConfig`].
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use md2doc_cache::ImageCache;
//!
//! let cache = ImageCache::open("/tmp/md2doc-cache")?;
//! let png = cache.optimize_for_word(Path::new("figure.png"))?;
//! println!("{}", png.display());
//! # Ok::<(), md2doc_cache::CacheError>(())
//! ```

mod cache;
mod config;
mod error;
mod key;
pub mod metadata;
mod transform;

pub use cache::{CacheEntry, CacheStats, CleanupReport, ImageCache};
pub use config::{DEFAULT_MAX_HEIGHT, DEFAULT_MAX_WIDTH, OutputFormat, RenderConfig, STANDARD_DPI};
pub use error::CacheError;
pub use key::CacheKey;
pub use metadata::ImageMetadata;

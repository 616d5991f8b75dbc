//! Markdown to Word conversion for md2doc.
//!
//! [`Converter`] ties the pipeline together: markdown is parsed into
//! elements, diagrams are rendered through the fallback orchestrator,
//! images are normalized through the cache, and the result is assembled
//! into a `.docx` document.
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use md2doc_core::Converter;
//!
//! let mut converter = Converter::new()?;
//! let output = converter.convert_file(Path::new("README.md"), None)?;
//! println!("wrote {}", output.display());
//! # Ok::<(), md2doc_core::ConversionError>(())
//! ```

mod converter;
mod error;
mod settings;

pub use converter::{ConversionResult, ConversionStats, Converter};
pub use error::ConversionError;
pub use settings::{diagram_settings, document_settings, image_config};

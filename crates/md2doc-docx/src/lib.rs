//! Word document generation for md2doc.
//!
//! Parsed markdown elements are folded into an in-memory [`Document`] by the
//! [`DocumentAssembler`] and written out as a `.docx` package.
//!
//! # Architecture
//!
//! - [`model`]: paragraphs, runs, tables and embedded media
//! - [`inline`]: single-pass inline markdown tokenizer
//! - [`DocumentAssembler`]: element stream to document, diagrams and images resolved
//! - [`writer`]: WordprocessingML package serialization
//!
//! # Example
//!
//! ```no_run
//! use md2doc_docx::{DocumentAssembler, DocumentSettings};
//!
//! let elements = md2doc_parser::parse("# Report\n\nSome **bold** text.");
//! let assembly = DocumentAssembler::new(DocumentSettings::default()).assemble(&elements);
//! assembly.document.save(std::path::Path::new("report.docx"))?;
//! # Ok::<(), md2doc_docx::WriteError>(())
//! ```

mod assemble;
mod error;
pub mod inline;
pub mod model;
mod settings;
pub mod writer;

pub use assemble::{Assembly, DiagramRenderer, DiagramTally, DocumentAssembler};
pub use error::WriteError;
pub use model::{Block, Document, Paragraph, Run, Table};
pub use settings::DocumentSettings;
pub use writer::write_docx;

//! Markdown structure parsing for md2doc.
//!
//! Turns markdown text into a flat sequence of typed [`Element`]s and
//! classifies fenced blocks as diagrams or plain code.
//!
//! # Architecture
//!
//! - [`parser`]: line scanner with priority dispatch (heading, fence, list, table, paragraph)
//! - [`detect`]: diagram detection, subtype classification and minimal syntax checks
//! - [`table`]: pipe table splitting and delimiter-row alignment
//! - [`language`]: diagram families and subtypes
//!
//! # Example
//!
//! ```
//! use md2doc_parser::{ElementKind, parse};
//!
//! let elements = parse("# Title\n\n```mermaid\ngraph TD\n  A --> B\n```");
//! assert!(matches!(elements[0].kind, ElementKind::Heading { level: 1, .. }));
//! assert!(elements[1].diagram().is_some());
//! ```

pub mod detect;
mod element;
mod language;
mod parser;
pub mod table;

pub use detect::{DiagramInfo, detect, validate_syntax};
pub use element::{Element, ElementCounts, ElementKind};
pub use language::{DiagramKind, DiagramSubtype};
pub use parser::parse;
pub use table::{Alignment, TableLayout};

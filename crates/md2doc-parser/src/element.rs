//! Typed document elements produced by the parser.

use crate::detect::DiagramInfo;
use crate::table::Alignment;

/// Block-level element kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ElementKind {
    Heading {
        level: u8,
        text: String,
    },
    Paragraph {
        text: String,
    },
    List {
        items: Vec<String>,
        ordered: bool,
    },
    CodeBlock {
        content: String,
        language: Option<String>,
    },
    DiagramBlock {
        content: String,
        language: Option<String>,
        info: DiagramInfo,
    },
    Table {
        rows: Vec<Vec<String>>,
        alignments: Vec<Alignment>,
        has_header: bool,
    },
}

/// A parsed element with its source position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub kind: ElementKind,
    /// Zero-based line where the element starts.
    pub line: usize,
    /// Source lines the element was built from.
    pub raw: String,
}

impl Element {
    #[must_use]
    pub fn new(kind: ElementKind, line: usize, raw: impl Into<String>) -> Self {
        Self {
            kind,
            line,
            raw: raw.into(),
        }
    }

    /// Diagram info for diagram blocks.
    #[must_use]
    pub fn diagram(&self) -> Option<&DiagramInfo> {
        match &self.kind {
            ElementKind::DiagramBlock { info, .. } => Some(info),
            _ => None,
        }
    }
}

/// Per-kind element counts for a parsed document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ElementCounts {
    pub total: usize,
    pub headings: usize,
    pub paragraphs: usize,
    pub lists: usize,
    pub code_blocks: usize,
    pub diagrams: usize,
    pub tables: usize,
}

impl ElementCounts {
    #[must_use]
    pub fn from_elements(elements: &[Element]) -> Self {
        let mut counts = Self {
            total: elements.len(),
            ..Self::default()
        };
        for element in elements {
            match element.kind {
                ElementKind::Heading { .. } => counts.headings += 1,
                ElementKind::Paragraph { .. } => counts.paragraphs += 1,
                ElementKind::List { .. } => counts.lists += 1,
                ElementKind::CodeBlock { .. } => counts.code_blocks += 1,
                ElementKind::DiagramBlock { .. } => counts.diagrams += 1,
                ElementKind::Table { .. } => counts.tables += 1,
            }
        }
        counts
    }
}

//! Diagram detection for fenced code blocks.
//!
//! A fenced block is classified in two steps:
//! 1. Content markers (`@startuml`, Mermaid diagram keywords at the start of a
//!    line) are checked first, since fence labels are often missing or wrong.
//! 2. Otherwise the fence language hint decides.
//!
//! Anything else is plain code and [`detect`] returns `None`.

use std::sync::LazyLock;

use regex::Regex;

use crate::language::{DiagramKind, DiagramSubtype};

static PLANTUML_START: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)@startuml").expect("invalid plantuml start regex"));

/// Mermaid content markers, checked in order.
static MERMAID_MARKERS: LazyLock<Vec<(Regex, DiagramSubtype)>> = LazyLock::new(|| {
    [
        (
            r"(?im)^\s*(?:flowchart|graph)\s+(?:TD|TB|BT|RL|LR)\b",
            DiagramSubtype::Flowchart,
        ),
        (r"(?im)^\s*sequenceDiagram\b", DiagramSubtype::Sequence),
        (r"(?im)^\s*classDiagram\b", DiagramSubtype::Class),
        (r"(?im)^\s*stateDiagram(?:-v2)?\b", DiagramSubtype::State),
        (r"(?im)^\s*erDiagram\b", DiagramSubtype::EntityRelationship),
        (r"(?im)^\s*gantt\s*$", DiagramSubtype::Gantt),
        (r"(?im)^\s*pie\s+title\b", DiagramSubtype::Pie),
        (r"(?im)^\s*gitGraph\b", DiagramSubtype::GitGraph),
        (r"(?im)^\s*timeline\s*$", DiagramSubtype::Timeline),
    ]
    .into_iter()
    .map(|(pattern, subtype)| (Regex::new(pattern).expect("invalid mermaid marker regex"), subtype))
    .collect()
});

static PLANTUML_SEQUENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?im)^\s*(?:actor|participant)\s+\S|^\s*\w+\s*->\s*\w+")
        .expect("invalid plantuml sequence regex")
});
static PLANTUML_ACTIVITY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)@startactivity|:[^;\n]*;").expect("invalid plantuml activity regex")
});
static PLANTUML_CLASS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bclass\s+\w+").expect("invalid plantuml class regex"));
static PLANTUML_COMPONENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)@startcomponent|\[[^\]\n]+\]").expect("invalid plantuml component regex")
});

static TITLE_PATTERNS: LazyLock<[Regex; 3]> = LazyLock::new(|| {
    [
        Regex::new(r"(?im)\btitle\s*[:\s]\s*(.+)$").expect("invalid title regex"),
        Regex::new(r"(?im)%%\s*title\s*[:\s]\s*(.+)$").expect("invalid title regex"),
        Regex::new(r"(?m)^\s*#\s*(.+)$").expect("invalid title regex"),
    ]
});

/// First-line keywords accepted by Mermaid validation (lowercase).
const MERMAID_KEYWORDS: &[&str] = &[
    "graph",
    "flowchart",
    "sequencediagram",
    "classdiagram",
    "statediagram",
    "erdiagram",
    "gantt",
    "pie",
    "gitgraph",
    "timeline",
];

/// A fenced block classified as a diagram.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagramInfo {
    /// Diagram family. `Unknown` only for recognized labels with no renderer.
    pub kind: DiagramKind,
    /// Diagram source exactly as written in the fence.
    pub content: String,
    /// Fence language label, if any.
    pub language_hint: Option<String>,
    /// Title extracted from the source.
    pub title: Option<String>,
    pub subtype: DiagramSubtype,
    /// Result of the minimal structural check.
    pub syntax_valid: bool,
    /// Zero-based line of the opening fence.
    pub source_line: usize,
}

impl DiagramInfo {
    fn new(kind: DiagramKind, subtype: DiagramSubtype, content: &str, hint: Option<&str>) -> Self {
        Self {
            kind,
            content: content.to_owned(),
            language_hint: hint.filter(|h| !h.is_empty()).map(str::to_owned),
            title: extract_title(content),
            subtype,
            syntax_valid: validate_syntax(kind, content).is_ok(),
            source_line: 0,
        }
    }

    /// Set the source line of the opening fence.
    #[must_use]
    pub fn at_line(mut self, line: usize) -> Self {
        self.source_line = line;
        self
    }
}

/// Classify a fenced block.
///
/// Returns `None` when neither content markers nor the language hint identify
/// a diagram.
#[must_use]
pub fn detect(content: &str, language_hint: Option<&str>) -> Option<DiagramInfo> {
    if let Some(info) = detect_by_content(content, language_hint) {
        return Some(info);
    }

    let kind = DiagramKind::from_hint(language_hint?)?;
    let subtype = match kind {
        DiagramKind::Mermaid => mermaid_subtype(content),
        DiagramKind::PlantUml => plantuml_subtype(content),
        DiagramKind::Unknown => DiagramSubtype::Unknown,
    };
    Some(DiagramInfo::new(kind, subtype, content, language_hint))
}

fn detect_by_content(content: &str, hint: Option<&str>) -> Option<DiagramInfo> {
    if PLANTUML_START.is_match(content) {
        return Some(DiagramInfo::new(
            DiagramKind::PlantUml,
            plantuml_subtype(content),
            content,
            hint,
        ));
    }

    MERMAID_MARKERS
        .iter()
        .find(|(pattern, _)| pattern.is_match(content))
        .map(|(_, subtype)| DiagramInfo::new(DiagramKind::Mermaid, *subtype, content, hint))
}

/// Mermaid subtype by keyword presence, first match wins.
#[must_use]
pub fn mermaid_subtype(content: &str) -> DiagramSubtype {
    let lower = content.to_lowercase();
    let rules = [
        ("sequencediagram", DiagramSubtype::Sequence),
        ("classdiagram", DiagramSubtype::Class),
        ("statediagram", DiagramSubtype::State),
        ("erdiagram", DiagramSubtype::EntityRelationship),
        ("gantt", DiagramSubtype::Gantt),
        ("pie", DiagramSubtype::Pie),
        ("gitgraph", DiagramSubtype::GitGraph),
        ("timeline", DiagramSubtype::Timeline),
        ("flowchart", DiagramSubtype::Flowchart),
        ("graph", DiagramSubtype::Flowchart),
    ];
    rules
        .iter()
        .find(|(keyword, _)| lower.contains(keyword))
        .map_or(DiagramSubtype::Unknown, |(_, subtype)| *subtype)
}

/// `PlantUML` subtype by keyword presence, first match wins.
#[must_use]
pub fn plantuml_subtype(content: &str) -> DiagramSubtype {
    let lower = content.to_lowercase();
    if PLANTUML_SEQUENCE.is_match(content) {
        DiagramSubtype::Sequence
    } else if PLANTUML_ACTIVITY.is_match(content) {
        DiagramSubtype::Activity
    } else if PLANTUML_CLASS.is_match(content) {
        DiagramSubtype::Class
    } else if PLANTUML_COMPONENT.is_match(content) {
        DiagramSubtype::Component
    } else if lower.contains("@startmindmap") {
        DiagramSubtype::Mindmap
    } else if lower.contains("usecase") {
        DiagramSubtype::UseCase
    } else {
        DiagramSubtype::Unknown
    }
}

/// Extract a diagram title from the source.
#[must_use]
pub fn extract_title(content: &str) -> Option<String> {
    TITLE_PATTERNS.iter().find_map(|pattern| {
        pattern
            .captures(content)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().trim().to_owned())
            .filter(|title| !title.is_empty())
    })
}

/// Minimal structural check for a diagram family.
///
/// Only checks that the source is non-empty and carries the family's
/// begin/end markers or leading keyword. Not a grammar check.
///
/// # Errors
///
/// Returns the reason when the check fails.
pub fn validate_syntax(kind: DiagramKind, content: &str) -> Result<(), String> {
    if content.trim().is_empty() {
        return Err("diagram source is empty".to_owned());
    }

    match kind {
        DiagramKind::Mermaid => {
            let first = content
                .lines()
                .map(str::trim)
                .find(|line| !line.is_empty() && !line.starts_with("%%"))
                .unwrap_or_default()
                .to_lowercase();
            if MERMAID_KEYWORDS.iter().any(|kw| first.starts_with(kw)) {
                Ok(())
            } else {
                Err(format!("unrecognized Mermaid diagram declaration: '{first}'"))
            }
        }
        DiagramKind::PlantUml => {
            let mut lines = content.lines().map(str::trim);
            let has_start = lines.clone().any(|line| line.starts_with("@start"));
            let has_end = lines.any(|line| line.starts_with("@end"));
            if has_start && has_end {
                Ok(())
            } else {
                Err("PlantUML source is missing @start or @end marker".to_owned())
            }
        }
        DiagramKind::Unknown => Ok(()),
    }
}

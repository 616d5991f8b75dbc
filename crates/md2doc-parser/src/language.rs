//! Diagram families and subtypes recognized in fenced blocks.

/// Diagram family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DiagramKind {
    Mermaid,
    PlantUml,
    /// Recognized diagram label with no renderer (e.g. `dot`).
    Unknown,
}

impl DiagramKind {
    /// Parse a fence language hint.
    ///
    /// Matching is exact after lowercasing. Returns `None` for labels that do
    /// not name a diagram language.
    #[must_use]
    pub fn from_hint(hint: &str) -> Option<Self> {
        match hint.trim().to_ascii_lowercase().as_str() {
            "mermaid" => Some(Self::Mermaid),
            "plantuml" | "puml" => Some(Self::PlantUml),
            "dot" | "graphviz" => Some(Self::Unknown),
            _ => None,
        }
    }

    /// Lowercase identifier used in logs, cache keys and config.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Mermaid => "mermaid",
            Self::PlantUml => "plantuml",
            Self::Unknown => "unknown",
        }
    }

    /// Uppercase label used in placeholders.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Mermaid => "MERMAID",
            Self::PlantUml => "PLANTUML",
            Self::Unknown => "DIAGRAM",
        }
    }

    /// Whether a render engine exists for this family.
    #[must_use]
    pub fn is_renderable(self) -> bool {
        !matches!(self, Self::Unknown)
    }
}

impl std::fmt::Display for DiagramKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Diagram subtype within a family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagramSubtype {
    Flowchart,
    Sequence,
    Class,
    State,
    EntityRelationship,
    Gantt,
    Pie,
    GitGraph,
    Timeline,
    Activity,
    Component,
    Mindmap,
    UseCase,
    Unknown,
}

impl DiagramSubtype {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Flowchart => "flowchart",
            Self::Sequence => "sequence",
            Self::Class => "class",
            Self::State => "state",
            Self::EntityRelationship => "er",
            Self::Gantt => "gantt",
            Self::Pie => "pie",
            Self::GitGraph => "gitgraph",
            Self::Timeline => "timeline",
            Self::Activity => "activity",
            Self::Component => "component",
            Self::Mindmap => "mindmap",
            Self::UseCase => "usecase",
            Self::Unknown => "unknown",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_hint_known_languages() {
        let hints = [
            ("mermaid", DiagramKind::Mermaid),
            ("Mermaid", DiagramKind::Mermaid),
            ("plantuml", DiagramKind::PlantUml),
            ("puml", DiagramKind::PlantUml),
            ("PlantUML", DiagramKind::PlantUml),
            ("dot", DiagramKind::Unknown),
            ("graphviz", DiagramKind::Unknown),
        ];

        for (hint, expected) in hints {
            assert_eq!(
                DiagramKind::from_hint(hint),
                Some(expected),
                "Failed to parse: {hint}"
            );
        }
    }

    #[test]
    fn test_from_hint_unrelated_language() {
        assert_eq!(DiagramKind::from_hint("python"), None);
        assert_eq!(DiagramKind::from_hint("rust"), None);
        assert_eq!(DiagramKind::from_hint(""), None);
        assert_eq!(DiagramKind::from_hint("mermaid-js"), None);
    }

    #[test]
    fn test_labels() {
        assert_eq!(DiagramKind::Mermaid.label(), "MERMAID");
        assert_eq!(DiagramKind::PlantUml.label(), "PLANTUML");
        assert_eq!(DiagramKind::PlantUml.to_string(), "plantuml");
    }

    #[test]
    fn test_renderable() {
        assert!(DiagramKind::Mermaid.is_renderable());
        assert!(DiagramKind::PlantUml.is_renderable());
        assert!(!DiagramKind::Unknown.is_renderable());
    }

    #[test]
    fn test_subtype_as_str() {
        assert_eq!(DiagramSubtype::EntityRelationship.as_str(), "er");
        assert_eq!(DiagramSubtype::GitGraph.as_str(), "gitgraph");
        assert_eq!(DiagramSubtype::UseCase.as_str(), "usecase");
    }
}

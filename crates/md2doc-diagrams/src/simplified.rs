//! Generic substitute diagrams for the opt-in simplified fallback.

use md2doc_parser::DiagramKind;

const MERMAID: &str = "graph TD\n    A[Diagram unavailable] --> B[See the diagram source in the original document]";

const PLANTUML: &str = "@startuml\nrectangle \"Diagram unavailable\" as unavailable\nnote right of unavailable : See the diagram source in the original document\n@enduml";

/// Substitute source for a diagram family.
pub(crate) fn simplified_source(kind: DiagramKind) -> Option<&'static str> {
    match kind {
        DiagramKind::Mermaid => Some(MERMAID),
        DiagramKind::PlantUml => Some(PLANTUML),
        DiagramKind::Unknown => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simplified_sources_are_valid() {
        for kind in [DiagramKind::Mermaid, DiagramKind::PlantUml] {
            let source = simplified_source(kind).unwrap();
            assert!(md2doc_parser::validate_syntax(kind, source).is_ok(), "{kind}");
            assert!(source.contains("Diagram unavailable"));
        }
        assert_eq!(simplified_source(DiagramKind::Unknown), None);
    }
}

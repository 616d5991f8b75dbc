//! Line-oriented structural parser.
//!
//! Each non-blank line is dispatched in priority order:
//! heading > fenced block > list > table > paragraph.
//! Unrecognized constructs always degrade to a paragraph; parsing never fails.

use std::sync::LazyLock;

use regex::Regex;

use crate::detect::detect;
use crate::element::{Element, ElementKind};
use crate::table::TableLayout;

static HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(#{1,6})\s+(.+)$").expect("invalid heading regex"));
/// Opening fence; the info string may not contain backticks.
static FENCE_OPEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(`{3,})([^`]*)$").expect("invalid fence regex"));
static UNORDERED_ITEM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*[-*+]\s+(.*)$").expect("invalid list regex"));
static ORDERED_ITEM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*\d+\.\s+(.*)$").expect("invalid list regex"));

/// List marker family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ListFamily {
    Unordered,
    Ordered,
}

impl ListFamily {
    fn of(line: &str) -> Option<Self> {
        if UNORDERED_ITEM.is_match(line) {
            Some(Self::Unordered)
        } else if ORDERED_ITEM.is_match(line) {
            Some(Self::Ordered)
        } else {
            None
        }
    }

    fn item_text(self, line: &str) -> String {
        let pattern = match self {
            Self::Unordered => &*UNORDERED_ITEM,
            Self::Ordered => &*ORDERED_ITEM,
        };
        pattern
            .captures(line)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().trim().to_owned())
            .unwrap_or_default()
    }
}

/// Parse text into an ordered sequence of elements.
#[must_use]
pub fn parse(text: &str) -> Vec<Element> {
    let mut parser = StructuralParser::new(text);
    let mut elements = Vec::new();
    while let Some(element) = parser.next_element() {
        elements.push(element);
    }
    tracing::debug!(elements = elements.len(), "parsed markdown");
    elements
}

/// Single-pass scanner over the input lines.
struct StructuralParser<'a> {
    lines: Vec<&'a str>,
    pos: usize,
}

impl<'a> StructuralParser<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            lines: text.lines().collect(),
            pos: 0,
        }
    }

    fn next_element(&mut self) -> Option<Element> {
        while self.pos < self.lines.len() && is_blank(self.lines[self.pos]) {
            self.pos += 1;
        }
        if self.pos >= self.lines.len() {
            return None;
        }

        let element = self
            .heading()
            .or_else(|| self.fenced_block())
            .or_else(|| self.list())
            .or_else(|| self.table())
            .unwrap_or_else(|| self.paragraph());
        Some(element)
    }

    fn heading(&mut self) -> Option<Element> {
        let line = self.lines[self.pos];
        let caps = HEADING.captures(line.trim())?;
        let level = u8::try_from(caps[1].len()).unwrap_or(6);
        let text = caps[2].trim().to_owned();

        let element = Element::new(ElementKind::Heading { level, text }, self.pos, line);
        self.pos += 1;
        Some(element)
    }

    fn fenced_block(&mut self) -> Option<Element> {
        let start = self.pos;
        let opening = self.lines[start].trim();
        let caps = FENCE_OPEN.captures(opening)?;
        let fence_len = caps[1].len();

        // Unterminated fences are left for paragraph handling.
        let end = (start + 1..self.lines.len())
            .find(|&i| closes_fence(self.lines[i], fence_len))?;

        let content = self.lines[start + 1..end].join("\n");
        let language = caps[2].split_whitespace().next().map(str::to_owned);
        let raw = self.lines[start..=end].join("\n");
        self.pos = end + 1;

        let kind = match detect(&content, language.as_deref()) {
            Some(info) if info.kind.is_renderable() => {
                tracing::debug!(
                    line = start,
                    kind = info.kind.as_str(),
                    subtype = info.subtype.as_str(),
                    "detected diagram"
                );
                ElementKind::DiagramBlock {
                    content,
                    language,
                    info: info.at_line(start),
                }
            }
            _ => ElementKind::CodeBlock { content, language },
        };
        Some(Element::new(kind, start, raw))
    }

    fn list(&mut self) -> Option<Element> {
        let start = self.pos;
        let family = ListFamily::of(self.lines[start])?;
        let mut items = Vec::new();
        let mut i = start;

        while i < self.lines.len() {
            let line = self.lines[i];
            if is_blank(line) {
                // A single blank line may separate items of the same family.
                match self.lines.get(i + 1) {
                    Some(next) if ListFamily::of(next) == Some(family) => {
                        i += 1;
                        continue;
                    }
                    _ => break,
                }
            }
            if ListFamily::of(line) != Some(family) {
                break;
            }
            items.push(family.item_text(line));
            i += 1;
        }

        let raw = self.lines[start..i].join("\n");
        self.pos = i;
        let ordered = family == ListFamily::Ordered;
        Some(Element::new(ElementKind::List { items, ordered }, start, raw))
    }

    fn table(&mut self) -> Option<Element> {
        let start = self.pos;
        if !self.starts_table(start) {
            return None;
        }

        let end = (start..self.lines.len())
            .find(|&i| !self.lines[i].contains('|'))
            .unwrap_or(self.lines.len());
        let lines = &self.lines[start..end];
        let layout = TableLayout::analyze(lines);
        let raw = lines.join("\n");
        self.pos = end;

        Some(Element::new(
            ElementKind::Table {
                rows: layout.rows,
                alignments: layout.alignments,
                has_header: layout.has_header,
            },
            start,
            raw,
        ))
    }

    fn paragraph(&mut self) -> Element {
        let start = self.pos;
        let mut end = start + 1;
        while end < self.lines.len() && !is_blank(self.lines[end]) && !self.is_special(end) {
            end += 1;
        }

        let lines = &self.lines[start..end];
        let text = lines
            .iter()
            .map(|line| line.trim())
            .collect::<Vec<_>>()
            .join(" ");
        self.pos = end;
        Element::new(ElementKind::Paragraph { text }, start, lines.join("\n"))
    }

    fn starts_table(&self, i: usize) -> bool {
        self.lines[i].contains('|')
            && self
                .lines
                .get(i + 1)
                .is_some_and(|next| next.contains('|'))
    }

    /// Whether line `i` would start a non-paragraph element.
    fn is_special(&self, i: usize) -> bool {
        let line = self.lines[i];
        let trimmed = line.trim();
        HEADING.is_match(trimmed)
            || FENCE_OPEN.is_match(trimmed)
            || ListFamily::of(line).is_some()
            || self.starts_table(i)
    }
}

fn is_blank(line: &str) -> bool {
    line.trim().is_empty()
}

/// A closing fence is a backtick run at least as long as the opening one.
fn closes_fence(line: &str, fence_len: usize) -> bool {
    let trimmed = line.trim();
    trimmed.len() >= fence_len && trimmed.bytes().all(|b| b == b'`')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::language::DiagramKind;
    use crate::table::Alignment;
    use pretty_assertions::assert_eq;

    fn kinds(text: &str) -> Vec<ElementKind> {
        parse(text).into_iter().map(|e| e.kind).collect()
    }

    #[test]
    fn test_headings() {
        assert_eq!(
            kinds("# Title\n\n### Sub   \n####### too deep"),
            vec![
                ElementKind::Heading {
                    level: 1,
                    text: "Title".to_owned()
                },
                ElementKind::Heading {
                    level: 3,
                    text: "Sub".to_owned()
                },
                ElementKind::Paragraph {
                    text: "####### too deep".to_owned()
                },
            ]
        );
    }

    #[test]
    fn test_hash_without_space_is_paragraph() {
        assert_eq!(
            kinds("#hashtag"),
            vec![ElementKind::Paragraph {
                text: "#hashtag".to_owned()
            }]
        );
    }

    #[test]
    fn test_paragraph_joins_lines() {
        let elements = parse("first line\n  second line\n\nnext");
        assert_eq!(elements.len(), 2);
        assert_eq!(
            elements[0].kind,
            ElementKind::Paragraph {
                text: "first line second line".to_owned()
            }
        );
        assert_eq!(elements[0].raw, "first line\n  second line");
        assert_eq!(elements[1].line, 3);
    }

    #[test]
    fn test_paragraph_stops_at_heading() {
        assert_eq!(
            kinds("text\n# Head"),
            vec![
                ElementKind::Paragraph {
                    text: "text".to_owned()
                },
                ElementKind::Heading {
                    level: 1,
                    text: "Head".to_owned()
                },
            ]
        );
    }

    #[test]
    fn test_code_block_keeps_lines() {
        let elements = parse("```bash\nline1\nline2\n  line3\n```");
        assert_eq!(
            elements[0].kind,
            ElementKind::CodeBlock {
                content: "line1\nline2\n  line3".to_owned(),
                language: Some("bash".to_owned()),
            }
        );
        assert_eq!(elements[0].raw, "```bash\nline1\nline2\n  line3\n```");
    }

    #[test]
    fn test_code_block_without_language() {
        assert_eq!(
            kinds("```\nplain\n```"),
            vec![ElementKind::CodeBlock {
                content: "plain".to_owned(),
                language: None,
            }]
        );
    }

    #[test]
    fn test_unterminated_fence_is_paragraph() {
        assert_eq!(
            kinds("```python\nprint(1)"),
            vec![ElementKind::Paragraph {
                text: "```python print(1)".to_owned()
            }]
        );
    }

    #[test]
    fn test_inline_triple_backticks_do_not_open_fence() {
        assert_eq!(
            kinds("```code```\n\n# Title\n\n```\nplain\n```"),
            vec![
                ElementKind::Paragraph {
                    text: "```code```".to_owned()
                },
                ElementKind::Heading {
                    level: 1,
                    text: "Title".to_owned()
                },
                ElementKind::CodeBlock {
                    content: "plain".to_owned(),
                    language: None,
                },
            ]
        );
    }

    #[test]
    fn test_longer_closing_fence() {
        assert_eq!(
            kinds("```rust\nfn main() {}\n`````\n\nafter"),
            vec![
                ElementKind::CodeBlock {
                    content: "fn main() {}".to_owned(),
                    language: Some("rust".to_owned()),
                },
                ElementKind::Paragraph {
                    text: "after".to_owned()
                },
            ]
        );
    }

    #[test]
    fn test_shorter_run_does_not_close_fence() {
        assert_eq!(
            kinds("````markdown\n```\ninner\n```\n````"),
            vec![ElementKind::CodeBlock {
                content: "```\ninner\n```".to_owned(),
                language: Some("markdown".to_owned()),
            }]
        );
    }

    #[test]
    fn test_info_string_after_language() {
        assert_eq!(
            kinds("``` python title=demo\nprint(1)\n```"),
            vec![ElementKind::CodeBlock {
                content: "print(1)".to_owned(),
                language: Some("python".to_owned()),
            }]
        );
    }

    #[test]
    fn test_diagram_blocks() {
        let elements = parse("intro\n\n```mermaid\ngraph TD\n  A --> B\n```\n");
        let diagram = elements[1].diagram().unwrap();
        assert_eq!(diagram.kind, DiagramKind::Mermaid);
        assert_eq!(diagram.content, "graph TD\n  A --> B");
        assert_eq!(diagram.source_line, 2);
        assert_eq!(elements[1].line, 2);

        let elements = parse("```\n@startuml\nA -> B\n@enduml\n```");
        assert_eq!(elements[0].diagram().unwrap().kind, DiagramKind::PlantUml);
    }

    #[test]
    fn test_graphviz_stays_code() {
        let elements = parse("```dot\ndigraph { a -> b }\n```");
        assert!(matches!(elements[0].kind, ElementKind::CodeBlock { .. }));
    }

    #[test]
    fn test_lists() {
        assert_eq!(
            kinds("- one\n* two\n+ three\n\n1. first\n2. second"),
            vec![
                ElementKind::List {
                    items: vec!["one".to_owned(), "two".to_owned(), "three".to_owned()],
                    ordered: false,
                },
                ElementKind::List {
                    items: vec!["first".to_owned(), "second".to_owned()],
                    ordered: true,
                },
            ]
        );
    }

    #[test]
    fn test_list_tolerates_single_blank_line() {
        assert_eq!(
            kinds("- a\n\n- b\n\n\n- c"),
            vec![
                ElementKind::List {
                    items: vec!["a".to_owned(), "b".to_owned()],
                    ordered: false,
                },
                ElementKind::List {
                    items: vec!["c".to_owned()],
                    ordered: false,
                },
            ]
        );
    }

    #[test]
    fn test_list_family_change_ends_list() {
        let elements = kinds("- a\n1. b");
        assert_eq!(elements.len(), 2);
        assert!(matches!(elements[1], ElementKind::List { ordered: true, .. }));
    }

    #[test]
    fn test_bold_line_is_not_list() {
        assert_eq!(
            kinds("**bold** start"),
            vec![ElementKind::Paragraph {
                text: "**bold** start".to_owned()
            }]
        );
    }

    #[test]
    fn test_table() {
        let elements = parse("| a | b |\n|:--|--:|\n| 1 | 2 |\nafter");
        assert_eq!(
            elements[0].kind,
            ElementKind::Table {
                rows: vec![
                    vec!["a".to_owned(), "b".to_owned()],
                    vec!["1".to_owned(), "2".to_owned()],
                ],
                alignments: vec![Alignment::Left, Alignment::Right],
                has_header: true,
            }
        );
        assert_eq!(
            elements[1].kind,
            ElementKind::Paragraph {
                text: "after".to_owned()
            }
        );
    }

    #[test]
    fn test_single_pipe_line_is_paragraph() {
        assert_eq!(
            kinds("a | b\n\nnext"),
            vec![
                ElementKind::Paragraph {
                    text: "a | b".to_owned()
                },
                ElementKind::Paragraph {
                    text: "next".to_owned()
                },
            ]
        );
    }

    #[test]
    fn test_empty_input() {
        assert!(parse("").is_empty());
        assert!(parse("\n   \n\t\n").is_empty());
    }

    #[test]
    fn test_crlf_input() {
        assert_eq!(
            kinds("# Title\r\nbody\r\n"),
            vec![
                ElementKind::Heading {
                    level: 1,
                    text: "Title".to_owned()
                },
                ElementKind::Paragraph {
                    text: "body".to_owned()
                },
            ]
        );
    }
}

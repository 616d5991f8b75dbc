//! Inline markdown tokenizer.
//!
//! A single left-to-right pass splits paragraph text into tagged [`Span`]s.
//! At each position the patterns are tried in a fixed precedence (image,
//! link, code, bold, italic) and the first match consumes its characters, so
//! spans never overlap. Emphasis nested inside another span stays literal.

use std::sync::LazyLock;

use regex::Regex;

static IMAGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^!\[([^\]]*)\]\(\s*([^)\s]+)(?:\s+"[^"]*")?\s*\)"#).expect("invalid image regex")
});

static LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^\[([^\]]+)\]\(\s*([^)\s]+)(?:\s+"[^"]*")?\s*\)"#).expect("invalid link regex")
});

static CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^`([^`]+)`").expect("invalid code regex"));

static BOLD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\*\*([^*]+)\*\*").expect("invalid bold regex"));

static ITALIC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\*([^*\s](?:[^*]*[^*\s])?)\*").expect("invalid italic regex"));

/// Formatting of a span.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpanKind {
    Text,
    Bold,
    Italic,
    Code,
    Link { url: String },
    Image { src: String },
}

/// A tagged piece of paragraph text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Span {
    pub kind: SpanKind,
    /// Display text (link text, image alt text, or the emphasized content).
    pub text: String,
    /// Byte range of the span in the input, markers included.
    pub start: usize,
    pub end: usize,
}

impl Span {
    #[must_use]
    pub fn is_formatted(&self) -> bool {
        self.kind != SpanKind::Text
    }
}

/// Split `text` into non-overlapping spans covering the whole input.
#[must_use]
pub fn tokenize(text: &str) -> Vec<Span> {
    let mut spans = Vec::new();
    let mut literal_start = 0;
    let mut pos = 0;

    while pos < text.len() {
        let rest = &text[pos..];
        if let Some((kind, inner, len)) = match_span(rest) {
            if literal_start < pos {
                spans.push(Span {
                    kind: SpanKind::Text,
                    text: text[literal_start..pos].to_owned(),
                    start: literal_start,
                    end: pos,
                });
            }
            spans.push(Span {
                kind,
                text: inner,
                start: pos,
                end: pos + len,
            });
            pos += len;
            literal_start = pos;
        } else {
            pos += rest.chars().next().map_or(1, char::len_utf8);
        }
    }

    if literal_start < text.len() {
        spans.push(Span {
            kind: SpanKind::Text,
            text: text[literal_start..].to_owned(),
            start: literal_start,
            end: text.len(),
        });
    }
    spans
}

fn match_span(rest: &str) -> Option<(SpanKind, String, usize)> {
    match rest.as_bytes().first()? {
        b'!' => IMAGE.captures(rest).map(|caps| {
            (
                SpanKind::Image {
                    src: caps[2].to_owned(),
                },
                caps[1].to_owned(),
                caps[0].len(),
            )
        }),
        b'[' => LINK.captures(rest).map(|caps| {
            (
                SpanKind::Link {
                    url: caps[2].to_owned(),
                },
                caps[1].to_owned(),
                caps[0].len(),
            )
        }),
        b'`' => CODE
            .captures(rest)
            .map(|caps| (SpanKind::Code, caps[1].to_owned(), caps[0].len())),
        b'*' => BOLD
            .captures(rest)
            .map(|caps| (SpanKind::Bold, caps[1].to_owned(), caps[0].len()))
            .or_else(|| {
                ITALIC
                    .captures(rest)
                    .map(|caps| (SpanKind::Italic, caps[1].to_owned(), caps[0].len()))
            }),
        _ => None,
    }
}

/// Remove inline markup, keeping display text only.
#[must_use]
pub fn strip_markup(text: &str) -> String {
    tokenize(text).into_iter().map(|span| span.text).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn kinds(text: &str) -> Vec<(SpanKind, String)> {
        tokenize(text)
            .into_iter()
            .map(|span| (span.kind, span.text))
            .collect()
    }

    #[test]
    fn test_three_spans_without_overlap() {
        let input = "**bold** and *italic* and `code`";
        let spans = tokenize(input);

        let formatted: Vec<_> = spans.iter().filter(|s| s.is_formatted()).collect();
        assert_eq!(formatted.len(), 3);
        assert_eq!(formatted[0].kind, SpanKind::Bold);
        assert_eq!(formatted[1].kind, SpanKind::Italic);
        assert_eq!(formatted[2].kind, SpanKind::Code);

        // Contiguous, non-overlapping cover of the input
        let mut expected_start = 0;
        for span in &spans {
            assert_eq!(span.start, expected_start);
            assert!(span.end > span.start);
            expected_start = span.end;
        }
        assert_eq!(expected_start, input.len());

        assert_eq!(
            kinds(input),
            vec![
                (SpanKind::Bold, "bold".to_owned()),
                (SpanKind::Text, " and ".to_owned()),
                (SpanKind::Italic, "italic".to_owned()),
                (SpanKind::Text, " and ".to_owned()),
                (SpanKind::Code, "code".to_owned()),
            ]
        );
    }

    #[test]
    fn test_plain_text_is_single_span() {
        assert_eq!(kinds("just text"), vec![(SpanKind::Text, "just text".to_owned())]);
        assert!(tokenize("").is_empty());
    }

    #[test]
    fn test_link_and_image() {
        assert_eq!(
            kinds("see [docs](https://example.com) ![logo](img/logo.png \"Logo\")"),
            vec![
                (SpanKind::Text, "see ".to_owned()),
                (
                    SpanKind::Link {
                        url: "https://example.com".to_owned()
                    },
                    "docs".to_owned()
                ),
                (SpanKind::Text, " ".to_owned()),
                (
                    SpanKind::Image {
                        src: "img/logo.png".to_owned()
                    },
                    "logo".to_owned()
                ),
            ]
        );
    }

    #[test]
    fn test_first_match_wins_inside_link() {
        // Bold inside link text is not parsed separately
        assert_eq!(
            kinds("[**x**](u)"),
            vec![(
                SpanKind::Link {
                    url: "u".to_owned()
                },
                "**x**".to_owned()
            )]
        );
    }

    #[test]
    fn test_code_protects_emphasis_markers() {
        assert_eq!(
            kinds("`a*b*c` *d*"),
            vec![
                (SpanKind::Code, "a*b*c".to_owned()),
                (SpanKind::Text, " ".to_owned()),
                (SpanKind::Italic, "d".to_owned()),
            ]
        );
    }

    #[test]
    fn test_unmatched_markers_stay_literal() {
        assert_eq!(
            kinds("2 * 3 * 4 and **open"),
            vec![(SpanKind::Text, "2 * 3 * 4 and **open".to_owned())]
        );
    }

    #[test]
    fn test_multibyte_text() {
        assert_eq!(
            kinds("中文 **粗体** 文本"),
            vec![
                (SpanKind::Text, "中文 ".to_owned()),
                (SpanKind::Bold, "粗体".to_owned()),
                (SpanKind::Text, " 文本".to_owned()),
            ]
        );
    }

    #[test]
    fn test_strip_markup() {
        assert_eq!(
            strip_markup("**Name** with [link](http://x) and `code`"),
            "Name with link and code"
        );
    }
}

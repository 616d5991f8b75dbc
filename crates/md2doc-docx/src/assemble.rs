//! Fold parsed elements into a [`Document`].

use std::path::{Path, PathBuf};

use md2doc_cache::{ImageCache, ImageMetadata, STANDARD_DPI};
use md2doc_diagrams::{FallbackError, RenderOrchestrator, RenderOutput};
use md2doc_parser::{Alignment, DiagramInfo, Element, ElementKind};

use crate::inline::{SpanKind, strip_markup, tokenize};
use crate::model::{
    Align, Document, HEADER_SHADING, LINK_COLOR, PLACEHOLDER_COLOR, Paragraph, ParagraphStyle,
    Picture, Run, Table, TableCell, TableRow, URL_COLOR,
};
use crate::settings::{DocumentSettings, inches_to_twips};

const CODE_INDENT_INCHES: f64 = 0.5;
const LIST_INDENT_INCHES: f64 = 0.25;
const TABLE_CAPTION_SIZE: f32 = 11.0;
/// Captions are shorter than this many characters.
const TABLE_CAPTION_MAX_CHARS: usize = 50;

/// Source of rendered diagrams.
pub trait DiagramRenderer {
    fn render_diagram(&mut self, info: &DiagramInfo) -> Result<RenderOutput, FallbackError>;
}

impl DiagramRenderer for RenderOrchestrator {
    fn render_diagram(&mut self, info: &DiagramInfo) -> Result<RenderOutput, FallbackError> {
        self.render(info, None)
    }
}

/// Diagram outcomes of one assembly.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiagramTally {
    /// Diagrams embedded as images, substitutes included.
    pub rendered: usize,
    /// Diagrams emitted as placeholders.
    pub failed: usize,
    /// Rendered diagrams showing a generic substitute instead of the source.
    pub replaced: usize,
}

/// Result of [`DocumentAssembler::assemble`].
#[derive(Debug, Clone)]
pub struct Assembly {
    pub document: Document,
    pub diagrams: DiagramTally,
    /// Recovered problems, one line each.
    pub errors: Vec<String>,
}

/// Builds a [`Document`] from parsed elements.
///
/// Diagrams are rendered through the attached [`DiagramRenderer`]; without
/// one they are kept as code blocks. Local images are normalized through the
/// attached [`ImageCache`] when there is one.
pub struct DocumentAssembler<'a> {
    settings: DocumentSettings,
    base_dir: Option<PathBuf>,
    images: Option<&'a ImageCache>,
    diagrams: Option<&'a mut dyn DiagramRenderer>,
}

impl<'a> DocumentAssembler<'a> {
    #[must_use]
    pub fn new(settings: DocumentSettings) -> Self {
        Self {
            settings,
            base_dir: None,
            images: None,
            diagrams: None,
        }
    }

    /// Directory that relative image paths resolve against.
    #[must_use]
    pub fn with_base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.base_dir = Some(dir.into());
        self
    }

    #[must_use]
    pub fn with_image_cache(mut self, cache: &'a ImageCache) -> Self {
        self.images = Some(cache);
        self
    }

    #[must_use]
    pub fn with_diagrams(mut self, renderer: &'a mut dyn DiagramRenderer) -> Self {
        self.diagrams = Some(renderer);
        self
    }

    pub fn assemble(mut self, elements: &[Element]) -> Assembly {
        let mut out = Assembly {
            document: Document::new(self.settings.clone()),
            diagrams: DiagramTally::default(),
            errors: Vec::new(),
        };

        for (i, element) in elements.iter().enumerate() {
            match &element.kind {
                ElementKind::Heading { level, text } => self.heading(&mut out, *level, text),
                ElementKind::Paragraph { text }
                    if is_table_caption(text)
                        && matches!(
                            elements.get(i + 1).map(|next| &next.kind),
                            Some(ElementKind::Table { .. })
                        ) =>
                {
                    self.table_caption(&mut out.document, text);
                }
                ElementKind::Paragraph { text } => self.paragraph(&mut out, text),
                ElementKind::List { items, ordered } => self.list(&mut out, items, *ordered),
                ElementKind::CodeBlock { content, language } => {
                    self.code_block(&mut out.document, content, language.as_deref());
                }
                ElementKind::DiagramBlock {
                    content,
                    language,
                    info,
                } => self.diagram(&mut out, element.line, content, language.as_deref(), info),
                ElementKind::Table {
                    rows,
                    alignments,
                    has_header,
                } => Self::table(&mut out.document, rows, alignments, *has_header),
            }
        }

        tracing::debug!(
            blocks = out.document.blocks.len(),
            media = out.document.media.len(),
            "document assembled"
        );
        out
    }

    fn heading(&self, out: &mut Assembly, level: u8, text: &str) {
        let text = strip_markup(text);
        let paragraph = match self.settings.heading_size(level) {
            Some(_) => Paragraph::new()
                .with_style(ParagraphStyle::Heading(level))
                .with_run(Run::new(text)),
            // Deeper levels become a bold paragraph
            None => Paragraph::new().with_run(Run::new(text).bold()),
        };
        out.document.push_paragraph(paragraph);
    }

    fn paragraph(&self, out: &mut Assembly, text: &str) {
        let mut paragraph = Paragraph::new();
        self.push_inline(out, &mut paragraph, text);

        // A paragraph holding only an image is centered
        if paragraph.pictures().count() == 1 && paragraph.text().trim().is_empty() {
            paragraph.align = Align::Center;
        }
        out.document.push_paragraph(paragraph);
    }

    fn table_caption(&self, document: &mut Document, text: &str) {
        let run = Run::new(strip_markup(text.trim()))
            .bold()
            .font(&self.settings.font_name, TABLE_CAPTION_SIZE);
        document.push_paragraph(Paragraph::new().with_align(Align::Center).with_run(run));
    }

    fn list(&self, out: &mut Assembly, items: &[String], ordered: bool) {
        for (i, item) in items.iter().enumerate() {
            let marker = if ordered {
                format!("{}. ", i + 1)
            } else {
                "• ".to_owned()
            };
            let mut paragraph = Paragraph::new()
                .with_indent(inches_to_twips(LIST_INDENT_INCHES))
                .with_run(Run::new(marker));
            self.push_inline(out, &mut paragraph, item);
            out.document.push_paragraph(paragraph);
        }
    }

    fn push_inline(&self, out: &mut Assembly, paragraph: &mut Paragraph, text: &str) {
        for span in tokenize(text) {
            match span.kind {
                SpanKind::Text => paragraph.push_run(Run::new(span.text)),
                SpanKind::Bold => paragraph.push_run(Run::new(span.text).bold()),
                SpanKind::Italic => paragraph.push_run(Run::new(span.text).italic()),
                SpanKind::Code => paragraph.push_run(
                    Run::new(span.text)
                        .font(&self.settings.code_font, self.settings.code_font_size),
                ),
                SpanKind::Link { url } => {
                    paragraph.push_run(Run::new(span.text).underline().color(LINK_COLOR));
                    paragraph.push_run(Run::new(format!(" ({url})")).color(URL_COLOR));
                }
                SpanKind::Image { src } => match self.embed_local_image(out, &src, &span.text) {
                    Some(picture) => paragraph.push_picture(picture),
                    None => paragraph.push_run(Run::new(format!("[Image: {}]", span.text))),
                },
            }
        }
    }

    fn embed_local_image(&self, out: &mut Assembly, src: &str, alt: &str) -> Option<Picture> {
        let path = self.resolve_image(src)?;
        let data = match self.images {
            Some(cache) => cache
                .process(&path, None, None)
                .map_err(|e| e.to_string())
                .and_then(|cached| std::fs::read(cached).map_err(|e| e.to_string())),
            None => std::fs::read(&path).map_err(|e| e.to_string()),
        };

        match data {
            Ok(data) => {
                let picture = self.picture(&mut out.document, data, alt);
                if picture.is_none() {
                    tracing::warn!(path = %path.display(), "unsupported image format");
                }
                picture
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), "failed to load image: {e}");
                None
            }
        }
    }

    /// Local image file referenced by `src`, if readable.
    fn resolve_image(&self, src: &str) -> Option<PathBuf> {
        if src.contains("://") || src.starts_with("data:") {
            return None;
        }
        let path = Path::new(src);
        let path = match &self.base_dir {
            Some(base) if path.is_relative() => base.join(path),
            _ => path.to_path_buf(),
        };
        path.is_file().then_some(path)
    }

    /// Register `data` as media and size it from its pixel dimensions and DPI.
    fn picture(&self, document: &mut Document, data: Vec<u8>, description: &str) -> Option<Picture> {
        let extension = image_extension(&data)?;
        let meta = ImageMetadata::read(&data)?;
        if meta.width == 0 || meta.height == 0 {
            return None;
        }

        let natural = meta.width_inches(f64::from(STANDARD_DPI));
        let width = natural.min(self.settings.printable_width_inches());
        let height = width * f64::from(meta.height) / f64::from(meta.width);

        let media = document.add_media(data, extension);
        Some(Picture {
            media,
            width_inches: width,
            height_inches: height,
            description: description.to_owned(),
        })
    }

    fn code_block(&self, document: &mut Document, content: &str, language: Option<&str>) {
        if let Some(language) = language.filter(|l| !l.is_empty()) {
            document.push_paragraph(
                Paragraph::new()
                    .compact()
                    .with_run(Run::new(format!("Language: {language}")).italic().color(URL_COLOR)),
            );
        }
        self.code_lines(document, content);
    }

    /// One compact paragraph per source line.
    fn code_lines(&self, document: &mut Document, content: &str) {
        let normalized = content.replace("\r\n", "\n").replace('\r', "\n");
        for line in normalized.trim_end().split('\n') {
            document.push_paragraph(self.code_paragraph(clean_code_line(line)));
        }
    }

    fn code_paragraph(&self, text: String) -> Paragraph {
        Paragraph::new()
            .compact()
            .with_indent(inches_to_twips(CODE_INDENT_INCHES))
            .with_run(Run::new(text).font(&self.settings.code_font, self.settings.code_font_size))
    }

    fn diagram(
        &mut self,
        out: &mut Assembly,
        line: usize,
        content: &str,
        language: Option<&str>,
        info: &DiagramInfo,
    ) {
        let Some(renderer) = self.diagrams.as_deref_mut() else {
            self.code_block(&mut out.document, content, language);
            return;
        };

        let failure = match renderer.render_diagram(info) {
            Ok(output) => match self.embed_diagram(&mut out.document, &output, info) {
                Ok(()) => {
                    out.diagrams.rendered += 1;
                    if output.content_replaced {
                        out.diagrams.replaced += 1;
                        out.errors.push(format!(
                            "line {}: {} diagram could not be rendered and was replaced by a simplified substitute",
                            line + 1,
                            info.kind
                        ));
                    }
                    return;
                }
                Err(message) => message,
            },
            Err(e) => e.to_string(),
        };

        tracing::warn!(line = line + 1, kind = %info.kind, "inserting diagram placeholder: {failure}");
        out.diagrams.failed += 1;
        out.errors
            .push(format!("line {}: {} diagram: {failure}", line + 1, info.kind));
        self.placeholder(&mut out.document, info, content);
    }

    fn embed_diagram(
        &self,
        document: &mut Document,
        output: &RenderOutput,
        info: &DiagramInfo,
    ) -> Result<(), String> {
        let data = output
            .image
            .read()
            .map_err(|e| format!("failed to read rendered image: {e}"))?;
        let description = info.title.clone().unwrap_or_else(|| format!("{} diagram", info.kind));
        let picture = self
            .picture(document, data, &description)
            .ok_or_else(|| "rendered output is not a PNG or JPEG image".to_owned())?;

        let mut paragraph = Paragraph::new().with_align(Align::Center);
        paragraph.push_picture(picture);
        document.push_paragraph(paragraph);

        if output.content_replaced {
            document.push_paragraph(
                Paragraph::new().with_align(Align::Center).with_run(
                    Run::new("(simplified substitute, original diagram could not be rendered)")
                        .italic()
                        .color(URL_COLOR),
                ),
            );
        }
        Ok(())
    }

    /// Type label followed by the verbatim diagram source.
    fn placeholder(&self, document: &mut Document, info: &DiagramInfo, content: &str) {
        document.push_paragraph(
            Paragraph::new().with_run(
                Run::new(format!("[{} DIAGRAM]", info.kind.label()))
                    .bold()
                    .color(PLACEHOLDER_COLOR),
            ),
        );
        for line in content.lines() {
            document.push_paragraph(self.code_paragraph(line.to_owned()));
        }
    }

    fn table(document: &mut Document, rows: &[Vec<String>], alignments: &[Alignment], has_header: bool) {
        let columns = rows.iter().map(Vec::len).max().unwrap_or(0);
        if columns == 0 {
            return;
        }

        let rows = rows
            .iter()
            .enumerate()
            .map(|(i, row)| {
                let header = has_header && i == 0;
                let cells = (0..columns)
                    .map(|col| {
                        let text = row.get(col).map(|c| strip_markup(c.trim())).unwrap_or_default();
                        let align = alignments.get(col).copied().unwrap_or_default();
                        let run = if header { Run::new(text).bold() } else { Run::new(text) };
                        TableCell {
                            paragraph: Paragraph::new().with_align(align.into()).with_run(run),
                            shading: header.then_some(HEADER_SHADING),
                        }
                    })
                    .collect();
                TableRow { cells, header }
            })
            .collect();

        document.push_table(Table { rows, columns });
    }
}

/// A short plain line directly above a table is taken as its caption.
fn is_table_caption(text: &str) -> bool {
    let text = text.trim();
    !text.is_empty()
        && text.chars().count() < TABLE_CAPTION_MAX_CHARS
        && !text.contains(['#', '*', '`', '['])
}

/// Remove control and zero-width characters, keeping tabs.
fn clean_code_line(line: &str) -> String {
    line.chars()
        .filter(|c| {
            *c == '\t'
                || !(c.is_control() || matches!(c, '\u{200B}'..='\u{200D}' | '\u{2060}' | '\u{FEFF}'))
        })
        .collect()
}

/// Package extension for embeddable image bytes.
fn image_extension(data: &[u8]) -> Option<&'static str> {
    if data.starts_with(b"\x89PNG\r\n\x1a\n") {
        Some("png")
    } else if data.starts_with(&[0xFF, 0xD8]) {
        Some("jpeg")
    } else {
        None
    }
}

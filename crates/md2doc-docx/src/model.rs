//! In-memory document model.
//!
//! A [`Document`] is a flat list of [`Block`]s (paragraphs and tables) plus
//! the media files embedded by image runs. The model knows nothing about the
//! package format; see [`crate::writer`] for serialization.

use crate::settings::DocumentSettings;

/// Hex RGB color without the leading `#`.
pub type Color = &'static str;

pub const LINK_COLOR: Color = "0563C1";
pub const URL_COLOR: Color = "808080";
pub const PLACEHOLDER_COLOR: Color = "00B050";
pub const HEADER_SHADING: Color = "F2F2F2";

/// Horizontal paragraph alignment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Align {
    #[default]
    Left,
    Center,
    Right,
}

impl Align {
    /// `w:jc` value.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Center => "center",
            Self::Right => "right",
        }
    }
}

impl From<md2doc_parser::Alignment> for Align {
    fn from(alignment: md2doc_parser::Alignment) -> Self {
        match alignment {
            md2doc_parser::Alignment::Left => Self::Left,
            md2doc_parser::Alignment::Center => Self::Center,
            md2doc_parser::Alignment::Right => Self::Right,
        }
    }
}

/// Paragraph style.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ParagraphStyle {
    #[default]
    Normal,
    /// Heading level 1 through 6.
    Heading(u8),
}

impl ParagraphStyle {
    /// Style id as declared in `styles.xml`.
    #[must_use]
    pub fn style_id(self) -> Option<String> {
        match self {
            Self::Normal => None,
            Self::Heading(level) => Some(format!("Heading{level}")),
        }
    }
}

/// A run of uniformly formatted text.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Run {
    pub text: String,
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub color: Option<Color>,
    /// Font override (code spans and code blocks).
    pub font: Option<String>,
    /// Size override in points.
    pub size: Option<f32>,
}

impl Run {
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn bold(mut self) -> Self {
        self.bold = true;
        self
    }

    #[must_use]
    pub fn italic(mut self) -> Self {
        self.italic = true;
        self
    }

    #[must_use]
    pub fn underline(mut self) -> Self {
        self.underline = true;
        self
    }

    #[must_use]
    pub fn color(mut self, color: Color) -> Self {
        self.color = Some(color);
        self
    }

    #[must_use]
    pub fn font(mut self, font: impl Into<String>, size: f32) -> Self {
        self.font = Some(font.into());
        self.size = Some(size);
        self
    }
}

/// Embedded picture sized in inches.
#[derive(Debug, Clone, PartialEq)]
pub struct Picture {
    /// Index into [`Document::media`].
    pub media: usize,
    pub width_inches: f64,
    pub height_inches: f64,
    pub description: String,
}

/// Inline paragraph content.
#[derive(Debug, Clone, PartialEq)]
pub enum Inline {
    Text(Run),
    Picture(Picture),
}

/// A paragraph of inline content.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Paragraph {
    pub style: ParagraphStyle,
    pub align: Align,
    /// Left indent in twips.
    pub indent: u32,
    /// Suppress spacing before and after (code lines).
    pub compact: bool,
    pub content: Vec<Inline>,
}

impl Paragraph {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_style(mut self, style: ParagraphStyle) -> Self {
        self.style = style;
        self
    }

    #[must_use]
    pub fn with_align(mut self, align: Align) -> Self {
        self.align = align;
        self
    }

    #[must_use]
    pub fn with_indent(mut self, twips: u32) -> Self {
        self.indent = twips;
        self
    }

    #[must_use]
    pub fn compact(mut self) -> Self {
        self.compact = true;
        self
    }

    #[must_use]
    pub fn with_run(mut self, run: Run) -> Self {
        self.content.push(Inline::Text(run));
        self
    }

    pub fn push_run(&mut self, run: Run) {
        self.content.push(Inline::Text(run));
    }

    pub fn push_picture(&mut self, picture: Picture) {
        self.content.push(Inline::Picture(picture));
    }

    /// Text runs in order.
    pub fn runs(&self) -> impl Iterator<Item = &Run> {
        self.content.iter().filter_map(|inline| match inline {
            Inline::Text(run) => Some(run),
            Inline::Picture(_) => None,
        })
    }

    /// Concatenated text of all runs.
    #[must_use]
    pub fn text(&self) -> String {
        self.runs().map(|run| run.text.as_str()).collect()
    }

    pub fn pictures(&self) -> impl Iterator<Item = &Picture> {
        self.content.iter().filter_map(|inline| match inline {
            Inline::Picture(picture) => Some(picture),
            Inline::Text(_) => None,
        })
    }
}

/// Table cell holding a single paragraph.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableCell {
    pub paragraph: Paragraph,
    pub shading: Option<Color>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableRow {
    pub cells: Vec<TableCell>,
    /// Repeated as header on each page.
    pub header: bool,
}

/// Bordered table ("Table Grid" style).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub rows: Vec<TableRow>,
    pub columns: usize,
}

/// Block-level content.
#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    Paragraph(Paragraph),
    Table(Table),
}

/// Image file stored in `word/media`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Media {
    pub data: Vec<u8>,
    /// File extension, also used for the content type.
    pub extension: &'static str,
}

impl Media {
    /// Package file name for media `index`.
    #[must_use]
    pub fn file_name(&self, index: usize) -> String {
        format!("image{}.{}", index + 1, self.extension)
    }

    #[must_use]
    pub fn content_type(&self) -> &'static str {
        match self.extension {
            "jpeg" => "image/jpeg",
            _ => "image/png",
        }
    }
}

/// A complete document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    pub settings: DocumentSettings,
    pub blocks: Vec<Block>,
    pub media: Vec<Media>,
}

impl Document {
    #[must_use]
    pub fn new(settings: DocumentSettings) -> Self {
        Self {
            settings,
            blocks: Vec::new(),
            media: Vec::new(),
        }
    }

    pub fn push_paragraph(&mut self, paragraph: Paragraph) {
        self.blocks.push(Block::Paragraph(paragraph));
    }

    pub fn push_table(&mut self, table: Table) {
        self.blocks.push(Block::Table(table));
    }

    /// Register a media file, reusing an identical one. Returns its index.
    pub fn add_media(&mut self, data: Vec<u8>, extension: &'static str) -> usize {
        if let Some(index) = self
            .media
            .iter()
            .position(|m| m.extension == extension && m.data == data)
        {
            return index;
        }
        self.media.push(Media { data, extension });
        self.media.len() - 1
    }

    /// Top-level paragraphs (table cells excluded).
    pub fn paragraphs(&self) -> impl Iterator<Item = &Paragraph> {
        self.blocks.iter().filter_map(|block| match block {
            Block::Paragraph(p) => Some(p),
            Block::Table(_) => None,
        })
    }

    pub fn tables(&self) -> impl Iterator<Item = &Table> {
        self.blocks.iter().filter_map(|block| match block {
            Block::Table(t) => Some(t),
            Block::Paragraph(_) => None,
        })
    }
}

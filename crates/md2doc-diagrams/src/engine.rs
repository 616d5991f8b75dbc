//! Render engine contract.

use std::path::{Path, PathBuf};

use md2doc_parser::DiagramInfo;

use crate::error::RenderError;
use crate::strategy::{EngineId, RenderMode};

/// Rendered diagram image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderedImage {
    /// Image written to disk (the requested output path or a cache file).
    File(PathBuf),
    /// Encoded image kept in memory.
    Bytes(Vec<u8>),
}

impl RenderedImage {
    /// Encoded image bytes.
    pub fn read(&self) -> std::io::Result<Vec<u8>> {
        match self {
            Self::File(path) => std::fs::read(path),
            Self::Bytes(data) => Ok(data.clone()),
        }
    }

    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::File(path) => Some(path),
            Self::Bytes(_) => None,
        }
    }
}

/// Successful render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderOutput {
    pub image: RenderedImage,
    /// The image shows a generic substitute diagram, not the source.
    pub content_replaced: bool,
}

impl RenderOutput {
    pub(crate) fn rendered(image: RenderedImage) -> Self {
        Self {
            image,
            content_replaced: false,
        }
    }
}

/// A diagram renderer for one family in one mode.
pub trait RenderEngine: Send {
    fn id(&self) -> EngineId;

    fn mode(&self) -> RenderMode;

    /// Whether the engine's backend is usable (local tool found, etc.).
    fn available(&self) -> bool {
        true
    }

    /// Whether this engine can render `info` right now.
    fn can_render(&self, info: &DiagramInfo) -> bool {
        info.kind == self.id().kind() && self.available()
    }

    /// Render `info`, writing to `out_path` when given.
    fn render(&self, info: &DiagramInfo, out_path: Option<&Path>)
    -> Result<RenderOutput, RenderError>;

    /// Minimal structural check of diagram source.
    fn validate_syntax(&self, content: &str) -> Result<(), String> {
        md2doc_parser::validate_syntax(self.id().kind(), content)
    }

    /// Output formats this engine can produce.
    fn supported_formats(&self) -> &'static [&'static str];
}

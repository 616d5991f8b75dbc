//! Render error types.

use std::time::Duration;

use md2doc_parser::DiagramKind;

use crate::strategy::{EngineId, RenderMode};

/// Single engine render failure.
///
/// Always recoverable: the orchestrator records it and moves on to the next
/// strategy.
#[derive(Debug, thiserror::Error)]
#[error("{engine} ({mode}): {kind}")]
pub struct RenderError {
    pub engine: EngineId,
    pub mode: RenderMode,
    pub kind: RenderErrorKind,
}

impl RenderError {
    pub(crate) fn new(engine: EngineId, mode: RenderMode, kind: RenderErrorKind) -> Self {
        Self { engine, mode, kind }
    }
}

/// Kind of render failure.
#[derive(Debug, thiserror::Error)]
pub enum RenderErrorKind {
    #[error("cannot render {0} diagrams")]
    Unsupported(DiagramKind),
    #[error("renderer not available: {0}")]
    Unavailable(String),
    #[error("HTTP error: {0}")]
    Http(String),
    #[error("unexpected response: {0}")]
    InvalidResponse(String),
    #[error("local tool failed: {0}")]
    Tool(String),
    #[error("timed out after {}s", .0.as_secs())]
    Timeout(Duration),
    #[error("I/O error: {0}")]
    Io(String),
}

/// Every strategy for a diagram failed or was skipped.
#[derive(Debug, thiserror::Error)]
pub enum FallbackError {
    #[error("no render strategy registered for {0} diagrams")]
    NoStrategy(DiagramKind),
    #[error("no render strategy available for {0} diagrams (network unreachable, no local renderer)")]
    NoneAvailable(DiagramKind),
    #[error("all render strategies failed for {kind} diagrams: {last}")]
    Exhausted {
        kind: DiagramKind,
        #[source]
        last: RenderError,
    },
}

impl FallbackError {
    /// Diagram family the failure refers to.
    #[must_use]
    pub fn kind(&self) -> DiagramKind {
        match self {
            Self::NoStrategy(kind) | Self::NoneAvailable(kind) | Self::Exhausted { kind, .. } => {
                *kind
            }
        }
    }
}

//! Diagram rendering for md2doc.
//!
//! Mermaid and `PlantUML` diagrams are rendered either through online
//! services or local command-line tools. A [`RenderOrchestrator`] tries the
//! configured [`RenderStrategy`] list for each family in priority order and
//! reports total failure as a [`FallbackError`] value instead of panicking.
//!
//! # Architecture
//!
//! - [`RenderEngine`]: common engine contract
//! - [`MermaidEngine`], [`PlantUmlEngine`]: online and local renderers
//! - [`encoding`]: `PlantUML` deflate + custom alphabet text encoding
//! - [`RenderOrchestrator`]: fallback chains, engine registry, network probe memo
//! - [`NetworkProbe`]: reachability check against the rendering endpoints
//!
//! Raster output is normalized through [`md2doc_cache::ImageCache`] when one
//! is supplied, so repeated renders of the same source are served from disk.

mod consts;
pub mod encoding;
mod engine;
mod error;
mod http;
mod mermaid;
mod orchestrator;
mod output;
mod plantuml;
mod probe;
mod settings;
mod simplified;
mod strategy;
mod tool;

pub use consts::{DEFAULT_MERMAID_ENDPOINT, DEFAULT_PLANTUML_SERVERS};
pub use encoding::encode_plantuml;
pub use engine::{RenderEngine, RenderOutput, RenderedImage};
pub use error::{FallbackError, RenderError, RenderErrorKind};
pub use mermaid::MermaidEngine;
pub use orchestrator::{DefaultEngineFactory, EngineFactory, EngineStatus, RenderOrchestrator};
pub use plantuml::{PlantUmlEngine, inject_dpi};
pub use probe::{HttpProbe, NetworkProbe, StaticProbe};
pub use settings::{DiagramFormat, DiagramSettings, MermaidSettings, MermaidTheme, PlantUmlSettings};
pub use strategy::{EngineId, RenderMode, RenderStrategy, default_strategies};

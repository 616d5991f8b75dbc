//! Markdown to Word conversion facade.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use md2doc_cache::{CacheStats, ImageCache};
use md2doc_config::Config;
use md2doc_diagrams::{DiagramSettings, RenderOrchestrator};
use md2doc_docx::{DiagramTally, Document, DocumentAssembler, DocumentSettings};
use md2doc_parser::ElementCounts;
use tempfile::TempDir;

use crate::error::ConversionError;
use crate::settings::{diagram_settings, document_settings, image_config};

/// Result of converting one markdown text.
#[derive(Debug, Clone)]
pub struct ConversionResult {
    pub document: Document,
    pub element_counts: ElementCounts,
    pub cache_stats: CacheStats,
    pub diagrams: DiagramTally,
    /// Recovered problems (failed or substituted diagrams).
    pub errors: Vec<String>,
}

/// Counters accumulated over the converter's lifetime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConversionStats {
    pub files_converted: usize,
    pub files_failed: usize,
    pub diagrams_rendered: usize,
    pub diagrams_failed: usize,
    /// Diagrams rendered as a generic substitute.
    pub diagrams_replaced: usize,
}

/// Converts markdown to Word documents.
///
/// Owns the image cache and the diagram orchestrator, so engine instances,
/// the network probe result and cache hits are shared across conversions.
pub struct Converter {
    document: DocumentSettings,
    cache: Arc<ImageCache>,
    orchestrator: Option<RenderOrchestrator>,
    stats: ConversionStats,
    /// Backing directory of a throwaway cache; removed on drop.
    _scratch: Option<TempDir>,
}

impl Converter {
    /// Converter with default settings, a throwaway cache and diagram
    /// rendering enabled.
    pub fn new() -> Result<Self, ConversionError> {
        let scratch = TempDir::new()?;
        let cache = Arc::new(ImageCache::open(scratch.path())?);
        let orchestrator = RenderOrchestrator::new(DiagramSettings::default(), Some(Arc::clone(&cache)));
        Ok(Self {
            document: DocumentSettings::default(),
            cache,
            orchestrator: Some(orchestrator),
            stats: ConversionStats::default(),
            _scratch: Some(scratch),
        })
    }

    /// Converter configured from a loaded [`Config`].
    ///
    /// With caching disabled the cache lives in a temporary directory for
    /// the converter's lifetime.
    pub fn from_config(config: &Config) -> Result<Self, ConversionError> {
        let image = image_config(&config.images)?;

        let (cache, scratch) = if config.cache_resolved.enabled {
            (ImageCache::open(&config.cache_resolved.dir)?, None)
        } else {
            let scratch = TempDir::new()?;
            (ImageCache::open(scratch.path())?, Some(scratch))
        };
        let cache = Arc::new(cache.with_config(image.clone()));

        let orchestrator = if config.diagrams.enabled {
            let settings = diagram_settings(&config.diagrams, &image)?;
            Some(RenderOrchestrator::new(settings, Some(Arc::clone(&cache))))
        } else {
            None
        };

        tracing::debug!(
            cache = %cache.dir().display(),
            diagrams = orchestrator.is_some(),
            "converter configured"
        );
        Ok(Self {
            document: document_settings(&config.document),
            cache,
            orchestrator,
            stats: ConversionStats::default(),
            _scratch: scratch,
        })
    }

    #[must_use]
    pub fn with_document_settings(mut self, settings: DocumentSettings) -> Self {
        self.document = settings;
        self
    }

    /// Replace the diagram orchestrator.
    #[must_use]
    pub fn with_orchestrator(mut self, orchestrator: RenderOrchestrator) -> Self {
        self.orchestrator = Some(orchestrator);
        self
    }

    /// Keep diagrams as code blocks instead of rendering them.
    #[must_use]
    pub fn without_diagrams(mut self) -> Self {
        self.orchestrator = None;
        self
    }

    #[must_use]
    pub fn cache(&self) -> &ImageCache {
        &self.cache
    }

    pub fn orchestrator_mut(&mut self) -> Option<&mut RenderOrchestrator> {
        self.orchestrator.as_mut()
    }

    #[must_use]
    pub fn stats(&self) -> ConversionStats {
        self.stats
    }

    /// Convert markdown text into a document.
    ///
    /// Relative image paths resolve against the current directory.
    pub fn convert(&mut self, text: &str) -> Result<ConversionResult, ConversionError> {
        self.convert_in(text, None)
    }

    fn convert_in(
        &mut self,
        text: &str,
        base_dir: Option<&Path>,
    ) -> Result<ConversionResult, ConversionError> {
        if text.trim().is_empty() {
            return Err(ConversionError::EmptyInput);
        }

        let elements = md2doc_parser::parse(text);
        let element_counts = ElementCounts::from_elements(&elements);

        let mut assembler =
            DocumentAssembler::new(self.document.clone()).with_image_cache(&self.cache);
        if let Some(dir) = base_dir {
            assembler = assembler.with_base_dir(dir);
        }
        if let Some(orchestrator) = self.orchestrator.as_mut() {
            assembler = assembler.with_diagrams(orchestrator);
        }
        let assembly = assembler.assemble(&elements);

        self.stats.diagrams_rendered += assembly.diagrams.rendered;
        self.stats.diagrams_failed += assembly.diagrams.failed;
        self.stats.diagrams_replaced += assembly.diagrams.replaced;

        tracing::info!(
            elements = element_counts.total,
            diagrams = element_counts.diagrams,
            diagrams_failed = assembly.diagrams.failed,
            "markdown converted"
        );

        Ok(ConversionResult {
            document: assembly.document,
            element_counts,
            cache_stats: self.cache.stats(),
            diagrams: assembly.diagrams,
            errors: assembly.errors,
        })
    }

    /// Convert a markdown file and write the `.docx` next to it, or to
    /// `output` when given. Returns the written path.
    pub fn convert_file(
        &mut self,
        input: &Path,
        output: Option<&Path>,
    ) -> Result<PathBuf, ConversionError> {
        match self.convert_file_inner(input, output) {
            Ok(path) => {
                self.stats.files_converted += 1;
                Ok(path)
            }
            Err(e) => {
                self.stats.files_failed += 1;
                Err(e)
            }
        }
    }

    fn convert_file_inner(
        &mut self,
        input: &Path,
        output: Option<&Path>,
    ) -> Result<PathBuf, ConversionError> {
        if !input.exists() {
            return Err(ConversionError::InputNotFound(input.to_path_buf()));
        }
        if !input.is_file() {
            return Err(ConversionError::NotAFile(input.to_path_buf()));
        }

        let text = std::fs::read_to_string(input)?;
        let base_dir = input.parent().filter(|p| !p.as_os_str().is_empty());
        let result = self.convert_in(&text, base_dir)?;

        for error in &result.errors {
            tracing::warn!(input = %input.display(), "{error}");
        }

        let output = output.map_or_else(|| input.with_extension("docx"), Path::to_path_buf);
        result.document.save(&output)?;
        tracing::info!(input = %input.display(), output = %output.display(), "document written");
        Ok(output)
    }

    /// Convert every file in `dir` matching `pattern` (e.g. `*.md` or
    /// `**/*.md`).
    ///
    /// Outputs go next to each input, or under `out_dir` mirroring the
    /// directory layout. Per-file failures are logged and mapped to `None`.
    pub fn batch_convert(
        &mut self,
        dir: &Path,
        pattern: &str,
        out_dir: Option<&Path>,
    ) -> Result<BTreeMap<PathBuf, Option<PathBuf>>, ConversionError> {
        if !dir.is_dir() {
            return Err(ConversionError::InputNotFound(dir.to_path_buf()));
        }

        let full_pattern = dir.join(pattern);
        let mut results = BTreeMap::new();
        for entry in glob::glob(&full_pattern.to_string_lossy())? {
            let path = match entry {
                Ok(path) => path,
                Err(e) => {
                    tracing::warn!("skipping unreadable path: {e}");
                    continue;
                }
            };
            if !path.is_file() {
                continue;
            }

            let output = out_dir.map(|out| {
                let relative = path.strip_prefix(dir).unwrap_or(&path);
                out.join(relative).with_extension("docx")
            });
            let converted = match self.convert_file(&path, output.as_deref()) {
                Ok(written) => Some(written),
                Err(e) => {
                    tracing::warn!(input = %path.display(), "conversion failed: {e}");
                    None
                }
            };
            results.insert(path, converted);
        }

        tracing::info!(
            files = results.len(),
            failed = results.values().filter(|v| v.is_none()).count(),
            "batch conversion finished"
        );
        Ok(results)
    }
}

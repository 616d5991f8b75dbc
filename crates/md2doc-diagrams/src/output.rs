//! Shared post-render handling: cache lookup, normalization, output placement.

use std::fs;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use md2doc_cache::{ImageCache, RenderConfig};

use crate::engine::RenderedImage;
use crate::error::{RenderError, RenderErrorKind};
use crate::strategy::{EngineId, RenderMode};

/// Where an engine puts what it rendered.
pub(crate) struct OutputSink {
    pub engine: EngineId,
    pub mode: RenderMode,
    pub cache: Option<Arc<ImageCache>>,
    pub config: RenderConfig,
}

impl OutputSink {
    /// Return a cached render of `source`, placed at `out_path` when given.
    pub fn lookup(&self, source: &[u8], out_path: Option<&Path>) -> Option<RenderedImage> {
        let cached = self.cache.as_ref()?.get(source, &self.config)?;
        tracing::debug!(engine = %self.engine, "diagram served from cache");
        match out_path {
            Some(out) => match fs::copy(&cached, out) {
                Ok(_) => Some(RenderedImage::File(out.to_path_buf())),
                Err(e) => {
                    tracing::warn!("failed to copy cached diagram: {e}");
                    None
                }
            },
            None => Some(RenderedImage::File(cached)),
        }
    }

    /// Store freshly rendered bytes.
    ///
    /// Raster output is normalized through the cache under the key of
    /// `source`. Anything the cache cannot handle is written as is.
    pub fn store(
        &self,
        source: &[u8],
        data: Vec<u8>,
        raster: bool,
        out_path: Option<&Path>,
    ) -> Result<RenderedImage, RenderError> {
        if raster && let Some(cache) = &self.cache {
            match self.insert(cache, source, &data) {
                Ok(cached) => {
                    return match out_path {
                        Some(out) => {
                            fs::copy(&cached, out).map_err(|e| self.io_error(&e))?;
                            Ok(RenderedImage::File(out.to_path_buf()))
                        }
                        None => Ok(RenderedImage::File(cached)),
                    };
                }
                Err(e) => tracing::warn!(engine = %self.engine, "failed to cache diagram: {e}"),
            }
        }

        match out_path {
            Some(out) => {
                if let Some(parent) = out.parent() {
                    fs::create_dir_all(parent).map_err(|e| self.io_error(&e))?;
                }
                fs::write(out, &data).map_err(|e| self.io_error(&e))?;
                Ok(RenderedImage::File(out.to_path_buf()))
            }
            None => Ok(RenderedImage::Bytes(data)),
        }
    }

    fn insert(
        &self,
        cache: &ImageCache,
        source: &[u8],
        data: &[u8],
    ) -> Result<std::path::PathBuf, md2doc_cache::CacheError> {
        let mut tmp = tempfile::Builder::new()
            .prefix("md2doc-render-")
            .suffix(".png")
            .tempfile()?;
        tmp.write_all(data)?;
        tmp.flush()?;
        cache.insert_rendered(source, tmp.path(), &self.config)
    }

    pub fn io_error(&self, e: &std::io::Error) -> RenderError {
        RenderError::new(self.engine, self.mode, RenderErrorKind::Io(e.to_string()))
    }
}

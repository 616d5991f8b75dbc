//! `PlantUML` rendering through mirror servers or the `plantuml` command.

use std::ffi::OsStr;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use md2doc_cache::{ImageCache, RenderConfig};
use md2doc_parser::{DiagramInfo, DiagramKind};
use ureq::Agent;

use crate::consts::MIN_IMAGE_BYTES;
use crate::encoding::encode_plantuml;
use crate::engine::{RenderEngine, RenderOutput};
use crate::error::{RenderError, RenderErrorKind};
use crate::http;
use crate::output::OutputSink;
use crate::settings::{DiagramFormat, PlantUmlSettings};
use crate::strategy::{EngineId, RenderMode};
use crate::tool;

const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// Insert `skinparam dpi` after the `@start*` line.
///
/// Source without a `@start` line is returned unchanged.
#[must_use]
pub fn inject_dpi(source: &str, dpi: u32) -> String {
    let mut offset = 0;
    for line in source.split_inclusive('\n') {
        offset += line.len();
        if line.trim_start().to_ascii_lowercase().starts_with("@start") {
            let mut result = String::with_capacity(source.len() + 24);
            result.push_str(&source[..offset]);
            if !line.ends_with('\n') {
                result.push('\n');
            }
            result.push_str(&format!("skinparam dpi {dpi}\n"));
            result.push_str(&source[offset..]);
            return result;
        }
    }
    source.to_owned()
}

/// `PlantUML` render engine.
pub struct PlantUmlEngine {
    mode: RenderMode,
    settings: PlantUmlSettings,
    agent: Agent,
    local_available: bool,
    sink: OutputSink,
}

impl PlantUmlEngine {
    /// Engine rendering through the configured mirror servers.
    #[must_use]
    pub fn online(
        settings: PlantUmlSettings,
        image: RenderConfig,
        cache: Option<Arc<ImageCache>>,
    ) -> Self {
        Self::new(RenderMode::Online, settings, image, cache, false)
    }

    /// Engine rendering through the local `plantuml` command. Probes once.
    #[must_use]
    pub fn local(
        settings: PlantUmlSettings,
        image: RenderConfig,
        cache: Option<Arc<ImageCache>>,
    ) -> Self {
        let available = tool::probe("plantuml", &["-version"], PROBE_TIMEOUT);
        if !available {
            tracing::info!("local PlantUML not found");
        }
        Self::new(RenderMode::Local, settings, image, cache, available)
    }

    fn new(
        mode: RenderMode,
        settings: PlantUmlSettings,
        image: RenderConfig,
        cache: Option<Arc<ImageCache>>,
        local_available: bool,
    ) -> Self {
        Self {
            mode,
            agent: http::create_agent(settings.online_timeout),
            settings,
            local_available,
            sink: OutputSink {
                engine: EngineId::PlantUml,
                mode,
                cache,
                config: image,
            },
        }
    }

    #[must_use]
    pub fn local_available(&self) -> bool {
        self.local_available
    }

    /// URL variants for one server, in the order they are tried.
    #[must_use]
    pub fn url_variants(&self, server: &str, content: &str) -> Vec<String> {
        let server = server.trim_end_matches('/');
        let format = self.settings.format.as_str();
        let encoded = encode_plantuml(content);
        let encoded_dpi = encode_plantuml(&inject_dpi(content, self.settings.dpi));

        let mut urls = vec![
            format!("{server}/{format}/{encoded_dpi}"),
            format!("{server}/{format}/{encoded}"),
        ];
        if self.settings.format == DiagramFormat::Png {
            urls.push(format!("{server}/img/{encoded}"));
        }
        urls.dedup();
        urls
    }

    fn render_online(&self, content: &str) -> Result<Vec<u8>, RenderErrorKind> {
        if self.settings.format == DiagramFormat::Pdf {
            return Err(RenderErrorKind::Unavailable(
                "PlantUML servers do not produce PDF".to_owned(),
            ));
        }

        let mut last_error = RenderErrorKind::Unavailable("no PlantUML servers configured".to_owned());
        for server in &self.settings.servers {
            for url in self.url_variants(server, content) {
                for attempt in 1..=self.settings.attempts.max(1) {
                    match self.fetch(&url) {
                        Ok(data) => {
                            tracing::debug!(server = %server, attempt, "rendered PlantUML diagram");
                            return Ok(data);
                        }
                        Err(e) => {
                            tracing::debug!(server = %server, attempt, "PlantUML request failed: {e}");
                            last_error = e;
                        }
                    }
                }
            }
            tracing::warn!(server = %server, "PlantUML server failed: {last_error}");
        }
        Err(last_error)
    }

    fn fetch(&self, url: &str) -> Result<Vec<u8>, RenderErrorKind> {
        let response = http::get(&self.agent, url).map_err(RenderErrorKind::Http)?;
        if !response.is_success() {
            return Err(RenderErrorKind::Http(format!("HTTP {}", response.status)));
        }
        if response.body.len() < MIN_IMAGE_BYTES {
            return Err(RenderErrorKind::InvalidResponse(format!(
                "response too short ({} bytes)",
                response.body.len()
            )));
        }
        Ok(response.body)
    }

    fn render_local(&self, content: &str) -> Result<Vec<u8>, RenderErrorKind> {
        if !self.local_available {
            return Err(RenderErrorKind::Unavailable("plantuml".to_owned()));
        }
        if self.settings.format == DiagramFormat::Pdf {
            return Err(RenderErrorKind::Unavailable(
                "PlantUML PDF output is not supported".to_owned(),
            ));
        }

        let work = tempfile::tempdir().map_err(|e| RenderErrorKind::Io(e.to_string()))?;
        let input = work.path().join("diagram.puml");
        fs::write(&input, inject_dpi(content, self.settings.dpi))
            .map_err(|e| RenderErrorKind::Io(e.to_string()))?;

        let format_flag = format!("-t{}", self.settings.format.as_str());
        let args: [&OsStr; 4] = [
            OsStr::new("-charset"),
            OsStr::new(&self.settings.charset),
            OsStr::new(&format_flag),
            input.as_os_str(),
        ];
        tool::run("plantuml", &args, self.settings.local_timeout)?;

        let output = input.with_extension(self.settings.format.as_str());
        fs::read(&output).map_err(|e| RenderErrorKind::Tool(format!("no output produced: {e}")))
    }

    fn error(&self, kind: RenderErrorKind) -> RenderError {
        RenderError::new(EngineId::PlantUml, self.mode, kind)
    }
}

impl RenderEngine for PlantUmlEngine {
    fn id(&self) -> EngineId {
        EngineId::PlantUml
    }

    fn mode(&self) -> RenderMode {
        self.mode
    }

    fn available(&self) -> bool {
        self.mode == RenderMode::Online || self.local_available
    }

    fn render(
        &self,
        info: &DiagramInfo,
        out_path: Option<&Path>,
    ) -> Result<RenderOutput, RenderError> {
        if info.kind != DiagramKind::PlantUml {
            return Err(self.error(RenderErrorKind::Unsupported(info.kind)));
        }

        let source = format!("plantuml\n{}\n{}", self.settings.fingerprint(), info.content);
        let raster = self.settings.format.is_raster();
        if raster && let Some(image) = self.sink.lookup(source.as_bytes(), out_path) {
            return Ok(RenderOutput::rendered(image));
        }

        let result = match self.mode {
            RenderMode::Online => self.render_online(&info.content),
            RenderMode::Local => self.render_local(&info.content),
        };

        match result {
            Ok(data) => {
                let image = self.sink.store(source.as_bytes(), data, raster, out_path)?;
                Ok(RenderOutput::rendered(image))
            }
            Err(kind) => Err(self.error(kind)),
        }
    }

    fn supported_formats(&self) -> &'static [&'static str] {
        &["png", "svg", "txt"]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn engine(settings: PlantUmlSettings) -> PlantUmlEngine {
        PlantUmlEngine::online(settings, RenderConfig::default(), None)
    }

    #[test]
    fn test_inject_dpi_after_start_line() {
        let source = "@startuml\nAlice -> Bob\n@enduml";
        assert_eq!(
            inject_dpi(source, 150),
            "@startuml\nskinparam dpi 150\nAlice -> Bob\n@enduml"
        );
    }

    #[test]
    fn test_inject_dpi_indented_and_other_start() {
        let source = "' comment\n  @startmindmap\n* root\n@endmindmap";
        assert_eq!(
            inject_dpi(source, 96),
            "' comment\n  @startmindmap\nskinparam dpi 96\n* root\n@endmindmap"
        );
    }

    #[test]
    fn test_inject_dpi_without_start_marker() {
        assert_eq!(inject_dpi("Alice -> Bob", 96), "Alice -> Bob");
        assert_eq!(inject_dpi("@startuml", 96), "@startuml\nskinparam dpi 96\n");
    }

    #[test]
    fn test_url_variants_png() {
        let engine = engine(PlantUmlSettings::default());
        let content = "@startuml\nA -> B\n@enduml";
        let urls = engine.url_variants("https://example.com/plantuml/", content);

        let encoded = encode_plantuml(content);
        let encoded_dpi = encode_plantuml(&inject_dpi(content, 96));
        assert_eq!(
            urls,
            vec![
                format!("https://example.com/plantuml/png/{encoded_dpi}"),
                format!("https://example.com/plantuml/png/{encoded}"),
                format!("https://example.com/plantuml/img/{encoded}"),
            ]
        );
    }

    #[test]
    fn test_url_variants_svg_skip_img_path() {
        let engine = engine(PlantUmlSettings {
            format: DiagramFormat::Svg,
            ..PlantUmlSettings::default()
        });
        let urls = engine.url_variants("https://example.com", "@startuml\nA -> B\n@enduml");
        assert_eq!(urls.len(), 2);
        assert!(urls.iter().all(|u| u.starts_with("https://example.com/svg/")));
    }

    #[test]
    fn test_url_variants_dedup_without_start_marker() {
        let engine = engine(PlantUmlSettings {
            format: DiagramFormat::Svg,
            ..PlantUmlSettings::default()
        });
        let urls = engine.url_variants("https://example.com", "A -> B");
        assert_eq!(urls.len(), 1);
    }

    #[test]
    fn test_no_servers_is_unavailable() {
        let engine = engine(PlantUmlSettings {
            servers: Vec::new(),
            ..PlantUmlSettings::default()
        });
        let info = md2doc_parser::detect("@startuml\nA -> B\n@enduml", None).unwrap();
        let err = engine.render(&info, None).unwrap_err();
        assert!(matches!(err.kind, RenderErrorKind::Unavailable(_)));
        assert_eq!(err.engine, EngineId::PlantUml);
    }

    #[test]
    fn test_local_without_tool() {
        let engine = PlantUmlEngine::new(
            RenderMode::Local,
            PlantUmlSettings::default(),
            RenderConfig::default(),
            None,
            false,
        );
        let info = md2doc_parser::detect("@startuml\nA -> B\n@enduml", None).unwrap();
        assert!(!engine.can_render(&info));
        assert!(engine.render(&info, None).is_err());
    }
}

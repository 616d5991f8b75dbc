//! Mermaid rendering through the image service or the `mmdc` command.

use std::ffi::OsString;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use base64::Engine;
use base64::prelude::BASE64_URL_SAFE;
use md2doc_cache::{ImageCache, RenderConfig};
use md2doc_parser::{DiagramInfo, DiagramKind};
use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};
use ureq::Agent;

use crate::engine::{RenderEngine, RenderOutput};
use crate::error::{RenderError, RenderErrorKind};
use crate::http;
use crate::output::OutputSink;
use crate::settings::{DiagramFormat, MermaidSettings, MermaidTheme};
use crate::strategy::{EngineId, RenderMode};
use crate::tool;

const MMDC_PROBE_TIMEOUT: Duration = Duration::from_secs(5);
const NPX_PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// How the local Mermaid CLI is invoked.
#[derive(Debug, Clone, PartialEq, Eq)]
struct LocalCommand {
    program: String,
    prefix: Vec<String>,
}

impl LocalCommand {
    /// Find `mmdc` on the path, falling back to `npx mmdc`.
    fn detect() -> Option<Self> {
        if tool::probe("mmdc", &["--version"], MMDC_PROBE_TIMEOUT) {
            return Some(Self {
                program: "mmdc".to_owned(),
                prefix: Vec::new(),
            });
        }
        if tool::probe("npx", &["mmdc", "--version"], NPX_PROBE_TIMEOUT) {
            return Some(Self {
                program: "npx".to_owned(),
                prefix: vec!["mmdc".to_owned()],
            });
        }
        None
    }
}

/// Mermaid render engine.
pub struct MermaidEngine {
    mode: RenderMode,
    settings: MermaidSettings,
    agent: Agent,
    local: Option<LocalCommand>,
    sink: OutputSink,
}

impl MermaidEngine {
    /// Engine rendering through the online image service.
    #[must_use]
    pub fn online(
        settings: MermaidSettings,
        image: RenderConfig,
        cache: Option<Arc<ImageCache>>,
    ) -> Self {
        Self::new(RenderMode::Online, settings, image, cache, None)
    }

    /// Engine rendering through the local CLI. Probes for the tool once.
    #[must_use]
    pub fn local(
        settings: MermaidSettings,
        image: RenderConfig,
        cache: Option<Arc<ImageCache>>,
    ) -> Self {
        let local = LocalCommand::detect();
        if local.is_none() {
            tracing::info!("local Mermaid CLI not found");
        }
        Self::new(RenderMode::Local, settings, image, cache, local)
    }

    fn new(
        mode: RenderMode,
        settings: MermaidSettings,
        image: RenderConfig,
        cache: Option<Arc<ImageCache>>,
        local: Option<LocalCommand>,
    ) -> Self {
        Self {
            mode,
            agent: http::create_agent(settings.online_timeout),
            settings,
            local,
            sink: OutputSink {
                engine: EngineId::Mermaid,
                mode,
                cache,
                config: image,
            },
        }
    }

    /// Whether the local CLI was found.
    #[must_use]
    pub fn local_available(&self) -> bool {
        self.local.is_some()
    }

    /// Image service URL for `content`.
    #[must_use]
    pub fn image_url(&self, content: &str) -> String {
        let encoded = BASE64_URL_SAFE.encode(content.as_bytes());
        let endpoint = self.settings.endpoint.trim_end_matches('/');
        let path = match self.settings.format {
            DiagramFormat::Svg => "svg",
            _ => "img",
        };

        let mut params = Vec::new();
        if self.settings.format == DiagramFormat::Png {
            params.push(("type", "png".to_owned()));
        }
        if self.settings.theme != MermaidTheme::Default {
            params.push(("theme", self.settings.theme.as_str().to_owned()));
        }
        if self.settings.background != "white" {
            params.push(("bgColor", self.settings.background.clone()));
        }

        let mut url = format!("{endpoint}/{path}/{encoded}");
        for (i, (key, value)) in params.iter().enumerate() {
            url.push(if i == 0 { '?' } else { '&' });
            url.push_str(key);
            url.push('=');
            url.extend(utf8_percent_encode(value, NON_ALPHANUMERIC));
        }
        url
    }

    /// Arguments for the local CLI, without the program prefix.
    #[must_use]
    pub fn local_args(&self, input: &Path, output: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "-i".into(),
            input.into(),
            "-o".into(),
            output.into(),
        ];
        if self.settings.theme != MermaidTheme::Default {
            args.extend(["-t".into(), self.settings.theme.as_str().into()]);
        }
        if self.settings.background != "white" {
            args.extend(["-b".into(), self.settings.background.as_str().into()]);
        }
        args.extend([
            "-w".into(),
            self.settings.width.to_string().into(),
            "-H".into(),
            self.settings.height.to_string().into(),
        ]);
        if (self.settings.scale - 1.0).abs() > f64::EPSILON {
            args.extend(["-s".into(), self.settings.scale.to_string().into()]);
        }
        args
    }

    fn render_online(&self, content: &str) -> Result<Vec<u8>, RenderErrorKind> {
        if self.settings.format == DiagramFormat::Pdf {
            return Err(RenderErrorKind::Unavailable(
                "PDF output requires the local Mermaid CLI".to_owned(),
            ));
        }

        let url = self.image_url(content);
        tracing::debug!(url = %url, "requesting Mermaid image");
        let response = http::get(&self.agent, &url).map_err(RenderErrorKind::Http)?;

        if !response.is_success() {
            return Err(RenderErrorKind::Http(format!("HTTP {}", response.status)));
        }
        if !response.content_type.starts_with("image/") {
            return Err(RenderErrorKind::InvalidResponse(format!(
                "non-image content type '{}'",
                response.content_type
            )));
        }
        Ok(response.body)
    }

    fn render_local(&self, content: &str) -> Result<Vec<u8>, RenderErrorKind> {
        let command = self
            .local
            .as_ref()
            .ok_or_else(|| RenderErrorKind::Unavailable("mmdc".to_owned()))?;

        // Removed on every exit path when dropped
        let work = tempfile::tempdir().map_err(|e| RenderErrorKind::Io(e.to_string()))?;
        let input = work.path().join("diagram.mmd");
        let output = work
            .path()
            .join(format!("diagram.{}", self.settings.format.as_str()));
        fs::write(&input, content).map_err(|e| RenderErrorKind::Io(e.to_string()))?;

        let mut args: Vec<OsString> = command.prefix.iter().map(OsString::from).collect();
        args.extend(self.local_args(&input, &output));
        tool::run(&command.program, &args, self.settings.local_timeout)?;

        fs::read(&output).map_err(|e| RenderErrorKind::Tool(format!("no output produced: {e}")))
    }

    fn error(&self, kind: RenderErrorKind) -> RenderError {
        RenderError::new(EngineId::Mermaid, self.mode, kind)
    }
}

impl RenderEngine for MermaidEngine {
    fn id(&self) -> EngineId {
        EngineId::Mermaid
    }

    fn mode(&self) -> RenderMode {
        self.mode
    }

    fn available(&self) -> bool {
        self.mode == RenderMode::Online || self.local.is_some()
    }

    fn render(
        &self,
        info: &DiagramInfo,
        out_path: Option<&Path>,
    ) -> Result<RenderOutput, RenderError> {
        if info.kind != DiagramKind::Mermaid {
            return Err(self.error(RenderErrorKind::Unsupported(info.kind)));
        }

        let source = format!("mermaid\n{}\n{}", self.settings.fingerprint(), info.content);
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
                tracing::debug!(mode = %self.mode, subtype = info.subtype.as_str(), "rendered Mermaid diagram");
                let image = self.sink.store(source.as_bytes(), data, raster, out_path)?;
                Ok(RenderOutput::rendered(image))
            }
            Err(kind) => Err(self.error(kind)),
        }
    }

    fn supported_formats(&self) -> &'static [&'static str] {
        match self.mode {
            RenderMode::Online => &["png", "svg"],
            RenderMode::Local => &["png", "svg", "pdf"],
        }
    }
}

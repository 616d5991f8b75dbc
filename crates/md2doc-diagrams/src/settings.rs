//! Engine settings.

use std::time::Duration;

use md2doc_cache::RenderConfig;

use crate::consts::{
    DEFAULT_MERMAID_ENDPOINT, DEFAULT_NETWORK_TTL, DEFAULT_PLANTUML_DPI,
    DEFAULT_PLANTUML_SERVERS, LOCAL_RENDER_TIMEOUT, MERMAID_ONLINE_TIMEOUT, PLANTUML_ATTEMPTS,
    PLANTUML_ONLINE_TIMEOUT, PROBE_TIMEOUT,
};

/// Rendered output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DiagramFormat {
    #[default]
    Png,
    Svg,
    Pdf,
    Txt,
}

impl DiagramFormat {
    /// Parse a format name.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "png" => Some(Self::Png),
            "svg" => Some(Self::Svg),
            "pdf" => Some(Self::Pdf),
            "txt" => Some(Self::Txt),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Svg => "svg",
            Self::Pdf => "pdf",
            Self::Txt => "txt",
        }
    }

    /// Whether the image cache can normalize this format.
    #[must_use]
    pub fn is_raster(self) -> bool {
        matches!(self, Self::Png)
    }
}

/// Mermaid color theme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MermaidTheme {
    #[default]
    Default,
    Neutral,
    Dark,
    Forest,
    Base,
}

impl MermaidTheme {
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "default" => Some(Self::Default),
            "neutral" => Some(Self::Neutral),
            "dark" => Some(Self::Dark),
            "forest" => Some(Self::Forest),
            "base" => Some(Self::Base),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Neutral => "neutral",
            Self::Dark => "dark",
            Self::Forest => "forest",
            Self::Base => "base",
        }
    }
}

/// Mermaid engine settings.
#[derive(Debug, Clone, PartialEq)]
pub struct MermaidSettings {
    pub theme: MermaidTheme,
    pub format: DiagramFormat,
    pub width: u32,
    pub height: u32,
    pub background: String,
    pub scale: f64,
    /// Image service base URL (`{endpoint}/img/{source}`).
    pub endpoint: String,
    pub online_timeout: Duration,
    pub local_timeout: Duration,
}

impl Default for MermaidSettings {
    fn default() -> Self {
        Self {
            theme: MermaidTheme::Default,
            format: DiagramFormat::Png,
            width: 800,
            height: 600,
            background: "white".to_owned(),
            scale: 1.0,
            endpoint: DEFAULT_MERMAID_ENDPOINT.to_owned(),
            online_timeout: MERMAID_ONLINE_TIMEOUT,
            local_timeout: LOCAL_RENDER_TIMEOUT,
        }
    }
}

impl MermaidSettings {
    /// Settings that change the rendered image, hashed into cache keys.
    pub(crate) fn fingerprint(&self) -> String {
        format!(
            "theme={};bg={};size={}x{};scale={};format={}",
            self.theme.as_str(),
            self.background,
            self.width,
            self.height,
            self.scale,
            self.format.as_str()
        )
    }
}

/// `PlantUML` engine settings.
#[derive(Debug, Clone, PartialEq)]
pub struct PlantUmlSettings {
    /// Mirror servers, tried in order.
    pub servers: Vec<String>,
    pub format: DiagramFormat,
    /// DPI hint injected as `skinparam dpi`.
    pub dpi: u32,
    pub charset: String,
    /// Attempts per URL variant.
    pub attempts: u32,
    pub online_timeout: Duration,
    pub local_timeout: Duration,
}

impl Default for PlantUmlSettings {
    fn default() -> Self {
        Self {
            servers: DEFAULT_PLANTUML_SERVERS
                .iter()
                .map(|s| (*s).to_owned())
                .collect(),
            format: DiagramFormat::Png,
            dpi: DEFAULT_PLANTUML_DPI,
            charset: "UTF-8".to_owned(),
            attempts: PLANTUML_ATTEMPTS,
            online_timeout: PLANTUML_ONLINE_TIMEOUT,
            local_timeout: LOCAL_RENDER_TIMEOUT,
        }
    }
}

impl PlantUmlSettings {
    pub(crate) fn fingerprint(&self) -> String {
        format!("dpi={};format={}", self.dpi, self.format.as_str())
    }
}

/// Settings for all engines and the orchestrator.
#[derive(Debug, Clone, PartialEq)]
pub struct DiagramSettings {
    pub mermaid: MermaidSettings,
    pub plantuml: PlantUmlSettings,
    /// Normalization applied to rendered raster images.
    pub image: RenderConfig,
    /// Try local renderers before online services.
    pub prefer_local: bool,
    /// Substitute a generic "Diagram unavailable" diagram when every online
    /// attempt fails. The result is flagged as replaced content.
    pub allow_simplified_fallback: bool,
    /// How long a network probe result is reused.
    pub network_ttl: Duration,
    pub probe_timeout: Duration,
}

impl Default for DiagramSettings {
    fn default() -> Self {
        Self {
            mermaid: MermaidSettings::default(),
            plantuml: PlantUmlSettings::default(),
            image: RenderConfig::default().for_word(),
            prefer_local: false,
            allow_simplified_fallback: false,
            network_ttl: DEFAULT_NETWORK_TTL,
            probe_timeout: PROBE_TIMEOUT,
        }
    }
}

impl DiagramSettings {
    /// Endpoints probed for network reachability: the services actually used.
    #[must_use]
    pub fn probe_endpoints(&self) -> Vec<String> {
        let mut endpoints = vec![self.mermaid.endpoint.clone()];
        endpoints.extend(self.plantuml.servers.iter().cloned());
        endpoints.dedup();
        endpoints
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_parse() {
        assert_eq!(DiagramFormat::parse("PNG"), Some(DiagramFormat::Png));
        assert_eq!(DiagramFormat::parse("svg"), Some(DiagramFormat::Svg));
        assert_eq!(DiagramFormat::parse("gif"), None);
        assert!(DiagramFormat::Png.is_raster());
        assert!(!DiagramFormat::Svg.is_raster());
    }

    #[test]
    fn test_theme_parse() {
        assert_eq!(MermaidTheme::parse("Forest"), Some(MermaidTheme::Forest));
        assert_eq!(MermaidTheme::parse("solarized"), None);
    }

    #[test]
    fn test_probe_endpoints_are_render_services() {
        let endpoints = DiagramSettings::default().probe_endpoints();
        assert_eq!(endpoints[0], "https://mermaid.ink");
        assert!(endpoints.contains(&"https://www.plantuml.com/plantuml".to_owned()));
        assert_eq!(endpoints.len(), 4);
    }

    #[test]
    fn test_fingerprint_changes_with_theme() {
        let a = MermaidSettings::default();
        let b = MermaidSettings {
            theme: MermaidTheme::Dark,
            ..MermaidSettings::default()
        };
        assert_ne!(a.fingerprint(), b.fingerprint());
    }
}

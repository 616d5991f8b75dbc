//! Map loaded configuration onto the settings of each component.
//!
//! Keys missing from the config keep the component defaults.

use std::time::Duration;

use md2doc_cache::{OutputFormat, RenderConfig};
use md2doc_config::{ConfigError, DiagramsConfig, DocumentConfig, ImagesConfig};
use md2doc_diagrams::{DiagramFormat, DiagramSettings, MermaidTheme};
use md2doc_docx::DocumentSettings;

#[must_use]
pub fn document_settings(config: &DocumentConfig) -> DocumentSettings {
    let mut settings = DocumentSettings::default();
    if let Some(font) = &config.font_name {
        settings.font_name.clone_from(font);
    }
    if let Some(size) = config.font_size {
        settings.font_size = size;
    }
    if let Some(font) = &config.code_font {
        settings.code_font.clone_from(font);
    }
    if let Some(size) = config.code_font_size {
        settings.code_font_size = size;
    }
    if let Some(sizes) = config.heading_sizes {
        settings.heading_sizes = sizes;
    }
    settings.margin_top_cm = config.margin_top_cm.unwrap_or(settings.margin_top_cm);
    settings.margin_bottom_cm = config.margin_bottom_cm.unwrap_or(settings.margin_bottom_cm);
    settings.margin_left_cm = config.margin_left_cm.unwrap_or(settings.margin_left_cm);
    settings.margin_right_cm = config.margin_right_cm.unwrap_or(settings.margin_right_cm);
    settings
}

/// Image normalization settings for embedded images.
pub fn image_config(config: &ImagesConfig) -> Result<RenderConfig, ConfigError> {
    let mut image = RenderConfig::default();
    if let Some(format) = &config.format {
        image.output_format = OutputFormat::parse(format).ok_or_else(|| {
            ConfigError::Validation(format!("images.format: unsupported format '{format}'"))
        })?;
    }
    image.max_width = config.max_width.unwrap_or(image.max_width);
    image.max_height = config.max_height.unwrap_or(image.max_height);
    image.quality = config.quality.unwrap_or(image.quality);
    image.dpi = config.dpi.unwrap_or(image.dpi);
    image.word_max_width_inches = config
        .word_max_width_inches
        .unwrap_or(image.word_max_width_inches);
    image.word_dpi = config.word_dpi.unwrap_or(image.word_dpi);
    Ok(image)
}

/// Engine and orchestrator settings. Rendered diagrams are normalized with
/// the Word-page variant of `image`.
pub fn diagram_settings(
    config: &DiagramsConfig,
    image: &RenderConfig,
) -> Result<DiagramSettings, ConfigError> {
    let mut settings = DiagramSettings {
        image: image.for_word(),
        prefer_local: config.prefer_local,
        allow_simplified_fallback: config.allow_simplified_fallback,
        ..DiagramSettings::default()
    };
    if let Some(ttl) = config.network_ttl_secs {
        settings.network_ttl = Duration::from_secs(ttl);
    }
    if let Some(timeout) = config.probe_timeout_secs {
        settings.probe_timeout = Duration::from_secs(timeout);
    }

    let source = &config.mermaid;
    let mermaid = &mut settings.mermaid;
    if let Some(theme) = &source.theme {
        mermaid.theme = MermaidTheme::parse(theme).ok_or_else(|| {
            ConfigError::Validation(format!("diagrams.mermaid.theme: unknown theme '{theme}'"))
        })?;
    }
    if let Some(format) = &source.format {
        mermaid.format = diagram_format(format, "diagrams.mermaid.format")?;
    }
    if let Some(background) = &source.background {
        mermaid.background.clone_from(background);
    }
    if let Some(endpoint) = &source.endpoint {
        mermaid.endpoint = endpoint.trim_end_matches('/').to_owned();
    }
    mermaid.width = source.width.unwrap_or(mermaid.width);
    mermaid.height = source.height.unwrap_or(mermaid.height);
    mermaid.scale = source.scale.unwrap_or(mermaid.scale);
    if let Some(secs) = source.timeout_secs {
        mermaid.online_timeout = Duration::from_secs(secs);
    }
    if let Some(secs) = source.local_timeout_secs {
        mermaid.local_timeout = Duration::from_secs(secs);
    }

    let source = &config.plantuml;
    let plantuml = &mut settings.plantuml;
    if let Some(servers) = &source.servers {
        plantuml.servers = servers
            .iter()
            .map(|s| s.trim_end_matches('/').to_owned())
            .collect();
    }
    if let Some(format) = &source.format {
        plantuml.format = diagram_format(format, "diagrams.plantuml.format")?;
        if plantuml.format == DiagramFormat::Pdf {
            return Err(ConfigError::Validation(
                "diagrams.plantuml.format: pdf is not supported".to_owned(),
            ));
        }
    }
    if let Some(charset) = &source.charset {
        plantuml.charset.clone_from(charset);
    }
    plantuml.dpi = source.dpi.unwrap_or(plantuml.dpi);
    plantuml.attempts = source.attempts.unwrap_or(plantuml.attempts);
    if let Some(secs) = source.timeout_secs {
        plantuml.online_timeout = Duration::from_secs(secs);
    }
    if let Some(secs) = source.local_timeout_secs {
        plantuml.local_timeout = Duration::from_secs(secs);
    }

    Ok(settings)
}

fn diagram_format(value: &str, field: &str) -> Result<DiagramFormat, ConfigError> {
    DiagramFormat::parse(value)
        .ok_or_else(|| ConfigError::Validation(format!("{field}: unsupported format '{value}'")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults_pass_through() {
        let document = document_settings(&DocumentConfig::default());
        assert_eq!(document, DocumentSettings::default());

        let image = image_config(&ImagesConfig::default()).unwrap();
        assert_eq!(image, RenderConfig::default());

        let diagrams = diagram_settings(&DiagramsConfig::default(), &image).unwrap();
        assert_eq!(diagrams, DiagramSettings::default());
    }

    #[test]
    fn test_document_overrides() {
        let config = DocumentConfig {
            font_name: Some("Arial".to_owned()),
            font_size: Some(11.0),
            margin_left_cm: Some(2.0),
            ..DocumentConfig::default()
        };
        let settings = document_settings(&config);

        assert_eq!(settings.font_name, "Arial");
        assert_eq!(settings.font_size, 11.0);
        assert_eq!(settings.margin_left_cm, 2.0);
        assert_eq!(settings.margin_right_cm, 3.17);
        assert_eq!(settings.code_font, "Consolas");
    }

    #[test]
    fn test_image_format() {
        let config = ImagesConfig {
            format: Some("JPEG".to_owned()),
            quality: Some(80),
            ..ImagesConfig::default()
        };
        let image = image_config(&config).unwrap();
        assert_eq!(image.output_format, OutputFormat::Jpeg);
        assert_eq!(image.quality, 80);

        let bad = ImagesConfig {
            format: Some("bmp".to_owned()),
            ..ImagesConfig::default()
        };
        assert!(matches!(image_config(&bad), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_diagram_overrides() {
        let mut config = DiagramsConfig {
            prefer_local: true,
            allow_simplified_fallback: true,
            network_ttl_secs: Some(5),
            ..DiagramsConfig::default()
        };
        config.mermaid.theme = Some("dark".to_owned());
        config.mermaid.endpoint = Some("https://ink.example.com/".to_owned());
        config.plantuml.servers = Some(vec!["https://uml.example.com/plantuml/".to_owned()]);
        config.plantuml.dpi = Some(200);

        let settings = diagram_settings(&config, &RenderConfig::default()).unwrap();
        assert!(settings.prefer_local);
        assert!(settings.allow_simplified_fallback);
        assert_eq!(settings.network_ttl, Duration::from_secs(5));
        assert_eq!(settings.mermaid.theme, MermaidTheme::Dark);
        assert_eq!(settings.mermaid.endpoint, "https://ink.example.com");
        assert_eq!(settings.plantuml.servers, vec!["https://uml.example.com/plantuml"]);
        assert_eq!(settings.plantuml.dpi, 200);
    }

    #[test]
    fn test_invalid_diagram_values() {
        let mut config = DiagramsConfig::default();
        config.mermaid.theme = Some("neon".to_owned());
        let err = diagram_settings(&config, &RenderConfig::default()).unwrap_err();
        assert!(err.to_string().contains("diagrams.mermaid.theme"));

        let mut config = DiagramsConfig::default();
        config.plantuml.format = Some("pdf".to_owned());
        let err = diagram_settings(&config, &RenderConfig::default()).unwrap_err();
        assert!(err.to_string().contains("diagrams.plantuml.format"));
    }
}

//! Image normalization settings.

use serde::{Deserialize, Serialize};

/// Default maximum width in pixels.
pub const DEFAULT_MAX_WIDTH: u32 = 800;

/// Default maximum height in pixels.
pub const DEFAULT_MAX_HEIGHT: u32 = 600;

/// Standard display DPI (96 = CSS reference pixel).
pub const STANDARD_DPI: u32 = 96;

/// Encoded output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Png,
    Jpeg,
}

impl OutputFormat {
    /// Parse a format name (`png`, `jpeg`, `jpg`).
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "png" => Some(Self::Png),
            "jpeg" | "jpg" => Some(Self::Jpeg),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpeg",
        }
    }

    /// File extension for cached files.
    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
        }
    }

    /// Whether the format can carry an alpha channel.
    #[must_use]
    pub fn supports_alpha(self) -> bool {
        matches!(self, Self::Png)
    }
}

/// Settings applied when an image is normalized into the cache.
///
/// Serialized field order is stable, so the JSON form doubles as the canonical
/// representation hashed into cache keys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderConfig {
    pub max_width: u32,
    pub max_height: u32,
    pub output_format: OutputFormat,
    /// JPEG quality (1-100).
    pub quality: u8,
    /// DPI written into the output file.
    pub dpi: u32,
    /// Use the slowest PNG compression.
    pub optimize: bool,
    pub preserve_aspect_ratio: bool,
    /// Maximum image width on a Word page, in inches.
    pub word_max_width_inches: f64,
    /// DPI assumed for Word page layout.
    pub word_dpi: u32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            max_width: DEFAULT_MAX_WIDTH,
            max_height: DEFAULT_MAX_HEIGHT,
            output_format: OutputFormat::Png,
            quality: 95,
            dpi: STANDARD_DPI,
            optimize: true,
            preserve_aspect_ratio: true,
            word_max_width_inches: 6.0,
            word_dpi: STANDARD_DPI,
        }
    }
}

impl RenderConfig {
    /// Settings sized for a Word page.
    ///
    /// Width is `word_max_width_inches * word_dpi` pixels, height is three
    /// quarters of that. Output is PNG at `word_dpi`.
    #[must_use]
    pub fn for_word(&self) -> Self {
        let max_width = inches_to_pixels(self.word_max_width_inches, self.word_dpi);
        let max_height = inches_to_pixels(self.word_max_width_inches * 0.75, self.word_dpi);
        Self {
            max_width,
            max_height,
            output_format: OutputFormat::Png,
            quality: 95,
            dpi: self.word_dpi,
            optimize: true,
            preserve_aspect_ratio: true,
            ..self.clone()
        }
    }

    /// Canonical JSON form used for hashing.
    #[must_use]
    pub fn canonical(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn inches_to_pixels(inches: f64, dpi: u32) -> u32 {
    (inches * f64::from(dpi)).max(1.0) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RenderConfig::default();
        assert_eq!(config.max_width, 800);
        assert_eq!(config.max_height, 600);
        assert_eq!(config.output_format, OutputFormat::Png);
        assert_eq!(config.quality, 95);
        assert_eq!(config.dpi, 96);
        assert!(config.preserve_aspect_ratio);
    }

    #[test]
    fn test_for_word() {
        let config = RenderConfig {
            word_max_width_inches: 6.0,
            word_dpi: 96,
            output_format: OutputFormat::Jpeg,
            ..RenderConfig::default()
        };
        let word = config.for_word();
        assert_eq!(word.max_width, 576);
        assert_eq!(word.max_height, 432);
        assert_eq!(word.output_format, OutputFormat::Png);
        assert_eq!(word.dpi, 96);
    }

    #[test]
    fn test_canonical_changes_with_config() {
        let a = RenderConfig::default();
        let b = RenderConfig {
            dpi: 192,
            ..RenderConfig::default()
        };
        assert_eq!(a.canonical(), RenderConfig::default().canonical());
        assert_ne!(a.canonical(), b.canonical());
        assert!(a.canonical().starts_with(r#"{"max_width":800"#));
    }

    #[test]
    fn test_output_format_parse() {
        assert_eq!(OutputFormat::parse("PNG"), Some(OutputFormat::Png));
        assert_eq!(OutputFormat::parse("jpg"), Some(OutputFormat::Jpeg));
        assert_eq!(OutputFormat::parse("gif"), None);
        assert_eq!(OutputFormat::Jpeg.extension(), "jpg");
        assert!(!OutputFormat::Jpeg.supports_alpha());
    }
}

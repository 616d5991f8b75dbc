//! Configuration management for md2doc.
//!
//! Parses `md2doc.toml` configuration files with serde and provides
//! auto-discovery of config files in parent directories. Every value is
//! optional: unset document, diagram and image keys keep the defaults of the
//! crate that consumes them.
//!
//! CLI settings can be applied during load via [`CliSettings`].
//!
//! ## Environment Variable Expansion
//!
//! String values support `${VAR}` (error if unset) and `${VAR:-default}`.
//!
//! Expanded fields:
//! - `cache.dir`
//! - `diagrams.mermaid.endpoint`
//! - `diagrams.plantuml.servers`

mod expand;

use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Configuration filename to search for.
const CONFIG_FILENAME: &str = "md2doc.toml";

/// Cache directory used when `cache.dir` is not set.
const DEFAULT_CACHE_DIR: &str = ".md2doc/cache";

const MAX_DPI: u32 = 1000;

/// CLI settings that override configuration file values.
///
/// Only `Some` values override the loaded config.
#[derive(Debug, Default)]
pub struct CliSettings {
    pub cache_enabled: Option<bool>,
    pub cache_dir: Option<PathBuf>,
    pub diagrams_enabled: Option<bool>,
    pub allow_simplified_fallback: Option<bool>,
    pub prefer_local: Option<bool>,
}

/// Application configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub document: DocumentConfig,
    pub diagrams: DiagramsConfig,
    pub images: ImagesConfig,
    /// Cache section as written (directory as a string).
    cache: CacheConfigRaw,
    pub logging: LoggingConfig,

    /// Resolved cache configuration (set after loading).
    #[serde(skip)]
    pub cache_resolved: CacheConfig,
    /// Path to the config file (set after loading).
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

/// `[document]` section.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct DocumentConfig {
    pub font_name: Option<String>,
    /// Body font size in points.
    pub font_size: Option<f32>,
    pub code_font: Option<String>,
    pub code_font_size: Option<f32>,
    /// Sizes in points for heading levels 1 through 6.
    pub heading_sizes: Option<[f32; 6]>,
    pub margin_top_cm: Option<f64>,
    pub margin_bottom_cm: Option<f64>,
    pub margin_left_cm: Option<f64>,
    pub margin_right_cm: Option<f64>,
}

/// `[diagrams]` section.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DiagramsConfig {
    /// Render diagrams; when false they are kept as code blocks.
    pub enabled: bool,
    pub prefer_local: bool,
    /// Substitute a generic diagram when rendering fails everywhere.
    pub allow_simplified_fallback: bool,
    /// Seconds a network probe result is reused.
    pub network_ttl_secs: Option<u64>,
    pub probe_timeout_secs: Option<u64>,
    pub mermaid: MermaidConfig,
    pub plantuml: PlantUmlConfig,
}

impl Default for DiagramsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            prefer_local: false,
            allow_simplified_fallback: false,
            network_ttl_secs: None,
            probe_timeout_secs: None,
            mermaid: MermaidConfig::default(),
            plantuml: PlantUmlConfig::default(),
        }
    }
}

/// `[diagrams.mermaid]` section.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct MermaidConfig {
    pub theme: Option<String>,
    pub background: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub scale: Option<f64>,
    pub format: Option<String>,
    /// Online image service base URL.
    pub endpoint: Option<String>,
    pub timeout_secs: Option<u64>,
    pub local_timeout_secs: Option<u64>,
}

/// `[diagrams.plantuml]` section.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct PlantUmlConfig {
    /// Mirror servers, tried in order.
    pub servers: Option<Vec<String>>,
    pub dpi: Option<u32>,
    pub format: Option<String>,
    pub charset: Option<String>,
    pub attempts: Option<u32>,
    pub timeout_secs: Option<u64>,
    pub local_timeout_secs: Option<u64>,
}

/// `[images]` section.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ImagesConfig {
    pub max_width: Option<u32>,
    pub max_height: Option<u32>,
    /// `png` or `jpeg`.
    pub format: Option<String>,
    pub quality: Option<u8>,
    pub dpi: Option<u32>,
    pub word_max_width_inches: Option<f64>,
    pub word_dpi: Option<u32>,
}

/// Raw cache configuration as parsed from TOML.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CacheConfigRaw {
    enabled: Option<bool>,
    dir: Option<String>,
    max_age_days: Option<u32>,
    max_size_mb: Option<u64>,
}

/// Resolved cache configuration with an absolute directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    pub enabled: bool,
    pub dir: PathBuf,
    /// Default age limit for `cache cleanup`.
    pub max_age_days: u32,
    /// Default size limit for `cache cleanup`.
    pub max_size_mb: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            dir: PathBuf::from(DEFAULT_CACHE_DIR),
            max_age_days: 30,
            max_size_mb: 500,
        }
    }
}

impl CacheConfig {
    #[must_use]
    pub fn max_size_bytes(&self) -> u64 {
        self.max_size_mb.saturating_mul(1024 * 1024)
    }
}

/// `[logging]` section.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default `tracing` filter when `RUST_LOG` is unset.
    pub level: Option<String>,
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Configuration error: {0}")]
    Validation(String),
    /// Environment variable error during expansion.
    #[error("Environment variable error in {field}: {message}")]
    EnvVar {
        /// Config field path (e.g. `cache.dir`).
        field: String,
        message: String,
    },
}

fn require_http_url(url: &str, field: &str) -> Result<(), ConfigError> {
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(ConfigError::Validation(format!(
            "{field} must start with http:// or https://"
        )));
    }
    Ok(())
}

fn require_positive<T: PartialOrd + Default>(value: Option<T>, field: &str) -> Result<(), ConfigError> {
    match value {
        Some(v) if v <= T::default() => Err(ConfigError::Validation(format!(
            "{field} must be greater than 0"
        ))),
        _ => Ok(()),
    }
}

fn require_dpi(value: Option<u32>, field: &str) -> Result<(), ConfigError> {
    match value {
        Some(dpi) if !(1..=MAX_DPI).contains(&dpi) => Err(ConfigError::Validation(format!(
            "{field} must be between 1 and {MAX_DPI}"
        ))),
        _ => Ok(()),
    }
}

impl Config {
    /// Load configuration from file with optional CLI settings.
    ///
    /// If `config_path` is provided, loads from that file. Otherwise, searches
    /// for `md2doc.toml` in the current directory and its parents, falling
    /// back to defaults.
    ///
    /// # Errors
    ///
    /// Returns error if explicit `config_path` doesn't exist, or if reading,
    /// parsing, expansion or validation fails.
    pub fn load(
        config_path: Option<&Path>,
        cli_settings: Option<&CliSettings>,
    ) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = config_path {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            Self::load_from_file(path)?
        } else if let Some(discovered) = Self::discover_config() {
            Self::load_from_file(&discovered)?
        } else {
            Self::default_with_cwd()
        };

        if let Some(settings) = cli_settings {
            config.apply_cli_settings(settings);
        }

        Ok(config)
    }

    fn apply_cli_settings(&mut self, settings: &CliSettings) {
        if let Some(enabled) = settings.cache_enabled {
            self.cache_resolved.enabled = enabled;
        }
        if let Some(dir) = &settings.cache_dir {
            self.cache_resolved.dir.clone_from(dir);
        }
        if let Some(enabled) = settings.diagrams_enabled {
            self.diagrams.enabled = enabled;
        }
        if let Some(allow) = settings.allow_simplified_fallback {
            self.diagrams.allow_simplified_fallback = allow;
        }
        if let Some(prefer_local) = settings.prefer_local {
            self.diagrams.prefer_local = prefer_local;
        }
    }

    fn discover_config() -> Option<PathBuf> {
        let mut current = std::env::current_dir().ok()?;
        loop {
            let candidate = current.join(CONFIG_FILENAME);
            if candidate.exists() {
                return Some(candidate);
            }
            if !current.pop() {
                return None;
            }
        }
    }

    fn default_with_cwd() -> Self {
        let cwd = std::env::current_dir().unwrap_or_default();
        Self::default_with_base(&cwd)
    }

    /// Default config with the cache directory under `base`.
    fn default_with_base(base: &Path) -> Self {
        Self {
            cache_resolved: CacheConfig {
                dir: base.join(DEFAULT_CACHE_DIR),
                ..CacheConfig::default()
            },
            ..Self::default()
        }
    }

    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)?;

        config.expand_env_vars()?;

        let config_dir = path.parent().unwrap_or(Path::new("."));
        config.resolve_paths(config_dir);
        config.config_path = Some(path.to_path_buf());

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values.
    ///
    /// Called automatically after loading from file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` naming the first invalid field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_document()?;
        self.validate_diagrams()?;
        self.validate_images()?;
        Ok(())
    }

    fn validate_document(&self) -> Result<(), ConfigError> {
        let doc = &self.document;
        require_positive(doc.font_size, "document.font_size")?;
        require_positive(doc.code_font_size, "document.code_font_size")?;
        if let Some(sizes) = doc.heading_sizes
            && sizes.iter().any(|s| *s <= 0.0)
        {
            return Err(ConfigError::Validation(
                "document.heading_sizes must all be greater than 0".to_owned(),
            ));
        }
        for (value, field) in [
            (doc.margin_top_cm, "document.margin_top_cm"),
            (doc.margin_bottom_cm, "document.margin_bottom_cm"),
            (doc.margin_left_cm, "document.margin_left_cm"),
            (doc.margin_right_cm, "document.margin_right_cm"),
        ] {
            if value.is_some_and(|v| v < 0.0) {
                return Err(ConfigError::Validation(format!("{field} cannot be negative")));
            }
        }
        Ok(())
    }

    fn validate_diagrams(&self) -> Result<(), ConfigError> {
        let mermaid = &self.diagrams.mermaid;
        if let Some(endpoint) = &mermaid.endpoint {
            require_http_url(endpoint, "diagrams.mermaid.endpoint")?;
        }
        require_positive(mermaid.width, "diagrams.mermaid.width")?;
        require_positive(mermaid.height, "diagrams.mermaid.height")?;
        require_positive(mermaid.scale, "diagrams.mermaid.scale")?;

        let plantuml = &self.diagrams.plantuml;
        if let Some(servers) = &plantuml.servers {
            if servers.is_empty() {
                return Err(ConfigError::Validation(
                    "diagrams.plantuml.servers cannot be empty".to_owned(),
                ));
            }
            for server in servers {
                require_http_url(server, "diagrams.plantuml.servers")?;
            }
        }
        require_dpi(plantuml.dpi, "diagrams.plantuml.dpi")?;
        require_positive(plantuml.attempts, "diagrams.plantuml.attempts")?;
        Ok(())
    }

    fn validate_images(&self) -> Result<(), ConfigError> {
        let images = &self.images;
        require_positive(images.max_width, "images.max_width")?;
        require_positive(images.max_height, "images.max_height")?;
        require_positive(images.word_max_width_inches, "images.word_max_width_inches")?;
        require_dpi(images.dpi, "images.dpi")?;
        require_dpi(images.word_dpi, "images.word_dpi")?;
        if let Some(quality) = images.quality
            && !(1..=100).contains(&quality)
        {
            return Err(ConfigError::Validation(
                "images.quality must be between 1 and 100".to_owned(),
            ));
        }
        Ok(())
    }

    fn expand_env_vars(&mut self) -> Result<(), ConfigError> {
        expand::expand_opt(&mut self.cache.dir, "cache.dir")?;
        expand::expand_opt(&mut self.diagrams.mermaid.endpoint, "diagrams.mermaid.endpoint")?;
        if let Some(servers) = &mut self.diagrams.plantuml.servers {
            for server in servers.iter_mut() {
                *server = expand::expand_env(server, "diagrams.plantuml.servers")?;
            }
        }
        Ok(())
    }

    /// Resolve the cache directory against the config file's directory.
    fn resolve_paths(&mut self, config_dir: &Path) {
        let defaults = CacheConfig::default();
        self.cache_resolved = CacheConfig {
            enabled: self.cache.enabled.unwrap_or(defaults.enabled),
            dir: config_dir.join(self.cache.dir.as_deref().unwrap_or(DEFAULT_CACHE_DIR)),
            max_age_days: self.cache.max_age_days.unwrap_or(defaults.max_age_days),
            max_size_mb: self.cache.max_size_mb.unwrap_or(defaults.max_size_mb),
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn parse(toml: &str) -> Config {
        toml::from_str(toml).unwrap()
    }

    #[test]
    fn test_default_config() {
        let config = Config::default_with_base(Path::new("/work"));
        assert!(config.diagrams.enabled);
        assert!(!config.diagrams.prefer_local);
        assert!(!config.diagrams.allow_simplified_fallback);
        assert!(config.cache_resolved.enabled);
        assert_eq!(config.cache_resolved.dir, PathBuf::from("/work/.md2doc/cache"));
        assert_eq!(config.cache_resolved.max_size_bytes(), 500 * 1024 * 1024);
        assert_eq!(config.logging.level, None);
    }

    #[test]
    fn test_parse_empty_config() {
        let config = parse("");
        assert!(config.diagrams.enabled);
        assert_eq!(config.document.font_name, None);
        assert_eq!(config.images.max_width, None);
    }

    #[test]
    fn test_parse_sections() {
        let config = parse(
            r#"
[document]
font_name = "Arial"
font_size = 11
heading_sizes = [20, 18, 16, 14, 12, 11]

[diagrams]
prefer_local = true
allow_simplified_fallback = true
network_ttl_secs = 60

[diagrams.mermaid]
theme = "forest"
background = "transparent"
endpoint = "https://mermaid.example.com"

[diagrams.plantuml]
servers = ["https://plantuml.example.com/plantuml"]
dpi = 150

[images]
format = "jpeg"
quality = 85

[logging]
level = "debug"
"#,
        );

        assert_eq!(config.document.font_name.as_deref(), Some("Arial"));
        assert_eq!(config.document.font_size, Some(11.0));
        assert_eq!(
            config.document.heading_sizes,
            Some([20.0, 18.0, 16.0, 14.0, 12.0, 11.0])
        );
        assert!(config.diagrams.prefer_local);
        assert!(config.diagrams.allow_simplified_fallback);
        assert_eq!(config.diagrams.network_ttl_secs, Some(60));
        assert_eq!(config.diagrams.mermaid.theme.as_deref(), Some("forest"));
        assert_eq!(
            config.diagrams.plantuml.servers,
            Some(vec!["https://plantuml.example.com/plantuml".to_owned()])
        );
        assert_eq!(config.diagrams.plantuml.dpi, Some(150));
        assert_eq!(config.images.format.as_deref(), Some("jpeg"));
        assert_eq!(config.images.quality, Some(85));
        assert_eq!(config.logging.level.as_deref(), Some("debug"));
        config.validate().unwrap();
    }

    #[test]
    fn test_resolve_relative_cache_dir() {
        let mut config = parse(
            r#"
[cache]
dir = "build/cache"
max_age_days = 7
"#,
        );
        config.resolve_paths(Path::new("/project"));

        assert_eq!(config.cache_resolved.dir, PathBuf::from("/project/build/cache"));
        assert_eq!(config.cache_resolved.max_age_days, 7);
        assert_eq!(config.cache_resolved.max_size_mb, 500);
        assert!(config.cache_resolved.enabled);
    }

    #[test]
    fn test_absolute_cache_dir_kept() {
        let mut config = parse("[cache]\ndir = \"/tmp/md2doc\"\nenabled = false\n");
        config.resolve_paths(Path::new("/project"));

        assert_eq!(config.cache_resolved.dir, PathBuf::from("/tmp/md2doc"));
        assert!(!config.cache_resolved.enabled);
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let cases = [
            ("[diagrams.mermaid]\nendpoint = \"ftp://x\"", "diagrams.mermaid.endpoint"),
            ("[diagrams.plantuml]\nservers = []", "diagrams.plantuml.servers"),
            ("[diagrams.plantuml]\nservers = [\"plantuml.com\"]", "diagrams.plantuml.servers"),
            ("[diagrams.plantuml]\ndpi = 0", "diagrams.plantuml.dpi"),
            ("[images]\ndpi = 5000", "images.dpi"),
            ("[images]\nquality = 0", "images.quality"),
            ("[images]\nmax_width = 0", "images.max_width"),
            ("[document]\nfont_size = 0", "document.font_size"),
            ("[document]\nmargin_left_cm = -1", "document.margin_left_cm"),
        ];

        for (toml, field) in cases {
            let err = parse(toml).validate().unwrap_err();
            assert!(
                matches!(err, ConfigError::Validation(_)),
                "expected validation error for {toml:?}, got {err:?}"
            );
            assert!(err.to_string().contains(field), "{err} should name {field}");
        }
    }

    #[test]
    fn test_apply_cli_settings() {
        let mut config = Config::default_with_base(Path::new("/work"));
        config.apply_cli_settings(&CliSettings {
            cache_enabled: Some(false),
            cache_dir: Some(PathBuf::from("/elsewhere")),
            diagrams_enabled: Some(false),
            allow_simplified_fallback: Some(true),
            prefer_local: Some(true),
        });

        assert!(!config.cache_resolved.enabled);
        assert_eq!(config.cache_resolved.dir, PathBuf::from("/elsewhere"));
        assert!(!config.diagrams.enabled);
        assert!(config.diagrams.allow_simplified_fallback);
        assert!(config.diagrams.prefer_local);
    }

    #[test]
    fn test_apply_empty_cli_settings() {
        let mut config = Config::default_with_base(Path::new("/work"));
        config.apply_cli_settings(&CliSettings::default());

        assert!(config.cache_resolved.enabled);
        assert!(config.diagrams.enabled);
        assert_eq!(config.cache_resolved.dir, PathBuf::from("/work/.md2doc/cache"));
    }

    #[test]
    fn test_load_explicit_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("md2doc.toml");
        std::fs::write(&path, "[cache]\ndir = \"cache\"\n[diagrams]\nenabled = false\n").unwrap();

        let cli = CliSettings {
            prefer_local: Some(true),
            ..Default::default()
        };
        let config = Config::load(Some(&path), Some(&cli)).unwrap();

        assert_eq!(config.config_path.as_deref(), Some(path.as_path()));
        assert_eq!(config.cache_resolved.dir, dir.path().join("cache"));
        assert!(!config.diagrams.enabled);
        assert!(config.diagrams.prefer_local);
    }

    #[test]
    fn test_load_missing_file() {
        let err = Config::load(Some(Path::new("/nonexistent/md2doc.toml")), None).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
    }

    #[test]
    fn test_load_invalid_toml() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("md2doc.toml");
        std::fs::write(&path, "[cache\n").unwrap();

        let err = Config::load(Some(&path), None).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_load_expands_env_vars() {
        // SAFETY: each test uses its own variable name
        unsafe {
            std::env::set_var("MD2DOC_TEST_LOAD_ENDPOINT", "https://ink.example.com");
        }
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("md2doc.toml");
        std::fs::write(
            &path,
            r#"
[cache]
dir = "${MD2DOC_TEST_LOAD_CACHE:-shared-cache}"

[diagrams.mermaid]
endpoint = "${MD2DOC_TEST_LOAD_ENDPOINT}"
"#,
        )
        .unwrap();

        let config = Config::load(Some(&path), None).unwrap();
        assert_eq!(
            config.diagrams.mermaid.endpoint.as_deref(),
            Some("https://ink.example.com")
        );
        assert_eq!(config.cache_resolved.dir, dir.path().join("shared-cache"));
        unsafe {
            std::env::remove_var("MD2DOC_TEST_LOAD_ENDPOINT");
        }
    }

    #[test]
    fn test_load_unset_env_var_is_error() {
        // SAFETY: each test uses its own variable name
        unsafe {
            std::env::remove_var("MD2DOC_TEST_LOAD_MISSING");
        }
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("md2doc.toml");
        std::fs::write(&path, "[cache]\ndir = \"${MD2DOC_TEST_LOAD_MISSING}\"\n").unwrap();

        let err = Config::load(Some(&path), None).unwrap_err();
        assert!(matches!(err, ConfigError::EnvVar { ref field, .. } if field == "cache.dir"));
    }
}

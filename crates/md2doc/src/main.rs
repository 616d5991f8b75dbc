//! md2doc CLI - Markdown to Word converter.
//!
//! Provides commands for:
//! - `convert`: Convert a markdown file to `.docx`
//! - `batch`: Convert every matching file in a directory
//! - `cache stats|cleanup|clear`: Manage the image cache
//! - `engines`: Report diagram engine availability

mod commands;
mod error;
mod output;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use md2doc_config::{CliSettings, Config};
use tracing_subscriber::EnvFilter;

use commands::{BatchArgs, CacheCommand, ConvertArgs, EnginesArgs};
use error::CliError;
use output::Output;

/// Default log filter when neither `--verbose`, `RUST_LOG` nor
/// `[logging] level` is set.
const DEFAULT_LOG_LEVEL: &str = "warn";

/// md2doc - Convert markdown to Word documents.
#[derive(Parser)]
#[command(name = "md2doc", version, about)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct GlobalArgs {
    /// Path to configuration file (default: auto-discover md2doc.toml).
    #[arg(short, long, global = true, env = "MD2DOC_CONFIG")]
    config: Option<PathBuf>,

    /// Enable info-level logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Use a throwaway image cache.
    #[arg(long, global = true)]
    no_cache: bool,

    /// Keep diagrams as code blocks instead of rendering them.
    #[arg(long, global = true)]
    no_diagrams: bool,

    /// Render a simplified substitute when a diagram cannot be rendered.
    #[arg(long, global = true)]
    allow_simplified_diagrams: bool,

    /// Try local renderers before online services.
    #[arg(long, global = true)]
    prefer_local: bool,
}

impl GlobalArgs {
    /// Overrides for flags that were given; absent flags keep config values.
    fn cli_settings(&self) -> CliSettings {
        CliSettings {
            cache_enabled: self.no_cache.then_some(false),
            cache_dir: None,
            diagrams_enabled: self.no_diagrams.then_some(false),
            allow_simplified_fallback: self.allow_simplified_diagrams.then_some(true),
            prefer_local: self.prefer_local.then_some(true),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a markdown file to a Word document.
    Convert(ConvertArgs),
    /// Convert all matching markdown files in a directory.
    Batch(BatchArgs),
    /// Image cache commands.
    #[command(subcommand)]
    Cache(CacheCommand),
    /// Show which diagram engines are available.
    Engines(EnginesArgs),
}

fn main() {
    let cli = Cli::parse();
    let output = Output::new();

    let config = match Config::load(cli.global.config.as_deref(), Some(&cli.global.cli_settings())) {
        Ok(config) => config,
        Err(err) => {
            output.error(&format!("Error: {err}"));
            std::process::exit(1);
        }
    };

    // --verbose wins, then RUST_LOG, then the config file level
    let filter = if cli.global.verbose {
        EnvFilter::new("info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(config.logging.level.as_deref().unwrap_or(DEFAULT_LOG_LEVEL))
        })
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Some(path) = &config.config_path {
        tracing::info!(path = %path.display(), "loaded configuration");
    }

    let result: Result<(), CliError> = match cli.command {
        Commands::Convert(args) => args.execute(&config),
        Commands::Batch(args) => args.execute(&config),
        Commands::Cache(cmd) => cmd.execute(&config),
        Commands::Engines(args) => args.execute(&config),
    };

    if let Err(err) = result {
        output.error(&format!("Error: {err}"));
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::parse_from(["md2doc", "convert", "in.md", "--no-cache", "--prefer-local"]);
        let settings = cli.global.cli_settings();

        assert_eq!(settings.cache_enabled, Some(false));
        assert_eq!(settings.prefer_local, Some(true));
        assert_eq!(settings.diagrams_enabled, None);
        assert_eq!(settings.allow_simplified_fallback, None);
    }

    #[test]
    fn test_absent_flags_keep_config() {
        let cli = Cli::parse_from(["md2doc", "engines"]);
        let settings = cli.global.cli_settings();

        assert!(settings.cache_enabled.is_none());
        assert!(settings.diagrams_enabled.is_none());
        assert!(settings.prefer_local.is_none());
    }
}

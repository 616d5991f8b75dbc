//! `md2doc cache` command implementations.

use clap::{Args, Subcommand};
use md2doc_cache::ImageCache;
use md2doc_config::Config;

use crate::error::CliError;
use crate::output::{Output, format_size};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Image cache commands.
#[derive(Subcommand)]
pub(crate) enum CacheCommand {
    /// Show cache size and age.
    Stats,
    /// Evict old entries, then least recently used entries over the size limit.
    Cleanup(CleanupArgs),
    /// Remove every cached image.
    Clear,
}

#[derive(Args)]
pub(crate) struct CleanupArgs {
    /// Remove entries not used for this many days (default: from config).
    #[arg(long)]
    max_age_days: Option<u32>,

    /// Shrink the cache below this size (default: from config).
    #[arg(long)]
    max_size_mb: Option<u64>,
}

impl CacheCommand {
    pub(crate) fn execute(self, config: &Config) -> Result<(), CliError> {
        let output = Output::new();
        let cache = ImageCache::open(&config.cache_resolved.dir)?;

        match self {
            Self::Stats => print_stats(&output, &cache),
            Self::Cleanup(args) => {
                let max_age = args.max_age_days.unwrap_or(config.cache_resolved.max_age_days);
                let max_size_mb = args.max_size_mb.unwrap_or(config.cache_resolved.max_size_mb);
                let report = cache.cleanup(max_age, max_size_mb.saturating_mul(1024 * 1024))?;
                output.success(&format!(
                    "Removed {} file(s), freed {}",
                    report.removed,
                    format_size(report.freed_bytes)
                ));
            }
            Self::Clear => {
                let removed = cache.clear()?;
                output.success(&format!("Removed {removed} cached file(s)"));
            }
        }
        Ok(())
    }
}

fn print_stats(output: &Output, cache: &ImageCache) {
    let stats = cache.stats();
    output.highlight(&format!("Cache: {}", cache.dir().display()));
    output.info(&format!("Files:  {}", stats.total_files));
    output.info(&format!("Size:   {}", format_size(stats.total_size)));
    output.info(&format!("Recent: {} (used in the last 7 days)", stats.recent_files));
    if let (Some(oldest), Some(newest)) = (stats.oldest, stats.newest) {
        output.detail(&format!(
            "Oldest: {}  Newest: {}",
            oldest.format(TIMESTAMP_FORMAT),
            newest.format(TIMESTAMP_FORMAT)
        ));
    }
}

//! `md2doc batch` command implementation.

use std::path::PathBuf;

use clap::Args;
use md2doc_config::Config;
use md2doc_core::Converter;

use super::convert::print_diagram_summary;
use crate::error::CliError;
use crate::output::Output;

/// Arguments for the batch command.
#[derive(Args)]
pub(crate) struct BatchArgs {
    /// Directory containing markdown files.
    dir: PathBuf,

    /// Glob pattern relative to the directory.
    #[arg(short, long, default_value = "*.md")]
    pattern: String,

    /// Write documents here, mirroring the directory layout
    /// (default: next to each input).
    #[arg(long)]
    out_dir: Option<PathBuf>,
}

impl BatchArgs {
    pub(crate) fn execute(self, config: &Config) -> Result<(), CliError> {
        let output = Output::new();
        let mut converter = Converter::from_config(config)?;

        let results = converter.batch_convert(&self.dir, &self.pattern, self.out_dir.as_deref())?;
        if results.is_empty() {
            output.warning(&format!(
                "No files matching '{}' in {}",
                self.pattern,
                self.dir.display()
            ));
            return Ok(());
        }

        for (input, written) in &results {
            match written {
                Some(path) => output.info(&format!("  {} -> {}", input.display(), path.display())),
                None => output.error(&format!("  {} failed", input.display())),
            }
        }

        let stats = converter.stats();
        print_diagram_summary(&output, &stats);
        if stats.files_failed > 0 {
            return Err(CliError::Validation(format!(
                "{} of {} file(s) failed to convert",
                stats.files_failed,
                results.len()
            )));
        }
        output.success(&format!("Converted {} file(s)", stats.files_converted));
        Ok(())
    }
}

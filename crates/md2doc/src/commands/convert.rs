//! `md2doc convert` command implementation.

use std::path::PathBuf;

use clap::Args;
use md2doc_config::Config;
use md2doc_core::{ConversionStats, Converter};

use crate::error::CliError;
use crate::output::Output;

/// Arguments for the convert command.
#[derive(Args)]
pub(crate) struct ConvertArgs {
    /// Path to the markdown file.
    input: PathBuf,

    /// Output path (default: input with a .docx extension).
    #[arg(short, long)]
    output: Option<PathBuf>,
}

impl ConvertArgs {
    pub(crate) fn execute(self, config: &Config) -> Result<(), CliError> {
        let output = Output::new();
        let mut converter = Converter::from_config(config)?;

        output.info(&format!("Converting {}...", self.input.display()));
        let written = converter.convert_file(&self.input, self.output.as_deref())?;

        print_diagram_summary(&output, &converter.stats());
        output.success(&format!("Wrote {}", written.display()));
        Ok(())
    }
}

/// Report diagrams that did not render cleanly.
pub(crate) fn print_diagram_summary(output: &Output, stats: &ConversionStats) {
    if stats.diagrams_rendered > 0 {
        output.detail(&format!("Diagrams rendered: {}", stats.diagrams_rendered));
    }
    if stats.diagrams_replaced > 0 {
        output.warning(&format!(
            "{} diagram(s) replaced by a simplified substitute",
            stats.diagrams_replaced
        ));
    }
    if stats.diagrams_failed > 0 {
        output.warning(&format!(
            "{} diagram(s) could not be rendered and were kept as source text",
            stats.diagrams_failed
        ));
    }
}

//! `md2doc engines` command implementation.

use clap::Args;
use md2doc_config::Config;
use md2doc_core::{diagram_settings, image_config};
use md2doc_diagrams::RenderOrchestrator;

use crate::error::CliError;
use crate::output::Output;

/// Arguments for the engines command.
#[derive(Args)]
pub(crate) struct EnginesArgs {
    /// Only list engines that can render right now.
    #[arg(long)]
    available_only: bool,
}

impl EnginesArgs {
    pub(crate) fn execute(self, config: &Config) -> Result<(), CliError> {
        let output = Output::new();
        let image = image_config(&config.images)?;
        let mut orchestrator = RenderOrchestrator::new(diagram_settings(&config.diagrams, &image)?, None);

        if orchestrator.network_available() {
            output.success("Network: rendering services reachable");
        } else {
            output.warning("Network: rendering services unreachable");
        }
        if !config.diagrams.enabled {
            output.warning("Diagram rendering is disabled in configuration");
        }

        for status in orchestrator.available_engines() {
            if self.available_only && !status.available {
                continue;
            }
            let line = format!(
                "  {:<9} {:<8} {:<7} [{}]",
                status.kind.as_str(),
                status.strategy.mode.as_str(),
                if status.available { "ready" } else { "missing" },
                status.formats.join(", ")
            );
            if status.available {
                output.info(&line);
            } else {
                output.detail(&line);
            }
        }
        Ok(())
    }
}

//! Ghostscript-backed conversion strategy.

use async_trait::async_trait;
use std::path::Path;
use tracing::debug;

use super::error::ConversionError;
use super::traits::ConversionStrategy;
use super::types::ConversionOptions;
use super::workspace::TempWorkspace;
use crate::config::ExecutionConfig;
use crate::format::Format;
use crate::locator::ToolLocator;
use crate::process::{CommandExecutor, CommandLine, CommandSpec};

/// Pairs Ghostscript is dispatched for.
pub const GHOSTSCRIPT_CONVERSIONS: &[(Format, Format)] =
    &[(Format::Ps, Format::Pdf), (Format::Eps, Format::Pdf)];

/// Converts PostScript to PDF, and PDF to EPS for the fallback chain.
pub struct GhostscriptStrategy {
    locator: ToolLocator,
    executor: CommandExecutor,
    settings: ExecutionConfig,
}

impl GhostscriptStrategy {
    pub fn new(locator: ToolLocator, executor: CommandExecutor, settings: ExecutionConfig) -> Self {
        Self {
            locator,
            executor,
            settings,
        }
    }

    pub fn locator(&self) -> &ToolLocator {
        &self.locator
    }
}

/// Output device for a pair, or `None` when Ghostscript cannot produce it.
fn device_for(from: Format, to: Format) -> Option<&'static str> {
    match (from, to) {
        (Format::Ps | Format::Eps, Format::Pdf) => Some("pdfwrite"),
        (Format::Pdf, Format::Eps) => Some("eps2write"),
        _ => None,
    }
}

fn build_args(device: &str, input: &Path, output: &Path, options: &ConversionOptions) -> Vec<String> {
    let mut args = vec![
        "-q".to_string(),
        "-dNOPAUSE".to_string(),
        "-dBATCH".to_string(),
        "-dSAFER".to_string(),
        format!("-sDEVICE={device}"),
    ];
    if options.eps_crop {
        args.push("-dEPSCrop".to_string());
    }
    args.push(format!("-sOutputFile={}", output.to_string_lossy()));
    args.push(input.to_string_lossy().to_string());
    args
}

#[async_trait]
impl ConversionStrategy for GhostscriptStrategy {
    fn name(&self) -> &str {
        "ghostscript"
    }

    fn supported_conversions(&self) -> &[(Format, Format)] {
        GHOSTSCRIPT_CONVERSIONS
    }

    fn available(&self) -> bool {
        self.locator.is_available()
    }

    async fn convert(
        &self,
        content: &[u8],
        from: Format,
        to: Format,
        options: &ConversionOptions,
    ) -> Result<Vec<u8>, ConversionError> {
        let Some(device) = device_for(from, to) else {
            return Err(ConversionError::NoStrategy {
                from,
                to,
                supported: GHOSTSCRIPT_CONVERSIONS.to_vec(),
            });
        };

        let program = self.locator.locate()?;
        let workspace = TempWorkspace::new(self.settings.temp_dir.as_deref())?;
        let input = workspace.write_input(from, content).await?;
        let output = workspace.output_path(from, to);

        let spec = CommandSpec::new(
            CommandLine::new(program).args(build_args(device, &input, &output, options)),
        )
        .timeout(self.settings.timeout())
        .grace_period(self.settings.kill_after());

        let record = self.executor.execute(&spec).await?;
        debug!(%from, %to, device, elapsed_ms = record.elapsed.as_millis() as u64, "ghostscript finished");

        workspace
            .read_output(&output, self.name(), &record.command_line)
            .await
    }
}

//! Inkscape-backed conversion strategy.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::sync::OnceCell;
use tracing::debug;

use super::capabilities::CliSyntax;
use super::error::ConversionError;
use super::traits::ConversionStrategy;
use super::types::{ConversionOptions, Dimension};
use super::workspace::TempWorkspace;
use crate::config::ExecutionConfig;
use crate::format::Format;
use crate::locator::ToolLocator;
use crate::process::{CommandExecutor, CommandLine, CommandSpec};

/// Pairs Inkscape is dispatched for.
pub const INKSCAPE_CONVERSIONS: &[(Format, Format)] = &[
    (Format::Svg, Format::Eps),
    (Format::Svg, Format::Ps),
    (Format::Svg, Format::Emf),
    (Format::Svg, Format::Pdf),
    (Format::Eps, Format::Svg),
    (Format::Eps, Format::Pdf),
    (Format::Ps, Format::Svg),
    (Format::Ps, Format::Pdf),
    (Format::Pdf, Format::Svg),
    (Format::Emf, Format::Svg),
];

/// Converts between vector formats by exporting through Inkscape.
///
/// Any format Inkscape can import may be exported to any format it can write,
/// so `convert` also serves pipeline hops such as PDF→EPS that are not
/// advertised for dispatch.
pub struct InkscapeStrategy {
    locator: ToolLocator,
    executor: CommandExecutor,
    settings: ExecutionConfig,
    syntax: OnceCell<CliSyntax>,
}

impl InkscapeStrategy {
    pub fn new(locator: ToolLocator, executor: CommandExecutor, settings: ExecutionConfig) -> Self {
        Self {
            locator,
            executor,
            settings,
            syntax: OnceCell::new(),
        }
    }

    /// Pins the CLI syntax instead of probing `--version`.
    pub fn with_syntax(self, syntax: CliSyntax) -> Self {
        let cell = OnceCell::new_with(Some(syntax));
        Self {
            syntax: cell,
            ..self
        }
    }

    pub fn locator(&self) -> &ToolLocator {
        &self.locator
    }

    async fn syntax(&self, program: &Path) -> CliSyntax {
        *self
            .syntax
            .get_or_init(|| {
                let spec = self.spec(program.to_path_buf(), vec!["--version".to_string()]);
                CliSyntax::detect(&self.executor, spec)
            })
            .await
    }

    /// Wraps arguments into a spec carrying the configured limits.
    fn spec(&self, program: PathBuf, args: Vec<String>) -> CommandSpec {
        let mut spec = CommandSpec::new(CommandLine::new(program).args(args))
            .timeout(self.settings.timeout())
            .grace_period(self.settings.kill_after());
        if self.settings.headless && !self.executor.runner().platform().is_windows() {
            spec = spec.env_remove("DISPLAY");
        }
        spec
    }

    /// Runs a `--query-width`/`--query-height` against `content`.
    pub async fn query(
        &self,
        content: &[u8],
        format: Format,
        dimension: Dimension,
    ) -> Result<u32, ConversionError> {
        let program = self.locator.locate()?;
        let syntax = self.syntax(&program).await;
        let workspace = TempWorkspace::new(self.settings.temp_dir.as_deref())?;
        let input = workspace.write_input(format, content).await?;

        let args = build_query_args(syntax, &input, format, dimension);
        let record = self.executor.execute(&self.spec(program, args)).await?;
        parse_dimension(&record.result.stdout_text(), dimension)
    }
}

#[async_trait]
impl ConversionStrategy for InkscapeStrategy {
    fn name(&self) -> &str {
        "inkscape"
    }

    fn supported_conversions(&self) -> &[(Format, Format)] {
        INKSCAPE_CONVERSIONS
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
        let program = self.locator.locate()?;
        let syntax = self.syntax(&program).await;
        let workspace = TempWorkspace::new(self.settings.temp_dir.as_deref())?;
        let input = workspace.write_input(from, content).await?;
        let output = workspace.output_path(from, to);

        let args = build_export_args(syntax, &input, &output, from, to, options);
        let record = self.executor.execute(&self.spec(program, args)).await?;
        debug!(%from, %to, elapsed_ms = record.elapsed.as_millis() as u64, "inkscape export finished");

        workspace
            .read_output(&output, self.name(), &record.command_line)
            .await
    }

    async fn query_dimension(
        &self,
        content: &[u8],
        format: Format,
        dimension: Dimension,
    ) -> Result<u32, ConversionError> {
        self.query(content, format, dimension).await
    }
}

/// Builds the export command line for the given syntax.
fn build_export_args(
    syntax: CliSyntax,
    input: &Path,
    output: &Path,
    from: Format,
    to: Format,
    options: &ConversionOptions,
) -> Vec<String> {
    let output = output.to_string_lossy();
    let mut args = Vec::new();

    match syntax {
        CliSyntax::Modern => {
            // Without an explicit page, multi-page PDF import opens a dialog.
            if from == Format::Pdf {
                args.push("--pdf-page=1".to_string());
            }
            args.push(format!("--export-type={}", to.extension()));
            args.push(format!("--export-filename={output}"));
            if to == Format::Svg && options.plain_svg {
                args.push("--export-plain-svg".to_string());
            }
        }
        CliSyntax::Legacy => {
            args.push("-z".to_string());
            if from == Format::Pdf {
                args.push("--pdf-page=1".to_string());
            }
            let flag = match to {
                // The legacy CLI only exports SVG in plain form.
                Format::Svg => "--export-plain-svg",
                Format::Eps => "--export-eps",
                Format::Ps => "--export-ps",
                Format::Pdf => "--export-pdf",
                Format::Emf => "--export-emf",
            };
            args.push(format!("{flag}={output}"));
        }
    }

    args.push(input.to_string_lossy().to_string());
    args
}

fn build_query_args(syntax: CliSyntax, input: &Path, format: Format, dimension: Dimension) -> Vec<String> {
    let mut args = Vec::new();
    if syntax == CliSyntax::Legacy {
        args.push("-z".to_string());
    }
    if format == Format::Pdf {
        args.push("--pdf-page=1".to_string());
    }
    args.push(format!("--query-{}", dimension.as_str()));
    args.push(input.to_string_lossy().to_string());
    args
}

/// Parses the first numeric line of query output, rounded to whole pixels.
fn parse_dimension(stdout: &str, dimension: Dimension) -> Result<u32, ConversionError> {
    let line = stdout
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .ok_or_else(|| ConversionError::query_failed(dimension.as_str(), "no output"))?;

    let value: f64 = line.parse().map_err(|_| {
        ConversionError::query_failed(dimension.as_str(), format!("not a number: {line:?}"))
    })?;
    if !value.is_finite() || value < 0.0 {
        return Err(ConversionError::query_failed(
            dimension.as_str(),
            format!("out of range: {value}"),
        ));
    }
    Ok(value.round() as u32)
}

//! The conversion service callers talk to.

use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

use super::bbox::BoundingBox;
use super::env_flag;
use crate::config::Config;
use crate::converter::{
    ConversionError, ConversionOptions, ConversionRequest, ConversionStrategy, Dimension,
    GhostscriptStrategy, InkscapeStrategy, StrategyRegistry,
};
use crate::format::{Document, Format};
use crate::locator::{ToolLocator, ToolSpec};
use crate::metrics;
use crate::platform::{Platform, SystemPlatform};
use crate::process::{CommandExecutor, ProcessRunner};

/// Routes that exist only as multi-hop chains, not as a single tool call.
const PIPELINE_CONVERSIONS: &[(Format, Format)] = &[
    (Format::Pdf, Format::Eps),
    (Format::Pdf, Format::Ps),
    (Format::Pdf, Format::Emf),
    (Format::Ps, Format::Eps),
    (Format::Ps, Format::Emf),
];

/// Converts documents between vector formats.
///
/// Holds the vector tool (general export), the print tool (PostScript
/// rendering) and a registry over both. Most pairs go straight to the
/// registry; PDF and PS sources take the routes below.
///
/// - PDF → T tries the vector tool directly. If the tool exits cleanly but
///   writes nothing, it retries once as PDF → EPS (print) → T (vector).
/// - PS → T always renders PS → PDF with the print tool first, then follows
///   the PDF route. The PS `%%BoundingBox`, when present, is restored on SVG
///   output.
#[derive(Clone)]
pub struct Converter {
    vector: Arc<dyn ConversionStrategy>,
    print: Arc<dyn ConversionStrategy>,
    registry: StrategyRegistry,
    defaults: ConversionOptions,
    verbose_fallback: bool,
}

impl Converter {
    /// Uses the given strategies for the vector and print tool roles.
    pub fn new(vector: Arc<dyn ConversionStrategy>, print: Arc<dyn ConversionStrategy>) -> Self {
        let registry = StrategyRegistry::new()
            .with(vector.clone())
            .with(print.clone());
        Self {
            vector,
            print,
            registry,
            defaults: ConversionOptions::default(),
            verbose_fallback: env_flag("VECCONV_DEBUG") || env_flag("CI"),
        }
    }

    /// Builds the Inkscape and Ghostscript strategies from configuration.
    pub fn from_config(config: &Config) -> Self {
        Self::with_platform(config, Arc::new(SystemPlatform))
    }

    pub fn with_platform(config: &Config, platform: Arc<dyn Platform>) -> Self {
        let executor = CommandExecutor::new(ProcessRunner::new(platform.clone()));

        let inkscape = ToolLocator::new(ToolSpec::INKSCAPE, platform.clone())
            .with_explicit_path(config.tools.inkscape.clone());
        let ghostscript = ToolLocator::new(ToolSpec::GHOSTSCRIPT, platform)
            .with_explicit_path(config.tools.ghostscript.clone());

        let vector = InkscapeStrategy::new(inkscape, executor.clone(), config.execution.clone());
        let print = GhostscriptStrategy::new(ghostscript, executor, config.execution.clone());

        Self::new(Arc::new(vector), Arc::new(print)).with_defaults(config.output.clone())
    }

    /// Configured output options, exposed through [`defaults`](Self::defaults).
    ///
    /// Conversions use exactly the options they are given; callers merge
    /// these in themselves.
    pub fn with_defaults(mut self, defaults: ConversionOptions) -> Self {
        self.defaults = defaults;
        self
    }

    /// Overrides the `VECCONV_DEBUG`/`CI` detection.
    pub fn with_verbose_fallback(mut self, verbose: bool) -> Self {
        self.verbose_fallback = verbose;
        self
    }

    pub fn defaults(&self) -> &ConversionOptions {
        &self.defaults
    }

    pub fn registry(&self) -> &StrategyRegistry {
        &self.registry
    }

    /// Whether the pair can be requested. Same-format pairs always can.
    pub fn supports(&self, from: Format, to: Format) -> bool {
        from == to || self.registry.supports(from, to) || PIPELINE_CONVERSIONS.contains(&(from, to))
    }

    /// Every requestable pair between different formats, sorted.
    pub fn supported_conversions(&self) -> Vec<(Format, Format)> {
        let mut pairs = self.registry.supported_conversions();
        pairs.extend_from_slice(PIPELINE_CONVERSIONS);
        pairs.sort();
        pairs.dedup();
        pairs
    }

    pub async fn convert(&self, request: &ConversionRequest) -> Result<Vec<u8>, ConversionError> {
        let from = request.input_format;
        let to = request.output_format;
        if from == to {
            return Ok(request.content.clone());
        }

        let result = self.route(&request.content, from, to, &request.options).await;
        let outcome = if result.is_ok() { "success" } else { "failed" };
        metrics::CONVERSIONS_TOTAL
            .with_label_values(&[from.extension(), to.extension(), outcome])
            .inc();
        if let Err(e) = &result {
            debug!(%from, %to, kind = ?e.kind(), error = %e, "conversion failed");
        }
        result
    }

    /// Converts a document into a new document of format `to`.
    pub async fn convert_document(
        &self,
        document: &Document,
        to: Format,
        options: &ConversionOptions,
    ) -> Result<Document, ConversionError> {
        let request = ConversionRequest::new(document.content(), document.format(), to)
            .with_options(options.clone());
        let content = self.convert(&request).await?;
        Ok(Document::from_bytes(to, content))
    }

    /// Converts `input` to `output`, taking both formats from the file
    /// extensions.
    pub async fn convert_file(
        &self,
        input: &Path,
        output: &Path,
        options: &ConversionOptions,
    ) -> Result<Document, ConversionError> {
        let to = Format::from_path(output).ok_or_else(|| {
            ConversionError::malformed_input(format!(
                "cannot determine format of {}",
                output.display()
            ))
        })?;
        let document = Document::from_path(input).await?;
        let converted = self.convert_document(&document, to, options).await?;
        tokio::fs::write(output, converted.content()).await?;
        Ok(converted)
    }

    pub async fn query_width(&self, content: &[u8], format: Format) -> Result<u32, ConversionError> {
        self.vector.query_dimension(content, format, Dimension::Width).await
    }

    pub async fn query_height(&self, content: &[u8], format: Format) -> Result<u32, ConversionError> {
        self.vector.query_dimension(content, format, Dimension::Height).await
    }

    async fn route(
        &self,
        content: &[u8],
        from: Format,
        to: Format,
        options: &ConversionOptions,
    ) -> Result<Vec<u8>, ConversionError> {
        match from {
            Format::Pdf => self.convert_from_pdf(content, to, options).await,
            Format::Ps => self.convert_from_ps(content, to, options).await,
            _ => self.registry.dispatch(content, from, to, options).await,
        }
    }

    /// PDF → `to` with the missing-output fallback.
    async fn convert_from_pdf(
        &self,
        content: &[u8],
        to: Format,
        options: &ConversionOptions,
    ) -> Result<Vec<u8>, ConversionError> {
        let err = match run(&self.vector, content, Format::Pdf, to, options).await {
            Ok(out) => return Ok(out),
            Err(e) if e.is_retryable() => e,
            Err(e) => return Err(e),
        };

        if self.verbose_fallback {
            warn!(%to, error = %err, "direct PDF conversion produced no output, retrying via EPS");
        } else {
            debug!(%to, error = %err, "direct PDF conversion produced no output, retrying via EPS");
        }

        let result = self.fallback_from_pdf(content, to, options).await;
        let outcome = if result.is_ok() { "success" } else { "failed" };
        metrics::FALLBACK_ATTEMPTS.with_label_values(&[outcome]).inc();
        result.map_err(ConversionError::fallback)
    }

    async fn fallback_from_pdf(
        &self,
        content: &[u8],
        to: Format,
        options: &ConversionOptions,
    ) -> Result<Vec<u8>, ConversionError> {
        let eps = run(&self.print, content, Format::Pdf, Format::Eps, options).await?;
        if to == Format::Eps {
            return Ok(eps);
        }
        run(&self.vector, &eps, Format::Eps, to, options).await
    }

    /// PS → PDF (print tool) → `to`.
    async fn convert_from_ps(
        &self,
        content: &[u8],
        to: Format,
        options: &ConversionOptions,
    ) -> Result<Vec<u8>, ConversionError> {
        let bbox = BoundingBox::parse(content);
        // Crop to the declared box so the intermediate PDF page matches it.
        let render_options = match bbox {
            Some(_) => options.clone().eps_crop(true),
            None => options.clone(),
        };

        let pdf = run(&self.print, content, Format::Ps, Format::Pdf, &render_options).await?;
        if to == Format::Pdf {
            return Ok(pdf);
        }

        let output = self.convert_from_pdf(&pdf, to, options).await?;
        match (to, bbox) {
            (Format::Svg, Some(bbox)) => {
                debug!(width = bbox.width(), height = bbox.height(), "restoring PostScript bounding box");
                Ok(bbox.apply_svg_dimensions(&output))
            }
            _ => Ok(output),
        }
    }
}

/// Runs one hop on a specific strategy, bypassing registry selection.
async fn run(
    strategy: &Arc<dyn ConversionStrategy>,
    content: &[u8],
    from: Format,
    to: Format,
    options: &ConversionOptions,
) -> Result<Vec<u8>, ConversionError> {
    debug!(strategy = strategy.name(), %from, %to, "pipeline step");
    strategy.convert(content, from, to, options).await
}

impl std::fmt::Debug for Converter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Converter")
            .field("vector", &self.vector.name())
            .field("print", &self.print.name())
            .field("defaults", &self.defaults)
            .field("verbose_fallback", &self.verbose_fallback)
            .finish()
    }
}

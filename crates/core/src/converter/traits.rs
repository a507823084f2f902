//! Trait definitions for the converter module.

use async_trait::async_trait;

use super::error::ConversionError;
use super::types::{ConversionOptions, Dimension};
use crate::format::Format;

/// A tool-backed converter.
///
/// `supported_conversions` is what the strategy advertises for registry
/// dispatch. `convert` may accept further pairs the tool can handle, which
/// the pipeline uses for intermediate hops.
#[async_trait]
pub trait ConversionStrategy: Send + Sync {
    /// Returns the name of this strategy (usually the tool name).
    fn name(&self) -> &str;

    /// Pairs this strategy advertises.
    fn supported_conversions(&self) -> &[(Format, Format)];

    fn supports(&self, from: Format, to: Format) -> bool {
        self.supported_conversions().contains(&(from, to))
    }

    /// Whether the backing tool can be located.
    fn available(&self) -> bool;

    /// Converts `content` from one format to another.
    async fn convert(
        &self,
        content: &[u8],
        from: Format,
        to: Format,
        options: &ConversionOptions,
    ) -> Result<Vec<u8>, ConversionError>;

    /// Queries a drawing's width or height in device pixels.
    async fn query_dimension(
        &self,
        _content: &[u8],
        _format: Format,
        dimension: Dimension,
    ) -> Result<u32, ConversionError> {
        Err(ConversionError::query_failed(
            dimension.as_str(),
            format!("{} does not support dimension queries", self.name()),
        ))
    }
}

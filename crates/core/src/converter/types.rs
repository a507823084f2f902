//! Types for conversion requests.

use serde::{Deserialize, Serialize};

use crate::format::Format;

/// Optional export flags.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversionOptions {
    /// Export SVG without editor-specific namespaces and metadata.
    pub plain_svg: bool,
    /// Crop PostScript input to its bounding box instead of a fixed page size.
    pub eps_crop: bool,
}

impl ConversionOptions {
    pub fn plain_svg(mut self, plain: bool) -> Self {
        self.plain_svg = plain;
        self
    }

    pub fn eps_crop(mut self, crop: bool) -> Self {
        self.eps_crop = crop;
        self
    }
}

/// A single conversion call.
#[derive(Debug, Clone)]
pub struct ConversionRequest {
    pub content: Vec<u8>,
    pub input_format: Format,
    pub output_format: Format,
    pub options: ConversionOptions,
}

impl ConversionRequest {
    pub fn new(content: impl Into<Vec<u8>>, input_format: Format, output_format: Format) -> Self {
        Self {
            content: content.into(),
            input_format,
            output_format,
            options: ConversionOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ConversionOptions) -> Self {
        self.options = options;
        self
    }
}

/// Which extent a dimension query asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dimension {
    Width,
    Height,
}

impl Dimension {
    pub fn as_str(&self) -> &'static str {
        match self {
            Dimension::Width => "width",
            Dimension::Height => "height",
        }
    }
}

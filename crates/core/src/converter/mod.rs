//! Tool-backed conversion strategies.
//!
//! Each strategy wraps one external program: [`InkscapeStrategy`] for general
//! vector conversions and [`GhostscriptStrategy`] for PostScript to PDF. A
//! [`StrategyRegistry`] picks the first available strategy for a pair.
//!
//! # Example
//!
//! ```ignore
//! use vecconv_core::converter::{ConversionOptions, ConversionStrategy, InkscapeStrategy};
//! use vecconv_core::Format;
//!
//! let pdf = strategy
//!     .convert(svg_bytes, Format::Svg, Format::Pdf, &ConversionOptions::default())
//!     .await?;
//! ```

mod capabilities;
mod error;
mod ghostscript;
mod inkscape;
mod registry;
mod traits;
mod types;
mod workspace;

pub use capabilities::CliSyntax;
pub use error::{ConversionError, ErrorKind};
pub use ghostscript::{GhostscriptStrategy, GHOSTSCRIPT_CONVERSIONS};
pub use inkscape::{InkscapeStrategy, INKSCAPE_CONVERSIONS};
pub use registry::StrategyRegistry;
pub use traits::ConversionStrategy;
pub use types::{ConversionOptions, ConversionRequest, Dimension};
pub use workspace::TempWorkspace;

//! Testing utilities and mock implementations.
//!
//! Mocks for the two seams that touch the outside world: the platform the
//! tool locator searches, and the tool-backed conversion strategies.
//!
//! # Example
//!
//! ```rust,ignore
//! use vecconv_core::testing::{MockPlatform, MockStrategy};
//!
//! let vector = Arc::new(MockStrategy::vector());
//! let print = Arc::new(MockStrategy::print());
//! let converter = Converter::new(vector.clone(), print.clone());
//! ```

mod mock_platform;
mod mock_strategy;

pub use mock_platform::MockPlatform;
pub use mock_strategy::{MockStrategy, RecordedConversion};

/// Test fixtures and helper functions.
pub mod fixtures {
    use std::path::PathBuf;

    use crate::converter::ConversionError;

    /// A minimal SVG document.
    pub const SVG: &[u8] =
        br#"<svg xmlns="http://www.w3.org/2000/svg" width="10" height="10"><rect width="10" height="10"/></svg>"#;

    /// A PostScript document with a bounding box of 100 x 200 points.
    pub const PS_WITH_BBOX: &[u8] =
        b"%!PS-Adobe-3.0\n%%BoundingBox: 0 0 100 200\nnewpath 0 0 moveto 100 200 lineto stroke\nshowpage\n%%EOF\n";

    /// A PostScript document without a bounding box comment.
    pub const PS_WITHOUT_BBOX: &[u8] = b"%!PS-Adobe-3.0\nnewpath 0 0 moveto 10 10 lineto stroke\nshowpage\n";

    /// The error a tool produces when it exits cleanly but writes nothing.
    pub fn output_missing(tool: &str) -> ConversionError {
        ConversionError::OutputMissing {
            tool: tool.to_string(),
            path: PathBuf::from("/tmp/vecconv-test/image.svg"),
            command: format!("{tool} image.pdf"),
        }
    }
}

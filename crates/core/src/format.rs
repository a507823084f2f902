//! Document formats and the byte holder that carries them through conversions.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::converter::ConversionError;

/// A vector document format understood by the conversion tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    Svg,
    Eps,
    Ps,
    Pdf,
    Emf,
}

impl Format {
    /// Every known format, in a stable order.
    pub const ALL: [Format; 5] = [
        Format::Svg,
        Format::Eps,
        Format::Ps,
        Format::Pdf,
        Format::Emf,
    ];

    /// File extension used when naming files of this format (no dot).
    pub fn extension(&self) -> &'static str {
        match self {
            Format::Svg => "svg",
            Format::Eps => "eps",
            Format::Ps => "ps",
            Format::Pdf => "pdf",
            Format::Emf => "emf",
        }
    }

    /// MIME type for the format.
    pub fn mimetype(&self) -> &'static str {
        match self {
            Format::Svg => "image/svg+xml",
            Format::Eps => "application/postscript",
            Format::Ps => "application/postscript",
            Format::Pdf => "application/pdf",
            Format::Emf => "image/emf",
        }
    }

    /// Guesses the format from a path's extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(|e| e.parse().ok())
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for Format {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().trim_start_matches('.').to_ascii_lowercase().as_str() {
            "svg" => Ok(Format::Svg),
            "eps" | "epsf" => Ok(Format::Eps),
            "ps" => Ok(Format::Ps),
            "pdf" => Ok(Format::Pdf),
            "emf" => Ok(Format::Emf),
            other => Err(ConversionError::malformed_input(format!(
                "unknown format: {other:?}"
            ))),
        }
    }
}

/// Raw document bytes tagged with their format.
///
/// The converter never interprets the content; it only moves it in and out of
/// temp files named after [`Document::default_extension`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    format: Format,
    content: Vec<u8>,
}

impl Document {
    pub fn from_bytes(format: Format, content: impl Into<Vec<u8>>) -> Self {
        Self {
            format,
            content: content.into(),
        }
    }

    /// Reads a document from disk, taking its format from the file extension.
    pub async fn from_path(path: &Path) -> Result<Self, ConversionError> {
        let format = Format::from_path(path).ok_or_else(|| {
            ConversionError::malformed_input(format!(
                "cannot determine format of {}",
                path.display()
            ))
        })?;
        let content = tokio::fs::read(path).await?;
        Ok(Self { format, content })
    }

    pub fn format(&self) -> Format {
        self.format
    }

    pub fn content(&self) -> &[u8] {
        &self.content
    }

    pub fn into_content(self) -> Vec<u8> {
        self.content
    }

    pub fn default_extension(&self) -> &'static str {
        self.format.extension()
    }

    pub fn mimetype(&self) -> &'static str {
        self.format.mimetype()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_format() {
        assert_eq!("svg".parse::<Format>().unwrap(), Format::Svg);
        assert_eq!(".PDF".parse::<Format>().unwrap(), Format::Pdf);
        assert_eq!("epsf".parse::<Format>().unwrap(), Format::Eps);
        assert!("png".parse::<Format>().is_err());
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(Format::from_path(Path::new("/a/b/image.eps")), Some(Format::Eps));
        assert_eq!(Format::from_path(Path::new("noext")), None);
    }

    #[test]
    fn test_display_matches_extension() {
        for format in Format::ALL {
            assert_eq!(format.to_string(), format.extension());
        }
    }

    #[test]
    fn test_serde_lowercase() {
        let json = serde_json::to_string(&Format::Emf).unwrap();
        assert_eq!(json, "\"emf\"");
        let parsed: Format = serde_json::from_str("\"ps\"").unwrap();
        assert_eq!(parsed, Format::Ps);
    }

    #[tokio::test]
    async fn test_document_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("drawing.svg");
        tokio::fs::write(&path, b"<svg/>").await.unwrap();

        let doc = Document::from_path(&path).await.unwrap();
        assert_eq!(doc.format(), Format::Svg);
        assert_eq!(doc.content(), b"<svg/>");
        assert_eq!(doc.mimetype(), "image/svg+xml");
    }

    #[tokio::test]
    async fn test_document_unknown_extension() {
        let err = Document::from_path(Path::new("/tmp/file.png")).await.unwrap_err();
        assert!(err.to_string().contains("cannot determine format"));
    }
}

//! Per-call temporary directories.

use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;
use tracing::debug;

use super::error::ConversionError;
use crate::format::Format;

/// Removal attempts for a workspace whose files are still held open.
const CLEANUP_ATTEMPTS: u32 = 5;
const CLEANUP_BACKOFF: Duration = Duration::from_millis(100);

/// A private directory holding one input and one output file for a single
/// conversion. Deleted when dropped, whatever the outcome of the call.
#[derive(Debug)]
pub struct TempWorkspace {
    dir: Option<TempDir>,
    path: PathBuf,
}

impl TempWorkspace {
    /// Creates a fresh directory under `base` or the system temp directory.
    pub fn new(base: Option<&Path>) -> std::io::Result<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("vecconv-");
        let dir = match base {
            Some(base) => {
                std::fs::create_dir_all(base)?;
                builder.tempdir_in(base)?
            }
            None => builder.tempdir()?,
        };
        let path = dir.path().to_path_buf();
        Ok(Self {
            dir: Some(dir),
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `image.<ext>` for the input file.
    pub fn input_path(&self, format: Format) -> PathBuf {
        self.path.join(format!("image.{}", format.extension()))
    }

    /// `image.<ext>` for the output file, disambiguated when it would
    /// collide with the input.
    pub fn output_path(&self, from: Format, to: Format) -> PathBuf {
        if from == to {
            self.path.join(format!("image.out.{}", to.extension()))
        } else {
            self.input_path(to)
        }
    }

    /// Writes the input content and returns its path.
    pub async fn write_input(
        &self,
        format: Format,
        content: &[u8],
    ) -> Result<PathBuf, ConversionError> {
        let path = self.input_path(format);
        tokio::fs::write(&path, content).await?;
        Ok(path)
    }

    /// Reads the tool's output, treating an absent or empty file as missing.
    pub async fn read_output(
        &self,
        path: &Path,
        tool: &str,
        command: &str,
    ) -> Result<Vec<u8>, ConversionError> {
        let missing = || ConversionError::OutputMissing {
            tool: tool.to_string(),
            path: path.to_path_buf(),
            command: command.to_string(),
        };

        match tokio::fs::metadata(path).await {
            Ok(meta) if meta.is_file() && meta.len() > 0 => Ok(tokio::fs::read(path).await?),
            Ok(_) => Err(missing()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(missing()),
            Err(e) => Err(e.into()),
        }
    }
}

impl Drop for TempWorkspace {
    fn drop(&mut self) {
        let Some(dir) = self.dir.take() else {
            return;
        };
        let Err(e) = dir.close() else {
            return;
        };
        debug!(path = %self.path.display(), error = %e, "temp workspace removal failed");

        // Tools that crashed or hung on Windows can keep handles open for a
        // moment after exit. The retries sleep, so keep them off async workers.
        if cfg!(windows) {
            let path = self.path.clone();
            match tokio::runtime::Handle::try_current() {
                Ok(handle) => {
                    handle.spawn_blocking(move || retry_removal(&path));
                }
                Err(_) => {
                    retry_removal(&path);
                }
            }
        }
    }
}

/// Retries removing `path`, returning whether it is gone.
fn retry_removal(path: &Path) -> bool {
    for _ in 0..CLEANUP_ATTEMPTS {
        match std::fs::remove_dir_all(path) {
            Ok(()) => return true,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return true,
            Err(_) => std::thread::sleep(CLEANUP_BACKOFF),
        }
    }
    debug!(path = %path.display(), "leaving temp workspace behind");
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_removal() {
        let parent = tempfile::tempdir().unwrap();
        let dir = parent.path().join("leftover");
        std::fs::create_dir_all(dir.join("nested")).unwrap();
        std::fs::write(dir.join("nested/image.svg"), b"<svg/>").unwrap();

        assert!(retry_removal(&dir));
        assert!(!dir.exists());
        assert!(retry_removal(&dir));
    }

    #[test]
    fn test_paths_follow_naming_convention() {
        let ws = TempWorkspace::new(None).unwrap();
        assert_eq!(ws.input_path(Format::Pdf), ws.path().join("image.pdf"));
        assert_eq!(ws.output_path(Format::Pdf, Format::Svg), ws.path().join("image.svg"));
        assert_ne!(
            ws.output_path(Format::Svg, Format::Svg),
            ws.input_path(Format::Svg)
        );
    }

    #[test]
    fn test_directory_removed_on_drop() {
        let ws = TempWorkspace::new(None).unwrap();
        let path = ws.path().to_path_buf();
        std::fs::write(ws.input_path(Format::Eps), b"%!PS").unwrap();
        assert!(path.exists());
        drop(ws);
        assert!(!path.exists());
    }

    #[test]
    fn test_custom_base_directory() {
        let base = tempfile::tempdir().unwrap();
        let nested = base.path().join("work");
        let ws = TempWorkspace::new(Some(&nested)).unwrap();
        assert!(ws.path().starts_with(&nested));
    }

    #[tokio::test]
    async fn test_read_output_missing_and_empty() {
        let ws = TempWorkspace::new(None).unwrap();
        let out = ws.output_path(Format::Pdf, Format::Svg);

        let err = ws.read_output(&out, "inkscape", "inkscape x").await.unwrap_err();
        assert!(err.is_retryable());

        tokio::fs::write(&out, b"").await.unwrap();
        let err = ws.read_output(&out, "inkscape", "inkscape x").await.unwrap_err();
        assert!(err.is_retryable());

        tokio::fs::write(&out, b"<svg/>").await.unwrap();
        assert_eq!(ws.read_output(&out, "inkscape", "x").await.unwrap(), b"<svg/>");
    }

    #[tokio::test]
    async fn test_removed_when_call_fails() {
        async fn failing(ws: &TempWorkspace) -> Result<(), ConversionError> {
            ws.write_input(Format::Svg, b"<svg/>").await?;
            Err(ConversionError::malformed_input("boom"))
        }

        let ws = TempWorkspace::new(None).unwrap();
        let path = ws.path().to_path_buf();
        let result = failing(&ws).await;
        drop(ws);
        assert!(result.is_err());
        assert!(!path.exists());
    }
}

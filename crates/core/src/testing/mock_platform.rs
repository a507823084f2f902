//! Mock platform for testing.

use std::path::{Path, PathBuf};

use crate::platform::Platform;

/// A [`Platform`] with a caller-supplied search path and install roots.
///
/// Executability is "is a regular file", so tests can lay out fake tool
/// binaries with plain `fs::write` on any host.
#[derive(Debug, Clone)]
pub struct MockPlatform {
    windows: bool,
    path: Vec<PathBuf>,
    extensions: Vec<String>,
    roots: Vec<PathBuf>,
}

impl MockPlatform {
    /// A Unix-like platform searching `path` with bare names only.
    pub fn unix(path: Vec<PathBuf>) -> Self {
        Self {
            windows: false,
            path,
            extensions: vec![String::new()],
            roots: Vec::new(),
        }
    }

    /// A Windows-like platform with the default PATHEXT and the given
    /// installer roots.
    pub fn windows(path: Vec<PathBuf>, roots: Vec<PathBuf>) -> Self {
        Self {
            windows: true,
            path,
            extensions: ["", ".exe", ".com", ".bat", ".cmd"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            roots,
        }
    }

    /// Replaces the executable extensions.
    pub fn with_extensions(mut self, extensions: &[&str]) -> Self {
        self.extensions = extensions.iter().map(|s| s.to_string()).collect();
        self
    }
}

impl Platform for MockPlatform {
    fn is_windows(&self) -> bool {
        self.windows
    }

    fn path_entries(&self) -> Vec<PathBuf> {
        self.path.clone()
    }

    fn executable_extensions(&self) -> Vec<String> {
        self.extensions.clone()
    }

    fn install_roots(&self) -> Vec<PathBuf> {
        self.roots.clone()
    }

    fn is_executable(&self, path: &Path) -> bool {
        path.is_file()
    }
}

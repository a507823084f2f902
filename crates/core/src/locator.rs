//! Finding external tools on disk.
//!
//! A [`ToolLocator`] searches the executable path (and, on Windows, the
//! versioned directories graphical installers create) for one tool, then
//! caches the result for the life of the locator. Failures are not cached so
//! a tool installed later is picked up on the next call.

use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};
use thiserror::Error;
use tracing::debug;

use crate::platform::Platform;

/// A directory layout created by a tool's installer, relative to an install
/// root such as `C:\Program Files`.
#[derive(Debug, Clone, Copy)]
pub struct InstallDir {
    /// Directory under the root that holds the versioned directories ("" for none).
    pub parent: &'static str,
    /// Prefix of the versioned directory name, e.g. `gs` for `gs10.02.1`.
    pub prefix: &'static str,
    /// Subdirectories of the versioned directory that may hold the binary.
    pub bin_dirs: &'static [&'static str],
}

/// Static description of an external tool.
#[derive(Debug, Clone, Copy)]
pub struct ToolSpec {
    pub name: &'static str,
    pub unix_candidates: &'static [&'static str],
    pub windows_candidates: &'static [&'static str],
    pub install_dirs: &'static [InstallDir],
}

impl ToolSpec {
    pub const INKSCAPE: ToolSpec = ToolSpec {
        name: "inkscape",
        unix_candidates: &["inkscape"],
        windows_candidates: &["inkscape", "inkscape.com"],
        install_dirs: &[InstallDir {
            parent: "",
            prefix: "Inkscape",
            bin_dirs: &["bin", ""],
        }],
    };

    pub const GHOSTSCRIPT: ToolSpec = ToolSpec {
        name: "ghostscript",
        unix_candidates: &["gs"],
        windows_candidates: &["gswin64c", "gswin32c", "gs"],
        install_dirs: &[InstallDir {
            parent: "gs",
            prefix: "gs",
            bin_dirs: &["bin"],
        }],
    };

    fn candidates(&self, windows: bool) -> &'static [&'static str] {
        if windows {
            self.windows_candidates
        } else {
            self.unix_candidates
        }
    }
}

#[derive(Debug, Error)]
pub enum LocatorError {
    #[error("{tool} not found (searched {} locations); install it or set an explicit path", .searched.len())]
    ToolNotFound { tool: String, searched: Vec<PathBuf> },
}

/// Resolves and caches the path of one external tool.
#[derive(Debug)]
pub struct ToolLocator {
    spec: ToolSpec,
    platform: Arc<dyn Platform>,
    explicit: Option<PathBuf>,
    cached: RwLock<Option<PathBuf>>,
}

impl ToolLocator {
    pub fn new(spec: ToolSpec, platform: Arc<dyn Platform>) -> Self {
        Self {
            spec,
            platform,
            explicit: None,
            cached: RwLock::new(None),
        }
    }

    /// Uses a configured path (or bare program name) instead of searching.
    pub fn with_explicit_path(mut self, path: Option<PathBuf>) -> Self {
        self.explicit = path;
        self
    }

    pub fn tool_name(&self) -> &'static str {
        self.spec.name
    }

    /// Returns the tool's path, searching on the first call.
    ///
    /// Concurrent first calls may both search; whichever stores first wins
    /// and every caller gets that path.
    pub fn locate(&self) -> Result<PathBuf, LocatorError> {
        if let Some(path) = self.cached() {
            return Ok(path);
        }

        let found = self.search()?;
        let mut slot = self.cached.write().unwrap_or_else(PoisonError::into_inner);
        let path = slot.get_or_insert(found).clone();
        debug!(tool = self.spec.name, path = %path.display(), "resolved tool");
        Ok(path)
    }

    pub fn is_available(&self) -> bool {
        self.locate().is_ok()
    }

    /// The cached path, if one was resolved.
    pub fn cached(&self) -> Option<PathBuf> {
        self.cached
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Forgets the cached path.
    pub fn reset(&self) {
        *self.cached.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    fn search(&self) -> Result<PathBuf, LocatorError> {
        let mut searched = Vec::new();

        if let Some(explicit) = &self.explicit {
            if self.platform.is_executable(explicit) {
                return Ok(explicit.clone());
            }
            searched.push(explicit.clone());
            let bare = explicit.components().count() == 1;
            if bare {
                if let Some(name) = explicit.to_str() {
                    if let Some(path) = self.search_path(&[name], &mut searched) {
                        return Ok(path);
                    }
                }
            }
            return Err(self.not_found(searched));
        }

        let windows = self.platform.is_windows();
        if windows {
            if let Some(path) = self.search_install_dirs(&mut searched) {
                return Ok(path);
            }
        }
        if let Some(path) = self.search_path(self.spec.candidates(windows), &mut searched) {
            return Ok(path);
        }

        Err(self.not_found(searched))
    }

    fn search_path(&self, candidates: &[&str], searched: &mut Vec<PathBuf>) -> Option<PathBuf> {
        let extensions = self.platform.executable_extensions();
        for dir in self.platform.path_entries() {
            if let Some(found) = self.probe_dir(&dir, candidates, &extensions) {
                return Some(found);
            }
            searched.push(dir);
        }
        None
    }

    /// Checks versioned install directories, highest version first.
    fn search_install_dirs(&self, searched: &mut Vec<PathBuf>) -> Option<PathBuf> {
        let extensions = self.platform.executable_extensions();
        let candidates = self.spec.candidates(true);

        for root in self.platform.install_roots() {
            for layout in self.spec.install_dirs {
                let parent = if layout.parent.is_empty() {
                    root.clone()
                } else {
                    root.join(layout.parent)
                };
                for versioned in versioned_dirs(&parent, layout.prefix) {
                    for bin in layout.bin_dirs {
                        let dir = if bin.is_empty() {
                            versioned.clone()
                        } else {
                            versioned.join(bin)
                        };
                        if let Some(found) = self.probe_dir(&dir, candidates, &extensions) {
                            return Some(found);
                        }
                        searched.push(dir);
                    }
                }
            }
        }
        None
    }

    fn probe_dir(&self, dir: &Path, candidates: &[&str], extensions: &[String]) -> Option<PathBuf> {
        candidates.iter().find_map(|name| {
            extensions
                .iter()
                .map(|ext| dir.join(format!("{name}{ext}")))
                .find(|path| self.platform.is_executable(path))
        })
    }

    fn not_found(&self, searched: Vec<PathBuf>) -> LocatorError {
        debug!(tool = self.spec.name, searched = searched.len(), "tool not found");
        LocatorError::ToolNotFound {
            tool: self.spec.name.to_string(),
            searched,
        }
    }
}

/// Lists subdirectories of `parent` whose names start with `prefix`,
/// sorted by the version that follows the prefix, highest first.
fn versioned_dirs(parent: &Path, prefix: &str) -> Vec<PathBuf> {
    let Ok(entries) = std::fs::read_dir(parent) else {
        return Vec::new();
    };
    let prefix = prefix.to_ascii_lowercase();

    let mut dirs: Vec<(Vec<u32>, PathBuf)> = entries
        .filter_map(Result::ok)
        .filter(|e| e.path().is_dir())
        .filter_map(|e| {
            let name = e.file_name().to_string_lossy().to_ascii_lowercase();
            let suffix = name.strip_prefix(&prefix)?;
            Some((parse_version(suffix), e.path()))
        })
        .collect();
    dirs.sort_by(|a, b| b.0.cmp(&a.0));
    dirs.into_iter().map(|(_, path)| path).collect()
}

/// Parses the leading dotted number in `s` (e.g. " 1.2.2" → [1, 2, 2]).
pub(crate) fn parse_version(s: &str) -> Vec<u32> {
    let start = s.find(|c: char| c.is_ascii_digit()).unwrap_or(s.len());
    s[start..]
        .split('.')
        .map_while(|part| {
            let digits: String = part.chars().take_while(char::is_ascii_digit).collect();
            digits.parse().ok()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockPlatform;
    use std::fs;

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"").unwrap();
    }

    #[test]
    fn test_parse_version() {
        assert_eq!(parse_version("10.02.1"), vec![10, 2, 1]);
        assert_eq!(parse_version(" 1.2"), vec![1, 2]);
        assert_eq!(parse_version("Inkscape 0.92.4 (5da689c313, 2019-01-14)"), vec![0, 92, 4]);
        assert!(parse_version("").is_empty());
    }

    #[test]
    fn test_missing_tool_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let platform = Arc::new(MockPlatform::unix(vec![dir.path().to_path_buf()]));
        let locator = ToolLocator::new(ToolSpec::INKSCAPE, platform);

        let err = locator.locate().unwrap_err();
        assert!(matches!(err, LocatorError::ToolNotFound { ref tool, .. } if tool == "inkscape"));
        assert!(!locator.is_available());
    }

    #[test]
    fn test_found_path_is_cached() {
        let dir = tempfile::tempdir().unwrap();
        let tool = dir.path().join("gs");
        touch(&tool);
        let platform = Arc::new(MockPlatform::unix(vec![dir.path().to_path_buf()]));
        let locator = ToolLocator::new(ToolSpec::GHOSTSCRIPT, platform);

        let first = locator.locate().unwrap();
        let second = locator.locate().unwrap();
        assert_eq!(first, tool);
        assert_eq!(first, second);

        // Still served from cache after the file disappears.
        fs::remove_file(&tool).unwrap();
        assert_eq!(locator.locate().unwrap(), tool);

        locator.reset();
        assert!(locator.locate().is_err());
    }

    #[test]
    fn test_failure_is_not_cached() {
        let dir = tempfile::tempdir().unwrap();
        let platform = Arc::new(MockPlatform::unix(vec![dir.path().to_path_buf()]));
        let locator = ToolLocator::new(ToolSpec::INKSCAPE, platform);

        assert!(locator.locate().is_err());
        touch(&dir.path().join("inkscape"));
        assert!(locator.locate().is_ok());
    }

    #[test]
    fn test_path_order_wins() {
        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();
        touch(&first.path().join("inkscape"));
        touch(&second.path().join("inkscape"));
        let platform = Arc::new(MockPlatform::unix(vec![
            first.path().to_path_buf(),
            second.path().to_path_buf(),
        ]));

        let locator = ToolLocator::new(ToolSpec::INKSCAPE, platform);
        assert_eq!(locator.locate().unwrap(), first.path().join("inkscape"));
    }

    #[test]
    fn test_windows_extension_search() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("gswin32c.exe"));
        let platform = Arc::new(MockPlatform::windows(
            vec![dir.path().to_path_buf()],
            Vec::new(),
        ));

        let locator = ToolLocator::new(ToolSpec::GHOSTSCRIPT, platform);
        assert_eq!(locator.locate().unwrap(), dir.path().join("gswin32c.exe"));
    }

    #[test]
    fn test_windows_prefers_highest_installed_version() {
        let root = tempfile::tempdir().unwrap();
        let old = root.path().join("gs").join("gs9.56.1").join("bin").join("gswin64c.exe");
        let new = root.path().join("gs").join("gs10.02.1").join("bin").join("gswin64c.exe");
        touch(&old);
        touch(&new);
        let path_dir = tempfile::tempdir().unwrap();
        touch(&path_dir.path().join("gs.exe"));

        let platform = Arc::new(MockPlatform::windows(
            vec![path_dir.path().to_path_buf()],
            vec![root.path().to_path_buf()],
        ));
        let locator = ToolLocator::new(ToolSpec::GHOSTSCRIPT, platform);
        assert_eq!(locator.locate().unwrap(), new);
    }

    #[test]
    fn test_windows_inkscape_install_dir() {
        let root = tempfile::tempdir().unwrap();
        let exe = root.path().join("Inkscape").join("bin").join("inkscape.exe");
        touch(&exe);

        let platform = Arc::new(MockPlatform::windows(Vec::new(), vec![root.path().to_path_buf()]));
        let locator = ToolLocator::new(ToolSpec::INKSCAPE, platform);
        assert_eq!(locator.locate().unwrap(), exe);
    }

    #[test]
    fn test_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let custom = dir.path().join("custom-inkscape");
        touch(&custom);
        let platform = Arc::new(MockPlatform::unix(Vec::new()));

        let locator = ToolLocator::new(ToolSpec::INKSCAPE, platform.clone())
            .with_explicit_path(Some(custom.clone()));
        assert_eq!(locator.locate().unwrap(), custom);

        let missing = ToolLocator::new(ToolSpec::INKSCAPE, platform)
            .with_explicit_path(Some(dir.path().join("nope")));
        assert!(missing.locate().is_err());
    }

    #[test]
    fn test_explicit_bare_name_searches_path() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("inkscape-1.3"));
        let platform = Arc::new(MockPlatform::unix(vec![dir.path().to_path_buf()]));

        let locator = ToolLocator::new(ToolSpec::INKSCAPE, platform)
            .with_explicit_path(Some(PathBuf::from("inkscape-1.3")));
        assert_eq!(locator.locate().unwrap(), dir.path().join("inkscape-1.3"));
    }

    #[test]
    fn test_concurrent_resolution_agrees() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("gs"));
        let platform = Arc::new(MockPlatform::unix(vec![dir.path().to_path_buf()]));
        let locator = Arc::new(ToolLocator::new(ToolSpec::GHOSTSCRIPT, platform));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let locator = Arc::clone(&locator);
                std::thread::spawn(move || locator.locate().unwrap())
            })
            .collect();
        let paths: Vec<PathBuf> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(paths.iter().all(|p| p == &paths[0]));
        assert_eq!(locator.cached(), Some(paths[0].clone()));
    }
}

//! Platform capabilities used by the tool locator and process runner.
//!
//! All OS-conditional behaviour lives behind [`Platform`] so the locator and
//! runner can be exercised against a fake filesystem layout in tests.

use std::fmt::Debug;
use std::path::{Path, PathBuf};

/// Default PATHEXT on Windows when the variable is unset.
const DEFAULT_PATHEXT: &str = ".COM;.EXE;.BAT;.CMD";

/// Platform-specific facts needed to find and launch external tools.
pub trait Platform: Send + Sync + Debug {
    /// Whether this is the Windows family (graphical installers, PATHEXT, no SIGTERM).
    fn is_windows(&self) -> bool;

    /// Directories listed in the executable search path, in order.
    fn path_entries(&self) -> Vec<PathBuf>;

    /// Extensions appended to candidate names when searching (empty string
    /// means the bare name).
    fn executable_extensions(&self) -> Vec<String>;

    /// Base directories that graphical installers drop tools into
    /// (e.g. `C:\Program Files`). Empty outside Windows.
    fn install_roots(&self) -> Vec<PathBuf>;

    /// Whether `path` names something that can be executed.
    fn is_executable(&self, path: &Path) -> bool;

    /// Quotes a single argument for display or for a shell command string.
    fn quote_arg(&self, arg: &str) -> String {
        if self.is_windows() {
            quote_windows(arg)
        } else {
            quote_posix(arg)
        }
    }
}

/// The platform the process is actually running on.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemPlatform;

impl Platform for SystemPlatform {
    fn is_windows(&self) -> bool {
        cfg!(windows)
    }

    fn path_entries(&self) -> Vec<PathBuf> {
        std::env::var_os("PATH")
            .map(|p| std::env::split_paths(&p).collect())
            .unwrap_or_default()
    }

    fn executable_extensions(&self) -> Vec<String> {
        if !self.is_windows() {
            return vec![String::new()];
        }
        let pathext = std::env::var("PATHEXT").unwrap_or_else(|_| DEFAULT_PATHEXT.to_string());
        parse_pathext(&pathext)
    }

    fn install_roots(&self) -> Vec<PathBuf> {
        if !self.is_windows() {
            return Vec::new();
        }
        let mut roots: Vec<PathBuf> = ["ProgramW6432", "ProgramFiles", "ProgramFiles(x86)"]
            .iter()
            .filter_map(|var| std::env::var_os(var).map(PathBuf::from))
            .collect();
        if roots.is_empty() {
            roots.push(PathBuf::from(r"C:\Program Files"));
        }
        roots.dedup();
        roots
    }

    fn is_executable(&self, path: &Path) -> bool {
        let Ok(meta) = std::fs::metadata(path) else {
            return false;
        };
        if !meta.is_file() {
            return false;
        }
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            meta.permissions().mode() & 0o111 != 0
        }
        #[cfg(not(unix))]
        {
            true
        }
    }
}

/// Splits a PATHEXT value. The bare name is always tried first.
pub fn parse_pathext(value: &str) -> Vec<String> {
    let mut exts = vec![String::new()];
    exts.extend(
        value
            .split(';')
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .map(str::to_ascii_lowercase),
    );
    exts
}

fn quote_posix(arg: &str) -> String {
    let safe = !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./=:,+@%".contains(c));
    if safe {
        arg.to_string()
    } else {
        format!("'{}'", arg.replace('\'', r"'\''"))
    }
}

fn quote_windows(arg: &str) -> String {
    let safe = !arg.is_empty() && !arg.chars().any(|c| c.is_whitespace() || c == '"');
    if safe {
        arg.to_string()
    } else {
        format!("\"{}\"", arg.replace('"', "\\\""))
    }
}

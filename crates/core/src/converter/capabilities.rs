//! Command-line syntax detection for the vector tool.
//!
//! Inkscape 1.0 replaced the `--export-<type>=<file>` family of flags with
//! `--export-filename`. The version banner decides which form to emit.

use std::time::Duration;
use tracing::debug;

use crate::locator::parse_version;
use crate::process::{CommandExecutor, CommandSpec};

/// How long the version probe may take.
const VERSION_PROBE_TIMEOUT: Duration = Duration::from_secs(30);

/// Which flag dialect the installed tool understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CliSyntax {
    /// 0.x: `-z`, `--export-pdf=<file>`, `--export-plain-svg=<file>`.
    Legacy,
    /// 1.x and later: `--export-filename=<file>`.
    #[default]
    Modern,
}

impl CliSyntax {
    /// Interprets a `--version` banner such as `Inkscape 1.2.2 (b0a8486541, 2022-12-01)`.
    ///
    /// Anything without a recognisable major version is assumed modern.
    pub fn from_version_output(output: &str) -> Self {
        let line = output
            .lines()
            .find(|l| l.to_ascii_lowercase().contains("inkscape"))
            .unwrap_or(output);
        match parse_version(line).first() {
            Some(0) => Self::Legacy,
            _ => Self::Modern,
        }
    }

    /// Runs the `--version` invocation in `spec` and interprets the banner.
    ///
    /// The caller builds `spec` so the probe gets the same environment as
    /// real conversions; its timeout is capped at 30 seconds.
    pub async fn detect(executor: &CommandExecutor, spec: CommandSpec) -> Self {
        let limit = spec
            .options
            .timeout
            .map_or(VERSION_PROBE_TIMEOUT, |t| t.min(VERSION_PROBE_TIMEOUT));
        let spec = spec.timeout(limit);
        let program = spec.command.program();

        match executor.execute(&spec).await {
            Ok(record) => {
                // Some builds print the banner on stderr.
                let mut banner = record.result.stdout_text();
                banner.push('\n');
                banner.push_str(&record.result.stderr_text());
                let syntax = Self::from_version_output(&banner);
                debug!(%program, ?syntax, "detected CLI syntax");
                syntax
            }
            Err(e) => {
                debug!(%program, error = %e, "version probe failed, assuming modern syntax");
                Self::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_modern_banner() {
        assert_eq!(
            CliSyntax::from_version_output("Inkscape 1.3.2 (091e20e, 2023-11-25)"),
            CliSyntax::Modern
        );
    }

    #[test]
    fn test_legacy_banner() {
        assert_eq!(
            CliSyntax::from_version_output("Inkscape 0.92.4 (5da689c313, 2019-01-14)"),
            CliSyntax::Legacy
        );
    }

    #[test]
    fn test_banner_with_noise_lines() {
        let output = "Gtk-Message: 10:00:00.000: Failed to load module\nInkscape 0.92.5\n";
        assert_eq!(CliSyntax::from_version_output(output), CliSyntax::Legacy);
    }

    #[test]
    fn test_unparseable_is_modern() {
        assert_eq!(CliSyntax::from_version_output("garbage"), CliSyntax::Modern);
        assert_eq!(CliSyntax::from_version_output(""), CliSyntax::Modern);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_detect_from_script() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("fake-inkscape");
        std::fs::write(&script, "#!/bin/sh\necho 'Inkscape 0.92.3 (2405546, 2018-03-11)'\n").unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let spec = CommandSpec::new(crate::process::CommandLine::new(script.clone()).arg("--version"))
            .timeout(Duration::from_secs(10));
        let syntax = CliSyntax::detect(&CommandExecutor::default(), spec).await;
        assert_eq!(syntax, CliSyntax::Legacy);
    }
}

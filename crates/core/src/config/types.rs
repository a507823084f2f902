use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::converter::ConversionOptions;

/// Root configuration. Every section is optional.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub execution: ExecutionConfig,
    #[serde(default)]
    pub tools: ToolsConfig,
    /// Default export flags, overridable per call.
    #[serde(default)]
    pub output: ConversionOptions,
}

/// Limits applied to every external tool invocation.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ExecutionConfig {
    /// Watchdog timeout per invocation.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Grace period between the termination signal and a forced kill.
    #[serde(default = "default_kill_after_secs")]
    pub kill_after_secs: u64,
    /// Clear `DISPLAY` for the vector tool so it never opens a window.
    #[serde(default = "default_headless")]
    pub headless: bool,
    /// Parent directory for per-call workspaces (system temp dir when unset).
    #[serde(default)]
    pub temp_dir: Option<PathBuf>,
}

impl ExecutionConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn kill_after(&self) -> Duration {
        Duration::from_secs(self.kill_after_secs)
    }
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            kill_after_secs: default_kill_after_secs(),
            headless: default_headless(),
            temp_dir: None,
        }
    }
}

fn default_timeout_secs() -> u64 {
    120
}

fn default_kill_after_secs() -> u64 {
    5
}

fn default_headless() -> bool {
    true
}

/// Explicit tool locations. Unset tools are searched for.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ToolsConfig {
    #[serde(default)]
    pub inkscape: Option<PathBuf>,
    #[serde(default)]
    pub ghostscript: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.execution.timeout_secs, 120);
        assert_eq!(config.execution.kill_after(), Duration::from_secs(5));
        assert!(config.execution.headless);
        assert!(config.tools.inkscape.is_none());
        assert_eq!(config.output, ConversionOptions::default());
    }

    #[test]
    fn test_full_config() {
        let toml = r#"
[execution]
timeout_secs = 30
kill_after_secs = 2
headless = false
temp_dir = "/var/tmp/vecconv"

[tools]
inkscape = "/opt/inkscape/bin/inkscape"

[output]
plain_svg = true
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.execution.timeout(), Duration::from_secs(30));
        assert!(!config.execution.headless);
        assert_eq!(
            config.execution.temp_dir.as_deref(),
            Some(std::path::Path::new("/var/tmp/vecconv"))
        );
        assert_eq!(
            config.tools.inkscape,
            Some(PathBuf::from("/opt/inkscape/bin/inkscape"))
        );
        assert!(config.tools.ghostscript.is_none());
        assert!(config.output.plain_svg);
        assert!(!config.output.eps_crop);
    }

    #[test]
    fn test_serializes_to_json() {
        let json = serde_json::to_value(Config::default()).unwrap();
        assert_eq!(json["execution"]["timeout_secs"], 120);
        assert_eq!(json["output"]["plain_svg"], false);
    }
}

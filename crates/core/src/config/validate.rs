use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Timeout is not 0
/// - Explicit tool paths are not empty
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.execution.timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "execution.timeout_secs cannot be 0".to_string(),
        ));
    }

    let tools = [
        ("tools.inkscape", &config.tools.inkscape),
        ("tools.ghostscript", &config.tools.ghostscript),
    ];
    for (key, path) in tools {
        if path.as_ref().is_some_and(|p| p.as_os_str().is_empty()) {
            return Err(ConfigError::ValidationError(format!("{key} cannot be empty")));
        }
    }

    Ok(())
}

//! Multi-hop conversion routes and the missing-output fallback.

mod bbox;
mod converter;

pub use bbox::BoundingBox;
pub use converter::Converter;

/// Whether an environment variable is set to a truthy value
/// (`1`, `true`, `yes`, `on`, any case).
pub fn env_flag(name: &str) -> bool {
    std::env::var(name)
        .map(|v| is_truthy(&v))
        .unwrap_or(false)
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truthy_values() {
        for v in ["1", "true", "TRUE", "Yes", " on "] {
            assert!(is_truthy(v), "{v}");
        }
        for v in ["", "0", "false", "off", "no", "2"] {
            assert!(!is_truthy(v), "{v}");
        }
    }

    #[test]
    fn test_unset_variable_is_false() {
        assert!(!env_flag("VECCONV_TEST_FLAG_THAT_IS_NEVER_SET"));
    }
}

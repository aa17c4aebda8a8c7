//! CLI configuration loading.

use anyhow::{Context, Result};

use swr_core::CoordinatorConfig;

/// Load coordinator configuration from a TOML file, or defaults when no
/// path is given.
pub fn load(path: Option<&str>) -> Result<CoordinatorConfig> {
    match path {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read config file: {path}"))?;
            toml::from_str(&text).with_context(|| format!("invalid config file: {path}"))
        }
        None => Ok(CoordinatorConfig::default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_path_uses_defaults() {
        let config = load(None).unwrap();
        assert_eq!(config.control_param, "force_refresh");
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: CoordinatorConfig =
            toml::from_str("workers = 2\ncontrol_param = \"refresh\"\n").unwrap();
        assert_eq!(config.workers, 2);
        assert_eq!(config.control_param, "refresh");
        assert_eq!(config.queue_depth, 64);
    }
}

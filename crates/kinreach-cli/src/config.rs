//! Settings file for the `kinreach` binary.
//!
//! ```toml
//! [logging]
//! level = "info"
//! json_format = false
//!
//! [engine]
//! cache_filename = "arm.cache"
//! cache_timeout = 60.0
//! ik_timeout = 5.0
//!
//! [engine.cache]
//! workspace_size = [2.0, 2.0, 2.0]
//! resolution = [0.01, 0.01, 0.01]
//! ```

use std::path::Path;

use anyhow::{Context, Result};
use kinreach::EngineConfig;
use serde::{Deserialize, Serialize};

fn default_log_level() -> String {
    "info".to_string()
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Filter directive (trace, debug, info, warn, error). `RUST_LOG` wins.
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json_format: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json_format: false,
        }
    }
}

/// Everything read from `--config`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingSettings,
    /// Engine configuration.
    #[serde(default)]
    pub engine: EngineConfig,
}

impl Settings {
    /// Read settings from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading settings {}", path.display()))?;
        toml::from_str(&text).with_context(|| format!("parsing settings {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_settings_use_defaults() {
        let settings: Settings = toml::from_str("").unwrap();
        assert_eq!(settings.logging.level, "info");
        assert!(!settings.logging.json_format);
        assert!(settings.engine.cache_filename.is_none());
    }

    #[test]
    fn test_sections() {
        let text = r#"
            [logging]
            level = "debug"
            json_format = true

            [engine]
            cache_filename = "arm.cache"
            ik_timeout = 0.5
        "#;
        let settings: Settings = toml::from_str(text).unwrap();
        assert_eq!(settings.logging.level, "debug");
        assert!(settings.logging.json_format);
        assert_eq!(settings.engine.ik_timeout, 0.5);
        assert_eq!(settings.engine.cache_timeout, 60.0);
    }
}

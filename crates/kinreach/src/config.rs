//! Engine settings.

use std::path::{Path, PathBuf};
use std::time::Duration;

use kinreach_cache::CacheOptions;
use serde::{Deserialize, Serialize};

use crate::visualize::MarkerStyle;
use crate::{ReachError, Result};

fn default_cache_timeout() -> f64 {
    60.0
}

fn default_ik_timeout() -> f64 {
    5.0
}

/// Settings of a [`crate::ReachabilityEngine`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// File the IK solution cache is read from and written to. Required.
    #[serde(default)]
    pub cache_filename: Option<PathBuf>,
    /// Seconds spent sampling when a cache has to be generated.
    #[serde(default = "default_cache_timeout")]
    pub cache_timeout: f64,
    /// Seconds the solver may spend on one pose.
    #[serde(default = "default_ik_timeout")]
    pub ik_timeout: f64,
    /// Cache grid.
    #[serde(default)]
    pub cache: CacheOptions,
    /// Marker colors and sizes.
    #[serde(default)]
    pub markers: MarkerStyle,
    /// Seed for random IK seeds and FK sampling. Entropy when absent.
    #[serde(default)]
    pub rng_seed: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cache_filename: None,
            cache_timeout: default_cache_timeout(),
            ik_timeout: default_ik_timeout(),
            cache: CacheOptions::default(),
            markers: MarkerStyle::default(),
            rng_seed: None,
        }
    }
}

impl EngineConfig {
    /// Defaults with the given cache file.
    pub fn with_cache_file(path: impl Into<PathBuf>) -> Self {
        Self {
            cache_filename: Some(path.into()),
            ..Self::default()
        }
    }

    /// Parse from TOML.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        Ok(toml::from_str(s)?)
    }

    /// Read from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Check required fields and ranges.
    pub fn validate(&self) -> Result<()> {
        match self.cache_filename.as_deref() {
            Some(p) if !p.as_os_str().is_empty() => {}
            _ => return Err(ReachError::MissingCacheFile),
        }
        if !(self.cache_timeout >= 0.0) || !self.cache_timeout.is_finite() {
            return Err(ReachError::InvalidConfig(format!(
                "cache_timeout must be a non-negative number of seconds, got {}",
                self.cache_timeout
            )));
        }
        if !(self.ik_timeout > 0.0) || !self.ik_timeout.is_finite() {
            return Err(ReachError::InvalidConfig(format!(
                "ik_timeout must be a positive number of seconds, got {}",
                self.ik_timeout
            )));
        }
        self.cache.validate()?;
        Ok(())
    }

    /// Cache generation budget.
    pub fn cache_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.cache_timeout)
    }

    /// Per-pose solver budget.
    pub fn ik_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.ik_timeout)
    }
}

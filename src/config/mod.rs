pub mod defaults;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::stability::CircuitBreakerOptions;
use defaults::*;

/// Serializable breaker thresholds, the on-disk form of [`CircuitBreakerOptions`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BreakerSettings {
    pub failure_threshold: u32,
    pub success_threshold: u32,
    pub reset_timeout_ms: u64,
    pub max_half_open_requests: u32,
}

/// Per-breaker overrides; unset fields fall back to `[defaults]`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreakerOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_threshold: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub success_threshold: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reset_timeout_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_half_open_requests: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    pub defaults: BreakerSettings,
    pub breakers: HashMap<String, BreakerOverrides>,
}

impl BreakerSettings {
    pub fn reset_timeout(&self) -> Duration {
        Duration::from_millis(self.reset_timeout_ms)
    }

    pub fn to_options(&self) -> CircuitBreakerOptions {
        CircuitBreakerOptions::new(self.failure_threshold, self.success_threshold, self.reset_timeout())
            .with_max_half_open_requests(self.max_half_open_requests)
    }

    fn apply(&self, overrides: &BreakerOverrides) -> Self {
        Self {
            failure_threshold: overrides.failure_threshold.unwrap_or(self.failure_threshold),
            success_threshold: overrides.success_threshold.unwrap_or(self.success_threshold),
            reset_timeout_ms: overrides.reset_timeout_ms.unwrap_or(self.reset_timeout_ms),
            max_half_open_requests: overrides
                .max_half_open_requests
                .unwrap_or(self.max_half_open_requests),
        }
    }
}

impl RegistryConfig {
    pub fn get_default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(CONFIG_DIR_NAME)
            .join(CONFIG_FILENAME)
    }

    /// Load from `config_path`, or from the default location when it exists,
    /// otherwise fall back to built-in defaults.
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let path = match config_path {
            Some(path) => path.to_path_buf(),
            None => {
                let default_path = Self::get_default_config_path();
                if !default_path.exists() {
                    return Ok(Self::default());
                }
                default_path
            }
        };

        let config_str = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config = Self::from_toml_str(&config_str)
            .with_context(|| format!("Failed to load config file: {}", path.display()))?;

        Ok(config)
    }

    pub fn from_toml_str(config_str: &str) -> Result<Self> {
        let config: Self = toml::from_str(config_str).context("Failed to parse circuit breaker config")?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize circuit breaker config")
    }

    /// Effective settings for `name`
    pub fn settings_for(&self, name: &str) -> BreakerSettings {
        match self.breakers.get(name) {
            Some(overrides) => self.defaults.apply(overrides),
            None => self.defaults.clone(),
        }
    }

    pub fn options_for(&self, name: &str) -> CircuitBreakerOptions {
        self.settings_for(name).to_options()
    }

    /// Validate configuration settings
    pub fn validate(&self) -> Result<()> {
        self.defaults
            .to_options()
            .validate()
            .context("Invalid [defaults] circuit breaker settings")?;

        for name in self.breakers.keys() {
            if name.trim().is_empty() {
                return Err(anyhow::anyhow!("Circuit breaker names must not be empty"));
            }

            self.options_for(name)
                .validate()
                .with_context(|| format!("Invalid settings for circuit breaker '{}'", name))?;
        }

        Ok(())
    }
}

impl Default for BreakerSettings {
    fn default() -> Self {
        Self {
            failure_threshold: DEFAULT_FAILURE_THRESHOLD,
            success_threshold: DEFAULT_SUCCESS_THRESHOLD,
            reset_timeout_ms: DEFAULT_RESET_TIMEOUT_MS,
            max_half_open_requests: DEFAULT_MAX_HALF_OPEN_REQUESTS,
        }
    }
}

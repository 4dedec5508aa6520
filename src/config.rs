//! Configuration management with validation and defaults
//!
//! Values come from an optional TOML file, then `FLIPPER_*` environment
//! overrides, then validation.

use crate::errors::{ConfigurationError, FlipperResult};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;

/// Top-level flipper configuration
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlipperConfig {
    pub engine: EngineConfig,
    pub double_flip: DoubleFlipConfig,
    pub monitoring: MonitoringConfig,
}

/// How flip outcomes are produced
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolverMode {
    /// Uniform pseudorandom draw
    #[default]
    Random,
    /// SHA-256 over the round context
    Hash,
}

impl std::str::FromStr for ResolverMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "random" => Ok(ResolverMode::Random),
            "hash" => Ok(ResolverMode::Hash),
            other => Err(format!("unknown resolver mode '{}'", other)),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub resolver: ResolverMode,
    /// Mix a high-resolution nonce into hashed preimages.
    /// Disable to make hash-mode outcomes recomputable from the round context.
    pub hash_nonce: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            resolver: ResolverMode::Random,
            hash_nonce: true,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DoubleFlipConfig {
    pub enabled: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitoringConfig {
    pub log_level: String,
    /// Emit a debug event per settled flip
    pub log_flips: bool,
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_flips: false,
        }
    }
}

const LOG_LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];

/// Configuration loader with environment variable support
pub struct ConfigLoader {
    config_path: Option<String>,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self { config_path: None }
    }

    /// Set the configuration file path
    pub fn with_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_path = Some(path.as_ref().to_string_lossy().to_string());
        self
    }

    /// Load configuration from file and environment variables
    pub fn load(&self) -> FlipperResult<FlipperConfig> {
        let mut config = match self.config_path {
            Some(ref path) => self.load_from_file(path)?,
            None => FlipperConfig::default(),
        };

        self.apply_env_overrides(&mut config)?;
        self.validate(&config)?;

        Ok(config)
    }

    fn load_from_file(&self, path: &str) -> FlipperResult<FlipperConfig> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigurationError::LoadFailed(format!("Failed to read {}: {}", path, e)))?;

        toml::from_str(&content)
            .map_err(|e| ConfigurationError::LoadFailed(format!("Failed to parse TOML: {}", e)).into())
    }

    fn apply_env_overrides(&self, config: &mut FlipperConfig) -> FlipperResult<()> {
        if let Ok(mode) = env::var("FLIPPER_RESOLVER") {
            config.engine.resolver = mode.parse().map_err(|reason| ConfigurationError::InvalidValue {
                field: "FLIPPER_RESOLVER".to_string(),
                value: mode.clone(),
                reason,
            })?;
        }
        if let Ok(value) = env::var("FLIPPER_HASH_NONCE") {
            config.engine.hash_nonce = parse_bool("FLIPPER_HASH_NONCE", value)?;
        }
        if let Ok(value) = env::var("FLIPPER_DOUBLE_FLIP") {
            config.double_flip.enabled = parse_bool("FLIPPER_DOUBLE_FLIP", value)?;
        }
        if let Ok(level) = env::var("FLIPPER_LOG_LEVEL") {
            config.monitoring.log_level = level;
        }

        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self, config: &FlipperConfig) -> FlipperResult<()> {
        let level = config.monitoring.log_level.trim();
        if level.is_empty() {
            return Err(ConfigurationError::MissingRequired("monitoring.log_level".to_string()).into());
        }
        if !LOG_LEVELS.contains(&level.to_ascii_lowercase().as_str()) {
            return Err(ConfigurationError::InvalidValue {
                field: "monitoring.log_level".to_string(),
                value: level.to_string(),
                reason: format!("expected one of {}", LOG_LEVELS.join(", ")),
            }
            .into());
        }

        Ok(())
    }

    /// Save configuration to file
    pub fn save(&self, config: &FlipperConfig, path: &str) -> FlipperResult<()> {
        let toml_string = toml::to_string_pretty(config)
            .map_err(|e| ConfigurationError::SaveFailed(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, toml_string)
            .map_err(|e| ConfigurationError::SaveFailed(format!("Failed to write to {}: {}", path, e)).into())
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_bool(field: &str, value: String) -> FlipperResult<bool> {
    let parsed = value.trim().parse::<bool>();
    parsed.map_err(|_| {
        ConfigurationError::InvalidValue {
            field: field.to_string(),
            value,
            reason: "Invalid boolean value".to_string(),
        }
        .into()
    })
}

/// Builder pattern for creating configurations
pub struct ConfigBuilder {
    config: FlipperConfig,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: FlipperConfig::default(),
        }
    }

    pub fn resolver(mut self, mode: ResolverMode) -> Self {
        self.config.engine.resolver = mode;
        self
    }

    pub fn hash_nonce(mut self, enabled: bool) -> Self {
        self.config.engine.hash_nonce = enabled;
        self
    }

    pub fn double_flip(mut self, enabled: bool) -> Self {
        self.config.double_flip.enabled = enabled;
        self
    }

    pub fn monitoring(mut self, monitoring: MonitoringConfig) -> Self {
        self.config.monitoring = monitoring;
        self
    }

    pub fn build(self) -> FlipperConfig {
        self.config
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Write a configuration file holding every default
pub fn generate_sample_config(path: &str) -> FlipperResult<()> {
    ConfigLoader::new().save(&FlipperConfig::default(), path)
}

//! Runtime configuration.
//!
//! Loaded from TOML or JSON; every field has a default so partial files are
//! accepted.

use crate::core::error::ConfigError;
use crate::core::props::SurfaceProps;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Settings for the filter result cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum number of cached images.
    pub capacity: usize,
    /// Memory budget in megabytes.
    pub max_memory_mb: usize,
    /// Seconds before an entry expires.
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: 64,
            max_memory_mb: 256,
            ttl_secs: 600,
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub cache: CacheConfig,
    /// Surface properties given to images created by filter stages.
    pub surface: SurfaceProps,
    /// Default `env_logger` filter when `RUST_LOG` is unset.
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache: CacheConfig::default(),
            surface: SurfaceProps::default(),
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load from a `.toml` or `.json` file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();

        let config = match ext.as_str() {
            "toml" => Self::from_toml(&text)?,
            "json" => Self::from_json(&text)?,
            _ => return Err(ConfigError::UnsupportedExtension(ext)),
        };
        log::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Serialize to pretty JSON.
    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::props::PixelGeometry;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.cache.capacity, 64);
        assert_eq!(config.cache.ttl(), Duration::from_secs(600));
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_partial_toml() {
        let config = Config::from_toml(
            r#"
            log_level = "debug"

            [cache]
            capacity = 8

            [surface]
            pixel_geometry = "rgb_horizontal"
            "#,
        )
        .unwrap();
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.cache.capacity, 8);
        assert_eq!(config.cache.max_memory_mb, 256);
        assert_eq!(config.surface.pixel_geometry, PixelGeometry::RgbHorizontal);
    }

    #[test]
    fn test_from_path_json() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(file, r#"{{"cache": {{"ttl_secs": 5}}}}"#).unwrap();
        let config = Config::from_path(file.path()).unwrap();
        assert_eq!(config.cache.ttl_secs, 5);
        assert_eq!(config.cache.capacity, 64);
    }

    #[test]
    fn test_from_path_rejects_unknown_extension() {
        let file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        assert!(matches!(
            Config::from_path(file.path()),
            Err(ConfigError::UnsupportedExtension(ext)) if ext == "yaml"
        ));
    }

    #[test]
    fn test_json_round_trip() {
        let config = Config::default();
        let json = config.to_json().unwrap();
        assert_eq!(Config::from_json(&json).unwrap(), config);
    }
}

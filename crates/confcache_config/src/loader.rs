//! Settings file loading and validation.

use crate::error::ConfigError;
use crate::types::CacheConfig;
use confcache_core::cache::MAX_STAMP_OFFSET;
use std::path::Path;

/// Conventional settings file name.
pub const CONFIG_FILE_NAME: &str = "confcache.toml";

/// Loads and validates a settings file.
pub fn load_config(path: &Path) -> Result<CacheConfig, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    load_config_from_str(&content)
}

/// Parses and validates settings from a string.
pub fn load_config_from_str(content: &str) -> Result<CacheConfig, ConfigError> {
    let config: CacheConfig =
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
    validate_config(&config)?;
    Ok(config)
}

fn validate_config(config: &CacheConfig) -> Result<(), ConfigError> {
    validate_extension("cache.extension", &config.cache.extension)?;
    validate_extension("resolver.library_extension", &config.resolver.library_extension)?;
    let max_offset_ms = MAX_STAMP_OFFSET.as_millis() as u64;
    if !(1..=max_offset_ms).contains(&config.cache.stamp_offset_ms) {
        return Err(ConfigError::ValidationError(format!(
            "cache.stamp_offset_ms must be between 1 and {max_offset_ms}, got {}",
            config.cache.stamp_offset_ms
        )));
    }
    if let Some(label) = &config.namespace.label {
        if label.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "namespace.label must not be empty".to_string(),
            ));
        }
    }
    Ok(())
}

fn validate_extension(field: &str, ext: &str) -> Result<(), ConfigError> {
    if ext.is_empty() {
        return Err(ConfigError::ValidationError(format!(
            "{field} must not be empty"
        )));
    }
    if ext.contains(['.', '/', '\\']) {
        return Err(ConfigError::ValidationError(format!(
            "{field} must be a bare extension without dots or separators, got '{ext}'"
        )));
    }
    Ok(())
}

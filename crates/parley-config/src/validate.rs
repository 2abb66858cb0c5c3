//! Post-merge configuration validation.

use crate::error::{ConfigError, ConfigResult};
use crate::types::Config;

/// Validate a fully-merged and deserialized configuration.
///
/// # Errors
///
/// Returns the first validation error found.
pub fn validate(config: &Config) -> ConfigResult<()> {
    validate_identity(config)?;
    validate_chat(config)?;
    validate_logging(config)?;
    Ok(())
}

fn validate_identity(config: &Config) -> ConfigResult<()> {
    let Some(url) = config.identity.base_url.as_deref() else {
        return Ok(());
    };

    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return Err(ConfigError::ValidationError {
            field: "identity.base_url".to_owned(),
            message: format!("'{url}' must start with http:// or https://"),
        });
    }

    Ok(())
}

fn validate_chat(config: &Config) -> ConfigResult<()> {
    if config.chat.max_count_label.trim().is_empty() {
        return Err(ConfigError::ValidationError {
            field: "chat.max_count_label".to_owned(),
            message: "must not be empty".to_owned(),
        });
    }

    Ok(())
}

fn validate_logging(config: &Config) -> ConfigResult<()> {
    let valid_levels = ["trace", "debug", "info", "warn", "error"];
    if !valid_levels.contains(&config.logging.level.as_str()) {
        return Err(ConfigError::ValidationError {
            field: "logging.level".to_owned(),
            message: format!(
                "unsupported log level '{}'; expected one of: {}",
                config.logging.level,
                valid_levels.join(", ")
            ),
        });
    }

    let valid_formats = ["pretty", "compact", "json", "full"];
    if !valid_formats.contains(&config.logging.format.as_str()) {
        return Err(ConfigError::ValidationError {
            field: "logging.format".to_owned(),
            message: format!(
                "unsupported log format '{}'; expected one of: {}",
                config.logging.format,
                valid_formats.join(", ")
            ),
        });
    }

    Ok(())
}

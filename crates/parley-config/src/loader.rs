//! Config loading.
//!
//! Implements the `Config::load()` algorithm:
//! 1. Parse `defaults.toml` → base
//! 2. Deep-merge the config file, if one was given
//! 3. Apply `PARLEY_*` env fallbacks to fields the file did not set
//! 4. Deserialize the merged tree → `Config`
//! 5. Validate

use std::collections::HashMap;
use std::path::Path;

use tracing::{debug, info};

use crate::error::{ConfigError, ConfigResult};
use crate::types::Config;
use crate::validate;

/// Embedded default configuration.
const DEFAULTS_TOML: &str = include_str!("defaults.toml");

/// Maximum allowed config file size (1 MB).
const MAX_CONFIG_FILE_SIZE: u64 = 1_048_576;

/// Env vars consulted as fallbacks, and the field each one fills.
const ENV_MAPPINGS: &[(&str, &str)] = &[
    ("PARLEY_IDENTITY_URL", "identity.base_url"),
    ("PARLEY_IDENTITY_SOURCE", "identity.source"),
    ("PARLEY_APP_ID", "chat.app_id"),
    ("PARLEY_LOG_LEVEL", "logging.level"),
];

/// Collect the `PARLEY_*` environment variables.
#[must_use]
pub fn collect_env_vars() -> HashMap<String, String> {
    std::env::vars()
        .filter(|(key, _)| key.starts_with("PARLEY_"))
        .collect()
}

/// Load the configuration from defaults, an optional file, and `env`.
///
/// Env values are fallbacks: they only fill fields the file left unset.
///
/// # Errors
///
/// Returns a [`ConfigError`] if the file is unreadable or malformed, or if
/// the merged configuration fails validation.
pub fn load(path: Option<&Path>, env: &HashMap<String, String>) -> ConfigResult<Config> {
    let mut merged: toml::Value =
        toml::from_str(DEFAULTS_TOML).map_err(|e| ConfigError::ParseError {
            path: "<embedded defaults>".to_owned(),
            source: e,
        })?;

    let overlay = match path {
        Some(path) => {
            let overlay = read_toml(path)?;
            deep_merge(&mut merged, &overlay);
            info!(path = %path.display(), "loaded config file");
            Some(overlay)
        },
        None => None,
    };

    apply_env_fallbacks(&mut merged, overlay.as_ref(), env);

    let config: Config = merged.try_into().map_err(|e| ConfigError::ParseError {
        path: path.map_or_else(|| "<defaults>".to_owned(), |p| p.display().to_string()),
        source: e,
    })?;

    validate::validate(&config)?;
    Ok(config)
}

/// Load configuration from a single file (no defaults merge, no env).
///
/// # Errors
///
/// Returns a [`ConfigError`] if the file cannot be read or parsed.
pub fn load_file(path: &Path) -> ConfigResult<Config> {
    let content = read_bounded(path)?;
    let config: Config = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
        path: path.display().to_string(),
        source: e,
    })?;

    validate::validate(&config)?;
    Ok(config)
}

/// Read a file, rejecting anything over [`MAX_CONFIG_FILE_SIZE`].
fn read_bounded(path: &Path) -> ConfigResult<String> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.display().to_string(),
        source: e,
    })?;

    // Check size after reading to avoid TOCTOU between stat and read.
    if content.len() as u64 > MAX_CONFIG_FILE_SIZE {
        return Err(ConfigError::ValidationError {
            field: path.display().to_string(),
            message: format!(
                "config file is {} bytes, exceeding the {} byte limit",
                content.len(),
                MAX_CONFIG_FILE_SIZE
            ),
        });
    }

    Ok(content)
}

fn read_toml(path: &Path) -> ConfigResult<toml::Value> {
    let content = read_bounded(path)?;
    toml::from_str(&content).map_err(|e| ConfigError::ParseError {
        path: path.display().to_string(),
        source: e,
    })
}

/// Recursively merge `overlay` into `base`. Tables merge key by key; any
/// other value in `overlay` replaces the one in `base`.
fn deep_merge(base: &mut toml::Value, overlay: &toml::Value) {
    match (base, overlay) {
        (toml::Value::Table(base), toml::Value::Table(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(key) {
                    Some(existing) => deep_merge(existing, value),
                    None => {
                        base.insert(key.clone(), value.clone());
                    },
                }
            }
        },
        (base, overlay) => *base = overlay.clone(),
    }
}

fn apply_env_fallbacks(
    merged: &mut toml::Value,
    file: Option<&toml::Value>,
    env: &HashMap<String, String>,
) {
    for (var_name, field_path) in ENV_MAPPINGS {
        let Some(value) = env.get(*var_name).filter(|v| !v.is_empty()) else {
            continue;
        };
        if file.is_some_and(|f| lookup(f, field_path).is_some()) {
            debug!(var = var_name, field = field_path, "field set by file; env ignored");
            continue;
        }
        set_path(merged, field_path, toml::Value::String(value.clone()));
        debug!(var = var_name, field = field_path, "applied env fallback");
    }
}

fn lookup<'a>(value: &'a toml::Value, dotted: &str) -> Option<&'a toml::Value> {
    dotted
        .split('.')
        .try_fold(value, |current, key| current.as_table()?.get(key))
}

fn set_path(root: &mut toml::Value, dotted: &str, value: toml::Value) {
    let mut keys: Vec<&str> = dotted.split('.').collect();
    let Some(leaf) = keys.pop() else {
        return;
    };

    let mut current = root;
    for key in keys {
        let Some(table) = current.as_table_mut() else {
            return;
        };
        current = table
            .entry(key)
            .or_insert_with(|| toml::Value::Table(toml::map::Map::new()));
    }
    if let Some(table) = current.as_table_mut() {
        table.insert(leaf.to_owned(), value);
    }
}

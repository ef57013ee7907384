//! Settings loading from configuration files and the environment.
//!
//! ## Loading Order
//!
//! 1. Start with [`Settings::default`].
//! 2. Merge a TOML or JSON document over the defaults.
//! 3. Apply environment variable overrides (highest priority).
//!
//! ## Environment Variable Mapping
//!
//! | Env Var | Setting |
//! |---|---|
//! | `APIROUTE_DEBUG` | `debug` |
//! | `APIROUTE_LOG_LEVEL` | `log_level` |
//! | `APIROUTE_WORKER_THREADS` | `worker_threads` |
//! | `APIROUTE_MAX_BODY_SIZE` | `max_body_size` |
//! | `APIROUTE_BIND_ADDRESS` | `bind_address` |
//!
//! ## Examples
//!
//! ```rust,no_run
//! use apiroute_core::settings_loader;
//!
//! let settings = settings_loader::from_toml_file_with_env("config/apiroute.toml").unwrap();
//! ```

use std::path::Path;

use crate::error::ApiError;
use crate::settings::Settings;

/// Loads settings from a TOML string. Missing keys keep their defaults.
///
/// # Errors
///
/// Returns an error if the TOML is malformed or cannot be deserialized.
pub fn from_toml_str(toml_str: &str) -> Result<Settings, ApiError> {
    let toml_value: toml::Value = toml::from_str(toml_str)
        .map_err(|e| ApiError::ConfigurationError(format!("Failed to parse TOML: {e}")))?;
    merge_over_defaults(toml_to_json(toml_value), "TOML")
}

/// Loads settings from a TOML file.
pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Settings, ApiError> {
    from_toml_str(&read_config(path.as_ref(), "TOML")?)
}

/// Loads settings from a TOML file and then applies environment overrides.
pub fn from_toml_file_with_env(path: impl AsRef<Path>) -> Result<Settings, ApiError> {
    let mut settings = from_toml_file(path)?;
    apply_env_overrides(&mut settings);
    Ok(settings)
}

/// Loads settings from a JSON string. Missing keys keep their defaults.
pub fn from_json_str(json_str: &str) -> Result<Settings, ApiError> {
    let json_value: serde_json::Value = serde_json::from_str(json_str)
        .map_err(|e| ApiError::ConfigurationError(format!("Failed to parse JSON: {e}")))?;
    merge_over_defaults(json_value, "JSON")
}

/// Loads settings from a JSON file.
pub fn from_json_file(path: impl AsRef<Path>) -> Result<Settings, ApiError> {
    from_json_str(&read_config(path.as_ref(), "JSON")?)
}

/// Loads settings from environment variables only, starting from defaults.
pub fn from_env() -> Settings {
    let mut settings = Settings::default();
    apply_env_overrides(&mut settings);
    settings
}

/// Applies `APIROUTE_*` environment variable overrides.
///
/// Numeric variables that fail to parse are ignored and the current value kept.
pub fn apply_env_overrides(settings: &mut Settings) {
    if let Ok(val) = std::env::var("APIROUTE_DEBUG") {
        settings.debug = matches!(val.to_lowercase().as_str(), "true" | "1" | "yes");
    }

    if let Ok(val) = std::env::var("APIROUTE_LOG_LEVEL") {
        settings.log_level = val;
    }

    if let Ok(val) = std::env::var("APIROUTE_WORKER_THREADS") {
        match val.parse::<usize>() {
            Ok(n) if n > 0 => settings.worker_threads = n,
            _ => tracing::warn!(value = %val, "ignoring invalid APIROUTE_WORKER_THREADS"),
        }
    }

    if let Ok(val) = std::env::var("APIROUTE_MAX_BODY_SIZE") {
        if let Ok(n) = val.parse::<usize>() {
            settings.max_body_size = n;
        }
    }

    if let Ok(val) = std::env::var("APIROUTE_BIND_ADDRESS") {
        settings.bind_address = val;
    }
}

fn read_config(path: &Path, format: &str) -> Result<String, ApiError> {
    std::fs::read_to_string(path).map_err(|e| {
        ApiError::ConfigurationError(format!(
            "Failed to read {format} file '{}': {e}",
            path.display()
        ))
    })
}

fn merge_over_defaults(value: serde_json::Value, format: &str) -> Result<Settings, ApiError> {
    let default_json = serde_json::to_value(Settings::default()).map_err(|e| {
        ApiError::ConfigurationError(format!("Failed to serialize default settings: {e}"))
    })?;
    let settings: Settings = serde_json::from_value(merge_json(default_json, value)).map_err(|e| {
        ApiError::ConfigurationError(format!("Failed to deserialize settings from {format}: {e}"))
    })?;
    if settings.worker_threads == 0 {
        return Err(ApiError::ConfigurationError(
            "worker_threads must be at least 1".to_string(),
        ));
    }
    Ok(settings)
}

/// Converts a TOML value to a `serde_json::Value`.
fn toml_to_json(value: toml::Value) -> serde_json::Value {
    match value {
        toml::Value::String(s) => serde_json::Value::String(s),
        toml::Value::Integer(i) => serde_json::json!(i),
        toml::Value::Float(f) => serde_json::json!(f),
        toml::Value::Boolean(b) => serde_json::Value::Bool(b),
        toml::Value::Datetime(dt) => serde_json::Value::String(dt.to_string()),
        toml::Value::Array(arr) => {
            serde_json::Value::Array(arr.into_iter().map(toml_to_json).collect())
        }
        toml::Value::Table(table) => serde_json::Value::Object(
            table.into_iter().map(|(k, v)| (k, toml_to_json(v))).collect(),
        ),
    }
}

/// Deep-merges two JSON values; `override_val` wins, arrays are replaced.
fn merge_json(base: serde_json::Value, override_val: serde_json::Value) -> serde_json::Value {
    match (base, override_val) {
        (serde_json::Value::Object(mut base_map), serde_json::Value::Object(override_map)) => {
            for (key, override_v) in override_map {
                let merged = match base_map.remove(&key) {
                    Some(base_v) => merge_json(base_v, override_v),
                    None => override_v,
                };
                base_map.insert(key, merged);
            }
            serde_json::Value::Object(base_map)
        }
        (_, override_val) => override_val,
    }
}

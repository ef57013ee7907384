//! Runtime settings for apiroute.
//!
//! [`Settings`] holds the knobs the handler layer and the server integration
//! read at startup. Every field has a sensible default, so partial TOML/JSON
//! documents can be merged over [`Settings::default`] by the
//! [`settings_loader`](crate::settings_loader).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Default upper bound on concurrently running blocking handlers.
pub const DEFAULT_WORKER_THREADS: usize = 40;

/// Default maximum request body size in bytes (2 MiB).
pub const DEFAULT_MAX_BODY_SIZE: usize = 2 * 1024 * 1024;

/// The complete set of runtime settings.
///
/// # Examples
///
/// ```
/// use apiroute_core::settings::Settings;
///
/// let settings = Settings::default();
/// assert!(settings.debug);
/// assert_eq!(settings.worker_threads, 40);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Whether debug mode is enabled (pretty logs instead of JSON).
    pub debug: bool,
    /// The tracing filter directive (e.g. "info", "apiroute_handler=debug").
    pub log_level: String,
    /// Maximum number of blocking handlers and blocking background tasks
    /// running at once.
    pub worker_threads: usize,
    /// Maximum number of request body bytes read by the server integration.
    pub max_body_size: usize,
    /// The socket address the server binds to.
    pub bind_address: String,
    /// Application-specific settings that don't fit into the above.
    pub extra: HashMap<String, serde_json::Value>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            debug: true,
            log_level: "info".to_string(),
            worker_threads: DEFAULT_WORKER_THREADS,
            max_body_size: DEFAULT_MAX_BODY_SIZE,
            bind_address: "127.0.0.1:8000".to_string(),
            extra: HashMap::new(),
        }
    }
}

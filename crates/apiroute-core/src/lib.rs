//! # apiroute-core
//!
//! Core types, settings, and error types for the apiroute handler layer.
//! This crate has no HTTP framework dependencies and provides the foundation
//! for the other crates.
//!
//! ## Modules
//!
//! - [`error`] - Error types, validation error records, and result aliases
//! - [`settings`] - Runtime settings and global configuration
//! - [`settings_loader`] - Loading settings from TOML, JSON, and the environment
//! - [`logging`] - Tracing-based logging integration

pub mod error;
pub mod logging;
pub mod settings;
pub mod settings_loader;

// Re-export the most commonly used types at the crate root.
pub use error::{ApiError, ApiResult, ErrorRecord, RequestValidationError};
pub use settings::Settings;

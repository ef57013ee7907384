//! Core error types for apiroute.
//!
//! This module provides [`ApiError`], the single error enum every stage of the
//! request pipeline returns, and [`RequestValidationError`], the carrier for
//! field-level validation failures reported by dependency resolution.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A single field-level validation failure.
///
/// Records are produced by the dependency resolver and surfaced to the client
/// unchanged, so the wire shape (`loc`, `msg`, `type`) is part of the contract.
///
/// # Examples
///
/// ```
/// use apiroute_core::error::ErrorRecord;
///
/// let record = ErrorRecord::new(["body", "email"], "field required", "value_error.missing");
/// assert_eq!(record.loc, vec!["body", "email"]);
/// assert_eq!(record.to_string(), "body.email: field required");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorRecord {
    /// Location of the offending value, outermost first (e.g. `["query", "limit"]`).
    pub loc: Vec<String>,
    /// Human-readable message.
    pub msg: String,
    /// Machine-readable error type (e.g. `type_error.integer`).
    #[serde(rename = "type")]
    pub kind: String,
}

impl ErrorRecord {
    /// Creates a new record from a location path, message, and type.
    pub fn new<I, S>(loc: I, msg: impl Into<String>, kind: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            loc: loc.into_iter().map(Into::into).collect(),
            msg: msg.into(),
            kind: kind.into(),
        }
    }
}

impl fmt::Display for ErrorRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.loc.join("."), self.msg)
    }
}

/// Validation failure raised when dependency resolution reports errors.
///
/// Always carries the complete, ordered list of records produced by the
/// resolver; it is never built from a subset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestValidationError {
    errors: Vec<ErrorRecord>,
}

impl RequestValidationError {
    /// Wraps the resolver's error list.
    pub const fn new(errors: Vec<ErrorRecord>) -> Self {
        Self { errors }
    }

    /// Returns every recorded error, in resolver order.
    pub fn errors(&self) -> &[ErrorRecord] {
        &self.errors
    }

    /// Consumes the carrier and returns the records.
    pub fn into_errors(self) -> Vec<ErrorRecord> {
        self.errors
    }
}

impl fmt::Display for RequestValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, record) in self.errors.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{record}")?;
        }
        Ok(())
    }
}

impl std::error::Error for RequestValidationError {}

/// The primary error type for apiroute.
///
/// Only [`ApiError::HttpException`] and [`ApiError::RequestValidation`] are
/// meant for the client. Every other variant maps to a 500-class response in
/// the surrounding framework's error layer.
#[derive(Error, Debug)]
pub enum ApiError {
    // ── Client errors ────────────────────────────────────────────────

    /// An HTTP error with an explicit status code and client-visible detail.
    #[error("HTTP {status}: {detail}")]
    HttpException {
        /// The HTTP status code to respond with.
        status: u16,
        /// The detail message sent to the client.
        detail: String,
    },

    /// Dependency resolution reported one or more field-level errors.
    #[error("Request validation failed: {0}")]
    RequestValidation(RequestValidationError),

    // ── Server errors ────────────────────────────────────────────────

    /// The handler's return value did not match the declared response field.
    #[error("Response validation failed: {0}")]
    ResponseValidation(String),

    /// The response body could not be encoded.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// A header name or value could not be represented on the wire.
    #[error("Invalid header: {0}")]
    InvalidHeader(String),

    /// A handler failed. Produced by user code and passed through untouched.
    #[error("Handler error: {0}")]
    Handler(String),

    /// A configuration value is missing or invalid.
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// An unexpected internal failure.
    #[error("Internal server error: {0}")]
    Internal(String),

    /// An I/O error occurred.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ApiError {
    /// Creates an [`ApiError::HttpException`].
    pub fn http(status: u16, detail: impl Into<String>) -> Self {
        Self::HttpException {
            status,
            detail: detail.into(),
        }
    }

    /// Returns the HTTP status code associated with this error.
    ///
    /// - `HttpException` -> its own status
    /// - `RequestValidation` -> 422
    /// - everything else -> 500
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::HttpException { status, .. } => *status,
            Self::RequestValidation(_) => 422,
            Self::ResponseValidation(_)
            | Self::Serialization(_)
            | Self::InvalidHeader(_)
            | Self::Handler(_)
            | Self::ConfigurationError(_)
            | Self::Internal(_)
            | Self::Io(_) => 500,
        }
    }

    /// Returns the `detail` payload for the JSON error body.
    ///
    /// Validation errors expose every record; server errors expose a generic
    /// message so internals are not leaked to the client.
    pub fn detail(&self) -> serde_json::Value {
        match self {
            Self::HttpException { detail, .. } => serde_json::Value::String(detail.clone()),
            Self::RequestValidation(err) => {
                serde_json::to_value(err.errors()).unwrap_or(serde_json::Value::Null)
            }
            _ => serde_json::Value::String("Internal Server Error".to_string()),
        }
    }
}

impl From<RequestValidationError> for ApiError {
    fn from(err: RequestValidationError) -> Self {
        Self::RequestValidation(err)
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// A convenience type alias for `Result<T, ApiError>`.
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_record_display() {
        let record = ErrorRecord::new(["query", "limit"], "value is not a valid integer", "type_error.integer");
        assert_eq!(record.to_string(), "query.limit: value is not a valid integer");
    }

    #[test]
    fn test_error_record_serializes_type_key() {
        let record = ErrorRecord::new(["body"], "field required", "value_error.missing");
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["type"], "value_error.missing");
        assert_eq!(json["loc"], serde_json::json!(["body"]));
        assert!(json.get("kind").is_none());
    }

    #[test]
    fn test_request_validation_error_keeps_order() {
        let err = RequestValidationError::new(vec![
            ErrorRecord::new(["a"], "first", "x"),
            ErrorRecord::new(["b"], "second", "x"),
        ]);
        assert_eq!(err.errors().len(), 2);
        assert_eq!(err.errors()[0].msg, "first");
        assert_eq!(err.to_string(), "a: first; b: second");
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(ApiError::http(400, "bad").status_code(), 400);
        assert_eq!(ApiError::http(404, "missing").status_code(), 404);
        assert_eq!(
            ApiError::RequestValidation(RequestValidationError::new(vec![])).status_code(),
            422
        );
        assert_eq!(ApiError::Serialization("x".into()).status_code(), 500);
        assert_eq!(ApiError::ResponseValidation("x".into()).status_code(), 500);
        assert_eq!(ApiError::InvalidHeader("x".into()).status_code(), 500);
        assert_eq!(ApiError::Handler("x".into()).status_code(), 500);
        assert_eq!(ApiError::Internal("x".into()).status_code(), 500);
    }

    #[test]
    fn test_detail_for_http_exception() {
        let err = ApiError::http(400, "There was an error parsing the body");
        assert_eq!(err.detail(), serde_json::json!("There was an error parsing the body"));
    }

    #[test]
    fn test_detail_for_validation_lists_all_records() {
        let err: ApiError = RequestValidationError::new(vec![
            ErrorRecord::new(["query", "q"], "field required", "value_error.missing"),
            ErrorRecord::new(["body", "name"], "str type expected", "type_error.str"),
        ])
        .into();
        let detail = err.detail();
        assert_eq!(detail.as_array().unwrap().len(), 2);
        assert_eq!(detail[1]["loc"], serde_json::json!(["body", "name"]));
    }

    #[test]
    fn test_detail_hides_server_errors() {
        let err = ApiError::Serialization("NaN is not JSON".into());
        assert_eq!(err.detail(), serde_json::json!("Internal Server Error"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file missing");
        let err: ApiError = io_err.into();
        assert_eq!(err.status_code(), 500);
        assert!(err.to_string().contains("file missing"));
    }

    #[test]
    fn test_serde_json_error_conversion() {
        let parse_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: ApiError = parse_err.into();
        assert!(matches!(err, ApiError::Serialization(_)));
    }
}

//! Native HTTP responses.
//!
//! A [`Response`] is rendered when it is built: its body is already bytes and
//! its `content-length`/`content-type` headers are already set. Handlers that
//! return one bypass response-schema serialization entirely. The
//! [`ResponseClass`] picks how a plain value is rendered when the handler
//! layer builds a response on the handler's behalf.

use bytes::Bytes;
use http::header::{HeaderValue, CONTENT_LENGTH, CONTENT_TYPE, SET_COOKIE};
use http::StatusCode;
use serde_json::{json, Value};

use apiroute_core::{ApiError, ApiResult};

use crate::background::BackgroundTasks;
use crate::cookies::Cookie;
use crate::headers::Headers;
use crate::json;
use crate::send::{Sender, WireResponse};

/// How a value is rendered into a native response body.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ResponseClass {
    /// Compact JSON, `application/json`.
    #[default]
    Json,
    /// A string body, `text/html; charset=utf-8`.
    Html,
    /// A string body, `text/plain; charset=utf-8`.
    PlainText,
}

impl ResponseClass {
    /// The media type without parameters.
    pub fn media_type(self) -> mime::Mime {
        match self {
            Self::Json => mime::APPLICATION_JSON,
            Self::Html => mime::TEXT_HTML,
            Self::PlainText => mime::TEXT_PLAIN,
        }
    }

    /// The `content-type` header value. Text types carry a UTF-8 charset.
    pub fn content_type(self) -> String {
        let media_type = self.media_type();
        if media_type.type_() == mime::TEXT {
            format!("{media_type}; charset=utf-8")
        } else {
            media_type.to_string()
        }
    }

    /// Renders `value` as a body of this class.
    ///
    /// Text classes accept strings (used verbatim) and `null` (empty body);
    /// any other value is a serialization error.
    pub fn render(self, value: &Value) -> ApiResult<Bytes> {
        match (self, value) {
            (Self::Json, _) => json::render(value).map(Bytes::from),
            (_, Value::String(s)) => Ok(Bytes::copy_from_slice(s.as_bytes())),
            (_, Value::Null) => Ok(Bytes::new()),
            (class, other) => Err(ApiError::Serialization(format!(
                "{class:?} responses need a string body, got {}",
                kind_of(other)
            ))),
        }
    }
}

const fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// A rendered HTTP response.
///
/// # Examples
///
/// ```
/// use apiroute_http::Response;
/// use http::StatusCode;
///
/// let response = Response::json(&serde_json::json!({"ok": true}), StatusCode::OK).unwrap();
/// assert_eq!(response.headers().get_str("content-type"), Some("application/json"));
/// assert_eq!(response.headers().get_str("content-length"), Some("11"));
/// ```
#[derive(Debug, Default)]
pub struct Response {
    status: StatusCode,
    headers: Headers,
    body: Bytes,
    background: Option<BackgroundTasks>,
}

impl Response {
    /// Renders `value` as `class` and sets the derived headers.
    pub fn new(class: ResponseClass, value: &Value, status: StatusCode) -> ApiResult<Self> {
        let body = class.render(value)?;
        Self::with_body(body, &class.content_type(), status)
    }

    /// Builds a response around pre-rendered bytes.
    ///
    /// `content-length` is set for non-empty bodies.
    pub fn with_body(
        body: impl Into<Bytes>,
        content_type: &str,
        status: StatusCode,
    ) -> ApiResult<Self> {
        let body = body.into();
        let mut headers = Headers::new();
        if !body.is_empty() {
            headers.set_raw(CONTENT_LENGTH, HeaderValue::from(body.len()));
        }
        headers.set(CONTENT_TYPE.as_str(), content_type)?;
        Ok(Self {
            status,
            headers,
            body,
            background: None,
        })
    }

    /// A JSON response.
    pub fn json(value: &Value, status: StatusCode) -> ApiResult<Self> {
        Self::new(ResponseClass::Json, value, status)
    }

    /// An HTML response.
    pub fn html(body: impl Into<String>, status: StatusCode) -> ApiResult<Self> {
        Self::new(ResponseClass::Html, &Value::String(body.into()), status)
    }

    /// A plain-text response.
    pub fn text(body: impl Into<String>, status: StatusCode) -> ApiResult<Self> {
        Self::new(ResponseClass::PlainText, &Value::String(body.into()), status)
    }

    /// The JSON error response for `error`: `{"detail": ...}` with the
    /// error's status code.
    pub fn from_error(error: &ApiError) -> Self {
        let status = StatusCode::from_u16(error.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = json!({ "detail": error.detail() });
        Self::json(&body, status).unwrap_or_else(|e| {
            tracing::error!(error = %e, "failed to render error response");
            Self {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                ..Self::default()
            }
        })
    }

    pub const fn status(&self) -> StatusCode {
        self.status
    }

    pub fn set_status(&mut self, status: StatusCode) {
        self.status = status;
    }

    pub const fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut Headers {
        &mut self.headers
    }

    pub const fn body(&self) -> &Bytes {
        &self.body
    }

    /// The attached background tasks, if any.
    pub const fn background(&self) -> Option<&BackgroundTasks> {
        self.background.as_ref()
    }

    /// Returns `true` if background tasks are attached.
    pub const fn has_background(&self) -> bool {
        self.background.is_some()
    }

    /// Attaches background tasks, replacing any already attached.
    pub fn set_background(&mut self, background: Option<BackgroundTasks>) {
        self.background = background;
    }

    /// Builder form of [`set_background`](Self::set_background).
    #[must_use]
    pub fn with_background(mut self, background: BackgroundTasks) -> Self {
        self.background = Some(background);
        self
    }

    /// Appends a `set-cookie` header.
    pub fn set_cookie(&mut self, cookie: Cookie) -> ApiResult<()> {
        let value = HeaderValue::from_str(&cookie.to_set_cookie_header())
            .map_err(|e| ApiError::InvalidHeader(format!("set-cookie {}: {e}", cookie.name)))?;
        self.headers.append_raw(SET_COOKIE, value);
        Ok(())
    }

    /// Appends a `set-cookie` header that expires `name` on the client.
    pub fn delete_cookie(
        &mut self,
        name: &str,
        path: Option<&str>,
        domain: Option<&str>,
    ) -> ApiResult<()> {
        self.set_cookie(Cookie::deletion(name, path, domain))
    }

    /// Converts into the on-the-wire form.
    pub fn into_wire(self) -> WireResponse {
        WireResponse {
            status: self.status,
            headers: self.headers,
            body: self.body,
            background: self.background,
        }
    }

    /// Sends the response through `sender`: start, body, then background.
    pub async fn emit<S: Sender + ?Sized>(self, sender: &mut S) -> ApiResult<()> {
        self.into_wire().emit(sender).await
    }
}

impl axum::response::IntoResponse for Response {
    fn into_response(self) -> axum::response::Response {
        self.into_wire().into_axum()
    }
}

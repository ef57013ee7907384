//! The deferred-serialization response envelope.
//!
//! A [`ResponseEnvelope`] carries an unrendered JSON body together with the
//! status, headers, media type, and background tasks of a response. The body
//! is only turned into bytes when the envelope is emitted, so the handler
//! layer can still rewrite it (e.g. run it through a response schema) after
//! the handler returned.
//!
//! `content-length` and `content-type` are derived headers: they are filled in
//! from the rendered body right before sending, unless the caller supplied
//! them at construction time.

use bytes::Bytes;
use http::header::{HeaderValue, CONTENT_LENGTH, CONTENT_TYPE, SET_COOKIE};
use http::StatusCode;
use serde::Serialize;
use serde_json::Value;

use apiroute_core::{ApiError, ApiResult};

use crate::background::BackgroundTasks;
use crate::cookies::Cookie;
use crate::headers::Headers;
use crate::json;
use crate::send::{Sender, WireResponse};

/// The media type used when none is given.
pub const DEFAULT_MEDIA_TYPE: &str = "application/json";

/// A response whose body is rendered just before it is sent.
///
/// # Examples
///
/// ```
/// use apiroute_http::ResponseEnvelope;
/// use http::StatusCode;
/// use serde_json::json;
///
/// let mut envelope = ResponseEnvelope::new(json!({"id": 7})).with_status(StatusCode::CREATED);
/// envelope.set_cookie(apiroute_http::Cookie::new("seen", "1")).unwrap();
///
/// let wire = envelope.into_wire().unwrap();
/// assert_eq!(wire.status, StatusCode::CREATED);
/// assert_eq!(&wire.body[..], br#"{"id":7}"#);
/// assert_eq!(wire.headers.get_str("content-type"), Some("application/json"));
/// ```
#[derive(Debug)]
pub struct ResponseEnvelope {
    body: Value,
    status: StatusCode,
    headers: Headers,
    media_type: String,
    background: Option<BackgroundTasks>,
    populate_content_length: bool,
    populate_content_type: bool,
}

impl ResponseEnvelope {
    /// Creates an envelope with status 200, no headers, and the default
    /// media type.
    pub fn new(body: impl Into<Value>) -> Self {
        Self {
            body: body.into(),
            status: StatusCode::OK,
            headers: Headers::new(),
            media_type: DEFAULT_MEDIA_TYPE.to_string(),
            background: None,
            populate_content_length: true,
            populate_content_type: true,
        }
    }

    /// Creates an envelope from any serializable body.
    pub fn from_serialize<T: Serialize + ?Sized>(body: &T) -> ApiResult<Self> {
        Ok(Self::new(json::to_value(body)?))
    }

    /// Sets the status code.
    #[must_use]
    pub const fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    /// Replaces the headers with `pairs`.
    ///
    /// Supplying `content-length` or `content-type` here (in any letter case)
    /// turns off automatic population of that header.
    pub fn with_headers<I, K, V>(mut self, pairs: I) -> ApiResult<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        self.headers = Headers::from_pairs(pairs)?;
        self.populate_content_length = !self.headers.contains(CONTENT_LENGTH.as_str());
        self.populate_content_type = !self.headers.contains(CONTENT_TYPE.as_str());
        Ok(self)
    }

    /// Sets the media type used for the derived `content-type` header.
    #[must_use]
    pub fn with_media_type(mut self, media_type: impl Into<String>) -> Self {
        self.media_type = media_type.into();
        self
    }

    /// Attaches background tasks.
    #[must_use]
    pub fn with_background(mut self, background: BackgroundTasks) -> Self {
        self.background = Some(background);
        self
    }

    pub const fn body(&self) -> &Value {
        &self.body
    }

    /// Replaces the unrendered body.
    pub fn set_body(&mut self, body: Value) {
        self.body = body;
    }

    /// Takes the body out, leaving `null` behind.
    pub fn take_body(&mut self) -> Value {
        self.body.take()
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

    pub fn media_type(&self) -> &str {
        &self.media_type
    }

    pub const fn background(&self) -> Option<&BackgroundTasks> {
        self.background.as_ref()
    }

    pub fn take_background(&mut self) -> Option<BackgroundTasks> {
        self.background.take()
    }

    /// Whether `content-length` will be derived from the rendered body.
    pub const fn populates_content_length(&self) -> bool {
        self.populate_content_length
    }

    /// Whether `content-type` will be derived from the media type.
    pub const fn populates_content_type(&self) -> bool {
        self.populate_content_type
    }

    /// Renders the body as compact JSON.
    ///
    /// # Errors
    ///
    /// [`ApiError::Serialization`] if the body cannot be encoded.
    pub fn render(&self) -> ApiResult<Bytes> {
        json::render(&self.body).map(Bytes::from)
    }

    /// Fills in the derived headers for an already rendered body.
    ///
    /// `content-length` is only added for a non-empty body. Neither header is
    /// touched when already present, so calling this twice changes nothing.
    pub fn populate_content(&mut self, rendered: &[u8]) {
        if self.populate_content_length
            && !rendered.is_empty()
            && !self.headers.contains(CONTENT_LENGTH.as_str())
        {
            self.headers
                .set_raw(CONTENT_LENGTH, HeaderValue::from(rendered.len()));
        }
        if self.populate_content_type && !self.headers.contains(CONTENT_TYPE.as_str()) {
            match HeaderValue::from_str(&self.media_type) {
                Ok(value) => self.headers.set_raw(CONTENT_TYPE, value),
                Err(e) => tracing::warn!(
                    media_type = %self.media_type,
                    error = %e,
                    "media type is not a valid header value; content-type left unset"
                ),
            }
        }
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

    /// Renders the body, populates the derived headers, and returns the
    /// response as it will go on the wire.
    pub fn into_wire(mut self) -> ApiResult<WireResponse> {
        let body = self.render()?;
        self.populate_content(&body);
        Ok(WireResponse {
            status: self.status,
            headers: self.headers,
            body,
            background: self.background,
        })
    }

    /// Sends the envelope through `sender`: start, body, then background.
    pub async fn emit<S: Sender + ?Sized>(self, sender: &mut S) -> ApiResult<()> {
        self.into_wire()?.emit(sender).await
    }
}

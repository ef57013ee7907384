//! The incoming HTTP request.
//!
//! [`Request`] holds everything the handler layer reads from a request: the
//! method, path, query, headers, and the fully buffered body. The body is
//! parsed on demand, either as JSON ([`Request::json`]) or as a form
//! ([`Request::form`]).

use std::collections::HashMap;

use bytes::Bytes;
use http::header::{HeaderName, HeaderValue, CONTENT_TYPE, COOKIE};
use http::{HeaderMap, Method};
use serde_json::Value;

use crate::cookies;
use crate::form::FormData;
use crate::multipart::{self, MultipartError};

/// Why a request body could not be parsed.
#[derive(Debug, thiserror::Error)]
pub enum BodyError {
    /// The body is not valid JSON.
    #[error("invalid JSON body: {0}")]
    Json(#[from] serde_json::Error),
    /// The body is not a valid urlencoded form.
    #[error("invalid form body: {0}")]
    Form(String),
    /// The body is not a valid multipart form.
    #[error("invalid multipart body: {0}")]
    Multipart(#[from] MultipartError),
}

/// A parsed request body, as handed to the dependency resolver.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    /// A structured (JSON) body.
    Json(Value),
    /// A urlencoded or multipart form.
    Form(FormData),
}

impl RequestBody {
    /// The body as JSON. Forms are converted with [`FormData::to_json`].
    pub fn to_json(&self) -> Value {
        match self {
            Self::Json(value) => value.clone(),
            Self::Form(form) => form.to_json(),
        }
    }
}

/// An HTTP request with a buffered body.
///
/// # Examples
///
/// ```
/// use apiroute_http::Request;
///
/// let request = Request::builder()
///     .method(http::Method::POST)
///     .path("/items")
///     .query_string("verbose=1")
///     .json_body(&serde_json::json!({"name": "widget"}))
///     .build();
///
/// assert_eq!(request.path(), "/items");
/// assert_eq!(request.query().get("verbose").and_then(|v| v.as_text()), Some("1"));
/// assert_eq!(request.json().unwrap().unwrap()["name"], "widget");
/// ```
#[derive(Debug, Clone)]
pub struct Request {
    method: Method,
    path: String,
    query_string: String,
    query: FormData,
    headers: HeaderMap,
    body: Bytes,
    path_params: HashMap<String, String>,
}

impl Request {
    /// Creates a [`RequestBuilder`].
    pub fn builder() -> RequestBuilder {
        RequestBuilder::default()
    }

    /// Creates a request from axum request parts and the buffered body.
    pub fn from_parts(parts: http::request::Parts, body: Bytes) -> Self {
        let query_string = parts.uri.query().unwrap_or("").to_string();
        Self {
            method: parts.method,
            path: parts.uri.path().to_string(),
            query: FormData::parse_urlencoded(&query_string),
            query_string,
            headers: parts.headers,
            body,
            path_params: HashMap::new(),
        }
    }

    pub const fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// The raw query string, without the leading `?`.
    pub fn query_string(&self) -> &str {
        &self.query_string
    }

    /// The decoded query parameters.
    pub const fn query(&self) -> &FormData {
        &self.query
    }

    pub const fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Returns the header value as a string, if present and visible ASCII.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// The full `content-type` header value.
    pub fn content_type(&self) -> Option<&str> {
        self.headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok())
    }

    /// The parsed `content-type`, if present and well formed.
    pub fn media_type(&self) -> Option<mime::Mime> {
        self.content_type()?.parse::<mime::Mime>().ok()
    }

    /// The raw body bytes.
    pub const fn body(&self) -> &Bytes {
        &self.body
    }

    /// Path parameters captured by the router.
    pub const fn path_params(&self) -> &HashMap<String, String> {
        &self.path_params
    }

    /// Stores the router's captured path parameters.
    pub fn set_path_params(&mut self, params: HashMap<String, String>) {
        self.path_params = params;
    }

    /// Cookies sent with the request.
    pub fn cookies(&self) -> HashMap<String, String> {
        self.headers
            .get(COOKIE)
            .and_then(|v| v.to_str().ok())
            .map_or_else(HashMap::new, cookies::parse_cookie_header)
    }

    /// Parses the body as JSON.
    ///
    /// Returns `Ok(None)` for an empty body.
    pub fn json(&self) -> Result<Option<Value>, BodyError> {
        if self.body.is_empty() {
            return Ok(None);
        }
        Ok(Some(serde_json::from_slice(&self.body)?))
    }

    /// Parses the body as a form.
    ///
    /// `application/x-www-form-urlencoded` and `multipart/form-data` bodies are
    /// parsed; any other content type yields an empty form.
    pub fn form(&self) -> Result<FormData, BodyError> {
        let Some(media_type) = self.media_type() else {
            return Ok(FormData::new());
        };
        if media_type.type_() == mime::APPLICATION
            && media_type.subtype() == mime::WWW_FORM_URLENCODED
        {
            let text =
                std::str::from_utf8(&self.body).map_err(|e| BodyError::Form(e.to_string()))?;
            Ok(FormData::parse_urlencoded(text))
        } else if media_type.type_() == mime::MULTIPART && media_type.subtype() == mime::FORM_DATA
        {
            let boundary = self
                .content_type()
                .and_then(multipart::extract_boundary)
                .ok_or(MultipartError::MissingBoundary)?;
            Ok(multipart::parse_multipart(&self.body, boundary)?)
        } else {
            Ok(FormData::new())
        }
    }
}

/// Builder for [`Request`], mostly used by tests.
#[derive(Debug)]
pub struct RequestBuilder {
    method: Method,
    path: String,
    query_string: String,
    headers: HeaderMap,
    body: Bytes,
    path_params: HashMap<String, String>,
}

impl Default for RequestBuilder {
    fn default() -> Self {
        Self {
            method: Method::GET,
            path: "/".to_string(),
            query_string: String::new(),
            headers: HeaderMap::new(),
            body: Bytes::new(),
            path_params: HashMap::new(),
        }
    }
}

impl RequestBuilder {
    #[must_use]
    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    #[must_use]
    pub fn path(mut self, path: &str) -> Self {
        self.path = path.to_string();
        self
    }

    /// Sets the query string (without leading `?`).
    #[must_use]
    pub fn query_string(mut self, qs: &str) -> Self {
        self.query_string = qs.to_string();
        self
    }

    /// Adds a header. Invalid names or values are ignored.
    #[must_use]
    pub fn header(mut self, name: &str, value: &str) -> Self {
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            self.headers.append(name, value);
        }
        self
    }

    #[must_use]
    pub fn content_type(self, content_type: &str) -> Self {
        self.header(CONTENT_TYPE.as_str(), content_type)
    }

    #[must_use]
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Sets a JSON body and the `application/json` content type.
    #[must_use]
    pub fn json_body(self, value: &Value) -> Self {
        self.content_type("application/json")
            .body(value.to_string().into_bytes())
    }

    /// Sets a urlencoded form body and its content type.
    #[must_use]
    pub fn form_body(self, pairs: &[(&str, &str)]) -> Self {
        let encoded = pairs
            .iter()
            .map(|(k, v)| format!("{}={}", encode_component(k), encode_component(v)))
            .collect::<Vec<_>>()
            .join("&");
        self.content_type("application/x-www-form-urlencoded")
            .body(encoded.into_bytes())
    }

    #[must_use]
    pub fn path_param(mut self, name: &str, value: &str) -> Self {
        self.path_params.insert(name.to_string(), value.to_string());
        self
    }

    pub fn build(self) -> Request {
        Request {
            method: self.method,
            path: self.path,
            query: FormData::parse_urlencoded(&self.query_string),
            query_string: self.query_string,
            headers: self.headers,
            body: self.body,
            path_params: self.path_params,
        }
    }
}

fn encode_component(input: &str) -> String {
    percent_encoding::utf8_percent_encode(input, percent_encoding::NON_ALPHANUMERIC).to_string()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_from_parts() {
        let (parts, ()) = http::Request::builder()
            .method(Method::PUT)
            .uri("/things/3?x=1&x=2")
            .header("Cookie", "sid=abc; theme=dark")
            .body(())
            .unwrap()
            .into_parts();
        let request = Request::from_parts(parts, Bytes::from_static(b"{}"));
        assert_eq!(request.method(), Method::PUT);
        assert_eq!(request.path(), "/things/3");
        assert_eq!(request.query_string(), "x=1&x=2");
        assert_eq!(request.query().get_list("x"), vec!["1", "2"]);
        assert_eq!(request.cookies()["theme"], "dark");
        assert_eq!(request.json().unwrap(), Some(json!({})));
    }

    #[test]
    fn test_json_empty_body_is_none() {
        let request = Request::builder().content_type("application/json").build();
        assert!(request.json().unwrap().is_none());
    }

    #[test]
    fn test_json_malformed() {
        let request = Request::builder().body(&b"{not json"[..]).build();
        assert!(matches!(request.json(), Err(BodyError::Json(_))));
    }

    #[test]
    fn test_form_urlencoded() {
        let request = Request::builder()
            .form_body(&[("name", "Ada L"), ("lang", "en&fr")])
            .build();
        let form = request.form().unwrap();
        assert_eq!(form.get("name").unwrap().as_text(), Some("Ada L"));
        assert_eq!(form.get("lang").unwrap().as_text(), Some("en&fr"));
    }

    #[test]
    fn test_form_urlencoded_invalid_utf8() {
        let request = Request::builder()
            .content_type("application/x-www-form-urlencoded")
            .body(vec![b'a', b'=', 0xff])
            .build();
        assert!(matches!(request.form(), Err(BodyError::Form(_))));
    }

    #[test]
    fn test_form_multipart() {
        let body = "--b1\r\nContent-Disposition: form-data; name=\"n\"\r\n\r\nv\r\n--b1--\r\n";
        let request = Request::builder()
            .content_type("multipart/form-data; boundary=b1")
            .body(body.as_bytes().to_vec())
            .build();
        assert_eq!(request.form().unwrap().get_list("n"), vec!["v"]);
    }

    #[test]
    fn test_form_multipart_without_boundary() {
        let request = Request::builder()
            .content_type("multipart/form-data")
            .body(b"--x".to_vec())
            .build();
        assert!(matches!(
            request.form(),
            Err(BodyError::Multipart(MultipartError::MissingBoundary))
        ));
    }

    #[test]
    fn test_form_other_content_type_is_empty() {
        let request = Request::builder().json_body(&json!({"a": 1})).build();
        assert!(request.form().unwrap().is_empty());
    }

    #[test]
    fn test_request_body_to_json() {
        let form = FormData::parse_urlencoded("a=1");
        assert_eq!(RequestBody::Form(form).to_json(), json!({"a": "1"}));
        assert_eq!(RequestBody::Json(json!([1])).to_json(), json!([1]));
    }
}

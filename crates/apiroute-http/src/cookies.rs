//! Cookie handling for the apiroute HTTP layer.
//!
//! [`Cookie`] builds `Set-Cookie` header values for responses and envelopes;
//! [`parse_cookie_header`] reads the request-side `Cookie` header. Only
//! attributes that were explicitly requested are emitted.

use std::collections::HashMap;
use std::fmt::Write as _;

use chrono::{Duration, Utc};

/// The `expires` value used when deleting a cookie.
pub const EPOCH_HTTP_DATE: &str = "Thu, 01 Jan 1970 00:00:00 GMT";

const HTTP_DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";

/// A cookie to be set on an HTTP response.
///
/// # Examples
///
/// ```
/// use apiroute_http::Cookie;
///
/// let cookie = Cookie::new("session", "abc123").max_age(3600).httponly(true);
/// assert_eq!(
///     cookie.to_set_cookie_header(),
///     "session=abc123; Max-Age=3600; Path=/; HttpOnly"
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cookie {
    /// The cookie name.
    pub name: String,
    /// The cookie value.
    pub value: String,
    /// Maximum age in seconds. `None` means the attribute is omitted.
    pub max_age: Option<i64>,
    /// Expiration date string (HTTP date format).
    pub expires: Option<String>,
    /// The path for which the cookie is valid. Defaults to `/`.
    pub path: Option<String>,
    /// The domain for which the cookie is valid.
    pub domain: Option<String>,
    /// Whether the cookie should only be sent over HTTPS.
    pub secure: bool,
    /// Whether the cookie is inaccessible to JavaScript.
    pub httponly: bool,
}

impl Cookie {
    /// Creates a new cookie with path `/` and no other attributes.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            max_age: None,
            expires: None,
            path: Some("/".to_string()),
            domain: None,
            secure: false,
            httponly: false,
        }
    }

    /// Builds a cookie that tells the client to drop `name` immediately.
    ///
    /// `path` defaults to `/`.
    pub fn deletion(name: impl Into<String>, path: Option<&str>, domain: Option<&str>) -> Self {
        Self {
            name: name.into(),
            value: String::new(),
            max_age: Some(0),
            expires: Some(EPOCH_HTTP_DATE.to_string()),
            path: Some(path.unwrap_or("/").to_string()),
            domain: domain.map(str::to_string),
            secure: false,
            httponly: false,
        }
    }

    /// Sets the max age.
    #[must_use]
    pub const fn max_age(mut self, max_age: i64) -> Self {
        self.max_age = Some(max_age);
        self
    }

    /// Sets the expires date string verbatim.
    #[must_use]
    pub fn expires(mut self, expires: impl Into<String>) -> Self {
        self.expires = Some(expires.into());
        self
    }

    /// Sets `expires` to the HTTP date `seconds` from now.
    #[must_use]
    pub fn expires_in(mut self, seconds: i64) -> Self {
        let at = Utc::now() + Duration::seconds(seconds);
        self.expires = Some(at.format(HTTP_DATE_FORMAT).to_string());
        self
    }

    /// Sets the path. `None` omits the attribute.
    #[must_use]
    pub fn path(mut self, path: Option<&str>) -> Self {
        self.path = path.map(str::to_string);
        self
    }

    /// Sets the domain.
    #[must_use]
    pub fn domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    /// Sets the secure flag.
    #[must_use]
    pub const fn secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    /// Sets the httponly flag.
    #[must_use]
    pub const fn httponly(mut self, httponly: bool) -> Self {
        self.httponly = httponly;
        self
    }

    /// Formats this cookie as a `Set-Cookie` header value.
    pub fn to_set_cookie_header(&self) -> String {
        let mut out = format!("{}={}", self.name, quote_value(&self.value));

        if let Some(max_age) = self.max_age {
            let _ = write!(out, "; Max-Age={max_age}");
        }
        if let Some(ref expires) = self.expires {
            let _ = write!(out, "; expires={expires}");
        }
        if let Some(ref path) = self.path {
            let _ = write!(out, "; Path={path}");
        }
        if let Some(ref domain) = self.domain {
            let _ = write!(out, "; Domain={domain}");
        }
        if self.secure {
            out.push_str("; Secure");
        }
        if self.httponly {
            out.push_str("; HttpOnly");
        }
        out
    }
}

fn is_cookie_octet(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~:/?@[]{}<>=()".contains(&b)
}

/// Wraps values containing separators or non-ASCII bytes in double quotes.
///
/// Inside the quotes `"` and `\` are backslash-escaped and bytes outside
/// printable ASCII become `\ooo` octal escapes, so the result is always a
/// valid header value.
fn quote_value(value: &str) -> String {
    if value.bytes().all(is_cookie_octet) {
        return value.to_string();
    }
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for b in value.bytes() {
        match b {
            b'"' => out.push_str("\\\""),
            b'\\' => out.push_str("\\\\"),
            0x20..=0x7e => out.push(char::from(b)),
            _ => {
                let _ = write!(out, "\\{b:03o}");
            }
        }
    }
    out.push('"');
    out
}

/// Parses a `Cookie` header value into a map of name-value pairs.
///
/// Malformed entries (no `=`) are skipped; surrounding double quotes on a
/// value are removed.
pub fn parse_cookie_header(header: &str) -> HashMap<String, String> {
    let mut cookies = HashMap::new();

    for part in header.split(';') {
        let Some((name, value)) = part.trim().split_once('=') else {
            continue;
        };
        let name = name.trim();
        if name.is_empty() {
            continue;
        }
        let value = value.trim();
        let value = value
            .strip_prefix('"')
            .and_then(|v| v.strip_suffix('"'))
            .unwrap_or(value);
        cookies.insert(name.to_string(), value.to_string());
    }

    cookies
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_multiple_cookies() {
        let cookies = parse_cookie_header("name1=value1; name2=value2;name3=value3");
        assert_eq!(cookies.len(), 3);
        assert_eq!(cookies["name2"], "value2");
        assert_eq!(cookies["name3"], "value3");
    }

    #[test]
    fn test_parse_malformed_and_empty() {
        let cookies = parse_cookie_header("valid=yes; noequals; =orphan; ;");
        assert_eq!(cookies.len(), 1);
        assert_eq!(cookies["valid"], "yes");
        assert!(parse_cookie_header("").is_empty());
    }

    #[test]
    fn test_parse_keeps_equals_and_strips_quotes() {
        let cookies = parse_cookie_header("token=a=b=c; msg=\"hello world\"");
        assert_eq!(cookies["token"], "a=b=c");
        assert_eq!(cookies["msg"], "hello world");
    }

    #[test]
    fn test_cookie_default_has_only_path() {
        assert_eq!(Cookie::new("a", "1").to_set_cookie_header(), "a=1; Path=/");
    }

    #[test]
    fn test_cookie_without_path() {
        let cookie = Cookie::new("a", "1").path(None);
        assert_eq!(cookie.to_set_cookie_header(), "a=1");
    }

    #[test]
    fn test_cookie_full_attributes() {
        let cookie = Cookie::new("sid", "xyz")
            .max_age(60)
            .expires("Wed, 21 Oct 2026 07:28:00 GMT")
            .path(Some("/api"))
            .domain("example.com")
            .secure(true)
            .httponly(true);
        assert_eq!(
            cookie.to_set_cookie_header(),
            "sid=xyz; Max-Age=60; expires=Wed, 21 Oct 2026 07:28:00 GMT; Path=/api; \
             Domain=example.com; Secure; HttpOnly"
        );
    }

    #[test]
    fn test_deletion_cookie() {
        let header = Cookie::deletion("sid", Some("/"), None).to_set_cookie_header();
        assert_eq!(
            header,
            "sid=; Max-Age=0; expires=Thu, 01 Jan 1970 00:00:00 GMT; Path=/"
        );
    }

    #[test]
    fn test_deletion_defaults_to_root_path() {
        let header = Cookie::deletion("sid", None, None).to_set_cookie_header();
        assert_eq!(
            header,
            "sid=; Max-Age=0; expires=Thu, 01 Jan 1970 00:00:00 GMT; Path=/"
        );

        let scoped = Cookie::deletion("sid", Some("/api"), Some("example.com"));
        assert!(scoped.to_set_cookie_header().ends_with("; Path=/api; Domain=example.com"));
    }

    #[test]
    fn test_expires_in_is_http_date() {
        let cookie = Cookie::new("a", "1").expires_in(3600);
        let expires = cookie.expires.unwrap();
        assert!(expires.ends_with(" GMT"));
        assert!(chrono::NaiveDateTime::parse_from_str(&expires, HTTP_DATE_FORMAT).is_ok());
    }

    #[test]
    fn test_value_quoting() {
        assert_eq!(quote_value("plain-value_1"), "plain-value_1");
        assert_eq!(quote_value("a b"), "\"a b\"");
        assert_eq!(quote_value("say \"hi\""), "\"say \\\"hi\\\"\"");
        assert_eq!(quote_value("a;b"), "\"a;b\"");
        assert_eq!(quote_value("é"), "\"\\303\\251\"");
    }

    #[test]
    fn test_quoted_header_is_valid_header_value() {
        let header = Cookie::new("n", "ünïcode; x").to_set_cookie_header();
        assert!(http::HeaderValue::from_str(&header).is_ok());
    }
}

//! An ordered, case-insensitive header list.
//!
//! [`Headers`] keeps headers in insertion order as raw `(name, value)` pairs,
//! the shape the send protocol puts on the wire. Names are normalized to
//! lower case on insertion (via [`HeaderName`]), so lookups are
//! case-insensitive. Unlike [`http::HeaderMap`] it distinguishes between
//! [`set`](Headers::set) (replace) and [`append`](Headers::append) (add another
//! value), which `set-cookie` relies on.

use http::header::{HeaderName, HeaderValue, CONTENT_LENGTH, SET_COOKIE};

use apiroute_core::{ApiError, ApiResult};

/// An ordered list of header pairs with case-insensitive lookup.
///
/// # Examples
///
/// ```
/// use apiroute_http::Headers;
///
/// let mut headers = Headers::new();
/// headers.set("X-Trace", "abc").unwrap();
/// assert!(headers.contains("x-trace"));
/// assert_eq!(headers.get_str("X-TRACE"), Some("abc"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: Vec<(HeaderName, HeaderValue)>,
}

impl Headers {
    /// Creates an empty header list.
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Builds a header list from string pairs, preserving their order.
    pub fn from_pairs<I, K, V>(pairs: I) -> ApiResult<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut headers = Self::new();
        for (name, value) in pairs {
            headers.append(name.as_ref(), value.as_ref())?;
        }
        Ok(headers)
    }

    /// Returns `true` if at least one header with this name is present.
    pub fn contains(&self, name: &str) -> bool {
        self.entries
            .iter()
            .any(|(n, _)| n.as_str().eq_ignore_ascii_case(name))
    }

    /// Returns the first value for `name`.
    pub fn get(&self, name: &str) -> Option<&HeaderValue> {
        self.entries
            .iter()
            .find(|(n, _)| n.as_str().eq_ignore_ascii_case(name))
            .map(|(_, v)| v)
    }

    /// Returns the first value for `name` if it is valid visible ASCII.
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(|v| v.to_str().ok())
    }

    /// Returns every value for `name`, in insertion order.
    pub fn get_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a HeaderValue> + 'a {
        self.entries
            .iter()
            .filter(move |(n, _)| n.as_str().eq_ignore_ascii_case(name))
            .map(|(_, v)| v)
    }

    /// Sets `name` to a single value.
    ///
    /// The first existing entry is overwritten in place and any further
    /// entries with the same name are removed; otherwise the pair is appended.
    pub fn set(&mut self, name: &str, value: &str) -> ApiResult<()> {
        let (name, value) = parse_pair(name, value)?;
        self.set_raw(name, value);
        Ok(())
    }

    /// Like [`set`](Self::set) for already-validated header types.
    pub fn set_raw(&mut self, name: HeaderName, value: HeaderValue) {
        let mut slot = Some(value);
        self.entries.retain_mut(|(n, v)| {
            if *n != name {
                return true;
            }
            match slot.take() {
                Some(new_value) => {
                    *v = new_value;
                    true
                }
                None => false,
            }
        });
        if let Some(value) = slot {
            self.entries.push((name, value));
        }
    }

    /// Appends another value for `name`, keeping existing ones.
    pub fn append(&mut self, name: &str, value: &str) -> ApiResult<()> {
        let (name, value) = parse_pair(name, value)?;
        self.entries.push((name, value));
        Ok(())
    }

    /// Like [`append`](Self::append) for already-validated header types.
    pub fn append_raw(&mut self, name: HeaderName, value: HeaderValue) {
        self.entries.push((name, value));
    }

    /// Removes every entry named `name`, returning how many were removed.
    pub fn remove(&mut self, name: &str) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|(n, _)| !n.as_str().eq_ignore_ascii_case(name));
        before - self.entries.len()
    }

    /// Merges headers from `other` (a dependency sub-response) into `self`.
    ///
    /// - `set-cookie` values are appended, so cookies from both sides survive.
    /// - `content-length` is skipped: the body, and therefore its length, is
    ///   owned by `self`.
    /// - Every other name replaces the existing value(s) in `self`, and when
    ///   `other` carries several values for a name, all of them are kept.
    pub fn merge_from(&mut self, other: &Self) {
        let mut replaced: Vec<&HeaderName> = Vec::new();
        for (name, value) in &other.entries {
            if *name == CONTENT_LENGTH {
                continue;
            }
            if *name == SET_COOKIE || replaced.contains(&name) {
                self.entries.push((name.clone(), value.clone()));
            } else {
                self.set_raw(name.clone(), value.clone());
                replaced.push(name);
            }
        }
    }

    /// Returns an iterator over `(name, value)` pairs in order.
    pub fn iter(&self) -> impl Iterator<Item = (&HeaderName, &HeaderValue)> {
        self.entries.iter().map(|(n, v)| (n, v))
    }

    /// Returns the number of entries (not distinct names).
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if there are no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Consumes the list and returns the raw pairs.
    pub fn into_pairs(self) -> Vec<(HeaderName, HeaderValue)> {
        self.entries
    }
}

fn parse_pair(name: &str, value: &str) -> ApiResult<(HeaderName, HeaderValue)> {
    let header_name = HeaderName::from_bytes(name.as_bytes())
        .map_err(|e| ApiError::InvalidHeader(format!("{name:?}: {e}")))?;
    let header_value = HeaderValue::from_str(value)
        .map_err(|e| ApiError::InvalidHeader(format!("{name}: {e}")))?;
    Ok((header_name, header_value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_are_lowercased() {
        let mut headers = Headers::new();
        headers.set("Content-Type", "text/plain").unwrap();
        let (name, _) = headers.iter().next().unwrap();
        assert_eq!(name.as_str(), "content-type");
        assert!(headers.contains("CONTENT-TYPE"));
    }

    #[test]
    fn test_set_replaces_in_place() {
        let mut headers = Headers::from_pairs([("a", "1"), ("b", "2"), ("a", "3")]).unwrap();
        headers.set("A", "9").unwrap();
        let pairs: Vec<_> = headers
            .iter()
            .map(|(n, v)| (n.as_str().to_string(), v.to_str().unwrap().to_string()))
            .collect();
        assert_eq!(pairs, vec![("a".into(), "9".into()), ("b".into(), "2".into())]);
    }

    #[test]
    fn test_set_appends_when_missing() {
        let mut headers = Headers::new();
        headers.set("x-one", "1").unwrap();
        headers.set("x-two", "2").unwrap();
        assert_eq!(headers.len(), 2);
        assert_eq!(headers.get_str("x-two"), Some("2"));
    }

    #[test]
    fn test_append_keeps_duplicates() {
        let mut headers = Headers::new();
        headers.append("set-cookie", "a=1").unwrap();
        headers.append("Set-Cookie", "b=2").unwrap();
        let values: Vec<_> = headers.get_all("set-cookie").collect();
        assert_eq!(values.len(), 2);
        assert_eq!(headers.get_str("set-cookie"), Some("a=1"));
    }

    #[test]
    fn test_remove() {
        let mut headers = Headers::from_pairs([("a", "1"), ("A", "2"), ("b", "3")]).unwrap();
        assert_eq!(headers.remove("a"), 2);
        assert!(!headers.contains("a"));
        assert_eq!(headers.len(), 1);
    }

    #[test]
    fn test_invalid_header_name() {
        let mut headers = Headers::new();
        let err = headers.set("bad header", "x").unwrap_err();
        assert!(matches!(err, ApiError::InvalidHeader(_)));
    }

    #[test]
    fn test_invalid_header_value() {
        let mut headers = Headers::new();
        assert!(headers.append("x-bad", "line\nbreak").is_err());
    }

    #[test]
    fn test_merge_replaces_same_name() {
        let mut target = Headers::from_pairs([("content-type", "application/json")]).unwrap();
        let sub = Headers::from_pairs([("content-type", "application/vnd.api+json")]).unwrap();
        target.merge_from(&sub);
        assert_eq!(target.get_all("content-type").count(), 1);
        assert_eq!(target.get_str("content-type"), Some("application/vnd.api+json"));
    }

    #[test]
    fn test_merge_appends_cookies() {
        let mut target = Headers::from_pairs([("set-cookie", "a=1")]).unwrap();
        let sub = Headers::from_pairs([("set-cookie", "b=2"), ("set-cookie", "c=3")]).unwrap();
        target.merge_from(&sub);
        assert_eq!(target.get_all("set-cookie").count(), 3);
    }

    #[test]
    fn test_merge_keeps_multiple_values_from_sub() {
        let mut target = Headers::from_pairs([("vary", "origin")]).unwrap();
        let sub = Headers::from_pairs([("vary", "accept"), ("vary", "cookie")]).unwrap();
        target.merge_from(&sub);
        let values: Vec<_> = target.get_all("vary").map(|v| v.to_str().unwrap()).collect();
        assert_eq!(values, vec!["accept", "cookie"]);
    }

    #[test]
    fn test_merge_skips_content_length() {
        let mut target = Headers::from_pairs([("content-length", "7")]).unwrap();
        let sub = Headers::from_pairs([("content-length", "999"), ("x-trace", "abc")]).unwrap();
        target.merge_from(&sub);
        assert_eq!(target.get_str("content-length"), Some("7"));
        assert_eq!(target.get_str("x-trace"), Some("abc"));
    }
}

//! Form data: query strings, urlencoded bodies, and multipart fields.
//!
//! [`FormData`] keeps every `(name, value)` pair in arrival order, so repeated
//! names stay distinct and [`FormData::get_list`] returns them in order.

use serde_json::{json, Map, Value};

/// A file uploaded through a multipart form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    /// The client-supplied filename.
    pub filename: String,
    /// The part's content type, `application/octet-stream` when absent.
    pub content_type: String,
    /// The raw file bytes.
    pub content: Vec<u8>,
}

impl UploadedFile {
    /// The file size in bytes.
    pub fn size(&self) -> usize {
        self.content.len()
    }
}

/// A single form value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormValue {
    /// A text field.
    Text(String),
    /// An uploaded file.
    File(UploadedFile),
}

impl FormValue {
    /// The text content, or `None` for files.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            Self::File(_) => None,
        }
    }

    /// The uploaded file, or `None` for text fields.
    pub const fn as_file(&self) -> Option<&UploadedFile> {
        match self {
            Self::File(f) => Some(f),
            Self::Text(_) => None,
        }
    }

    fn to_json(&self) -> Value {
        match self {
            Self::Text(s) => Value::String(s.clone()),
            Self::File(f) => json!({
                "filename": f.filename,
                "content_type": f.content_type,
                "size": f.size(),
            }),
        }
    }
}

/// An ordered multi-value form.
///
/// # Examples
///
/// ```
/// use apiroute_http::FormData;
///
/// let form = FormData::parse_urlencoded("tag=a&tag=b&name=J%C3%BCrgen+K");
/// assert_eq!(form.get_list("tag"), vec!["a", "b"]);
/// assert_eq!(form.get("name").and_then(|v| v.as_text()), Some("Jürgen K"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormData {
    entries: Vec<(String, FormValue)>,
}

impl FormData {
    /// Creates an empty form.
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Parses `application/x-www-form-urlencoded` data (also used for query
    /// strings). `+` decodes to a space; invalid UTF-8 is replaced.
    pub fn parse_urlencoded(input: &str) -> Self {
        let mut form = Self::new();
        for pair in input.split('&').filter(|p| !p.is_empty()) {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            form.push_text(decode_component(key), decode_component(value));
        }
        form
    }

    /// Appends a text value.
    pub fn push_text(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entries
            .push((name.into(), FormValue::Text(value.into())));
    }

    /// Appends an uploaded file.
    pub fn push_file(&mut self, name: impl Into<String>, file: UploadedFile) {
        self.entries.push((name.into(), FormValue::File(file)));
    }

    /// Returns the last value for `name`.
    pub fn get(&self, name: &str) -> Option<&FormValue> {
        self.entries
            .iter()
            .rev()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    /// Returns every text value for `name`, in order. Files are skipped.
    pub fn get_list(&self, name: &str) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|(n, _)| n == name)
            .filter_map(|(_, v)| v.as_text())
            .collect()
    }

    /// Returns every uploaded file for `name`, in order.
    pub fn files(&self, name: &str) -> Vec<&UploadedFile> {
        self.entries
            .iter()
            .filter(|(n, _)| n == name)
            .filter_map(|(_, v)| v.as_file())
            .collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|(n, _)| n == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FormValue)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Converts to a JSON object.
    ///
    /// A name seen once maps to its value; a repeated name maps to an array.
    /// Files become `{"filename", "content_type", "size"}` objects.
    pub fn to_json(&self) -> Value {
        let mut out = Map::new();
        for (name, value) in &self.entries {
            let value = value.to_json();
            match out.get_mut(name) {
                Some(Value::Array(items)) => items.push(value),
                Some(existing) => {
                    let first = existing.take();
                    *existing = Value::Array(vec![first, value]);
                }
                None => {
                    out.insert(name.clone(), value);
                }
            }
        }
        Value::Object(out)
    }
}

fn decode_component(input: &str) -> String {
    let plus_decoded = input.replace('+', " ");
    percent_encoding::percent_decode_str(&plus_decoded)
        .decode_utf8_lossy()
        .into_owned()
}

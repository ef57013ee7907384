//! `multipart/form-data` parsing.
//!
//! The parser works on raw bytes so binary uploads survive untouched. Any
//! structural problem (missing boundary, unterminated part, part without a
//! name) is an error rather than a silently shortened form.

use crate::form::{FormData, UploadedFile};

/// Why a multipart body could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MultipartError {
    #[error("content type has no boundary parameter")]
    MissingBoundary,
    #[error("body does not start with the boundary delimiter")]
    MissingOpeningDelimiter,
    #[error("part {0} has no header terminator")]
    MalformedHeaders(usize),
    #[error("part {0} is not terminated by a boundary delimiter")]
    UnterminatedPart(usize),
    #[error("part {0} has no content-disposition name")]
    MissingName(usize),
    #[error("text field {0:?} is not valid UTF-8")]
    InvalidUtf8(String),
}

/// Extracts the `boundary` parameter from a multipart content type.
pub fn extract_boundary(content_type: &str) -> Option<&str> {
    content_type.split(';').skip(1).find_map(|param| {
        let (key, value) = param.trim().split_once('=')?;
        if !key.trim().eq_ignore_ascii_case("boundary") {
            return None;
        }
        let value = value.trim().trim_matches('"');
        (!value.is_empty()).then_some(value)
    })
}

/// Parses a multipart body delimited by `boundary`.
///
/// An entirely empty body yields an empty form.
pub fn parse_multipart(body: &[u8], boundary: &str) -> Result<FormData, MultipartError> {
    let mut form = FormData::new();
    if body.is_empty() {
        return Ok(form);
    }

    let delimiter = format!("--{boundary}");
    let next_delimiter = format!("\r\n--{boundary}");

    let start = find(body, delimiter.as_bytes()).ok_or(MultipartError::MissingOpeningDelimiter)?;
    let mut pos = start + delimiter.len();
    let mut index = 0;

    loop {
        let rest = &body[pos..];
        if rest.starts_with(b"--") {
            break;
        }
        let rest = rest
            .strip_prefix(b"\r\n")
            .ok_or(MultipartError::MalformedHeaders(index))?;
        let header_end = find(rest, b"\r\n\r\n").ok_or(MultipartError::MalformedHeaders(index))?;
        let headers = String::from_utf8_lossy(&rest[..header_end]);
        let content_start = header_end + 4;
        let content_len = find(&rest[content_start..], next_delimiter.as_bytes())
            .ok_or(MultipartError::UnterminatedPart(index))?;
        let content = &rest[content_start..content_start + content_len];

        let part = PartHeaders::parse(&headers);
        let name = part.name.ok_or(MultipartError::MissingName(index))?;
        match part.filename {
            Some(filename) if filename.is_empty() && content.is_empty() => {}
            Some(filename) => form.push_file(
                name,
                UploadedFile {
                    filename,
                    content_type: part
                        .content_type
                        .unwrap_or_else(|| "application/octet-stream".to_string()),
                    content: content.to_vec(),
                },
            ),
            None => {
                let text = std::str::from_utf8(content)
                    .map_err(|_| MultipartError::InvalidUtf8(name.clone()))?;
                form.push_text(name, text);
            }
        }

        // Consumed: "\r\n" prefix, headers, blank line, content, "\r\n--boundary".
        pos += 2 + content_start + content_len + next_delimiter.len();
        index += 1;
        if pos >= body.len() {
            return Err(MultipartError::UnterminatedPart(index));
        }
    }

    Ok(form)
}

#[derive(Default)]
struct PartHeaders {
    name: Option<String>,
    filename: Option<String>,
    content_type: Option<String>,
}

impl PartHeaders {
    fn parse(block: &str) -> Self {
        let mut headers = Self::default();
        for line in block.split("\r\n") {
            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let key = key.trim();
            if key.eq_ignore_ascii_case("content-disposition") {
                headers.name = disposition_param(value, "name");
                headers.filename = disposition_param(value, "filename");
            } else if key.eq_ignore_ascii_case("content-type") {
                headers.content_type = Some(value.trim().to_string());
            }
        }
        headers
    }
}

/// Reads `param` from a `form-data; name="x"; filename="y"` value.
fn disposition_param(value: &str, param: &str) -> Option<String> {
    value.split(';').skip(1).find_map(|p| {
        let (key, raw) = p.trim().split_once('=')?;
        key.trim()
            .eq_ignore_ascii_case(param)
            .then(|| raw.trim().trim_matches('"').to_string())
    })
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}

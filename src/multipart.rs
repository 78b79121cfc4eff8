//! Hand-rolled `multipart/form-data` parsing for file uploads.
//!
//! The parser is deliberately lenient: segments that lack a header/body
//! separator or a `name` attribute are dropped rather than failing the whole
//! request, so a mostly-well-formed body still yields the fields that parsed.
//! Only a missing `boundary=` parameter is fatal.
//!
//! Binary safety is the invariant throughout — the boundary is matched as a
//! literal byte sequence (never a regex over the body), and field data is kept
//! as raw bytes with no UTF-8 assumption.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::ServiceError;

/// A single decoded form field.
///
/// A field with `filename` present is a file upload; without it, a plain form
/// value. `data` may be empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultipartField {
    /// Client-supplied filename for file uploads.
    pub filename: Option<String>,
    /// Raw field bytes, exactly as sent.
    pub data: Vec<u8>,
}

/// Decoded form: field name → field. Last occurrence wins on duplicate names.
pub type ParsedForm = HashMap<String, MultipartField>;

// Attribute extraction applies to the part's decoded header block only.
// The `name` pattern anchors on a preceding `;` or line start so it cannot
// match the tail of `filename=`.
static NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?:^|;)\s*name="([^"]+)""#).expect("invalid name regex"));
static FILENAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"filename="([^"]+)""#).expect("invalid filename regex"));

/// Extract the boundary token from a `Content-Type` header value.
///
/// Takes the substring after `boundary=` and strips surrounding quotes if
/// present. Returns `None` when the parameter is absent or empty.
fn extract_boundary(content_type: &str) -> Option<String> {
    let raw = content_type.split_once("boundary=")?.1.trim();
    let boundary = raw
        .strip_prefix('"')
        .and_then(|r| r.strip_suffix('"'))
        .unwrap_or(raw);
    if boundary.is_empty() {
        None
    } else {
        Some(boundary.to_string())
    }
}

/// Find the first occurrence of `needle` in `haystack`.
fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// Split `body` on every literal occurrence of `delim`.
fn split_on(body: &[u8], delim: &[u8]) -> Vec<Vec<u8>> {
    let mut segments = Vec::new();
    let mut rest = body;
    while let Some(pos) = find(rest, delim) {
        segments.push(rest[..pos].to_vec());
        rest = &rest[pos + delim.len()..];
    }
    segments.push(rest.to_vec());
    segments
}

/// Strip the boundary-split remnant from a part body.
///
/// Each part's payload is followed by a CRLF that belongs to the delimiter
/// line, not to the field data. Exactly one trailing `\r\n` (or bare `\n`
/// from non-conformant producers) is removed; everything else is field bytes.
fn strip_delimiter_remnant(payload: &[u8]) -> &[u8] {
    if let Some(rest) = payload.strip_suffix(b"\r\n") {
        rest
    } else if let Some(rest) = payload.strip_suffix(b"\n") {
        rest
    } else {
        payload
    }
}

/// Parse a `multipart/form-data` body into a [`ParsedForm`].
///
/// # Errors
///
/// Returns [`ServiceError::MalformedRequest`] when `content_type` carries no
/// `boundary=` parameter. Malformed individual segments are skipped, never
/// fatal.
pub fn parse_form(body: &[u8], content_type: &str) -> Result<ParsedForm, ServiceError> {
    let boundary = extract_boundary(content_type).ok_or_else(|| {
        ServiceError::MalformedRequest("No boundary found in Content-Type".to_string())
    })?;

    let delim = [b"--", boundary.as_bytes()].concat();
    let mut form = ParsedForm::new();

    for part in split_on(body, &delim) {
        let trimmed = part.trim_ascii();
        // Preamble, epilogue, and the closing `--` delimiter segment.
        if trimmed.is_empty() || trimmed == b"--" {
            continue;
        }

        // Header/body separator: CRLFCRLF preferred, bare LFLF fallback.
        let (head, payload) = if let Some(pos) = find(&part, b"\r\n\r\n") {
            (&part[..pos], &part[pos + 4..])
        } else if let Some(pos) = find(&part, b"\n\n") {
            (&part[..pos], &part[pos + 2..])
        } else {
            tracing::debug!(part_len = part.len(), "Dropping multipart segment without header separator");
            continue;
        };

        // Header bytes may be arbitrarily broken; replace invalid sequences
        // rather than failing.
        let head_text = String::from_utf8_lossy(head);
        if !head_text.contains("Content-Disposition: form-data") {
            continue;
        }
        let Some(name) = NAME_RE
            .captures(&head_text)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
        else {
            tracing::debug!("Dropping multipart segment without a field name");
            continue;
        };
        let filename = FILENAME_RE
            .captures(&head_text)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string());

        let data = strip_delimiter_remnant(payload).to_vec();
        form.insert(name, MultipartField { filename, data });
    }

    Ok(form)
}

//! Raw HTTP request extraction used by `AppService`.

use may_minihttp::Request;
use std::collections::HashMap;
use std::io::Read;
use tracing::debug;

/// Parsed HTTP request data.
///
/// The body is kept as raw bytes: `/transcribe` carries binary multipart
/// payloads, so nothing here may assume UTF-8.
#[derive(Debug, PartialEq)]
pub struct ParsedRequest {
    /// HTTP method (GET, POST, etc.)
    pub method: String,
    /// Request path without the query string
    pub path: String,
    /// HTTP headers (lowercase keys)
    pub headers: HashMap<String, String>,
    /// Declared Content-Length, when present and numeric
    pub content_length: Option<usize>,
    /// Raw request body, at most `content_length` bytes
    pub body: Vec<u8>,
}

impl ParsedRequest {
    /// Get a header by its lowercase name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }
}

/// Extract method, path, headers, and the raw body from a
/// `may_minihttp::Request`.
///
/// Reads exactly the declared `Content-Length` bytes — never more, so a
/// pipelined follow-up request is not consumed, and never beyond what the
/// peer actually sent.
pub fn parse_request(req: Request) -> ParsedRequest {
    let method = req.method().to_string();
    let raw_path = req.path().to_string();
    let path = raw_path.split('?').next().unwrap_or("/").to_string();

    let headers: HashMap<String, String> = req
        .headers()
        .iter()
        .map(|h| {
            (
                h.name.to_ascii_lowercase(),
                String::from_utf8_lossy(h.value).to_string(),
            )
        })
        .collect();

    let content_length = headers
        .get("content-length")
        .and_then(|v| v.trim().parse::<usize>().ok());

    let mut body = Vec::new();
    if let Some(len) = content_length {
        if len > 0 {
            body.reserve(len);
            if let Err(e) = req.body().take(len as u64).read_to_end(&mut body) {
                debug!(error = %e, "Request body read failed");
                body.clear();
            }
        }
    }

    debug!(
        method = %method,
        path = %path,
        header_count = headers.len(),
        body_bytes = body.len(),
        "HTTP request parsed"
    );

    ParsedRequest {
        method,
        path,
        headers,
        content_length,
        body,
    }
}

use std::collections::HashMap;

use crate::error::{Result, StatusError};

/// A request head as parsed from the header block.
///
/// Header names are stored upper-cased; [`Request::header`] normalizes the
/// lookup key the same way, so lookups are case-insensitive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Request {
    /// Request method token, as sent (e.g. "GET", "POST")
    pub method: String,
    /// Raw request target (e.g. "/run?id=7")
    pub url: String,
    /// Protocol version token (typically "HTTP/1.1")
    pub version: String,
    /// URL scheme when the target is absolute, otherwise empty
    pub protocol: String,
    /// Target path, without query string
    pub path: String,
    /// Everything after the first `?`, or empty
    pub query: String,
    /// Headers keyed by upper-cased name; a repeated name keeps the last value
    pub headers: HashMap<String, String>,
    /// Cookies from the Cookie header(s)
    pub cookies: HashMap<String, String>,
}

impl Request {
    /// Retrieves a header value by name, ignoring case.
    ///
    /// Returns an empty string when the header is absent.
    pub fn header(&self, name: &str) -> &str {
        self.headers
            .get(&name.to_ascii_uppercase())
            .map_or("", String::as_str)
    }

    /// Retrieves a cookie value by name, or an empty string.
    pub fn cookie(&self, name: &str) -> &str {
        self.cookies.get(name).map_or("", String::as_str)
    }

    /// The declared body length: zero when `Content-Length` is absent.
    pub fn content_length(&self) -> Result<usize> {
        let value = self.header("Content-Length");
        if value.is_empty() {
            return Ok(0);
        }
        value.parse().map_err(|_| {
            StatusError::bad_request("Erroneous content length").with_context(value)
        })
    }

    /// The request line rebuilt from its three tokens.
    pub fn request_line(&self) -> String {
        format!("{} {} {}", self.method, self.url, self.version)
    }
}

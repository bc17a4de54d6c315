use std::collections::HashMap;

use tracing::debug;

use crate::error::{Result, StatusError};
use crate::http::grammar::Grammar;
use crate::http::request::Request;

/// Walks a header block one line at a time.
///
/// A line ends at `\n`; a trailing `\r` is dropped. The final line may lack
/// a terminator.
#[derive(Debug, Clone)]
pub struct LineTokenizer<'a> {
    input: &'a str,
    offset: usize,
}

impl<'a> LineTokenizer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self { input, offset: 0 }
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Returns the next line without its terminator, or `None` at the end.
    pub fn next_line(&mut self) -> Option<&'a str> {
        if self.offset >= self.input.len() {
            return None;
        }
        let rest = &self.input[self.offset..];
        let line = match rest.find('\n') {
            Some(end) => {
                self.offset += end + 1;
                &rest[..end]
            }
            None => {
                self.offset = self.input.len();
                rest
            }
        };
        Some(line.strip_suffix('\r').unwrap_or(line))
    }
}

impl<'a> Iterator for LineTokenizer<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_line()
    }
}

/// Parses a complete header block (request line, headers, blank line).
pub fn parse_header_block(block: &[u8]) -> Result<Request> {
    let text = std::str::from_utf8(block)
        .map_err(|_| StatusError::bad_request("Request header is not valid UTF-8"))?;
    process_headers(text)
}

/// Parses the request line and every header up to the first blank line.
///
/// Blank lines before the request line are skipped.
pub fn process_headers(input: &str) -> Result<Request> {
    let mut lines = LineTokenizer::new(input);
    let request_line = lines.by_ref().find(|line| !line.is_empty()).unwrap_or("");

    let mut request = Request::default();
    parse_request_line(request_line, &mut request)?;

    for line in lines.take_while(|line| !line.is_empty()) {
        let (name, value) = parse_header_line(line)?;
        if name == "COOKIE" {
            let cookies = parse_cookies(&value)?;
            request.cookies.extend(cookies);
        }
        request.headers.insert(name, value);
    }

    Ok(request)
}

/// Fills method, URL, version and the URL parts of `request`.
pub fn parse_request_line(line: &str, request: &mut Request) -> Result<()> {
    debug!(line, "request line");
    let grammar = Grammar::shared();

    let (method, url, version) = grammar
        .match_request_line(line)
        .ok_or_else(|| StatusError::bad_request("Erroneous request line").with_context(line))?;
    let parts = grammar
        .match_url(url)
        .ok_or_else(|| StatusError::bad_request("Erroneous URL").with_context(url))?;

    debug!(method, url, version, "request line parsed");
    request.method = method.to_string();
    request.url = url.to_string();
    request.version = version.to_string();
    request.protocol = parts.protocol.to_string();
    request.path = parts.path.to_string();
    request.query = parts.query.to_string();
    Ok(())
}

/// Splits one header line, returning the upper-cased name and the value.
pub fn parse_header_line(line: &str) -> Result<(String, String)> {
    debug!(line, "header");
    let (name, value) = Grammar::shared().match_header(line).ok_or_else(|| {
        debug!(line, "header does not match");
        StatusError::bad_request("Erroneous header").with_context(line)
    })?;
    Ok((name.to_ascii_uppercase(), value.to_string()))
}

/// Parses a Cookie header value of `name=value` pairs separated by `"; "`.
///
/// A name appearing twice is an error, even with identical values.
pub fn parse_cookies(value: &str) -> Result<HashMap<String, String>> {
    debug!(cookie = value, "cookie header");
    let grammar = Grammar::shared();
    let mut cookies = HashMap::new();
    let mut matched = 0;
    let mut rest = value;

    while let Some(pair) = grammar.next_cookie(rest) {
        matched += 1;
        cookies.insert(pair.name.to_string(), pair.value.to_string());
        rest = &rest[pair.consumed..];
    }

    if cookies.len() != matched {
        debug!(cookie = value, "repeated cookie");
        return Err(StatusError::bad_request("Erroneous cookie (repeated)").with_context(value));
    }
    Ok(cookies)
}

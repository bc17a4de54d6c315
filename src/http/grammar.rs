//! The four patterns the request parser is built on.
//!
//! They are compiled once per process and shared read-only by every
//! connection; matching never mutates them.

use std::sync::LazyLock;

use regex::Regex;

static GRAMMAR: LazyLock<Grammar> = LazyLock::new(Grammar::compile);

/// Compiled request-line, header, URL and cookie matchers.
#[derive(Debug)]
pub struct Grammar {
    request_line: Regex,
    header: Regex,
    url: Regex,
    cookie: Regex,
}

/// A request target split into its parts. The authority is matched but
/// not kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UrlParts<'a> {
    pub protocol: &'a str,
    pub path: &'a str,
    pub query: &'a str,
}

/// One `name=value` pair taken off the front of a Cookie header value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CookiePair<'a> {
    pub name: &'a str,
    pub value: &'a str,
    /// Bytes of input this pair used up, separator included.
    pub consumed: usize,
}

impl Grammar {
    /// The process-wide instance.
    pub fn shared() -> &'static Grammar {
        &GRAMMAR
    }

    fn compile() -> Self {
        Self {
            request_line: Regex::new(r"^([^ \t]+) ([^ \t]+) ([^ \t]+)$")
                .expect("request-line pattern compiles"),
            header: Regex::new(r"^[ \t]*([^ \t:]+):[ \t]*(.*?)[ \t]*$")
                .expect("header pattern compiles"),
            url: Regex::new(r"^(?:([a-zA-Z]+):)?(//[^/]*)?([^?]*)(?:\?(.*))?$")
                .expect("url pattern compiles"),
            cookie: Regex::new(r"^([^=]+)=([^;]+)(?:; )?").expect("cookie pattern compiles"),
        }
    }

    /// Splits `METHOD SP TARGET SP VERSION`.
    pub fn match_request_line<'a>(&self, line: &'a str) -> Option<(&'a str, &'a str, &'a str)> {
        let caps = self.request_line.captures(line)?;
        Some((
            caps.get(1)?.as_str(),
            caps.get(2)?.as_str(),
            caps.get(3)?.as_str(),
        ))
    }

    /// Splits `NAME: VALUE`, trimming whitespace around the value.
    pub fn match_header<'a>(&self, line: &'a str) -> Option<(&'a str, &'a str)> {
        let caps = self.header.captures(line)?;
        Some((caps.get(1)?.as_str(), caps.get(2).map_or("", |m| m.as_str())))
    }

    pub fn match_url<'a>(&self, url: &'a str) -> Option<UrlParts<'a>> {
        let caps = self.url.captures(url)?;
        let group = |i: usize| caps.get(i).map_or("", |m| m.as_str());
        Some(UrlParts {
            protocol: group(1),
            path: group(3),
            query: group(4),
        })
    }

    /// Matches one cookie pair at the very start of `rest`.
    pub fn next_cookie<'a>(&self, rest: &'a str) -> Option<CookiePair<'a>> {
        let caps = self.cookie.captures(rest)?;
        Some(CookiePair {
            name: caps.get(1)?.as_str(),
            value: caps.get(2)?.as_str(),
            consumed: caps.get(0)?.end(),
        })
    }
}

//! jail-conn - request intake for a sandboxed execution server
//!
//! Owns one client connection: buffers raw bytes, captures and parses the
//! request head, and flushes response bytes, all under idle and request
//! deadlines.

pub mod config;
pub mod error;
pub mod http;
pub mod server;

pub use error::{Result, StatusError};

//! HTTP request intake for one connection.
//!
//! # Architecture
//!
//! - **`transport`**: The byte-level read/write/readiness capability (plain TCP here)
//! - **`connection`**: The per-connection engine: buffering, polling, deadlines
//! - **`grammar`**: The shared request-line, header, URL and cookie patterns
//! - **`parser`**: Turns a complete header block into a [`request::Request`]
//! - **`request`**: The parsed request head and its lookups
//! - **`response`**: Status codes and the responses callers answer with
//! - **`writer`**: Serializes responses and queues them on a connection
//!
//! # Data flow
//!
//! ```text
//!   Transport bytes
//!        │
//!        ▼
//!   read buffer ── "\r\n\r\n" found ──▶ header block ──▶ parser ──▶ Request
//!        │
//!        └── later receives ──▶ body bytes to the caller
//!
//!   caller response ──▶ write buffer ──▶ Transport
//! ```
//!
//! # Example
//!
//! ```ignore
//! use jail_conn::config::Limits;
//! use jail_conn::http::connection::Connection;
//! use tokio::net::TcpListener;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let listener = TcpListener::bind("127.0.0.1:8080").await?;
//!     let (socket, _addr) = listener.accept().await?;
//!     let mut conn = Connection::new(socket, Limits::default());
//!     conn.read_headers().await?;
//!     println!("{}", conn.request().unwrap().path);
//!     Ok(())
//! }
//! ```

pub mod connection;
pub mod grammar;
pub mod parser;
pub mod request;
pub mod response;
pub mod transport;
pub mod writer;

//! Accept loop driving one [`Connection`](crate::http::connection::Connection) per client.

pub mod listener;

use crate::error::Result;
use crate::http::connection::{Connection, SendMode};
use crate::http::response::Response;
use crate::http::transport::Transport;

const HTTP_VERSION: &str = "HTTP/1.1";

/// Serializes a response into its wire form.
pub fn serialize_response(resp: &Response) -> Vec<u8> {
    let mut buf = Vec::with_capacity(128 + resp.body.len());

    // Status line
    let status_line = format!(
        "{} {} {}\r\n",
        HTTP_VERSION,
        resp.status.as_u16(),
        resp.status.reason_phrase()
    );
    buf.extend_from_slice(status_line.as_bytes());

    // Sorted so the output is stable
    let mut headers: Vec<_> = resp.headers.iter().collect();
    headers.sort();
    for (k, v) in headers {
        buf.extend_from_slice(k.as_bytes());
        buf.extend_from_slice(b": ");
        buf.extend_from_slice(v.as_bytes());
        buf.extend_from_slice(b"\r\n");
    }

    // Header/body separator
    buf.extend_from_slice(b"\r\n");

    buf.extend_from_slice(&resp.body);

    buf
}

/// Queues a response on the connection and blocks until it is flushed.
pub async fn write_response<T: Transport>(
    conn: &mut Connection<T>,
    resp: &Response,
) -> Result<()> {
    conn.send(&serialize_response(resp), SendMode::Blocking).await
}

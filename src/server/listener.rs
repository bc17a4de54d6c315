use tokio::net::{TcpListener, TcpStream};
use tracing::{error, info, warn};

use crate::config::{Config, Limits};
use crate::error::{Result, StatusError};
use crate::http::connection::Connection;
use crate::http::response::Response;
use crate::http::transport::Transport;
use crate::http::writer::write_response;

pub async fn run(cfg: &Config) -> anyhow::Result<()> {
    let listener = TcpListener::bind(&cfg.server.listen_addr).await?;
    info!("Listening on {}", cfg.server.listen_addr);

    loop {
        let (socket, peer) = listener.accept().await?;
        info!("Accepted connection from {}", peer);

        let limits = cfg.limits;
        tokio::spawn(async move {
            handle_connection(socket, limits).await;
            info!("Connection from {} finished", peer);
        });
    }
}

async fn handle_connection(socket: TcpStream, limits: Limits) {
    let mut conn = Connection::new(socket, limits);
    serve(&mut conn).await;
    conn.close().await;
}

/// Serves the single request a connection carries and answers any failure
/// with its status response.
pub async fn serve<T: Transport>(conn: &mut Connection<T>) {
    let response = match summarize(conn).await {
        Ok(response) => response,
        Err(e) => {
            warn!(status = e.code(), context = e.context().unwrap_or(""), "{}", e);
            Response::from_error(&e)
        }
    };

    if let Err(e) = write_response(conn, &response).await {
        error!("Failed to write response: {}", e);
    }
}

/// Reads the request and describes it back to the peer.
async fn summarize<T: Transport>(conn: &mut Connection<T>) -> Result<Response> {
    conn.read_headers().await?;
    let body = conn.receive_body().await?;

    let request = conn
        .request()
        .ok_or_else(|| StatusError::bad_request("Incomplete request header"))?;
    info!(
        method = %request.method,
        path = %request.path,
        query = %request.query,
        body = body.len(),
        "request received"
    );

    let summary = format!(
        "{} {}\nquery: {}\nheaders: {}\ncookies: {}\nbody: {} bytes\n",
        request.method,
        request.path,
        request.query,
        request.headers.len(),
        request.cookies.len(),
        body.len()
    );
    Ok(Response::ok(summary))
}

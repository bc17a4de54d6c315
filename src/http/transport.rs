//! The byte-level capability a [`Connection`](crate::http::connection::Connection)
//! is written against.
//!
//! A transport reports readiness and moves bytes without blocking. Plain TCP
//! is implemented here; an encrypted stream implements the same trait and is
//! handed to the connection in its place.

use std::future::Future;
use std::io;
use std::net::SocketAddr;

use tokio::io::{AsyncWriteExt, Interest, Ready};
use tokio::net::TcpStream;

pub trait Transport {
    /// Resolves once the transport reports any of the requested readiness,
    /// or a hang-up or error condition.
    fn ready(&self, interest: Interest) -> impl Future<Output = io::Result<Ready>> + Send;

    /// Reads without blocking. `Ok(0)` means the peer closed its side;
    /// `WouldBlock` means the readiness was spurious.
    fn try_read(&self, buf: &mut [u8]) -> io::Result<usize>;

    /// Writes without blocking, returning how many bytes were taken.
    fn try_write(&self, buf: &[u8]) -> io::Result<usize>;

    fn peer_addr(&self) -> io::Result<SocketAddr>;

    /// Shuts both directions down.
    fn shutdown(&mut self) -> impl Future<Output = io::Result<()>> + Send;
}

impl Transport for TcpStream {
    async fn ready(&self, interest: Interest) -> io::Result<Ready> {
        TcpStream::ready(self, interest).await
    }

    fn try_read(&self, buf: &mut [u8]) -> io::Result<usize> {
        TcpStream::try_read(self, buf)
    }

    fn try_write(&self, buf: &[u8]) -> io::Result<usize> {
        TcpStream::try_write(self, buf)
    }

    fn peer_addr(&self) -> io::Result<SocketAddr> {
        TcpStream::peer_addr(self)
    }

    async fn shutdown(&mut self) -> io::Result<()> {
        AsyncWriteExt::shutdown(self).await
    }
}

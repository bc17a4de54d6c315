//! One connection's receive/send engine.
//!
//! The engine polls its [`Transport`] in short quanta and re-checks two
//! deadlines after every quantum: an idle deadline, pushed forward by each
//! successful transfer, and a request deadline fixed when the call starts.
//! The first receive on a fresh connection always reads until the header
//! block is complete and parses it; later receives hand out body bytes.

use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use bytes::{Buf, Bytes, BytesMut};
use tokio::io::{Interest, Ready};
use tokio::time::{Instant, timeout};
use tracing::{debug, info, warn};

use crate::config::Limits;
use crate::error::{Result, StatusError};
use crate::http::parser::parse_header_block;
use crate::http::request::Request;
use crate::http::transport::Transport;

const HEADER_TERMINATOR: &[u8] = b"\r\n\r\n";

/// How [`Connection::send`] behaves when the transport is not writable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendMode {
    /// Keep polling until everything is written or a deadline passes.
    Blocking,
    /// Return after the first quiet quantum, leaving the rest queued.
    Async,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReceiveMode {
    /// Whatever arrives; a deadline just ends the wait.
    Drain,
    /// At least this many bytes; a deadline is an error.
    AtLeast(usize),
}

impl ReceiveMode {
    fn satisfied_by(self, buffered: usize) -> bool {
        match self {
            ReceiveMode::Drain => true,
            ReceiveMode::AtLeast(size) => buffered >= size,
        }
    }
}

struct Deadlines {
    idle_timeout: Duration,
    idle: Instant,
    request: Instant,
}

impl Deadlines {
    fn start(limits: &Limits) -> Self {
        let now = Instant::now();
        Self {
            idle_timeout: limits.idle_timeout(),
            idle: now + limits.idle_timeout(),
            request: now + limits.request_timeout(),
        }
    }

    /// Only the idle deadline moves.
    fn touch(&mut self, now: Instant) {
        self.idle = now + self.idle_timeout;
    }

    fn expired(&self, now: Instant) -> bool {
        now > self.idle || now > self.request
    }
}

/// The state of one client connection.
///
/// Dropping a `Connection` does not shut its transport down: shutdown is
/// asynchronous and `Drop` cannot await it. Callers finish with
/// [`close`](Self::close); a dropped `TcpStream` still closes its socket, but
/// an encrypted transport only says goodbye cleanly through `close`.
pub struct Connection<T> {
    transport: T,
    limits: Limits,
    read_buffer: BytesMut,
    write_buffer: BytesMut,
    closed: bool,
    // Set once the header section overflowed; the read side is dead.
    rejected: bool,
    header_block: Option<Bytes>,
    request: Option<Request>,
    peer_addr: Option<SocketAddr>,
}

impl<T: Transport> Connection<T> {
    pub fn new(transport: T, limits: Limits) -> Self {
        let peer_addr = match transport.peer_addr() {
            Ok(addr) => {
                info!(peer = %addr, "client connected");
                Some(addr)
            }
            Err(e) => {
                warn!(error = %e, "peer address unavailable");
                None
            }
        };

        Self {
            transport,
            limits,
            read_buffer: BytesMut::with_capacity(limits.net_buffer_size),
            write_buffer: BytesMut::new(),
            closed: false,
            rejected: false,
            header_block: None,
            request: None,
            peer_addr,
        }
    }

    /// Reads and parses the header block unless that already happened or
    /// the read side is gone.
    pub async fn read_headers(&mut self) -> Result<()> {
        if self.header_block.is_none() && !self.closed && !self.rejected {
            self.receive(0).await?;
        }
        Ok(())
    }

    /// Receives data from the peer.
    ///
    /// `0` drains whatever is available ([`drain_available`](Self::drain_available));
    /// any other size blocks for at least that many bytes
    /// ([`receive_exactly`](Self::receive_exactly)).
    pub async fn receive(&mut self, size_to_receive: usize) -> Result<Bytes> {
        if size_to_receive == 0 {
            self.drain_available().await
        } else {
            self.receive_exactly(size_to_receive).await
        }
    }

    /// Returns what the peer has sent so far, waiting for the first bytes if
    /// nothing is buffered. Running into a deadline yields an empty result.
    pub async fn drain_available(&mut self) -> Result<Bytes> {
        self.receive_with(ReceiveMode::Drain).await
    }

    /// Waits until at least `size` bytes are buffered, the peer closes, or a
    /// deadline passes (an error). Everything buffered is returned, which may
    /// be more than `size`.
    pub async fn receive_exactly(&mut self, size: usize) -> Result<Bytes> {
        if size == 0 {
            return self.drain_available().await;
        }
        self.receive_with(ReceiveMode::AtLeast(size)).await
    }

    async fn receive_with(&mut self, mode: ReceiveMode) -> Result<Bytes> {
        if self.closed || self.rejected {
            return Ok(self.take_read_buffer());
        }

        let awaiting_headers = self.header_block.is_none();
        let mode = if awaiting_headers {
            ReceiveMode::AtLeast(self.limits.header_size_limit)
        } else {
            mode
        };

        if let ReceiveMode::AtLeast(size) = mode {
            if !awaiting_headers && self.read_buffer.len() >= size {
                return Ok(self.read_buffer.split_to(size).freeze());
            }
            debug!(size, "receiving until size");
        }

        let mut chunk = vec![0u8; self.limits.net_buffer_size];
        let mut deadlines = Deadlines::start(&self.limits);
        loop {
            let ready = self.poll(Interest::READABLE, "Error poll reading data").await?;
            let now = Instant::now();
            if deadlines.expired(now) {
                if mode == ReceiveMode::Drain {
                    debug!("socket read timeout, connection idle");
                    return Ok(self.take_read_buffer());
                }
                warn!(buffered = self.read_buffer.len(), "socket read timeout");
                return Err(StatusError::request_timeout("Socket read timeout"));
            }

            let Some(ready) = ready else {
                if mode == ReceiveMode::Drain && !self.read_buffer.is_empty() {
                    break;
                }
                continue;
            };

            let mut got_data = false;
            if ready.is_readable() {
                match self.transport.try_read(&mut chunk) {
                    Ok(0) => {
                        info!("peer closed connection");
                        self.closed = true;
                        break;
                    }
                    Ok(n) => {
                        got_data = true;
                        let scanned = self.read_buffer.len();
                        self.read_buffer.extend_from_slice(&chunk[..n]);
                        deadlines.touch(now);
                        if self.header_block.is_none() {
                            if self.capture_header_block(scanned)? {
                                return Ok(Bytes::new());
                            }
                        } else if mode.satisfied_by(self.read_buffer.len()) {
                            break;
                        }
                    }
                    Err(e) if e.kind() == io::ErrorKind::WouldBlock => {}
                    Err(e) => {
                        warn!(error = %e, "read failed");
                        return Err(StatusError::bad_request("Error reading data"));
                    }
                }
            }
            // Data still queued in the transport is read before honouring a hang-up.
            if ready.is_read_closed() && !got_data {
                info!("peer hung up");
                self.closed = true;
                break;
            }
            if ready.is_error() {
                return Err(StatusError::internal("Error reading data"));
            }
        }

        // Partial header bytes stay put for the next receive.
        if self.header_block.is_none() {
            return Ok(Bytes::new());
        }
        Ok(self.take_read_buffer())
    }

    /// Looks for the end of the header section in the bytes appended after
    /// `scanned`. Parses and returns `true` once it is found.
    fn capture_header_block(&mut self, scanned: usize) -> Result<bool> {
        let start = scanned.saturating_sub(HEADER_TERMINATOR.len() - 1);
        let found = self.read_buffer[start..]
            .windows(HEADER_TERMINATOR.len())
            .position(|w| w == HEADER_TERMINATOR);

        match found {
            Some(pos) => {
                let end = start + pos + HEADER_TERMINATOR.len();
                let block = self.read_buffer.split_to(end).freeze();
                info!(size = end, "received header");
                self.header_block = Some(block.clone());
                self.request = Some(parse_header_block(&block)?);
                Ok(true)
            }
            None if self.read_buffer.len() > self.limits.header_size_limit => {
                warn!(
                    buffered = self.read_buffer.len(),
                    limit = self.limits.header_size_limit,
                    "http headers too large"
                );
                self.rejected = true;
                self.read_buffer.clear();
                Err(StatusError::entity_too_large("Http headers too large"))
            }
            None => Ok(false),
        }
    }

    /// Reads the body announced by `Content-Length`, reading the header
    /// block first if needed.
    pub async fn receive_body(&mut self) -> Result<Bytes> {
        self.read_headers().await?;
        let request = self
            .request
            .as_ref()
            .ok_or_else(|| StatusError::bad_request("Incomplete request header"))?;

        let length = request.content_length()?;
        if length > self.limits.max_receive_size {
            return Err(StatusError::entity_too_large("Request body too large")
                .with_context(length.to_string()));
        }
        if length == 0 {
            return Ok(Bytes::new());
        }

        let mut body = BytesMut::with_capacity(length);
        while body.len() < length {
            let data = self.receive_exactly(length - body.len()).await?;
            if data.is_empty() {
                return Err(StatusError::bad_request(
                    "Connection closed before complete body received",
                ));
            }
            body.extend_from_slice(&data);
        }

        // Anything past the body belongs to whoever reads next.
        let mut excess = body.split_off(length);
        if !excess.is_empty() {
            excess.extend_from_slice(&self.read_buffer);
            self.read_buffer = excess;
        }
        Ok(body.freeze())
    }

    /// Queues `data` and writes as much of the queue as `mode` allows.
    /// Does nothing once the connection is closed.
    pub async fn send(&mut self, data: &[u8], mode: SendMode) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.write_buffer.extend_from_slice(data);
        let size = self.write_buffer.len();
        debug!(size, ?mode, "sending");

        let mut offset = 0;
        let mut deadlines = Deadlines::start(&self.limits);
        let result = loop {
            if offset >= size {
                break Ok(());
            }
            let ready = match self.poll(Interest::WRITABLE, "Error poll writing data").await {
                Ok(ready) => ready,
                Err(e) => break Err(e),
            };
            if ready.is_none() && mode == SendMode::Async {
                break Ok(());
            }
            let now = Instant::now();
            if deadlines.expired(now) {
                warn!(written = offset, size, "socket write timeout");
                break Err(StatusError::request_timeout("Socket write timeout"));
            }
            let Some(ready) = ready else {
                continue;
            };

            if ready.is_writable() {
                let end = size.min(offset + self.limits.net_buffer_size);
                match self.transport.try_write(&self.write_buffer[offset..end]) {
                    Ok(0) => {
                        info!("peer stopped accepting data");
                        self.closed = true;
                        break Ok(());
                    }
                    Ok(n) => {
                        offset += n;
                        deadlines.touch(now);
                    }
                    Err(e) if e.kind() == io::ErrorKind::WouldBlock => {}
                    Err(e) => {
                        warn!(error = %e, "write failed");
                        break Err(StatusError::internal("Socket write data error"));
                    }
                }
            }
            if ready.is_write_closed() {
                info!("peer hung up");
                self.closed = true;
                break Ok(());
            }
            if ready.is_error() {
                break Err(StatusError::internal("Socket write data error"));
            }
        };

        self.write_buffer.advance(offset);
        debug!(sent = offset, pending = self.write_buffer.len(), "send finished");
        result
    }

    /// Waits up to `duration` for activity and reports whether the
    /// connection stayed idle.
    ///
    /// Returns `false` straight away when unread data is buffered. Pending
    /// output is flushed opportunistically if the transport turns writable.
    pub async fn wait(&mut self, duration: Duration) -> Result<bool> {
        if !self.read_buffer.is_empty() || self.closed {
            return Ok(false);
        }
        let pending = !self.write_buffer.is_empty();
        let interest = if pending {
            Interest::READABLE | Interest::WRITABLE
        } else {
            Interest::READABLE
        };

        match timeout(duration, self.transport.ready(interest)).await {
            Err(_) => Ok(true),
            Ok(Err(e)) => {
                warn!(error = %e, "poll failed waiting");
                Err(StatusError::internal("Error poll waiting"))
            }
            Ok(Ok(ready)) => {
                if pending && ready.is_writable() {
                    self.send(&[], SendMode::Async).await?;
                }
                Ok(false)
            }
        }
    }

    /// Shuts the transport down. Later calls do nothing.
    pub async fn close(&mut self) {
        if self.closed {
            return;
        }
        if let Err(e) = self.transport.shutdown().await {
            debug!(error = %e, "shutdown failed");
        }
        self.closed = true;
    }

    /// One poll quantum. `None` means nothing became ready in time.
    async fn poll(&self, interest: Interest, failure: &'static str) -> Result<Option<Ready>> {
        match timeout(self.limits.poll_interval(), self.transport.ready(interest)).await {
            Ok(Ok(ready)) => Ok(Some(ready)),
            Ok(Err(e)) => {
                warn!(error = %e, "{failure}");
                Err(StatusError::internal(failure))
            }
            Err(_) => Ok(None),
        }
    }

    fn take_read_buffer(&mut self) -> Bytes {
        let data = self.read_buffer.split().freeze();
        if !data.is_empty() {
            debug!(size = data.len(), "received");
        }
        data
    }

    /// The parsed request head, once the header block has been read.
    pub fn request(&self) -> Option<&Request> {
        self.request.as_ref()
    }

    /// Header lookup ignoring case; empty when absent.
    pub fn header(&self, name: &str) -> &str {
        self.request.as_ref().map_or("", |r| r.header(name))
    }

    pub fn cookie(&self, name: &str) -> &str {
        self.request.as_ref().map_or("", |r| r.cookie(name))
    }

    /// Raw bytes of the header section, terminator included.
    pub fn header_block(&self) -> Option<&Bytes> {
        self.header_block.as_ref()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.peer_addr
    }

    pub fn max_receive_size(&self) -> usize {
        self.limits.max_receive_size
    }

    /// Bytes queued by `send` and not yet written.
    pub fn pending_output(&self) -> usize {
        self.write_buffer.len()
    }
}

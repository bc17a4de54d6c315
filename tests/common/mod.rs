#![allow(dead_code)]

use std::collections::VecDeque;
use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use jail_conn::config::Limits;
use jail_conn::http::transport::Transport;
use tokio::io::{Interest, Ready};

/// One scripted inbound event.
#[derive(Debug, Clone)]
pub enum Inbound {
    Data(Vec<u8>),
    Eof,
    Fail,
}

pub fn data(bytes: &[u8]) -> Inbound {
    Inbound::Data(bytes.to_vec())
}

/// Shared view of what a [`MockTransport`] saw.
#[derive(Debug, Clone, Default)]
pub struct MockHandle {
    inbound: Arc<Mutex<VecDeque<Inbound>>>,
    written: Arc<Mutex<Vec<u8>>>,
    reads: Arc<AtomicUsize>,
    shutdowns: Arc<AtomicUsize>,
    blocked: Arc<AtomicBool>,
    signals: Arc<Mutex<Option<Ready>>>,
    poll_fails: Arc<AtomicBool>,
    write_fails: Arc<AtomicBool>,
}

impl MockHandle {
    pub fn written(&self) -> Vec<u8> {
        self.written.lock().unwrap().clone()
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn shutdowns(&self) -> usize {
        self.shutdowns.load(Ordering::SeqCst)
    }

    /// Appends an inbound event; the connection sees it on its next poll.
    pub fn push(&self, event: Inbound) {
        self.inbound.lock().unwrap().push_back(event);
    }

    /// Adds readiness flags (hang-ups, errors) to every later poll.
    pub fn signal(&self, flags: Ready) {
        let mut signals = self.signals.lock().unwrap();
        *signals = Some(signals.map_or(flags, |current| current | flags));
    }

    /// Makes every later poll fail.
    pub fn fail_polls(&self) {
        self.poll_fails.store(true, Ordering::SeqCst);
    }

    /// Makes every later write fail.
    pub fn fail_writes(&self) {
        self.write_fails.store(true, Ordering::SeqCst);
    }

    /// Toggles whether the transport reports itself writable.
    pub fn set_writable(&self, writable: bool) {
        self.blocked.store(!writable, Ordering::SeqCst);
    }
}

/// A transport replaying a script. It is readable while inbound events
/// remain and never becomes ready otherwise.
pub struct MockTransport {
    write_chunk: usize,
    handle: MockHandle,
}

impl MockTransport {
    pub fn new(inbound: Vec<Inbound>) -> Self {
        let handle = MockHandle::default();
        handle.inbound.lock().unwrap().extend(inbound);
        Self {
            write_chunk: usize::MAX,
            handle,
        }
    }

    pub fn writable(self, writable: bool) -> Self {
        self.handle.set_writable(writable);
        self
    }

    /// Caps how many bytes a single write accepts.
    pub fn write_chunk(mut self, size: usize) -> Self {
        self.write_chunk = size;
        self
    }

    pub fn handle(&self) -> MockHandle {
        self.handle.clone()
    }
}

impl Transport for MockTransport {
    async fn ready(&self, interest: Interest) -> io::Result<Ready> {
        if self.handle.poll_fails.load(Ordering::SeqCst) {
            return Err(io::Error::other("poll failed"));
        }
        let ready = {
            let inbound = self.handle.inbound.lock().unwrap();
            let mut ready = Ready::EMPTY;
            if interest.is_readable() && !inbound.is_empty() {
                ready = ready | Ready::READABLE;
            }
            if interest.is_writable() && !self.handle.blocked.load(Ordering::SeqCst) {
                ready = ready | Ready::WRITABLE;
            }
            if let Some(flags) = *self.handle.signals.lock().unwrap() {
                ready = ready | flags;
            }
            ready
        };
        if ready.is_empty() {
            std::future::pending::<()>().await;
        }
        Ok(ready)
    }

    fn try_read(&self, buf: &mut [u8]) -> io::Result<usize> {
        self.handle.reads.fetch_add(1, Ordering::SeqCst);
        let mut inbound = self.handle.inbound.lock().unwrap();
        match inbound.pop_front() {
            Some(Inbound::Data(mut bytes)) => {
                let n = bytes.len().min(buf.len());
                buf[..n].copy_from_slice(&bytes[..n]);
                if n < bytes.len() {
                    inbound.push_front(Inbound::Data(bytes.split_off(n)));
                }
                Ok(n)
            }
            Some(Inbound::Eof) => {
                inbound.push_front(Inbound::Eof);
                Ok(0)
            }
            Some(Inbound::Fail) => Err(io::Error::new(io::ErrorKind::ConnectionReset, "reset")),
            None => Err(io::ErrorKind::WouldBlock.into()),
        }
    }

    fn try_write(&self, buf: &[u8]) -> io::Result<usize> {
        if self.handle.write_fails.load(Ordering::SeqCst) {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "broken pipe"));
        }
        if self.handle.blocked.load(Ordering::SeqCst) {
            return Err(io::ErrorKind::WouldBlock.into());
        }
        let n = buf.len().min(self.write_chunk);
        self.handle.written.lock().unwrap().extend_from_slice(&buf[..n]);
        Ok(n)
    }

    fn peer_addr(&self) -> io::Result<SocketAddr> {
        Ok(SocketAddr::from(([127, 0, 0, 1], 40000)))
    }

    async fn shutdown(&mut self) -> io::Result<()> {
        self.handle.shutdowns.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Small limits so deadline tests finish quickly on a paused clock.
pub fn test_limits() -> Limits {
    Limits {
        max_receive_size: 1024,
        header_size_limit: 256,
        net_buffer_size: 64,
        idle_timeout_ms: 100,
        request_timeout_ms: 1_000,
        poll_interval_ms: 10,
    }
}

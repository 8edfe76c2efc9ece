use std::io::{Read, Write};
use std::net::TcpStream;
use std::time::Duration;

use crate::error::Result;

/// A connected subscriber stream.
///
/// Subscribers only ever receive; `Read` is kept so callers can detect a
/// closed peer.
pub struct SubscriberStream {
    inner: SubscriberStreamInner,
    peer: String,
}

enum SubscriberStreamInner {
    Tcp(TcpStream),
    #[cfg(unix)]
    Unix(std::os::unix::net::UnixStream),
}

impl Read for SubscriberStream {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match &mut self.inner {
            SubscriberStreamInner::Tcp(stream) => stream.read(buf),
            #[cfg(unix)]
            SubscriberStreamInner::Unix(stream) => stream.read(buf),
        }
    }
}

impl Write for SubscriberStream {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match &mut self.inner {
            SubscriberStreamInner::Tcp(stream) => stream.write(buf),
            #[cfg(unix)]
            SubscriberStreamInner::Unix(stream) => stream.write(buf),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match &mut self.inner {
            SubscriberStreamInner::Tcp(stream) => stream.flush(),
            #[cfg(unix)]
            SubscriberStreamInner::Unix(stream) => stream.flush(),
        }
    }
}

impl SubscriberStream {
    pub(crate) fn from_tcp(stream: TcpStream) -> Self {
        let peer = stream
            .peer_addr()
            .map(|addr| format!("tcp://{addr}"))
            .unwrap_or_else(|_| "tcp://unknown".to_string());
        Self {
            inner: SubscriberStreamInner::Tcp(stream),
            peer,
        }
    }

    #[cfg(unix)]
    pub(crate) fn from_unix(stream: std::os::unix::net::UnixStream, label: String) -> Self {
        Self {
            inner: SubscriberStreamInner::Unix(stream),
            peer: label,
        }
    }

    /// Connect to a TCP endpoint as a subscriber.
    pub fn connect_tcp(addr: &str) -> Result<Self> {
        Ok(Self::from_tcp(TcpStream::connect(addr)?))
    }

    /// Set write timeout on the underlying stream.
    pub fn set_write_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        match &self.inner {
            SubscriberStreamInner::Tcp(stream) => stream.set_write_timeout(timeout).map_err(Into::into),
            #[cfg(unix)]
            SubscriberStreamInner::Unix(stream) => stream.set_write_timeout(timeout).map_err(Into::into),
        }
    }

    /// Human-readable peer label for logs.
    pub fn peer(&self) -> &str {
        &self.peer
    }
}

impl std::fmt::Debug for SubscriberStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match &self.inner {
            SubscriberStreamInner::Tcp(_) => "tcp",
            #[cfg(unix)]
            SubscriberStreamInner::Unix(_) => "unix",
        };
        f.debug_struct("SubscriberStream")
            .field("type", &kind)
            .field("peer", &self.peer)
            .finish()
    }
}

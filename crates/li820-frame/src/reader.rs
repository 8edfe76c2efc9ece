use std::io::{ErrorKind, Read};

use bytes::{Buf, BytesMut};
use tracing::{trace, warn};

use crate::backoff::Backoff;
use crate::config::{FrameConfig, READ_CHUNK_SIZE};
use crate::error::{FrameError, Result};
use crate::tag::{find, rfind};

const INITIAL_BUFFER_CAPACITY: usize = 4 * 1024;

/// Accumulates raw bytes from any `Read` stream until a marker shows up.
///
/// The accumulator survives between calls; whoever extracts a frame decides
/// how much of it to [`consume`](Self::consume).
pub struct FrameReader<T> {
    inner: T,
    buf: BytesMut,
    config: FrameConfig,
    backoff: Backoff,
}

impl<T: Read> FrameReader<T> {
    /// Create a new frame reader with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a new frame reader with explicit configuration.
    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            backoff: Backoff::new(config.retry.clone()),
            config,
        }
    }

    /// Read until the accumulator contains `marker`, then return all of it.
    ///
    /// Blocks for as long as the stream stays quiet. If the accumulator grows
    /// past `max_frame_size` without the marker, everything but a possible
    /// partial marker at the tail is dropped.
    pub fn read_until(&mut self, marker: &[u8]) -> Result<&[u8]> {
        self.read_until_inner(marker, None)
    }

    /// Like [`read_until`](Self::read_until), but an overflow resumes at the
    /// last `restart` found past the head of the accumulator.
    ///
    /// Used while a frame start is anchored at the head: when its end never
    /// arrives, the stale partial frame is dropped and the newer start kept.
    /// Without a newer `restart`, only a tail long enough to hold a partial
    /// `marker` or `restart` survives.
    pub fn read_until_or_restart(&mut self, marker: &[u8], restart: &[u8]) -> Result<&[u8]> {
        self.read_until_inner(marker, Some(restart))
    }

    fn read_until_inner(&mut self, marker: &[u8], restart: Option<&[u8]>) -> Result<&[u8]> {
        let overlap = marker.len().saturating_sub(1);
        let tail = restart.map_or(overlap, |r| overlap.max(r.len().saturating_sub(1)));
        let mut scanned = 0usize;

        loop {
            if find(&self.buf[scanned..], marker).is_some() {
                return Ok(&self.buf[..]);
            }
            scanned = self.buf.len().saturating_sub(overlap);

            if self.buf.len() > self.config.max_frame_size {
                let newer_start = restart
                    .filter(|r| !r.is_empty() && self.buf.len() > 1)
                    .and_then(|r| rfind(&self.buf[1..], r))
                    .map(|pos| pos + 1);
                let dropped = match newer_start {
                    Some(pos) => pos,
                    None => self.buf.len() - tail.min(self.buf.len()),
                };
                warn!(
                    dropped,
                    limit = self.config.max_frame_size,
                    restarted = newer_start.is_some(),
                    "no frame marker within size limit; resynchronizing"
                );
                self.buf.advance(dropped);
                scanned = 0;
                if newer_start.is_some() {
                    // The newer frame may already be complete.
                    continue;
                }
            }

            self.fill()?;
        }
    }

    /// Perform one successful read into the accumulator.
    ///
    /// Idle timeouts and interrupted reads are waited out. Other read errors are
    /// logged and retried with backoff until the retry budget is spent.
    pub fn fill(&mut self) -> Result<usize> {
        let mut chunk = [0u8; READ_CHUNK_SIZE];
        loop {
            match self.inner.read(&mut chunk) {
                Ok(0) => return Err(FrameError::ConnectionClosed),
                Ok(n) => {
                    self.backoff.mark_success();
                    self.buf.extend_from_slice(&chunk[..n]);
                    trace!(bytes = n, buffered = self.buf.len(), "read from device");
                    return Ok(n);
                }
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if matches!(err.kind(), ErrorKind::TimedOut | ErrorKind::WouldBlock) => {
                    trace!("device idle");
                    continue;
                }
                Err(err) => match self.backoff.mark_failure() {
                    Some(delay) => {
                        warn!(
                            error = %err,
                            attempt = self.backoff.failures(),
                            retry_in_ms = delay.as_millis() as u64,
                            "device read failed; retrying"
                        );
                        if !delay.is_zero() {
                            std::thread::sleep(delay);
                        }
                    }
                    None => {
                        return Err(FrameError::RetriesExhausted {
                            attempts: self.backoff.failures(),
                            source: err,
                        });
                    }
                },
            }
        }
    }

    /// Bytes accumulated and not yet consumed.
    pub fn buffer(&self) -> &[u8] {
        &self.buf
    }

    /// Drop the first `n` accumulated bytes.
    pub fn consume(&mut self, n: usize) {
        self.buf.advance(n.min(self.buf.len()));
    }

    /// Drop everything accumulated.
    pub fn clear(&mut self) {
        self.buf.clear();
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the reader and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Current reader configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}

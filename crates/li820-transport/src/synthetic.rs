use std::io::{Read, Write};
use std::time::{Duration, Instant};

use bytes::{Buf, BufMut, BytesMut};

const NOISE: &[u8] = b"\r\n\0";

/// A stand-in analyzer that emits well-formed frames on a fixed schedule.
///
/// Frames follow the LI-8x0 layout (`<TAG><data>...</data></TAG>`) with values
/// written in scientific notation. Readings follow a slow deterministic wave, so
/// two analyzers created with the same tag produce the same byte stream.
pub struct SyntheticAnalyzer {
    tag: String,
    interval: Duration,
    noise: bool,
    step: u64,
    pending: BytesMut,
    next_emit: Option<Instant>,
}

impl SyntheticAnalyzer {
    /// Create an analyzer emitting one `tag` frame per `interval`.
    pub fn new(tag: impl Into<String>, interval: Duration) -> Self {
        Self {
            tag: tag.into(),
            interval,
            noise: false,
            step: 0,
            pending: BytesMut::with_capacity(512),
            next_emit: None,
        }
    }

    /// Prefix every frame with line noise, as a real serial line often shows.
    pub fn with_noise(mut self, noise: bool) -> Self {
        self.noise = noise;
        self
    }

    /// Number of frames emitted so far.
    pub fn frames_emitted(&self) -> u64 {
        self.step
    }

    /// CO2 and H2O values carried by frame number `step`.
    pub fn reading_at(step: u64) -> (f64, f64) {
        let t = step as f64;
        let co2 = 412.0 + 15.0 * (t * 0.05).sin();
        let h2o = 12.0 + 2.0 * (t * 0.03).cos();
        (co2, h2o)
    }

    fn emit_frame(&mut self) {
        let (co2, h2o) = Self::reading_at(self.step);
        let co2abs = co2 * 1.6e-4;
        if self.noise {
            self.pending.put_slice(NOISE);
        }
        let frame = format!(
            "<{tag}><data><celltemp>{celltemp:.7e}</celltemp><cellpres>{cellpres:.7e}</cellpres>\
             <co2>{co2:.7e}</co2><co2abs>{co2abs:.7e}</co2abs><h2o>{h2o:.7e}</h2o>\
             <ivolt>{ivolt:.7e}</ivolt></data></{tag}>\n",
            tag = self.tag,
            celltemp = 51.25,
            cellpres = 97.16,
            ivolt = 18.97,
        );
        self.pending.put_slice(frame.as_bytes());
        self.step += 1;
    }

    fn wait_for_schedule(&mut self) {
        let now = Instant::now();
        match self.next_emit {
            None => self.next_emit = Some(now + self.interval),
            Some(due) => {
                if due > now {
                    std::thread::sleep(due - now);
                }
                self.next_emit = Some(due.max(now) + self.interval);
            }
        }
    }
}

impl Read for SyntheticAnalyzer {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        if self.pending.is_empty() {
            self.wait_for_schedule();
            self.emit_frame();
        }

        let n = self.pending.len().min(buf.len());
        buf[..n].copy_from_slice(&self.pending[..n]);
        self.pending.advance(n);
        Ok(n)
    }
}

/// Configuration writes are accepted and ignored.
impl Write for SyntheticAnalyzer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

use std::io::Read;
use std::thread::{self, JoinHandle};

use chrono::{DateTime, Utc};
use li820_frame::{FrameConfig, FrameExtractor, FrameTag};
use tracing::{debug, error, info};

use crate::decode::decode_at;
use crate::error::{Result, SessionError};
use crate::measurement::Measurement;
use crate::sink::RecordSink;

const SAMPLER_THREAD_NAME: &str = "li820-sampler";

/// Constants fixed when a session is created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Model tag delimiting frames, e.g. `li820`.
    pub frame_tag: FrameTag,
    /// Site label copied into every record.
    pub site: String,
}

impl SessionConfig {
    pub fn new(frame_tag: FrameTag, site: impl Into<String>) -> Self {
        Self {
            frame_tag,
            site: site.into(),
        }
    }
}

/// One open connection to an analyzer.
///
/// The session owns the stream for its whole life. Dropping it closes the
/// stream; [`close`](Self::close) hands the stream back instead.
pub struct DeviceSession<T> {
    extractor: FrameExtractor<T>,
    config: SessionConfig,
    cycles: u64,
    last_captured: Option<DateTime<Utc>>,
}

impl<T: Read> DeviceSession<T> {
    /// Start a session over `stream` with default framing.
    pub fn new(stream: T, config: SessionConfig) -> Self {
        Self::with_frame_config(stream, config, FrameConfig::default())
    }

    /// Start a session with explicit framing configuration.
    pub fn with_frame_config(stream: T, config: SessionConfig, frame: FrameConfig) -> Self {
        let extractor = FrameExtractor::with_config(stream, config.frame_tag.clone(), frame);
        Self {
            extractor,
            config,
            cycles: 0,
            last_captured: None,
        }
    }

    /// Run one cycle: wait for the next frame and decode it.
    ///
    /// Only fatal stream errors are returned. A frame that does not decode
    /// still produces a (sentinel) record. Capture times never go backwards
    /// within a session, even if the wall clock is stepped back.
    pub fn sample(&mut self) -> Result<Measurement> {
        let frame = self.extractor.next_frame()?;
        Ok(self.stamp(&frame, Utc::now()))
    }

    fn stamp(&mut self, frame: &str, now: DateTime<Utc>) -> Measurement {
        let captured_at = self.last_captured.map_or(now, |last| now.max(last));
        self.last_captured = Some(captured_at);
        let record = decode_at(frame, &self.config, captured_at);
        self.cycles += 1;
        debug!(
            cycle = self.cycles,
            co2 = record.co2,
            h2o = record.h2o,
            at = %record.captured_at,
            site = %record.site,
            "sampled"
        );
        record
    }

    /// Sample forever, forwarding each record to `sink` in capture order.
    ///
    /// Returns why the loop stopped: a fatal stream error or a closed sink.
    pub fn run(&mut self, sink: &mut impl RecordSink) -> SessionError {
        loop {
            let record = match self.sample() {
                Ok(record) => record,
                Err(err) => return err,
            };
            if let Err(err) = sink.send(record) {
                return err.into();
            }
        }
    }

    /// Number of completed sampling cycles.
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// End the session and return the stream.
    pub fn close(self) -> T {
        debug!(cycles = self.cycles, site = %self.config.site, "closing session");
        self.extractor.into_inner()
    }
}

impl<T: Read + Send + 'static> DeviceSession<T> {
    /// Run the sampling loop on its own named thread.
    ///
    /// The session, and with it the stream, is dropped when the loop ends. The
    /// join handle yields the reason it ended.
    pub fn spawn<S>(mut self, mut sink: S) -> Result<JoinHandle<SessionError>>
    where
        S: RecordSink + Send + 'static,
    {
        thread::Builder::new()
            .name(SAMPLER_THREAD_NAME.to_string())
            .spawn(move || {
                info!(tag = %self.config.frame_tag, site = %self.config.site, "sampler started");
                let reason = self.run(&mut sink);
                match &reason {
                    SessionError::Sink(_) => {
                        info!(cycles = self.cycles, "sampler stopped: no consumers left")
                    }
                    other => error!(cycles = self.cycles, error = %other, "sampler stopped"),
                }
                reason
            })
            .map_err(SessionError::Spawn)
    }
}

impl<T> std::fmt::Debug for DeviceSession<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceSession")
            .field("tag", &self.config.frame_tag.as_str())
            .field("site", &self.config.site)
            .field("cycles", &self.cycles)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::io::{self, Cursor, ErrorKind};
    use std::sync::mpsc;

    use li820_frame::{FrameError, LeftoverPolicy, RetryPolicy};

    use super::*;
    use crate::error::SinkError;
    use crate::sink::handoff;

    fn config() -> SessionConfig {
        SessionConfig::new(FrameTag::new("li820").unwrap(), "site-A")
    }

    fn session(bytes: &str) -> DeviceSession<Cursor<Vec<u8>>> {
        DeviceSession::new(Cursor::new(bytes.as_bytes().to_vec()), config())
    }

    fn frame(co2: u32) -> String {
        format!("<li820><data><co2>{co2}</co2><h2o>1.5</h2o></data></li820>\n")
    }

    /// Plays back one scripted read result per call, then end of stream.
    struct Script(VecDeque<io::Result<Vec<u8>>>);

    impl Read for Script {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            match self.0.pop_front() {
                None => Ok(0),
                Some(Err(err)) => Err(err),
                Some(Ok(bytes)) => {
                    buf[..bytes.len()].copy_from_slice(&bytes);
                    Ok(bytes.len())
                }
            }
        }
    }

    fn chunks(parts: &[&str]) -> Script {
        Script(parts.iter().map(|p| Ok(p.as_bytes().to_vec())).collect())
    }

    #[test]
    fn noisy_frame_decodes() {
        let before = chrono::Utc::now();
        let mut session = session("noise<li820><co2>412.5</co2><h2o>1.2</h2o></li820>");
        let record = session.sample().unwrap();

        assert_eq!(record.co2, 412.5);
        assert_eq!(record.h2o, 1.2);
        assert_eq!(record.site, "site-A");
        assert!(record.captured_at >= before);
        assert_eq!(session.cycles(), 1);
    }

    #[test]
    fn bad_value_yields_sentinel_and_keeps_going() {
        let good = frame(400);
        let mut session = DeviceSession::new(chunks(&["<li820><co2>bad</co2></li820>", &good]), config());
        let first = session.sample().unwrap();
        assert!(first.is_sentinel());
        assert_eq!(first.site, "site-A");

        let second = session.sample().unwrap();
        assert_eq!(second.co2, 400.0);
    }

    #[test]
    fn n_frames_give_n_records_in_order() {
        let parts: Vec<String> = (1..=5).map(frame).collect();
        let refs: Vec<&str> = parts.iter().map(String::as_str).collect();
        let mut session = DeviceSession::new(chunks(&refs), config());

        let mut sink: Vec<Measurement> = Vec::new();
        let reason = session.run(&mut sink);

        assert!(matches!(reason, SessionError::Frame(FrameError::ConnectionClosed)));
        let co2: Vec<f64> = sink.iter().map(|r| r.co2).collect();
        assert_eq!(co2, [1.0, 2.0, 3.0, 4.0, 5.0]);
        assert_eq!(session.cycles(), 5);
        assert!(sink.windows(2).all(|w| w[0].captured_at <= w[1].captured_at));
    }

    #[test]
    fn byte_by_byte_delivery_decodes_identically() {
        let text = format!("\r\n\0{}", frame(723));
        let bytes: Vec<String> = text.chars().map(String::from).collect();
        let refs: Vec<&str> = bytes.iter().map(String::as_str).collect();
        let mut session = DeviceSession::new(chunks(&refs), config());

        let record = session.sample().unwrap();
        assert_eq!(record.co2, 723.0);
        assert_eq!(record.h2o, 1.5);
    }

    fn burst_then_rest(leftover: LeftoverPolicy) -> Vec<Measurement> {
        let first = frame(1);
        let second = frame(2);
        let (head, tail) = second.split_at(12);
        let burst = format!("{first}{head}");
        let stream = chunks(&[&burst, tail]);

        let framing = FrameConfig {
            leftover,
            ..FrameConfig::default()
        };
        let mut session = DeviceSession::with_frame_config(stream, config(), framing);
        let mut sink: Vec<Measurement> = Vec::new();
        session.run(&mut sink);
        sink
    }

    #[test]
    fn carry_forward_keeps_burst_frames() {
        let records = burst_then_rest(LeftoverPolicy::CarryForward);
        let co2: Vec<f64> = records.iter().map(|r| r.co2).collect();
        assert_eq!(co2, [1.0, 2.0]);
    }

    #[test]
    fn discard_loses_frame_started_in_burst() {
        let records = burst_then_rest(LeftoverPolicy::Discard);
        let co2: Vec<f64> = records.iter().map(|r| r.co2).collect();
        assert_eq!(co2, [1.0]);
    }

    #[test]
    fn transient_error_then_frame() {
        let f = frame(410);
        let stream = Script(VecDeque::from([
            Err(io::Error::other("parity error")),
            Err(ErrorKind::TimedOut.into()),
            Ok(f.into_bytes()),
        ]));
        let framing = FrameConfig {
            retry: RetryPolicy::immediate(3),
            ..FrameConfig::default()
        };
        let mut session = DeviceSession::with_frame_config(stream, config(), framing);
        assert_eq!(session.sample().unwrap().co2, 410.0);
    }

    #[test]
    fn persistent_errors_end_the_session() {
        let stream = Script((0..3).map(|_| Err(io::Error::other("unplugged"))).collect());
        let framing = FrameConfig {
            retry: RetryPolicy::immediate(3),
            ..FrameConfig::default()
        };
        let mut session = DeviceSession::with_frame_config(stream, config(), framing);

        let reason = session.run(&mut Vec::<Measurement>::new());
        assert!(matches!(
            reason,
            SessionError::Frame(FrameError::RetriesExhausted { attempts: 3, .. })
        ));
    }

    #[test]
    fn closed_sink_ends_the_session() {
        let mut session = session(&frame(1).repeat(3));
        let (mut tx, rx) = mpsc::channel();
        drop(rx);

        let reason = session.run(&mut tx);
        assert!(matches!(reason, SessionError::Sink(SinkError::Closed)));
        assert_eq!(session.cycles(), 1);
    }

    #[test]
    fn spawned_sampler_feeds_handoff() {
        let session = session(&format!("{}{}", frame(1), frame(2)));
        let (tx, mut rx) = handoff(8);

        let handle = session.spawn(tx).unwrap();
        let reason = handle.join().unwrap();
        assert!(matches!(reason, SessionError::Frame(FrameError::ConnectionClosed)));

        // Both frames were complete in one read, so only the newer one is taken.
        assert_eq!(rx.blocking_recv().unwrap().co2, 2.0);
        assert!(rx.blocking_recv().is_err());
    }

    #[test]
    fn sampler_thread_is_named() {
        let session = session(&frame(1));
        let (tx, rx) = mpsc::channel::<String>();

        struct ThreadName(mpsc::Sender<String>);
        impl RecordSink for ThreadName {
            fn send(&mut self, _record: Measurement) -> std::result::Result<(), SinkError> {
                let name = thread::current().name().unwrap_or_default().to_string();
                self.0.send(name).map_err(|_| SinkError::Closed)
            }
        }

        session.spawn(ThreadName(tx)).unwrap().join().unwrap();
        assert_eq!(rx.recv().unwrap(), "li820-sampler");
    }

    #[test]
    fn close_returns_stream() {
        let mut session = session(&frame(1));
        session.sample().unwrap();
        let stream = session.close();
        assert_eq!(stream.position() as usize, stream.get_ref().len());
    }

    #[test]
    fn capture_time_holds_when_clock_steps_back() {
        let mut session = session("");
        let later = DateTime::from_timestamp(1_700_000_060, 0).unwrap();
        let earlier = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let frame = "<li820><co2>1</co2><h2o>2</h2o></li820>";

        assert_eq!(session.stamp(frame, later).captured_at, later);
        assert_eq!(session.stamp(frame, earlier).captured_at, later);

        let next = DateTime::from_timestamp(1_700_000_120, 0).unwrap();
        assert_eq!(session.stamp(frame, next).captured_at, next);
    }
}

//! Measurement decoding and the sampling loop.
//!
//! A [`DeviceSession`] owns one analyzer stream. Each cycle pulls the most
//! recent complete frame through [`li820_frame::FrameExtractor`], decodes it
//! into a [`Measurement`] and hands it to a [`RecordSink`]. Malformed frames
//! never stop the loop; they decode to the sentinel record instead.
//!
//! ```no_run
//! use li820_frame::FrameTag;
//! use li820_sampler::{handoff, DeviceSession, SessionConfig};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let port = std::fs::File::open("/dev/ttyS1")?;
//! let config = SessionConfig::new(FrameTag::new("li820")?, "glbrc");
//! let (tx, mut rx) = handoff(64);
//!
//! let sampler = DeviceSession::new(port, config).spawn(tx)?;
//! let record = rx.blocking_recv()?;
//! println!("{} ppm", record.co2);
//! # drop(sampler);
//! # Ok(())
//! # }
//! ```

pub mod decode;
pub mod error;
pub mod measurement;
pub mod session;
pub mod sink;

pub use decode::{decode, decode_at, parse_reading, Reading};
pub use error::{DecodeError, SessionError, SinkError};
pub use measurement::{Measurement, SENTINEL};
pub use session::{DeviceSession, SessionConfig};
pub use sink::{handoff, RecordSink, DEFAULT_QUEUE_CAPACITY, MAX_QUEUE_CAPACITY};

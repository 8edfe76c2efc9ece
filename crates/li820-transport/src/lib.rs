//! Byte-stream plumbing for the li820 sampler.
//!
//! Two directions live here:
//! - Device side: [`DeviceStream`] opens the analyzer's serial port (or the
//!   [`SyntheticAnalyzer`] stand-in) and exposes it as a plain `Read + Write`.
//! - Publish side: [`Endpoint`] and [`EndpointListener`] accept subscriber
//!   connections over TCP or Unix domain sockets.
//!
//! Nothing in this crate knows about frames or measurements.

pub mod device;
pub mod endpoint;
pub mod error;
pub mod listener;
pub mod stream;
pub mod synthetic;

#[cfg(unix)]
pub mod uds;

pub use device::{DeviceAddress, DeviceStream, SerialSettings, DEFAULT_BAUD_RATE};
pub use endpoint::Endpoint;
pub use error::{Result, TransportError};
pub use listener::EndpointListener;
pub use stream::SubscriberStream;
pub use synthetic::SyntheticAnalyzer;

#[cfg(unix)]
pub use uds::UnixDomainSocket;

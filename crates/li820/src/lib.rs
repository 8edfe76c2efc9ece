//! Continuous sampling of LI-COR LI-820/LI-840 CO2/H2O gas analyzers.
//!
//! The analyzer streams tag-delimited XML frames over RS-232. This workspace
//! slices those frames out of the byte stream, decodes them into typed
//! measurements and fans the measurements out to subscribers and a Prometheus
//! gauge.
//!
//! # Crate Structure
//!
//! - [`transport`]: Serial and synthetic device streams, publish endpoints
//! - [`frame`]: Tag-delimited frame reading and extraction
//! - [`sampler`]: Decoding and the per-device sampling loop
//! - [`publish`]: Subscriber fan-out, metrics, HTTP exposition

/// Re-export transport types.
pub mod transport {
    pub use li820_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use li820_frame::*;
}

/// Re-export sampler types.
pub mod sampler {
    pub use li820_sampler::*;
}

/// Re-export publish types.
pub mod publish {
    pub use li820_publish::*;
}

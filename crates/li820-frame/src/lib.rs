//! Tag-delimited framing for LI-COR analyzer output.
//!
//! The analyzer writes an endless ASCII stream of frames shaped like
//! `<li820>...<co2>412.5</co2>...</li820>`. There is no length prefix and no
//! checksum; frame boundaries are found purely by searching for the opening
//! and closing tags of the configured model.
//!
//! - [`FrameReader`] accumulates raw bytes until a marker shows up.
//! - [`FrameExtractor`] anchors on the most recent start tag and slices out the
//!   most recently completed frame.

pub mod backoff;
pub mod config;
pub mod error;
pub mod extractor;
pub mod reader;
pub mod tag;

pub use backoff::Backoff;
pub use config::{FrameConfig, LeftoverPolicy, RetryPolicy, DEFAULT_MAX_FRAME_SIZE, READ_CHUNK_SIZE};
pub use error::{FrameError, Result};
pub use extractor::{locate_frame, FrameExtractor};
pub use reader::FrameReader;
pub use tag::{FrameTag, Markers};

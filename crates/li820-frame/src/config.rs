use std::time::Duration;

/// Bytes requested from the stream per read.
pub const READ_CHUNK_SIZE: usize = 1024;

/// Default cap on accumulated bytes while waiting for a frame: 64 KiB.
///
/// Analyzer frames are a few hundred bytes; anything this large is garbage or a
/// lost end tag.
pub const DEFAULT_MAX_FRAME_SIZE: usize = 64 * 1024;

/// What happens to bytes received after the end of an extracted frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LeftoverPolicy {
    /// Keep them for the next frame, so a burst carrying several frames loses none.
    #[default]
    CarryForward,
    /// Drop them and start the next frame from fresh reads.
    Discard,
}

/// Backoff applied to failing stream reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Consecutive read errors tolerated before the stream is given up.
    pub max_consecutive_errors: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_consecutive_errors: 10,
            initial_delay: Duration::from_millis(50),
            max_delay: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    /// Retry without sleeping; used by tests and in-memory sources.
    pub fn immediate(max_consecutive_errors: u32) -> Self {
        Self {
            max_consecutive_errors,
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }
}

/// Configuration for frame reading and extraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameConfig {
    /// Accumulator size past which unframed bytes are dropped to resynchronize.
    pub max_frame_size: usize,
    pub leftover: LeftoverPolicy,
    pub retry: RetryPolicy,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
            leftover: LeftoverPolicy::default(),
            retry: RetryPolicy::default(),
        }
    }
}

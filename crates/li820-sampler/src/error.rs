/// Why a frame could not be turned into a reading.
///
/// Decode errors never leave the decoder as errors; they are logged and
/// replaced by the sentinel record.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DecodeError {
    /// The frame is not well-formed XML.
    #[error("malformed frame: {0}")]
    Malformed(String),

    /// The outer element is not the configured model tag.
    #[error("frame tag mismatch: expected <{expected}>, found <{found}>")]
    TagMismatch { expected: String, found: String },

    /// A required field is absent.
    #[error("missing field <{0}>")]
    MissingField(&'static str),

    /// A field holds something that is not a finite number.
    #[error("invalid number in <{field}>: {value:?}")]
    InvalidNumber { field: &'static str, value: String },
}

/// The handoff sink no longer accepts records.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SinkError {
    /// Every receiver is gone.
    #[error("record sink closed")]
    Closed,
}

/// Why a sampling session stopped.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Fatal stream error: end of stream or persistent read failures.
    #[error("stream error: {0}")]
    Frame(#[from] li820_frame::FrameError),

    /// Nothing is consuming records anymore.
    #[error("sink error: {0}")]
    Sink(#[from] SinkError),

    /// The sampler thread could not be started.
    #[error("failed to spawn sampler thread: {0}")]
    Spawn(std::io::Error),
}

pub type Result<T> = std::result::Result<T, SessionError>;

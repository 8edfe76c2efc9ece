/// Errors that end frame extraction on a stream.
///
/// Recoverable conditions (idle timeouts, isolated read errors, oversized
/// garbage) are handled inside the reader and never surface here.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The stream reached end-of-file.
    #[error("stream closed")]
    ConnectionClosed,

    /// Reads kept failing past the configured retry bound.
    #[error("giving up after {attempts} consecutive read errors: {source}")]
    RetriesExhausted {
        attempts: u32,
        source: std::io::Error,
    },

    /// The frame tag is empty or contains characters that cannot appear in a tag name.
    #[error("invalid frame tag {0:?}")]
    InvalidTag(String),
}

pub type Result<T> = std::result::Result<T, FrameError>;

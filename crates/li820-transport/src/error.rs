use std::path::PathBuf;

/// Errors that can occur opening devices or publish endpoints.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The analyzer device could not be opened.
    #[error("failed to open device {device}: {source}")]
    Open {
        device: String,
        source: serialport::Error,
    },

    /// Failed to bind a publish endpoint.
    #[error("failed to bind to {endpoint}: {source}")]
    Bind {
        endpoint: String,
        source: std::io::Error,
    },

    /// Failed to accept an incoming subscriber connection.
    #[error("failed to accept connection: {0}")]
    Accept(std::io::Error),

    /// An I/O error occurred on a stream.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The socket path is too long for the platform.
    #[error("socket path too long ({len} bytes, max {max}): {path}")]
    PathTooLong {
        path: PathBuf,
        len: usize,
        max: usize,
    },

    /// The device address could not be parsed.
    #[error("invalid device address: {0}")]
    InvalidAddress(String),

    /// The endpoint string is not `tcp://HOST:PORT` or `ipc://PATH`.
    #[error("invalid endpoint (expected tcp://HOST:PORT or ipc://PATH): {0}")]
    InvalidEndpoint(String),
}

pub type Result<T> = std::result::Result<T, TransportError>;

use std::fmt;
use std::io;

use li820_frame::FrameError;
use li820_publish::PublishError;
use li820_sampler::SessionError;
use li820_transport::TransportError;

// Process exit codes.
pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const TRANSPORT_ERROR: i32 = 3;
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::NotFound => FAILURE,
        io::ErrorKind::InvalidData => DATA_INVALID,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn transport_error(context: &str, err: TransportError) -> CliError {
    match err {
        TransportError::Accept(source) | TransportError::Io(source) => io_error(context, source),
        TransportError::Bind { ref source, .. }
            if source.kind() == io::ErrorKind::PermissionDenied =>
        {
            CliError::new(PERMISSION_DENIED, format!("{context}: {err}"))
        }
        TransportError::InvalidAddress(_) | TransportError::InvalidEndpoint(_) => {
            CliError::new(USAGE, format!("{context}: {err}"))
        }
        other => CliError::new(TRANSPORT_ERROR, format!("{context}: {other}")),
    }
}

pub fn frame_error(context: &str, err: FrameError) -> CliError {
    match err {
        FrameError::ConnectionClosed => CliError::new(FAILURE, format!("{context}: {err}")),
        FrameError::RetriesExhausted { .. } => {
            CliError::new(TRANSPORT_ERROR, format!("{context}: {err}"))
        }
        FrameError::InvalidTag(_) => CliError::new(USAGE, format!("{context}: {err}")),
    }
}

pub fn session_error(context: &str, err: SessionError) -> CliError {
    match err {
        SessionError::Frame(err) => frame_error(context, err),
        SessionError::Sink(err) => CliError::new(FAILURE, format!("{context}: {err}")),
        SessionError::Spawn(err) => io_error(context, err),
    }
}

pub fn publish_error(context: &str, err: PublishError) -> CliError {
    match err {
        PublishError::Transport(err) => transport_error(context, err),
        PublishError::HttpBind { ref source, .. }
            if source.kind() == io::ErrorKind::PermissionDenied =>
        {
            CliError::new(PERMISSION_DENIED, format!("{context}: {err}"))
        }
        PublishError::HttpBind { .. } => {
            CliError::new(TRANSPORT_ERROR, format!("{context}: {err}"))
        }
        PublishError::Http(source) | PublishError::Spawn { source, .. } => {
            io_error(context, source)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stream_errors() {
        assert_eq!(frame_error("x", FrameError::ConnectionClosed).code, FAILURE);
        let exhausted = FrameError::RetriesExhausted {
            attempts: 10,
            source: io::Error::other("unplugged"),
        };
        let err = frame_error("sampling failed", exhausted);
        assert_eq!(err.code, TRANSPORT_ERROR);
        assert!(err.message.starts_with("sampling failed: giving up after 10"));
    }

    #[test]
    fn session_errors_unwrap_to_frame_errors() {
        let err = session_error("x", SessionError::Frame(FrameError::ConnectionClosed));
        assert_eq!(err.code, FAILURE);
    }

    #[test]
    fn transport_errors() {
        let err = transport_error("x", TransportError::InvalidEndpoint("udp://a".into()));
        assert_eq!(err.code, USAGE);

        let denied = TransportError::Bind {
            endpoint: "tcp://0.0.0.0:80".into(),
            source: io::ErrorKind::PermissionDenied.into(),
        };
        assert_eq!(transport_error("x", denied).code, PERMISSION_DENIED);

        let in_use = TransportError::Bind {
            endpoint: "tcp://0.0.0.0:5556".into(),
            source: io::ErrorKind::AddrInUse.into(),
        };
        assert_eq!(transport_error("x", in_use).code, TRANSPORT_ERROR);
    }

    #[test]
    fn publish_errors() {
        let err = publish_error(
            "x",
            PublishError::HttpBind {
                addr: "0.0.0.0:9092".into(),
                source: io::ErrorKind::AddrInUse.into(),
            },
        );
        assert_eq!(err.code, TRANSPORT_ERROR);
    }
}

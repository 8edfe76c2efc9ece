/// Errors that can occur on the publishing side.
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    /// A publish endpoint could not be bound.
    #[error("transport error: {0}")]
    Transport(#[from] li820_transport::TransportError),

    /// The metrics HTTP listener could not be bound.
    #[error("failed to bind metrics server to {addr}: {source}")]
    HttpBind {
        addr: String,
        source: std::io::Error,
    },

    /// The metrics HTTP server failed while running.
    #[error("metrics server error: {0}")]
    Http(std::io::Error),

    /// A worker thread could not be started.
    #[error("failed to spawn {name} thread: {source}")]
    Spawn {
        name: &'static str,
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, PublishError>;

use std::net::TcpListener;

use tracing::{debug, info};

use crate::endpoint::Endpoint;
use crate::error::{Result, TransportError};
use crate::stream::SubscriberStream;

/// A bound publish endpoint accepting subscribers.
pub enum EndpointListener {
    Tcp {
        listener: TcpListener,
        endpoint: Endpoint,
    },
    #[cfg(unix)]
    Unix {
        socket: crate::uds::UnixDomainSocket,
        endpoint: Endpoint,
    },
}

impl EndpointListener {
    /// Bind `endpoint` and start listening.
    pub fn bind(endpoint: &Endpoint) -> Result<Self> {
        match endpoint {
            Endpoint::Tcp(addr) => {
                let listener = TcpListener::bind(addr).map_err(|source| TransportError::Bind {
                    endpoint: endpoint.to_string(),
                    source,
                })?;
                let local = listener
                    .local_addr()
                    .map(|a| a.to_string())
                    .unwrap_or_else(|_| addr.clone());
                info!(addr = %local, "listening on tcp");
                Ok(Self::Tcp {
                    listener,
                    endpoint: Endpoint::Tcp(local),
                })
            }
            #[cfg(unix)]
            Endpoint::Ipc(path) => Ok(Self::Unix {
                socket: crate::uds::UnixDomainSocket::bind(path)?,
                endpoint: endpoint.clone(),
            }),
            #[cfg(not(unix))]
            Endpoint::Ipc(_) => Err(TransportError::InvalidEndpoint(format!(
                "{endpoint} (unix domain sockets are not supported on this platform)"
            ))),
        }
    }

    /// Accept the next subscriber (blocking).
    pub fn accept(&self) -> Result<SubscriberStream> {
        match self {
            Self::Tcp { listener, .. } => {
                let (stream, addr) = listener.accept().map_err(TransportError::Accept)?;
                debug!(%addr, "accepted subscriber");
                Ok(SubscriberStream::from_tcp(stream))
            }
            #[cfg(unix)]
            Self::Unix { socket, .. } => socket.accept(),
        }
    }

    /// The endpoint as actually bound (TCP port 0 is resolved to the real port).
    pub fn endpoint(&self) -> &Endpoint {
        match self {
            Self::Tcp { endpoint, .. } => endpoint,
            #[cfg(unix)]
            Self::Unix { endpoint, .. } => endpoint,
        }
    }
}

impl std::fmt::Debug for EndpointListener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EndpointListener")
            .field("endpoint", &self.endpoint().to_string())
            .finish()
    }
}

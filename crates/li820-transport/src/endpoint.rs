use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::{Result, TransportError};

/// A publish endpoint subscribers connect to.
///
/// Accepts the same spelling as the endpoints the analyzer service has always
/// bound: `tcp://*:5556` and `ipc://weather.ipc`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    /// TCP listener on `HOST:PORT`; `*` as host binds all interfaces.
    Tcp(String),
    /// Unix domain socket at a filesystem path.
    Ipc(PathBuf),
}

impl FromStr for Endpoint {
    type Err = TransportError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if let Some(addr) = s.strip_prefix("tcp://") {
            let (host, port) = addr
                .rsplit_once(':')
                .ok_or_else(|| TransportError::InvalidEndpoint(s.to_string()))?;
            if port.parse::<u16>().is_err() {
                return Err(TransportError::InvalidEndpoint(s.to_string()));
            }
            let host = match host {
                "*" | "" => "0.0.0.0",
                other => other,
            };
            return Ok(Self::Tcp(format!("{host}:{port}")));
        }
        if let Some(path) = s.strip_prefix("ipc://") {
            if path.is_empty() {
                return Err(TransportError::InvalidEndpoint(s.to_string()));
            }
            return Ok(Self::Ipc(PathBuf::from(path)));
        }
        Err(TransportError::InvalidEndpoint(s.to_string()))
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Tcp(addr) => write!(f, "tcp://{addr}"),
            Endpoint::Ipc(path) => write!(f, "ipc://{}", path.display()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wildcard_tcp_binds_all_interfaces() {
        let ep: Endpoint = "tcp://*:5556".parse().unwrap();
        assert_eq!(ep, Endpoint::Tcp("0.0.0.0:5556".to_string()));
        assert_eq!(ep.to_string(), "tcp://0.0.0.0:5556");
    }

    #[test]
    fn explicit_tcp_host_kept() {
        let ep: Endpoint = "tcp://127.0.0.1:7000".parse().unwrap();
        assert_eq!(ep, Endpoint::Tcp("127.0.0.1:7000".to_string()));
    }

    #[test]
    fn relative_ipc_path() {
        let ep: Endpoint = "ipc://weather.ipc".parse().unwrap();
        assert_eq!(ep, Endpoint::Ipc(PathBuf::from("weather.ipc")));
        assert_eq!(ep.to_string(), "ipc://weather.ipc");
    }

    #[test]
    fn rejects_unknown_or_incomplete() {
        for bad in ["udp://*:1", "tcp://*", "tcp://*:port", "ipc://", "weather.ipc"] {
            assert!(
                matches!(bad.parse::<Endpoint>(), Err(TransportError::InvalidEndpoint(_))),
                "{bad} should be rejected"
            );
        }
    }
}

use std::os::unix::fs::{FileTypeExt, MetadataExt, PermissionsExt};
use std::os::unix::net::UnixListener;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{debug, info};

use crate::error::{Result, TransportError};
use crate::stream::SubscriberStream;

/// Unix domain socket publish endpoint.
///
/// The socket file is removed again on drop, unless something else has
/// replaced it in the meantime.
pub struct UnixDomainSocket {
    listener: UnixListener,
    path: PathBuf,
    created_inode: Option<(u64, u64)>,
    next_peer: AtomicU64,
}

impl UnixDomainSocket {
    /// Default permission mode for created socket paths.
    pub const DEFAULT_SOCKET_MODE: u32 = 0o600;
    /// `sockaddr_un.sun_path` is 108 bytes on Linux, 104 on macOS.
    #[cfg(target_os = "linux")]
    const MAX_PATH_LEN: usize = 108;
    #[cfg(not(target_os = "linux"))]
    const MAX_PATH_LEN: usize = 104;

    /// Bind and listen on `path` with [`Self::DEFAULT_SOCKET_MODE`].
    ///
    /// A stale socket file at `path` is removed first; any other kind of file
    /// is left alone and reported as a bind error.
    pub fn bind(path: impl AsRef<Path>) -> Result<Self> {
        Self::bind_with_mode(path, Self::DEFAULT_SOCKET_MODE)
    }

    /// Bind and listen with an explicit permission mode.
    pub fn bind_with_mode(path: impl AsRef<Path>, mode: u32) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let path_bytes = path.as_os_str().len();
        if path_bytes >= Self::MAX_PATH_LEN {
            return Err(TransportError::PathTooLong {
                path,
                len: path_bytes,
                max: Self::MAX_PATH_LEN,
            });
        }

        let bind_err = |source: std::io::Error| TransportError::Bind {
            endpoint: format!("ipc://{}", path.display()),
            source,
        };

        if path.exists() {
            let metadata = std::fs::symlink_metadata(&path).map_err(bind_err)?;
            if !metadata.file_type().is_socket() {
                return Err(bind_err(std::io::Error::new(
                    std::io::ErrorKind::AlreadyExists,
                    "existing path is not a unix socket",
                )));
            }
            debug!(?path, "removing stale socket");
            std::fs::remove_file(&path).map_err(bind_err)?;
        }

        let listener = UnixListener::bind(&path).map_err(bind_err)?;
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(mode)).map_err(bind_err)?;
        let created = std::fs::symlink_metadata(&path).map_err(bind_err)?;

        info!(?path, "listening on unix domain socket");

        Ok(Self {
            listener,
            created_inode: Some((created.dev(), created.ino())),
            path,
            next_peer: AtomicU64::new(1),
        })
    }

    /// Accept the next subscriber (blocking).
    pub fn accept(&self) -> Result<SubscriberStream> {
        let (stream, _addr) = self.listener.accept().map_err(TransportError::Accept)?;
        let id = self.next_peer.fetch_add(1, Ordering::Relaxed);
        let label = format!("ipc://{}#{id}", self.path.display());
        debug!(peer = %label, "accepted subscriber");
        Ok(SubscriberStream::from_unix(stream, label))
    }

    /// Connect to a listening socket as a subscriber.
    pub fn connect(path: impl AsRef<Path>) -> Result<SubscriberStream> {
        let path = path.as_ref();
        let stream = std::os::unix::net::UnixStream::connect(path)?;
        Ok(SubscriberStream::from_unix(
            stream,
            format!("ipc://{}", path.display()),
        ))
    }

    /// The path this socket is bound to.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for UnixDomainSocket {
    fn drop(&mut self) {
        let Some((expected_dev, expected_ino)) = self.created_inode else {
            return;
        };
        if let Ok(metadata) = std::fs::symlink_metadata(&self.path) {
            if metadata.file_type().is_socket()
                && metadata.dev() == expected_dev
                && metadata.ino() == expected_ino
            {
                debug!(path = ?self.path, "cleaning up socket file");
                let _ = std::fs::remove_file(&self.path);
            } else {
                debug!(path = ?self.path, "socket path identity changed; skipping cleanup");
            }
        }
    }
}

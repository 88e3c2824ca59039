//! Local listening sockets that stand in for a remote listener.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::net::{TcpListener, TcpStream};
#[cfg(unix)]
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::Mutex;
use tracing::debug;
use tunbind_common::{BindError, Result, PIPE_PREFIX, UNIX_PREFIX};

/// The forwarding address a listener is told to send traffic into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ForwardAddr {
    /// Loopback TCP, rendered as `localhost:<port>`.
    Tcp { port: u16 },
    /// Unix-domain socket, rendered as `unix:<path>`.
    Unix(PathBuf),
    /// Named pipe, rendered as `pipe:<path>`.
    Pipe(PathBuf),
}

impl fmt::Display for ForwardAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ForwardAddr::Tcp { port } => write!(f, "localhost:{port}"),
            ForwardAddr::Unix(path) => write!(f, "{UNIX_PREFIX}{}", path.display()),
            ForwardAddr::Pipe(path) => write!(f, "{PIPE_PREFIX}{}", path.display()),
        }
    }
}

#[derive(Debug)]
enum Kind {
    Tcp(TcpListener),
    #[cfg(unix)]
    Unix(UnixListener),
}

/// One accepted connection from the rendezvous socket.
pub enum LocalStream {
    Tcp(TcpStream),
    #[cfg(unix)]
    Unix(UnixStream),
}

/// An OS-level listening socket owned by this process.
///
/// Shared by reference between the bind adapter (address lookup, shutdown)
/// and the caller's accept loop, hence the internal close latch.
pub struct LocalSocket {
    kind: Mutex<Option<Arc<Kind>>>,
    addr: ForwardAddr,
    path: Option<PathBuf>,
}

impl LocalSocket {
    /// Bind a loopback TCP socket on an ephemeral port.
    pub async fn bind_loopback() -> Result<Self> {
        let listener = TcpListener::bind(("127.0.0.1", 0)).await?;
        let port = listener.local_addr()?.port();
        Ok(Self {
            kind: Mutex::new(Some(Arc::new(Kind::Tcp(listener)))),
            addr: ForwardAddr::Tcp { port },
            path: None,
        })
    }

    /// Bind a Unix-domain socket at `path`.
    ///
    /// Platforms without domain sockets report `Unsupported` so callers fall
    /// back to loopback TCP. Must be called from within a tokio runtime.
    pub fn bind_path(path: &Path) -> Result<Self> {
        #[cfg(unix)]
        {
            let listener = UnixListener::bind(path)?;
            Ok(Self {
                kind: Mutex::new(Some(Arc::new(Kind::Unix(listener)))),
                addr: ForwardAddr::Unix(path.to_path_buf()),
                path: Some(path.to_path_buf()),
            })
        }
        #[cfg(not(unix))]
        {
            let _ = path;
            Err(BindError::Io(std::io::Error::new(
                std::io::ErrorKind::Unsupported,
                "domain sockets unavailable on this platform",
            )))
        }
    }

    pub fn forward_addr(&self) -> &ForwardAddr {
        &self.addr
    }

    /// The socket file path, for pipe-backed sockets.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Accept one connection. Fails once the socket has been closed.
    pub async fn accept(&self) -> Result<LocalStream> {
        // the lock is not held across the accept await, so a concurrent
        // close never waits on a pending accept
        let kind = self.kind.lock().await.as_ref().map(Arc::clone);
        match kind.as_deref() {
            Some(Kind::Tcp(listener)) => Ok(LocalStream::Tcp(listener.accept().await?.0)),
            #[cfg(unix)]
            Some(Kind::Unix(listener)) => Ok(LocalStream::Unix(listener.accept().await?.0)),
            None => Err(BindError::SocketClosed),
        }
    }

    /// Close the socket and best-effort unlink its file. Idempotent.
    pub async fn close(&self) {
        let mut guard = self.kind.lock().await;
        if guard.take().is_some() {
            if let Some(path) = &self.path {
                if let Err(err) = std::fs::remove_file(path) {
                    debug!("cannot unlink {}: {err}", path.display());
                }
            }
        }
    }

    pub async fn is_closed(&self) -> bool {
        self.kind.lock().await.is_none()
    }
}

impl fmt::Debug for LocalSocket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalSocket")
            .field("addr", &self.addr)
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

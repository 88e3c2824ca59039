//! Bind adapter: make a remote listener usable as a local socket.
//!
//! Binding prefers a pipe rendezvous (Unix-domain socket or named pipe) and
//! falls back to loopback TCP on an ephemeral port when the pipe path cannot
//! be allocated or bound. Forwarding is only enabled once the local socket is
//! actually listening.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use tracing::debug;
use tunbind_common::Result;

use crate::config::{normalize, RawConfig};
use crate::engine::{with_error_code, Listener, TunnelEngine};
use crate::rendezvous;
use crate::shutdown::ShutdownCoordinator;
use crate::socket::LocalSocket;

/// The caller's server, reduced to its two listen operations.
///
/// The default implementation is [`LocalSocketFactory`]; servers with their
/// own socket setup (tuning, TLS offload, test doubles) implement this to
/// keep ownership of the listen call.
#[async_trait]
pub trait ServerLike: Send {
    /// Listen on a filesystem socket or named pipe at `path`.
    async fn listen_path(&mut self, path: &Path) -> Result<LocalSocket>;

    /// Listen on loopback TCP with an ephemeral port.
    async fn listen_loopback(&mut self) -> Result<LocalSocket>;
}

/// Plain tokio sockets; the default [`ServerLike`].
#[derive(Debug, Default)]
pub struct LocalSocketFactory;

#[async_trait]
impl ServerLike for LocalSocketFactory {
    async fn listen_path(&mut self, path: &Path) -> Result<LocalSocket> {
        LocalSocket::bind_path(path)
    }

    async fn listen_loopback(&mut self) -> Result<LocalSocket> {
        LocalSocket::bind_loopback().await
    }
}

/// A listener pre-bound to a synthetic local socket, not yet forwarding.
///
/// Two-phase by design: [`handle`](Self::handle) has no side effects, and
/// forwarding starts only on the explicit [`activate`](Self::activate) call,
/// so traffic never arrives before the adopting server runs its accept loop.
pub struct BoundListener {
    listener: Arc<dyn Listener>,
    socket: Arc<LocalSocket>,
    activated: AtomicBool,
}

impl BoundListener {
    /// The local socket a downstream listen API can adopt.
    pub fn handle(&self) -> Arc<LocalSocket> {
        Arc::clone(&self.socket)
    }

    pub fn listener(&self) -> Arc<dyn Listener> {
        Arc::clone(&self.listener)
    }

    /// Start forwarding into the synthetic socket. The first call enables
    /// forwarding; later calls are no-ops.
    pub async fn activate(&self) -> Result<()> {
        if self.activated.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        let addr = self.socket.forward_addr().to_string();
        with_error_code(self.listener.forward(&addr)).await
    }
}

/// Result of binding a caller's server to a listener.
#[derive(Debug)]
pub struct BoundSocket {
    socket: Arc<LocalSocket>,
    listener: Arc<dyn Listener>,
}

impl BoundSocket {
    pub fn socket(&self) -> Arc<LocalSocket> {
        Arc::clone(&self.socket)
    }

    pub fn listener(&self) -> Arc<dyn Listener> {
        Arc::clone(&self.listener)
    }

    /// The rendezvous file path, when the bind is pipe-based.
    pub fn path(&self) -> Option<&Path> {
        self.socket.path()
    }
}

/// What to bind a server to: a bare listener or a listenable handle.
pub enum BindTarget {
    Listener(Arc<dyn Listener>),
    Bound(BoundListener),
}

impl From<Arc<dyn Listener>> for BindTarget {
    fn from(listener: Arc<dyn Listener>) -> Self {
        BindTarget::Listener(listener)
    }
}

impl From<BoundListener> for BindTarget {
    fn from(bound: BoundListener) -> Self {
        BindTarget::Bound(bound)
    }
}

/// Composes the engine, the rendezvous allocator, and the shutdown
/// coordinator behind the caller-facing bind operations.
pub struct BindAdapter {
    pub(crate) engine: Arc<dyn TunnelEngine>,
    pub(crate) shutdown: Arc<ShutdownCoordinator>,
}

impl BindAdapter {
    pub fn new(engine: Arc<dyn TunnelEngine>) -> Self {
        Self::with_shutdown(engine, ShutdownCoordinator::new())
    }

    /// Use a caller-provided coordinator, e.g. one shared across adapters or
    /// driven manually in tests.
    pub fn with_shutdown(engine: Arc<dyn TunnelEngine>, shutdown: Arc<ShutdownCoordinator>) -> Self {
        Self { engine, shutdown }
    }

    pub fn shutdown(&self) -> &Arc<ShutdownCoordinator> {
        &self.shutdown
    }

    /// A listener pre-bound to a synthetic loopback socket, suitable for
    /// handing to anything that expects to accept local connections.
    /// Authenticates from the environment and uses an HTTP endpoint.
    pub async fn listenable(&self) -> Result<BoundListener> {
        let listener = self.default_listener().await?;
        let socket = Arc::new(LocalSocket::bind_loopback().await?);
        self.shutdown
            .register(Arc::clone(&listener), Arc::clone(&socket))
            .await;
        self.shutdown.install();
        Ok(BoundListener {
            listener,
            socket,
            activated: AtomicBool::new(false),
        })
    }

    /// Bind the caller's server to a listener, creating a default listener
    /// when none is supplied.
    pub async fn bind_server<S: ServerLike>(
        &self,
        server: &mut S,
        target: Option<BindTarget>,
    ) -> Result<BoundSocket> {
        let listener = match target {
            Some(BindTarget::Listener(listener)) => listener,
            Some(BindTarget::Bound(bound)) => {
                // the synthetic socket loses to the caller's real server
                bound.socket.close().await;
                bound.listener
            }
            None => self.default_listener().await?,
        };

        // pipe attempt first; any allocation or bind failure is recoverable
        let socket = match self.link_pipe(&listener, server).await {
            Ok(socket) => socket,
            Err(err) => {
                debug!("using tcp socket: {err}");
                server.listen_loopback().await?
            }
        };

        // the socket is listening, forwarding may start; engine failures
        // from here on are fatal
        let addr = socket.forward_addr().to_string();
        with_error_code(listener.forward(&addr)).await?;

        let socket = Arc::new(socket);
        self.shutdown
            .register(Arc::clone(&listener), Arc::clone(&socket))
            .await;
        self.shutdown.install();
        Ok(BoundSocket { socket, listener })
    }

    async fn link_pipe<S: ServerLike>(
        &self,
        listener: &Arc<dyn Listener>,
        server: &mut S,
    ) -> Result<LocalSocket> {
        let path = rendezvous::allocate(&listener.id())?;
        let socket = server.listen_path(&path).await?;
        rendezvous::tighten_permissions(&path);
        Ok(socket)
    }

    /// Env-authenticated session with an HTTP endpoint.
    async fn default_listener(&self) -> Result<Arc<dyn Listener>> {
        let raw = RawConfig::new(json!({ "authtoken_from_env": true }));
        let (config, hooks) = normalize(raw);
        let session = with_error_code(self.engine.connect(&config, hooks)).await?;
        with_error_code(session.http_endpoint().listen()).await
    }
}

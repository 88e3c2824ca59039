//! One-shot shutdown coordination for listener/socket pairs.
//!
//! An explicit object rather than process-wide ambient state, so independent
//! instances can be driven in tests. The latch guarantees the teardown runs
//! at most once no matter how often the interrupt fires or how many binds
//! race to register.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::callbacks::LogEventAdapter;
use crate::engine::Listener;
use crate::socket::LocalSocket;

// Bounded wait for the remote close RPC so process exit is never stalled by
// a hung engine.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

struct CleanupTarget {
    listener: Arc<dyn Listener>,
    socket: Arc<LocalSocket>,
}

/// Drives ordered teardown of a listener and its local socket on interrupt.
pub struct ShutdownCoordinator {
    target: Mutex<Option<CleanupTarget>>,
    log_hook: std::sync::Mutex<Option<Arc<LogEventAdapter>>>,
    installed: AtomicBool,
    fired: AtomicBool,
    external_handler: AtomicBool,
}

impl ShutdownCoordinator {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            target: Mutex::new(None),
            log_hook: std::sync::Mutex::new(None),
            installed: AtomicBool::new(false),
            fired: AtomicBool::new(false),
            external_handler: AtomicBool::new(false),
        })
    }

    /// Replace the cleanup target; the most recent registration wins.
    /// No-op once the coordinator has fired.
    pub async fn register(&self, listener: Arc<dyn Listener>, socket: Arc<LocalSocket>) {
        if self.fired.load(Ordering::SeqCst) {
            return;
        }
        self.target
            .lock()
            .await
            .replace(CleanupTarget { listener, socket });
    }

    /// Remember the active log adapter so it can be silenced at teardown.
    pub fn set_log_hook(&self, hook: Arc<LogEventAdapter>) {
        if let Ok(mut guard) = self.log_hook.lock() {
            guard.replace(hook);
        }
    }

    /// Record that the caller installed its own interrupt handler. The
    /// coordinator then defers entirely rather than half-running a teardown
    /// the other handler assumes it owns.
    pub fn note_external_handler(&self) {
        self.external_handler.store(true, Ordering::SeqCst);
    }

    /// Spawn the single process-wide ctrl-c watcher. Later calls are no-ops.
    pub fn install(self: &Arc<Self>) {
        if self.installed.swap(true, Ordering::SeqCst) {
            return;
        }
        let this = Arc::clone(self);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                this.trigger().await;
            }
        });
    }

    /// Run the ordered teardown at most once: listener close (bounded),
    /// then local socket, then the logging hook.
    pub async fn trigger(&self) {
        if self.external_handler.load(Ordering::SeqCst) {
            debug!("external interrupt handler present, deferring cleanup");
            return;
        }
        if self.fired.swap(true, Ordering::SeqCst) {
            return;
        }

        let target = self.target.lock().await.take();
        if let Some(CleanupTarget { listener, socket }) = target {
            // listener first, so the edge stops forwarding before the local
            // socket disappears; failures must not block socket teardown
            let id = listener.id();
            match tokio::time::timeout(CLOSE_TIMEOUT, listener.close()).await {
                Ok(Ok(())) => debug!("closed listener {id}"),
                Ok(Err(err)) => warn!("error closing listener {id}: {err}"),
                Err(_) => warn!("timed out closing listener {id}"),
            }
            socket.close().await;
            debug!("closed local socket");
        }

        if let Ok(mut guard) = self.log_hook.lock() {
            if let Some(hook) = guard.take() {
                hook.disable();
            }
        }
    }

    pub fn has_fired(&self) -> bool {
        self.fired.load(Ordering::SeqCst)
    }
}

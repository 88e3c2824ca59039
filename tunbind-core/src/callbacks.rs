//! Adapters that carry user callbacks across the engine boundary.
//!
//! The engine surface is not closure-aware in the shapes callers use: it wants
//! log events as (level, target, message) triples and connectivity changes as
//! two separate hooks. Callers hand over a single closure for each concern, so
//! these adapters sit in between and translate.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// User log callback: receives one pre-formatted line per event.
pub type LogFn = Arc<dyn Fn(String) + Send + Sync>;

/// User status callback: receives a status string such as `"connected"`.
pub type StatusFn = Arc<dyn Fn(String) + Send + Sync>;

/// Re-assembles engine log fields into the single line the caller expects.
///
/// Can be disabled (e.g. during shutdown) so late engine events stop reaching
/// caller code that may already be torn down.
pub struct LogEventAdapter {
    user: LogFn,
    enabled: AtomicBool,
}

impl LogEventAdapter {
    pub fn new(user: LogFn) -> Arc<Self> {
        Arc::new(Self {
            user,
            enabled: AtomicBool::new(true),
        })
    }

    /// Deliver one engine log event to the caller's closure.
    pub fn emit(&self, level: &str, target: &str, message: &str) {
        if self.enabled.load(Ordering::Acquire) {
            (self.user)(format!("{level} {target} - {message}"));
        }
    }

    /// Stop delivering events. Irreversible.
    pub fn disable(&self) {
        self.enabled.store(false, Ordering::Release);
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }
}

impl fmt::Debug for LogEventAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogEventAdapter")
            .field("enabled", &self.is_enabled())
            .finish_non_exhaustive()
    }
}

/// The two session-side hooks the engine fires on connectivity changes.
pub trait SessionHooks: Send + Sync {
    /// Fired on connect and reconnect with the new status.
    fn on_connection(&self, status: &str, error: Option<&str>);

    /// Fired when the session loses its connection to the remote service.
    fn on_disconnection(&self, addr: &str, error: Option<&str>);
}

/// Funnels both engine hooks into the caller's single status callback,
/// synthesizing `"closed"` on disconnect.
pub struct StatusChangeAdapter {
    user: StatusFn,
}

impl StatusChangeAdapter {
    pub fn new(user: StatusFn) -> Arc<Self> {
        Arc::new(Self { user })
    }
}

impl SessionHooks for StatusChangeAdapter {
    fn on_connection(&self, status: &str, _error: Option<&str>) {
        (self.user)(status.to_string());
    }

    fn on_disconnection(&self, _addr: &str, _error: Option<&str>) {
        (self.user)("closed".to_string());
    }
}

/// Callback material split out of a raw configuration, handed to the engine
/// alongside the canonical config.
#[derive(Default, Clone)]
pub struct EngineHooks {
    pub log: Option<Arc<LogEventAdapter>>,
    pub status: Option<Arc<dyn SessionHooks>>,
}

impl EngineHooks {
    pub fn is_empty(&self) -> bool {
        self.log.is_none() && self.status.is_none()
    }
}

impl fmt::Debug for EngineHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineHooks")
            .field("log", &self.log.is_some())
            .field("status", &self.status.is_some())
            .finish()
    }
}

//! Facade traits for the remote tunnel engine.
//!
//! The engine owns authentication, the multiplexed control channel, and edge
//! configuration. This layer only ever talks to it through the small async
//! surface below, so tests can substitute a mock and the real transport stays
//! out of scope.

use std::future::Future;
use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use regex::Regex;
use tunbind_common::{BindError, Result};

use crate::callbacks::EngineHooks;
use crate::config::CanonicalConfig;

/// Entry point to the remote ingress service.
#[async_trait]
pub trait TunnelEngine: Send + Sync {
    /// Establish an authenticated session from a canonical configuration.
    async fn connect(
        &self,
        config: &CanonicalConfig,
        hooks: EngineHooks,
    ) -> Result<Arc<dyn Session>>;
}

/// An established engine session, a factory for listener builders.
pub trait Session: Send + Sync {
    fn http_endpoint(&self) -> Box<dyn ListenerBuilder>;
    fn tcp_endpoint(&self) -> Box<dyn ListenerBuilder>;
    fn tls_endpoint(&self) -> Box<dyn ListenerBuilder>;
    fn labeled_endpoint(&self) -> Box<dyn ListenerBuilder>;
}

/// A configured endpoint that can start accepting remote connections.
#[async_trait]
pub trait ListenerBuilder: Send + Sync {
    async fn listen(&self) -> Result<Arc<dyn Listener>>;
}

/// A remotely-managed ingress endpoint.
///
/// Mutable only through engine calls; created by [`ListenerBuilder::listen`]
/// and destroyed exactly once by [`Listener::close`].
#[async_trait]
pub trait Listener: Send + Sync + std::fmt::Debug {
    fn id(&self) -> String;
    fn url(&self) -> Option<String>;
    fn forwards_to(&self) -> String;
    fn metadata(&self) -> String;

    /// Point the remote endpoint at a local address
    /// (`host:port`, `unix:<path>`, or `pipe:<path>`).
    async fn forward(&self, addr: &str) -> Result<()>;

    /// Shut the remote endpoint down.
    async fn close(&self) -> Result<()>;
}

// Engine failures carry a machine-readable code at the end of the message,
// e.g. "failed to start listener: ... error_code: ERR_NGROK_326".
#[allow(clippy::expect_used)]
static ERROR_CODE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"error_code: (ERR_[A-Z0-9]+_\d+)\s*$").expect("static pattern")
});

/// Run an engine call and lift any trailing `error_code:` from the failure
/// message into the structured field of [`BindError::Engine`]. Errors without
/// a code pass through unchanged.
pub async fn with_error_code<T, F>(op: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    op.await.map_err(attach_error_code)
}

fn attach_error_code(err: BindError) -> BindError {
    if let BindError::Engine {
        message,
        error_code: None,
    } = &err
    {
        if let Some(caps) = ERROR_CODE_RE.captures(message) {
            return BindError::Engine {
                message: message.clone(),
                error_code: Some(caps[1].to_string()),
            };
        }
    }
    err
}

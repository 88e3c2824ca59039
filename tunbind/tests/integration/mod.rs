#![allow(clippy::unwrap_used, clippy::expect_used)]

//! Integration tests for tunbind
//!
//! These drive the full bind/connect/shutdown surface against a mock engine
//! that records every configuration, endpoint choice, and forward call.

mod connect_test;
mod shutdown_test;

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tunbind::callbacks::EngineHooks;
use tunbind::prelude::*;

/// Shared recorder and failure knobs for one mock engine instance.
#[derive(Default)]
pub struct MockState {
    pub connect_error: Option<String>,
    pub listen_error: Option<String>,
    pub fail_forward: bool,
    pub fail_close: bool,
    next_id: AtomicUsize,
    pub configs: Mutex<Vec<CanonicalConfig>>,
    pub hooks: Mutex<Vec<EngineHooks>>,
    pub protos: Mutex<Vec<String>>,
    pub listeners: Mutex<Vec<Arc<MockListener>>>,
}

impl MockState {
    pub fn last_config(&self) -> CanonicalConfig {
        self.configs.lock().unwrap().last().unwrap().clone()
    }

    pub fn last_listener(&self) -> Arc<MockListener> {
        Arc::clone(self.listeners.lock().unwrap().last().unwrap())
    }
}

pub struct MockEngine {
    pub state: Arc<MockState>,
}

impl MockEngine {
    pub fn new() -> Self {
        Self::with_state(MockState::default())
    }

    pub fn with_state(state: MockState) -> Self {
        Self {
            state: Arc::new(state),
        }
    }
}

#[async_trait]
impl TunnelEngine for MockEngine {
    async fn connect(
        &self,
        config: &CanonicalConfig,
        hooks: EngineHooks,
    ) -> tunbind::Result<Arc<dyn Session>> {
        self.state.configs.lock().unwrap().push(config.clone());
        self.state.hooks.lock().unwrap().push(hooks);
        if let Some(message) = &self.state.connect_error {
            return Err(BindError::engine(message.clone()));
        }
        Ok(Arc::new(MockSession {
            state: Arc::clone(&self.state),
        }))
    }
}

struct MockSession {
    state: Arc<MockState>,
}

impl MockSession {
    fn builder(&self, proto: &'static str) -> Box<dyn ListenerBuilder> {
        Box::new(MockBuilder {
            state: Arc::clone(&self.state),
            proto,
        })
    }
}

impl Session for MockSession {
    fn http_endpoint(&self) -> Box<dyn ListenerBuilder> {
        self.builder("http")
    }
    fn tcp_endpoint(&self) -> Box<dyn ListenerBuilder> {
        self.builder("tcp")
    }
    fn tls_endpoint(&self) -> Box<dyn ListenerBuilder> {
        self.builder("tls")
    }
    fn labeled_endpoint(&self) -> Box<dyn ListenerBuilder> {
        self.builder("labeled")
    }
}

struct MockBuilder {
    state: Arc<MockState>,
    proto: &'static str,
}

#[async_trait]
impl ListenerBuilder for MockBuilder {
    async fn listen(&self) -> tunbind::Result<Arc<dyn Listener>> {
        self.state
            .protos
            .lock()
            .unwrap()
            .push(self.proto.to_string());
        if let Some(message) = &self.state.listen_error {
            return Err(BindError::engine(message.clone()));
        }
        let n = self.state.next_id.fetch_add(1, Ordering::Relaxed);
        let listener = Arc::new(MockListener {
            id: format!("tn_{n:08}"),
            fail_forward: self.state.fail_forward,
            fail_close: self.state.fail_close,
            forwards: Mutex::new(Vec::new()),
            closed: AtomicBool::new(false),
        });
        self.state
            .listeners
            .lock()
            .unwrap()
            .push(Arc::clone(&listener));
        Ok(listener)
    }
}

#[derive(Debug)]
pub struct MockListener {
    pub id: String,
    fail_forward: bool,
    fail_close: bool,
    pub forwards: Mutex<Vec<String>>,
    pub closed: AtomicBool,
}

impl MockListener {
    pub fn forwards(&self) -> Vec<String> {
        self.forwards.lock().unwrap().clone()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Listener for MockListener {
    fn id(&self) -> String {
        self.id.clone()
    }

    fn url(&self) -> Option<String> {
        Some(format!("https://{}.example.dev", self.id))
    }

    fn forwards_to(&self) -> String {
        self.forwards().last().cloned().unwrap_or_default()
    }

    fn metadata(&self) -> String {
        String::new()
    }

    async fn forward(&self, addr: &str) -> tunbind::Result<()> {
        if self.fail_forward {
            return Err(BindError::engine("listener is closed"));
        }
        self.forwards.lock().unwrap().push(addr.to_string());
        Ok(())
    }

    async fn close(&self) -> tunbind::Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        if self.fail_close {
            return Err(BindError::engine("remote close failed"));
        }
        Ok(())
    }
}

/// A server whose pipe listen always fails, forcing the TCP fallback.
pub struct PipelessServer;

#[async_trait]
impl ServerLike for PipelessServer {
    async fn listen_path(&mut self, _path: &std::path::Path) -> tunbind::Result<LocalSocket> {
        Err(BindError::Io(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "pipe binding unavailable",
        )))
    }

    async fn listen_loopback(&mut self) -> tunbind::Result<LocalSocket> {
        LocalSocket::bind_loopback().await
    }
}

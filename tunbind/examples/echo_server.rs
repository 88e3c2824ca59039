//! Example: bind a tiny echo server to a tunnel listener
//!
//! Uses a stub engine so the example runs offline; swap `StubEngine` for a
//! real engine implementation to expose the echo server publicly.
//!
//! # Usage
//!
//! ```bash
//! cargo run --example echo_server
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tunbind::callbacks::EngineHooks;
use tunbind::prelude::*;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(std::env::var("RUST_LOG").unwrap_or_else(|_| "debug".to_string()))
        .init();

    let adapter = BindAdapter::new(Arc::new(StubEngine));
    let mut server = LocalSocketFactory;
    let bound = adapter.bind_server(&mut server, None).await?;

    tracing::info!(
        "listener {} forwarding into {}",
        bound.listener().id(),
        bound.socket().forward_addr()
    );

    loop {
        match bound.socket().accept().await {
            Ok(LocalStream::Tcp(stream)) => {
                tokio::spawn(echo(stream));
            }
            #[cfg(unix)]
            Ok(LocalStream::Unix(stream)) => {
                tokio::spawn(echo(stream));
            }
            Err(err) => {
                tracing::info!("socket closed: {err}");
                return Ok(());
            }
        }
    }
}

async fn echo<S: AsyncRead + AsyncWrite + Unpin>(mut stream: S) {
    let mut buf = [0u8; 4096];
    loop {
        match stream.read(&mut buf).await {
            Ok(0) | Err(_) => return,
            Ok(n) => {
                if stream.write_all(&buf[..n]).await.is_err() {
                    return;
                }
            }
        }
    }
}

/// Offline stand-in for the remote tunnel engine.
struct StubEngine;

#[async_trait]
impl TunnelEngine for StubEngine {
    async fn connect(
        &self,
        _config: &CanonicalConfig,
        _hooks: EngineHooks,
    ) -> tunbind::Result<Arc<dyn Session>> {
        Ok(Arc::new(StubSession))
    }
}

struct StubSession;

impl Session for StubSession {
    fn http_endpoint(&self) -> Box<dyn ListenerBuilder> {
        Box::new(StubBuilder)
    }
    fn tcp_endpoint(&self) -> Box<dyn ListenerBuilder> {
        Box::new(StubBuilder)
    }
    fn tls_endpoint(&self) -> Box<dyn ListenerBuilder> {
        Box::new(StubBuilder)
    }
    fn labeled_endpoint(&self) -> Box<dyn ListenerBuilder> {
        Box::new(StubBuilder)
    }
}

struct StubBuilder;

#[async_trait]
impl ListenerBuilder for StubBuilder {
    async fn listen(&self) -> tunbind::Result<Arc<dyn Listener>> {
        Ok(Arc::new(StubListener))
    }
}

#[derive(Debug)]
struct StubListener;

#[async_trait]
impl Listener for StubListener {
    fn id(&self) -> String {
        "tn_stub".to_string()
    }
    fn url(&self) -> Option<String> {
        Some("https://stub.example.dev".to_string())
    }
    fn forwards_to(&self) -> String {
        String::new()
    }
    fn metadata(&self) -> String {
        String::new()
    }
    async fn forward(&self, addr: &str) -> tunbind::Result<()> {
        tracing::info!("stub engine would forward remote traffic to {addr}");
        Ok(())
    }
    async fn close(&self) -> tunbind::Result<()> {
        Ok(())
    }
}

//! Shutdown coordination tests across full bind flows.

use std::sync::Arc;

use tunbind::prelude::*;

use crate::{MockEngine, MockState, PipelessServer};

#[tokio::test]
async fn trigger_closes_only_the_latest_bind() {
    let engine = MockEngine::new();
    let state = Arc::clone(&engine.state);
    let adapter = BindAdapter::new(Arc::new(engine));

    let mut server = PipelessServer;
    let first = adapter.bind_server(&mut server, None).await.unwrap();
    let second = adapter.bind_server(&mut server, None).await.unwrap();

    adapter.shutdown().trigger().await;

    let listeners = state.listeners.lock().unwrap().clone();
    assert!(!listeners[0].is_closed());
    assert!(listeners[1].is_closed());
    assert!(!first.socket().is_closed().await);
    assert!(second.socket().is_closed().await);
}

#[tokio::test]
async fn failed_remote_close_does_not_stop_socket_teardown() {
    let engine = MockEngine::with_state(MockState {
        fail_close: true,
        ..MockState::default()
    });
    let state = Arc::clone(&engine.state);
    let adapter = BindAdapter::new(Arc::new(engine));

    let mut server = PipelessServer;
    let bound = adapter.bind_server(&mut server, None).await.unwrap();

    adapter.shutdown().trigger().await;

    assert!(state.last_listener().is_closed());
    assert!(bound.socket().is_closed().await);
    assert!(adapter.shutdown().has_fired());
}

#[tokio::test]
async fn second_trigger_is_a_no_op() {
    let engine = MockEngine::new();
    let state = Arc::clone(&engine.state);
    let adapter = BindAdapter::new(Arc::new(engine));

    let mut server = PipelessServer;
    adapter.bind_server(&mut server, None).await.unwrap();
    adapter.shutdown().trigger().await;

    // binds after the latch has fired are not re-armed
    adapter.bind_server(&mut server, None).await.unwrap();
    adapter.shutdown().trigger().await;

    let listeners = state.listeners.lock().unwrap().clone();
    assert!(listeners[0].is_closed());
    assert!(!listeners[1].is_closed());
}

#[tokio::test]
async fn coordinator_can_be_shared_between_adapters() {
    let shutdown = ShutdownCoordinator::new();

    let engine_a = MockEngine::new();
    let state_a = Arc::clone(&engine_a.state);
    let adapter_a = BindAdapter::with_shutdown(Arc::new(engine_a), Arc::clone(&shutdown));

    let engine_b = MockEngine::new();
    let state_b = Arc::clone(&engine_b.state);
    let adapter_b = BindAdapter::with_shutdown(Arc::new(engine_b), Arc::clone(&shutdown));

    let mut server = PipelessServer;
    adapter_a.bind_server(&mut server, None).await.unwrap();
    adapter_b.bind_server(&mut server, None).await.unwrap();

    shutdown.trigger().await;

    // the shared coordinator only owns the most recent pair
    assert!(!state_a.last_listener().is_closed());
    assert!(state_b.last_listener().is_closed());
}

#[tokio::test]
async fn external_handler_defers_cleanup() {
    let engine = MockEngine::new();
    let state = Arc::clone(&engine.state);
    let adapter = BindAdapter::new(Arc::new(engine));

    let mut server = PipelessServer;
    let bound = adapter.bind_server(&mut server, None).await.unwrap();

    adapter.shutdown().note_external_handler();
    adapter.shutdown().trigger().await;

    assert!(!state.last_listener().is_closed());
    assert!(!bound.socket().is_closed().await);
}

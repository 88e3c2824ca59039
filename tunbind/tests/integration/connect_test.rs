//! Connect surface tests: normalization as seen by the engine, protocol
//! dispatch, and error-code extraction.

use std::sync::{Arc, Mutex};

use serde_json::json;
use tunbind::callbacks::SessionHooks;
use tunbind::prelude::*;

use crate::{MockEngine, MockState};

fn adapter_with_state() -> (BindAdapter, Arc<MockState>) {
    let engine = MockEngine::new();
    let state = Arc::clone(&engine.state);
    (BindAdapter::new(Arc::new(engine)), state)
}

#[tokio::test]
async fn engine_sees_canonical_config() {
    let (adapter, state) = adapter_with_state();

    adapter
        .connect(RawConfig::new(json!({
            "addr": 8080,
            "basic_auth": "user:pass",
            "oauth.scopes": ["openid"],
            "oauth_scopes": ["email"],
        })))
        .await
        .unwrap();

    let config = state.last_config();
    assert_eq!(config.addr(), Some("localhost:8080"));
    assert_eq!(config.get("basic_auth"), Some(&json!(["user:pass"])));
    assert_eq!(config.get("oauth_scopes"), Some(&json!(["email", "openid"])));
    assert!(!config.contains("oauth.scopes"));
}

#[tokio::test]
async fn bare_port_connects_and_forwards() {
    let (adapter, state) = adapter_with_state();

    let listener = adapter.connect(9000_u16).await.unwrap();
    assert_eq!(state.last_listener().id, listener.id());
    assert_eq!(state.last_listener().forwards(), ["localhost:9000"]);
    assert_eq!(state.protos.lock().unwrap().as_slice(), ["http"]);
}

#[tokio::test]
async fn address_string_passes_through() {
    let (adapter, state) = adapter_with_state();

    adapter.connect("remotehost:9000").await.unwrap();
    assert_eq!(state.last_listener().forwards(), ["remotehost:9000"]);
}

#[tokio::test]
async fn proto_selects_the_endpoint() {
    let (adapter, state) = adapter_with_state();

    adapter
        .connect(RawConfig::new(json!({ "proto": "tcp", "addr": 5432 })))
        .await
        .unwrap();
    assert_eq!(state.protos.lock().unwrap().as_slice(), ["tcp"]);
}

#[tokio::test]
async fn unknown_proto_is_a_config_error() {
    let (adapter, _state) = adapter_with_state();

    let err = adapter
        .connect(RawConfig::new(json!({ "proto": "quic" })))
        .await
        .unwrap_err();
    assert!(matches!(err, BindError::Config(_)));
}

#[tokio::test]
async fn listen_failure_surfaces_error_code() {
    let engine = MockEngine::with_state(MockState {
        listen_error: Some(
            "failed to start listener: domain is taken\nerror_code: ERR_NGROK_326".to_string(),
        ),
        ..MockState::default()
    });
    let adapter = BindAdapter::new(Arc::new(engine));

    let err = adapter.connect(8080_u16).await.unwrap_err();
    assert_eq!(err.error_code(), Some("ERR_NGROK_326"));
}

#[tokio::test]
async fn listen_failure_without_code_stays_plain() {
    let engine = MockEngine::with_state(MockState {
        listen_error: Some("connection reset by peer".to_string()),
        ..MockState::default()
    });
    let adapter = BindAdapter::new(Arc::new(engine));

    let err = adapter.connect(8080_u16).await.unwrap_err();
    assert!(matches!(err, BindError::Engine { .. }));
    assert_eq!(err.error_code(), None);
}

#[tokio::test]
async fn log_callback_becomes_marker_and_adapter() {
    let (adapter, state) = adapter_with_state();

    let lines = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&lines);
    adapter
        .connect(
            RawConfig::new(json!({ "addr": "localhost:80" })).with_log_event(move |line| {
                sink.lock().unwrap().push(line);
            }),
        )
        .await
        .unwrap();

    let config = state.last_config();
    assert_eq!(config.get("on_log_event"), Some(&json!(true)));

    // the adapter re-assembles one formatted line per event
    let hooks = state.hooks.lock().unwrap().last().unwrap().clone();
    let log = hooks.log.expect("log adapter extracted");
    log.emit("INFO", "tunnel.session", "session started");
    assert_eq!(
        lines.lock().unwrap().as_slice(),
        ["INFO tunnel.session - session started"]
    );
}

#[tokio::test]
async fn status_callback_funnels_both_hooks() {
    let engine = MockEngine::new();
    let state = Arc::clone(&engine.state);
    let adapter = BindAdapter::new(Arc::new(engine));

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    adapter
        .connect(
            RawConfig::new(json!({ "addr": "localhost:80" })).with_status_change(move |status| {
                sink.lock().unwrap().push(status);
            }),
        )
        .await
        .unwrap();

    assert_eq!(state.last_config().get("on_status_change"), Some(&json!(true)));

    // fire the two engine-side hooks; both funnel into the one callback
    let hooks = state.hooks.lock().unwrap().last().unwrap().clone();
    let status = hooks.status.expect("status adapter extracted");
    status.on_connection("connected", None);
    status.on_disconnection("tunnel.example.dev:443", Some("eof"));
    assert_eq!(seen.lock().unwrap().as_slice(), ["connected", "closed"]);
}

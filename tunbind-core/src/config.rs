//! Raw configuration normalization.
//!
//! Callers hand in loosely-typed configuration: bare ports, scalar values
//! where the engine wants arrays, dotted key spellings from older releases,
//! and closures for log/status events. [`normalize`] turns all of that into
//! one canonical shape plus the extracted callback adapters. Normalization is
//! idempotent and performs no I/O; malformed values are passed through for
//! the engine to reject.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;
use tunbind_common::DEFAULT_LOCAL_ADDR;

use crate::callbacks::{
    EngineHooks, LogEventAdapter, LogFn, SessionHooks, StatusChangeAdapter, StatusFn,
};
use std::sync::Arc;

/// Fields the engine expects as arrays even when the caller passes a scalar.
const LIST_FIELDS: &[&str] = &[
    "auth",
    "basic_auth",
    "ip_restriction_allow_cidrs",
    "ip_restriction_deny_cidrs",
    "labels",
    "mutual_tls_cas",
    "oauth_allow_domains",
    "oauth_allow_emails",
    "oauth_scopes",
    "oidc_allow_domains",
    "oidc_allow_emails",
    "oidc_scopes",
    "request_header_add",
    "request_header_remove",
    "response_header_add",
    "response_header_remove",
    "schemes",
];

/// Key families that historically coexist under dotted and underscore
/// spellings. The canonical output carries only the underscore form.
const DOTTED_FIELDS: &[(&str, &str)] = &[
    ("ip_restriction.allow_cidrs", "ip_restriction_allow_cidrs"),
    ("ip_restriction.deny_cidrs", "ip_restriction_deny_cidrs"),
    ("oauth.allow_domains", "oauth_allow_domains"),
    ("oauth.allow_emails", "oauth_allow_emails"),
    ("oauth.scopes", "oauth_scopes"),
    ("oauth.provider", "oauth_provider"),
    ("oauth.client_id", "oauth_client_id"),
    ("oauth.client_secret", "oauth_client_secret"),
    ("oidc.allow_domains", "oidc_allow_domains"),
    ("oidc.allow_emails", "oidc_allow_emails"),
    ("oidc.scopes", "oidc_scopes"),
    ("oidc.client_id", "oidc_client_id"),
    ("oidc.client_secret", "oidc_client_secret"),
    ("oidc.issuer_url", "oidc_issuer_url"),
    ("request_header.add", "request_header_add"),
    ("request_header.remove", "request_header_remove"),
    ("response_header.add", "response_header_add"),
    ("response_header.remove", "response_header_remove"),
    ("verify_webhook.provider", "verify_webhook_provider"),
    ("verify_webhook.secret", "verify_webhook_secret"),
];

/// Keys accepted for compatibility with older agent configs but not consumed
/// by the engine. Warned about and dropped.
const UNUSED_FIELDS: &[&str] = &[
    "bin_path",
    "config_path",
    "host_header",
    "inspect",
    "name",
    "region",
    "subdomain",
    "terminate_at",
    "web_addr",
];

/// A loosely-typed configuration as callers supply it: a bare port, an
/// address string, or an open-ended map, optionally carrying callbacks.
pub struct RawConfig {
    value: Value,
    on_log_event: Option<LogFn>,
    on_status_change: Option<StatusFn>,
}

impl RawConfig {
    pub fn new(value: impl Into<Value>) -> Self {
        Self {
            value: value.into(),
            on_log_event: None,
            on_status_change: None,
        }
    }

    /// Receive engine log events as single formatted lines.
    #[must_use]
    pub fn with_log_event(mut self, f: impl Fn(String) + Send + Sync + 'static) -> Self {
        self.on_log_event = Some(Arc::new(f));
        self
    }

    /// Receive session status changes (`"connected"`, `"closed"`, ...).
    #[must_use]
    pub fn with_status_change(mut self, f: impl Fn(String) + Send + Sync + 'static) -> Self {
        self.on_status_change = Some(Arc::new(f));
        self
    }
}

impl std::fmt::Debug for RawConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RawConfig")
            .field("value", &self.value)
            .field("on_log_event", &self.on_log_event.is_some())
            .field("on_status_change", &self.on_status_change.is_some())
            .finish()
    }
}

impl From<Value> for RawConfig {
    fn from(value: Value) -> Self {
        Self::new(value)
    }
}

impl From<Map<String, Value>> for RawConfig {
    fn from(map: Map<String, Value>) -> Self {
        Self::new(Value::Object(map))
    }
}

impl From<u16> for RawConfig {
    fn from(port: u16) -> Self {
        Self::new(Value::from(port))
    }
}

impl From<i64> for RawConfig {
    fn from(port: i64) -> Self {
        Self::new(Value::from(port))
    }
}

impl From<&str> for RawConfig {
    fn from(addr: &str) -> Self {
        Self::new(Value::from(addr))
    }
}

impl From<String> for RawConfig {
    fn from(addr: String) -> Self {
        Self::new(Value::from(addr))
    }
}

/// The normalized configuration consumed by the engine.
///
/// Every list-typed field is an array, dotted keys are merged away, the
/// address is in `host:port` form, and callback fields are boolean markers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CanonicalConfig(Map<String, Value>);

impl CanonicalConfig {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// The upstream address traffic is forwarded to, in `host:port` form.
    pub fn addr(&self) -> Option<&str> {
        self.0.get("addr").and_then(Value::as_str)
    }

    /// Endpoint protocol, defaulting to `http`.
    pub fn proto(&self) -> &str {
        self.0.get("proto").and_then(Value::as_str).unwrap_or("http")
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_fields(self) -> Map<String, Value> {
        self.0
    }
}

/// Normalize a raw configuration into its canonical shape, splitting out
/// callback adapters for the engine boundary.
pub fn normalize(raw: RawConfig) -> (CanonicalConfig, EngineHooks) {
    let RawConfig {
        value,
        on_log_event,
        on_status_change,
    } = raw;

    // address shorthand expands before any field-level work
    let mut map = match value {
        Value::Object(map) => map,
        other => expand_shorthand(other),
    };

    merge_dotted(&mut map);
    vectorize_fields(&mut map);
    coerce_addr(&mut map);
    apply_defaults(&mut map);
    warn_unused(&mut map);

    let hooks = extract_callbacks(&mut map, on_log_event, on_status_change);
    (CanonicalConfig(map), hooks)
}

/// A bare port or address becomes `{ "addr": ... }`.
fn expand_shorthand(value: Value) -> Map<String, Value> {
    let mut map = Map::new();
    let addr = match value {
        Value::Number(n) => Some(format!("localhost:{n}")),
        Value::String(s) => {
            if !s.contains(':') && s.parse::<u32>().is_ok() {
                Some(format!("localhost:{s}"))
            } else {
                Some(s)
            }
        }
        _ => None,
    };
    if let Some(addr) = addr {
        map.insert("addr".to_string(), Value::String(addr));
    }
    map
}

fn merge_dotted(map: &mut Map<String, Value>) {
    for (dotted, underscore) in DOTTED_FIELDS {
        let Some(dotted_val) = map.remove(*dotted) else {
            continue;
        };
        match map.get_mut(*underscore) {
            None => {
                map.insert((*underscore).to_string(), dotted_val);
            }
            Some(Value::Array(existing)) => match dotted_val {
                Value::Array(items) => existing.extend(items),
                scalar => existing.push(scalar),
            },
            // an explicitly-set scalar underscore value wins outright;
            // compatibility behavior, preserved as observed
            Some(_) => {}
        }
    }
}

fn vectorize_fields(map: &mut Map<String, Value>) {
    for key in LIST_FIELDS {
        if let Some(val) = map.get_mut(*key) {
            if !val.is_array() {
                let scalar = val.take();
                *val = Value::Array(vec![scalar]);
            }
        }
    }
}

/// Numeric addresses become `localhost:<port>` strings.
fn coerce_addr(map: &mut Map<String, Value>) {
    let coerced = match map.get("addr") {
        Some(Value::Number(n)) => Some(format!("localhost:{n}")),
        Some(Value::String(s)) if !s.contains(':') && s.parse::<u32>().is_ok() => {
            Some(format!("localhost:{s}"))
        }
        _ => None,
    };
    if let Some(addr) = coerced {
        map.insert("addr".to_string(), Value::String(addr));
    }
}

fn apply_defaults(map: &mut Map<String, Value>) {
    if !map.contains_key("proto") {
        map.insert("proto".to_string(), Value::String("http".to_string()));
    }
    if !map.contains_key("addr") {
        let host = map.get("host").and_then(Value::as_str).map(str::to_owned);
        let port = map.get("port").and_then(Value::as_u64);
        let addr = match (host, port) {
            (Some(host), Some(port)) => format!("{host}:{port}"),
            (None, Some(port)) => format!("localhost:{port}"),
            (Some(host), None) => host,
            (None, None) => DEFAULT_LOCAL_ADDR.to_string(),
        };
        map.insert("addr".to_string(), Value::String(addr));
    }
}

fn warn_unused(map: &mut Map<String, Value>) {
    for key in UNUSED_FIELDS {
        if map.remove(*key).is_some() {
            warn!("{key} is unused");
        }
    }
    if let Some(Value::Array(schemes)) = map.get("schemes") {
        if schemes.len() > 1 {
            warn!("Multiple schemes set, only last one will be used");
        }
    }
}

fn extract_callbacks(
    map: &mut Map<String, Value>,
    on_log_event: Option<LogFn>,
    on_status_change: Option<StatusFn>,
) -> EngineHooks {
    let mut hooks = EngineHooks::default();
    if let Some(user) = on_log_event {
        map.insert("on_log_event".to_string(), Value::Bool(true));
        hooks.log = Some(LogEventAdapter::new(user));
    }
    if let Some(user) = on_status_change {
        map.insert("on_status_change".to_string(), Value::Bool(true));
        hooks.status = Some(StatusChangeAdapter::new(user) as Arc<dyn SessionHooks>);
    }
    hooks
}

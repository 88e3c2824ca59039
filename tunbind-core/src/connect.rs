//! Normalize-and-connect: raw configuration in, forwarding listener out.

use std::sync::Arc;

use tunbind_common::{BindError, Result};

use crate::bind::BindAdapter;
use crate::config::{normalize, RawConfig};
use crate::engine::{with_error_code, Listener};

impl BindAdapter {
    /// Normalize a raw configuration, establish a session, start a listener
    /// for the configured protocol, and point it at the configured address.
    ///
    /// Accepts a bare port, a `host:port` string, or a full configuration
    /// map; see [`RawConfig`].
    pub async fn connect(&self, raw: impl Into<RawConfig>) -> Result<Arc<dyn Listener>> {
        let (config, hooks) = normalize(raw.into());
        if let Some(log) = &hooks.log {
            self.shutdown.set_log_hook(Arc::clone(log));
        }

        let session = with_error_code(self.engine.connect(&config, hooks)).await?;

        let builder = match config.proto() {
            "http" => session.http_endpoint(),
            "tcp" => session.tcp_endpoint(),
            "tls" => session.tls_endpoint(),
            "labeled" => session.labeled_endpoint(),
            other => {
                return Err(BindError::Config(format!("unhandled protocol {other}")));
            }
        };
        let listener = with_error_code(builder.listen()).await?;

        if let Some(addr) = config.addr() {
            with_error_code(listener.forward(addr)).await?;
        }

        self.shutdown.install();
        Ok(listener)
    }
}

//! # tunbind
//!
//! A local binding/adapter layer for remotely-managed tunnel listeners.
//!
//! ## Overview
//!
//! tunbind makes a remote ingress endpoint usable as if it were an ordinary
//! local listening socket. It normalizes loosely-typed configuration into the
//! canonical shape the tunnel engine expects, allocates a local rendezvous
//! socket (Unix-domain socket, named pipe, or loopback TCP fallback), wires
//! the remote listener's forwarding to it, and tears everything down once on
//! process interruption.
//!
//! The tunnel engine itself (authentication, control channel, TLS, edges) is
//! an external collaborator behind the [`engine::TunnelEngine`] trait family.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tunbind::prelude::*;
//!
//! async fn run(engine: Arc<dyn TunnelEngine>) -> tunbind::Result<()> {
//!     let adapter = BindAdapter::new(engine);
//!
//!     // raw config in, forwarding listener out
//!     let listener = adapter.connect(8080_u16).await?;
//!     println!("listener {} at {:?}", listener.id(), listener.url());
//!
//!     // or: bind a local server to a fresh listener
//!     let mut server = LocalSocketFactory;
//!     let bound = adapter.bind_server(&mut server, None).await?;
//!     loop {
//!         let _conn = bound.socket().accept().await?;
//!     }
//! }
//! ```
//!
//! ## Architecture
//!
//! - [`tunbind-common`](tunbind_common) - shared errors and constants
//! - [`tunbind-core`](tunbind_core) - normalizer, allocator, bind adapter,
//!   shutdown coordinator, engine facade

// Re-export subcrates
pub use tunbind_common as common;
pub use tunbind_core::{bind, callbacks, config, engine, rendezvous, shutdown, socket};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::common::{BindError, Result};

    pub use crate::bind::{
        BindAdapter, BindTarget, BoundListener, BoundSocket, LocalSocketFactory, ServerLike,
    };
    pub use crate::config::{normalize, CanonicalConfig, RawConfig};
    pub use crate::engine::{
        with_error_code, Listener, ListenerBuilder, Session, TunnelEngine,
    };
    pub use crate::shutdown::ShutdownCoordinator;
    pub use crate::socket::{ForwardAddr, LocalSocket, LocalStream};
}

// Convenience re-exports at crate root
pub use tunbind_common::{BindError, Result};
pub use tunbind_core::{
    normalize, BindAdapter, BindTarget, BoundListener, BoundSocket, CanonicalConfig, ForwardAddr,
    Listener, ListenerBuilder, LocalSocket, LocalSocketFactory, LocalStream, RawConfig, ServerLike,
    Session, ShutdownCoordinator, TunnelEngine,
};

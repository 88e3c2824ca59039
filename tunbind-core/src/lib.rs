//! Core binding/adapter layer for tunbind.
//!
//! Takes a remotely-managed ingress listener and makes it usable as an
//! ordinary local listening socket:
//!
//! - [`config`] normalizes loosely-typed caller configuration into the
//!   canonical shape the engine consumes, splitting out callbacks.
//! - [`rendezvous`] allocates the local socket path or pipe name.
//! - [`socket`] owns the loopback TCP / domain-socket rendezvous endpoints.
//! - [`bind`] composes those into the caller-facing bind operations.
//! - [`shutdown`] guarantees idempotent, ordered teardown on interrupt.
//! - [`engine`] is the async facade over the remote tunnel engine, which
//!   stays an opaque collaborator.

pub mod bind;
pub mod callbacks;
pub mod config;
mod connect;
pub mod engine;
pub mod rendezvous;
pub mod shutdown;
pub mod socket;

pub use bind::{BindAdapter, BindTarget, BoundListener, BoundSocket, LocalSocketFactory, ServerLike};
pub use config::{normalize, CanonicalConfig, RawConfig};
pub use engine::{with_error_code, Listener, ListenerBuilder, Session, TunnelEngine};
pub use shutdown::ShutdownCoordinator;
pub use socket::{ForwardAddr, LocalSocket, LocalStream};

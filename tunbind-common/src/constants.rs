//! Address prefixes and rendezvous-path limits.
//!
//! Use these constants instead of magic strings so the address grammar stays
//! consistent between the bind adapter, the path allocator, and tests.

/// Scheme prefix for Unix-domain socket forwarding addresses (`unix:<path>`).
// no host section so relative socket paths survive round-tripping
pub const UNIX_PREFIX: &str = "unix:";

/// Scheme prefix for named-pipe forwarding addresses (`pipe:<path>`).
pub const PIPE_PREFIX: &str = "pipe:";

/// Scheme prefix for TCP forwarding addresses (`tcp://host:port`).
pub const TCP_PREFIX: &str = "tcp://";

/// Windows named-pipe namespace that pipe names must live under.
pub const PIPE_NAMESPACE: &str = r"\\.\pipe\";

/// Leading component of every rendezvous socket/pipe name.
pub const SOCKET_NAME_PREFIX: &str = "tun-";

/// Trailing component of every rendezvous socket/pipe name.
pub const SOCKET_NAME_SUFFIX: &str = ".sock";

/// Dedicated working-directory subdirectory for rendezvous sockets.
pub const SOCKET_DIR_NAME: &str = ".tunbind";

/// Maximum byte length of a Unix-domain socket path (`sun_path` is 108 bytes
/// on common implementations, including the trailing NUL).
pub const MAX_SOCKET_PATH_LEN: usize = 107;

/// Default upstream address when the caller gives neither `addr` nor `port`.
pub const DEFAULT_LOCAL_ADDR: &str = "localhost:80";

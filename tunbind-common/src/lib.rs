//! Common utilities and types for tunbind

pub mod constants;
pub mod error;

pub use constants::{
    DEFAULT_LOCAL_ADDR, MAX_SOCKET_PATH_LEN, PIPE_NAMESPACE, PIPE_PREFIX, SOCKET_DIR_NAME,
    SOCKET_NAME_PREFIX, SOCKET_NAME_SUFFIX, TCP_PREFIX, UNIX_PREFIX,
};
pub use error::{BindError, Result};

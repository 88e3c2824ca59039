//! Error types for tunbind

use thiserror::Error;

/// Main error type for tunbind operations
#[derive(Error, Debug)]
pub enum BindError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Failure reported by the remote tunnel engine
    #[error("Engine error: {message}")]
    Engine {
        message: String,
        /// Structured `ERR_<NAMESPACE>_<digits>` code, when the engine
        /// included one in its message text.
        error_code: Option<String>,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// No writable directory for a rendezvous socket
    #[error("No writable directory for rendezvous socket: {0}")]
    NoWritableDir(String),

    /// Local socket used after close
    #[error("Socket closed")]
    SocketClosed,

    /// Invalid state
    #[error("Invalid state: {0}")]
    InvalidState(String),
}

impl BindError {
    /// Build an engine error from bare message text, without code extraction.
    pub fn engine(message: impl Into<String>) -> Self {
        BindError::Engine {
            message: message.into(),
            error_code: None,
        }
    }

    /// The structured engine error code, if one was extracted.
    pub fn error_code(&self) -> Option<&str> {
        match self {
            BindError::Engine { error_code, .. } => error_code.as_deref(),
            _ => None,
        }
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, BindError>;

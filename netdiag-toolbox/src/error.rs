//! Unified error type definition

use serde::Serialize;
use thiserror::Error;

/// Toolbox error type
#[derive(Error, Debug, Serialize)]
#[serde(tag = "code", content = "details")]
pub enum DiagError {
    /// Target or option failed the allow-list check
    #[error("Validation error: {0}")]
    Validation(String),

    /// Diagnostic binary could not be started
    #[error("Failed to spawn {binary}: {message}")]
    Spawn { binary: String, message: String },

    /// I/O failure while streaming subprocess output
    #[error("I/O error: {0}")]
    Io(String),

    /// Process exited non-zero with diagnostic output on stderr
    #[error("{0}")]
    Execution(String),

    /// The event sink is gone; the client disconnected mid-session
    #[error("Event channel closed")]
    ChannelClosed,
}

impl DiagError {
    /// Whether this is expected behavior (bad user input, unreachable host)
    /// rather than a server-side fault. Used for log level selection:
    /// `warn` when `true`, `error` when `false`.
    #[must_use]
    pub fn is_expected(&self) -> bool {
        matches!(
            self,
            Self::Validation(_) | Self::Execution(_) | Self::ChannelClosed
        )
    }
}

impl From<std::io::Error> for DiagError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

/// Toolbox Result type alias
pub type DiagResult<T> = std::result::Result<T, DiagError>;

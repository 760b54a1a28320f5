//! Error types for scrollback-core

use thiserror::Error;

/// Result type alias using scrollback-core Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the controller
#[derive(Error, Debug)]
pub enum Error {
    /// An error from the transport layer
    #[error(transparent)]
    Transport(#[from] scrollback_client::Error),

    /// The answer stream ended without a completion or error event
    #[error("Answer stream closed before completion")]
    StreamClosed,
}

impl Error {
    /// Check if this error came from a cancelled request
    pub fn is_aborted(&self) -> bool {
        match self {
            Error::Transport(e) => e.is_aborted(),
            _ => false,
        }
    }
}

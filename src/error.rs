//! Error types for babybot.

use crate::session::SessionState;

/// Top-level error type for loading and generation.
#[derive(Debug, thiserror::Error)]
pub enum BotError {
    /// Model download, build or device error while loading.
    #[error("load error: {0}")]
    Load(String),

    /// Error raised by a generation call.
    #[error("generation error: {0}")]
    Generation(String),

    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// A lifecycle event that the current session state does not allow.
    #[error("invalid transition: {event} while {state:?}")]
    InvalidTransition {
        /// State the session was in.
        state: SessionState,
        /// Name of the rejected event.
        event: &'static str,
    },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, BotError>;

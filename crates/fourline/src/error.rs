//! Unified error type for the Fourline server.

use fourline_matchmaking::QueueError;
use fourline_protocol::{ErrorKind, ServerMessage};
use fourline_session::GameError;

use crate::ConfigError;

/// Top-level error that wraps all crate-specific errors.
#[derive(Debug, thiserror::Error)]
pub enum FourlineError {
    #[error(transparent)]
    Game(#[from] GameError),

    #[error(transparent)]
    Queue(#[from] QueueError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A request that is well-formed but not acceptable (empty name,
    /// move before joining).
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl FourlineError {
    /// Where this error falls in the client-facing taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Game(e) => match e {
                GameError::SessionNotFound(_) | GameError::PlayerNotInSession { .. } => {
                    ErrorKind::NotFound
                }
                GameError::SessionNotActive(_) | GameError::StaleConnection(_) => {
                    ErrorKind::Conflict
                }
                GameError::NotPlayersTurn { .. } | GameError::InvalidMove(_) => {
                    ErrorKind::Validation
                }
            },
            Self::Queue(e) => match e {
                QueueError::AlreadyQueued(_) => ErrorKind::Conflict,
                QueueError::QueueFull { .. } => ErrorKind::Capacity,
                QueueError::NotInQueue(_) => ErrorKind::NotFound,
                QueueError::RequestTimeout => ErrorKind::Timeout,
                QueueError::Unavailable => ErrorKind::Unavailable,
            },
            Self::Config(_) | Self::InvalidRequest(_) => ErrorKind::Validation,
        }
    }

    /// The `error{code, message}` reply for this error.
    pub fn to_message(&self) -> ServerMessage {
        ServerMessage::error(self.kind(), self.to_string())
    }
}

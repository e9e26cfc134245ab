//! Error types for the matchmaking layer.

use fourline_protocol::PlayerId;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueueError {
    #[error("player {0} is already in the queue")]
    AlreadyQueued(PlayerId),

    #[error("queue is full ({capacity} players)")]
    QueueFull { capacity: usize },

    #[error("player {0} is not in the queue")]
    NotInQueue(PlayerId),

    /// The coordinator did not answer within the request timeout.
    #[error("matchmaking request timed out")]
    RequestTimeout,

    /// The coordinator has stopped.
    #[error("matchmaking is unavailable")]
    Unavailable,
}

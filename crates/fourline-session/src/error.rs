//! Error types for the session layer.

use fourline_board::BoardError;
use fourline_protocol::{PlayerId, SessionId};

/// Why a session operation was refused.
///
/// Every variant is local to the request that caused it: the session is
/// left exactly as it was.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GameError {
    /// No session with this id (never existed, or already reaped).
    #[error("session {0} not found")]
    SessionNotFound(SessionId),

    /// The session has finished. Finished sessions never accept moves.
    #[error("session {0} is not in play")]
    SessionNotActive(SessionId),

    /// The player holds neither seat.
    #[error("player {player_id} is not in session {session_id}")]
    PlayerNotInSession {
        player_id: PlayerId,
        session_id: SessionId,
    },

    /// The player's color does not have the move.
    #[error("it is not {player_id}'s turn in session {session_id}")]
    NotPlayersTurn {
        player_id: PlayerId,
        session_id: SessionId,
    },

    /// The request came in on a connection that no longer speaks for the
    /// player.
    #[error("connection no longer acts for player {0}")]
    StaleConnection(PlayerId),

    /// The board rejected the column.
    #[error("invalid move: {0}")]
    InvalidMove(#[from] BoardError),
}

/// A player's transport refused a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum HandleError {
    /// The remote end is gone.
    #[error("player connection closed")]
    Closed,

    /// The outbound buffer is full; the message was dropped.
    #[error("player outbox full")]
    Full,
}

/// A collaborator failed to accept a finished game.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SinkError {
    #[error("result sink unavailable")]
    Unavailable,

    #[error("result sink rejected record: {0}")]
    Rejected(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_board_error_converts_to_invalid_move() {
        let err: GameError = BoardError::ColumnFull(3).into();
        assert_eq!(err, GameError::InvalidMove(BoardError::ColumnFull(3)));
        assert_eq!(err.to_string(), "invalid move: column 3 is full");
    }

    #[test]
    fn test_game_error_messages_name_ids() {
        let err = GameError::NotPlayersTurn {
            player_id: PlayerId(4),
            session_id: SessionId(2),
        };
        assert_eq!(err.to_string(), "it is not P-4's turn in session G-2");
    }
}

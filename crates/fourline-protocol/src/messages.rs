//! Client requests and server messages.
//!
//! Both enums are internally tagged (`{"type": "make_move", ...}`) with
//! snake_case names, which is what browser clients expect. The core never
//! encodes them itself; a transport picks the format.

use fourline_board::Color;
use serde::{Deserialize, Serialize};

use crate::{EndReason, GameSnapshot, MatchPreferences, Move, PlayerId, PlayerInfo, SessionId};

/// Everything a client can ask for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientRequest {
    /// Enter the matchmaking queue under a display name.
    JoinQueue {
        name: String,
        #[serde(default)]
        preferences: MatchPreferences,
    },

    /// Withdraw from the queue before a match is found.
    LeaveQueue,

    /// Drop a piece into `column`.
    MakeMove { session_id: SessionId, column: usize },

    /// Resume a session after a dropped connection.
    ///
    /// `last_seen` is the client's own record of when it last heard from
    /// the server (Unix ms); it is logged, not trusted.
    Reconnect {
        session_id: SessionId,
        player_id: PlayerId,
        #[serde(default)]
        last_seen: Option<u64>,
    },

    /// Keep-alive. `client_time` is echoed back for RTT measurement.
    Heartbeat {
        #[serde(default)]
        client_time: u64,
    },
}

/// Everything the server pushes to a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// The player is now waiting. `position` is 1-based, oldest first.
    QueueJoined {
        player_id: PlayerId,
        position: usize,
        queue_size: usize,
    },

    QueueLeft { player_id: PlayerId },

    /// A session was created with this player in it.
    GameFound {
        session: GameSnapshot,
        player_id: PlayerId,
    },

    /// Outcome of a move. Broadcast to both seats on success; sent only to
    /// the requester on failure.
    MoveResult {
        success: bool,
        #[serde(rename = "move", default, skip_serializing_if = "Option::is_none")]
        applied: Option<Move>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        state: Option<GameSnapshot>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },

    /// The session reached a terminal state.
    GameEnd {
        session_id: SessionId,
        /// `None` for a draw.
        winner: Option<PlayerInfo>,
        winner_color: Option<Color>,
        is_draw: bool,
        reason: EndReason,
        duration_secs: u64,
        state: GameSnapshot,
    },

    /// A request failed. `code` is HTTP-flavoured, see [`ErrorKind::code`].
    Error { code: u16, message: String },

    /// The opponent dropped. The game is forfeited if they are still gone
    /// after `grace_period_secs`.
    PlayerDisconnected {
        session_id: SessionId,
        player_id: PlayerId,
        grace_period_secs: u64,
    },

    PlayerReconnected {
        session_id: SessionId,
        player_id: PlayerId,
        offline_ms: u64,
    },

    /// Reply to a successful [`ClientRequest::Reconnect`].
    Reconnected { session: GameSnapshot },

    HeartbeatAck { client_time: u64, server_time: u64 },
}

impl ServerMessage {
    /// Builds an [`Error`](Self::Error) from a category and message.
    pub fn error(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self::Error {
            code: kind.code(),
            message: message.into(),
        }
    }
}

/// Error categories reported to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Bad column, wrong turn, malformed request.
    Validation,
    /// Request conflicts with current state (already queued).
    Conflict,
    /// Unknown session or player, not in queue.
    NotFound,
    /// Queue at capacity.
    Capacity,
    /// An internal worker did not answer in time. Retryable.
    Timeout,
    /// An internal worker is gone (shutting down).
    Unavailable,
}

impl ErrorKind {
    pub fn code(self) -> u16 {
        match self {
            Self::Validation => 400,
            Self::NotFound => 404,
            Self::Conflict => 409,
            Self::Capacity | Self::Unavailable => 503,
            Self::Timeout => 504,
        }
    }
}

#[cfg(test)]
mod tests {
    use fourline_board::Board;
    use serde_json::json;

    use super::*;
    use crate::GameStatus;

    #[test]
    fn test_join_queue_parses_without_preferences() {
        let req: ClientRequest =
            serde_json::from_value(json!({"type": "join_queue", "name": "alice"})).unwrap();
        assert_eq!(
            req,
            ClientRequest::JoinQueue {
                name: "alice".into(),
                preferences: MatchPreferences::default(),
            }
        );
    }

    #[test]
    fn test_make_move_parses() {
        let req: ClientRequest = serde_json::from_value(
            json!({"type": "make_move", "session_id": 4, "column": 3}),
        )
        .unwrap();
        assert_eq!(
            req,
            ClientRequest::MakeMove {
                session_id: SessionId(4),
                column: 3
            }
        );
    }

    #[test]
    fn test_unit_request_variants_parse() {
        let leave: ClientRequest = serde_json::from_str(r#"{"type":"leave_queue"}"#).unwrap();
        assert_eq!(leave, ClientRequest::LeaveQueue);
        let beat: ClientRequest = serde_json::from_str(r#"{"type":"heartbeat"}"#).unwrap();
        assert_eq!(beat, ClientRequest::Heartbeat { client_time: 0 });
    }

    #[test]
    fn test_unknown_request_type_rejected() {
        let res = serde_json::from_str::<ClientRequest>(r#"{"type":"resign"}"#);
        assert!(res.is_err());
    }

    #[test]
    fn test_failed_move_result_omits_empty_fields() {
        let msg = ServerMessage::MoveResult {
            success: false,
            applied: None,
            state: None,
            error: Some("not your turn".into()),
        };
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["type"], "move_result");
        assert_eq!(value["success"], false);
        assert_eq!(value["error"], "not your turn");
        assert!(value.get("move").is_none());
        assert!(value.get("state").is_none());
    }

    #[test]
    fn test_game_end_carries_winner_and_reason() {
        let winner = PlayerInfo {
            id: PlayerId(2),
            name: "bob".into(),
            color: Color::Yellow,
            is_bot: false,
            connected: true,
        };
        let state = GameSnapshot {
            id: SessionId(9),
            status: GameStatus::Finished,
            board: Board::new(),
            players: [
                PlayerInfo {
                    id: PlayerId(1),
                    name: "alice".into(),
                    color: Color::Red,
                    is_bot: false,
                    connected: false,
                },
                winner.clone(),
            ],
            current_turn: Color::Red,
            winner: Some(Color::Yellow),
            created_at: 1,
            finished_at: Some(2),
            last_move: None,
            move_count: 0,
        };
        let msg = ServerMessage::GameEnd {
            session_id: SessionId(9),
            winner: Some(winner),
            winner_color: Some(Color::Yellow),
            is_draw: false,
            reason: EndReason::Disconnect,
            duration_secs: 31,
            state,
        };
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["type"], "game_end");
        assert_eq!(value["reason"], "disconnect");
        assert_eq!(value["winner"]["id"], 2);
        assert_eq!(value["winner_color"], "yellow");
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(ErrorKind::Validation.code(), 400);
        assert_eq!(ErrorKind::NotFound.code(), 404);
        assert_eq!(ErrorKind::Conflict.code(), 409);
        assert_eq!(ErrorKind::Capacity.code(), 503);
        assert_eq!(ErrorKind::Timeout.code(), 504);

        let msg = ServerMessage::error(ErrorKind::Timeout, "queue busy");
        assert_eq!(
            msg,
            ServerMessage::Error {
                code: 504,
                message: "queue busy".into()
            }
        );
    }
}

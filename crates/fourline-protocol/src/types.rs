//! Identity and snapshot types.

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use fourline_board::{Board, Color};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// A unique identifier for a player.
///
/// Player ids double as the reconnect credential (a client resumes a game
/// by presenting its session and player id), so fresh ids are drawn at
/// random rather than counted up.
///
/// Serialized as a plain number thanks to `#[serde(transparent)]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub u64);

impl PlayerId {
    /// A fresh random id.
    pub fn random() -> Self {
        Self(rand::random())
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P-{}", self.0)
    }
}

/// A unique identifier for one game session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "G-{}", self.0)
    }
}

/// Milliseconds since the Unix epoch. Returns 0 if the system clock is
/// set before 1970.
pub fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

// ---------------------------------------------------------------------------
// Matchmaking preferences
// ---------------------------------------------------------------------------

/// What a player is willing to be matched with.
///
/// Every field has a default, so `{}` is a valid preferences object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchPreferences {
    /// Self-reported skill, compared against other entries using the
    /// queue's tolerance.
    pub skill_level: u8,
    /// Whether a bot opponent is acceptable once the wait runs out.
    pub allow_bots: bool,
    /// Per-entry override of the bot-escalation timeout, in seconds.
    pub max_wait_secs: Option<u64>,
}

impl Default for MatchPreferences {
    fn default() -> Self {
        Self {
            skill_level: 5,
            allow_bots: true,
            max_wait_secs: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Session snapshots
// ---------------------------------------------------------------------------

/// Lifecycle of a game session. `Finished` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameStatus {
    Playing,
    Finished,
}

/// How a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndReason {
    /// Four in a row.
    Win,
    /// Board filled with no winner.
    Draw,
    /// A player stayed disconnected past the grace period.
    Disconnect,
}

/// One applied move. Immutable once recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Move {
    pub player_id: PlayerId,
    pub column: usize,
    /// Row the piece landed in (0 = top).
    pub row: usize,
    pub color: Color,
    /// Unix milliseconds.
    pub timestamp: u64,
}

/// Public view of one seat in a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerInfo {
    pub id: PlayerId,
    pub name: String,
    pub color: Color,
    pub is_bot: bool,
    pub connected: bool,
}

/// A point-in-time copy of a session.
///
/// Produced under the registry's lock and then handed around freely;
/// holding one never blocks the game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameSnapshot {
    pub id: SessionId,
    pub status: GameStatus,
    pub board: Board,
    /// Seat 0 holds Red and opens the game.
    pub players: [PlayerInfo; 2],
    pub current_turn: Color,
    pub winner: Option<Color>,
    /// Unix milliseconds.
    pub created_at: u64,
    pub finished_at: Option<u64>,
    pub last_move: Option<Move>,
    pub move_count: usize,
}

impl GameSnapshot {
    /// The seat occupied by `player_id`.
    pub fn player(&self, player_id: PlayerId) -> Option<&PlayerInfo> {
        self.players.iter().find(|p| p.id == player_id)
    }

    /// The other seat.
    pub fn opponent_of(&self, player_id: PlayerId) -> Option<&PlayerInfo> {
        self.player(player_id)?;
        self.players.iter().find(|p| p.id != player_id)
    }

    /// Color assigned to `player_id`.
    pub fn color_of(&self, player_id: PlayerId) -> Option<Color> {
        self.player(player_id).map(|p| p.color)
    }

    pub fn is_playing(&self) -> bool {
        self.status == GameStatus::Playing
    }

    /// `true` if it is `player_id`'s move in a session still in play.
    pub fn is_turn_of(&self, player_id: PlayerId) -> bool {
        self.is_playing() && self.color_of(player_id) == Some(self.current_turn)
    }
}

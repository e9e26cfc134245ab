//! One game session: two seats, a board, and turn authority.
//!
//! [`GameSession`] is a plain state machine with no locking and no clock
//! of its own. Callers pass `now` in, which keeps every transition
//! testable with exact instants.
//!
//! ```text
//!            move (win) ───────────┐
//!            move (board full) ────┤
//!  Playing ──disconnect > grace ───┴──→ Finished
//!     ↑ │
//!     └─┘ move (game continues, turn flips)
//! ```
//!
//! Nothing leaves `Finished`.

use std::time::Duration;

use fourline_board::{Board, Color};
use fourline_protocol::{
    EndReason, GameSnapshot, GameStatus, Move, PlayerId, PlayerInfo, ServerMessage, SessionId,
    unix_millis,
};
use tokio::time::Instant;

use crate::{GameError, GameRecord};

// ---------------------------------------------------------------------------
// Players
// ---------------------------------------------------------------------------

/// Who is being seated. The session assigns the color.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerProfile {
    pub id: PlayerId,
    pub name: String,
    pub is_bot: bool,
}

impl PlayerProfile {
    pub fn human(id: PlayerId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            is_bot: false,
        }
    }

    pub fn bot(id: PlayerId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            is_bot: true,
        }
    }
}

/// A seated player.
#[derive(Debug, Clone)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    /// Fixed for the session's lifetime.
    pub color: Color,
    pub is_bot: bool,
    /// Toggled only by connection add/remove.
    pub connected: bool,
    /// Last connect, disconnect, move, or heartbeat.
    pub last_seen: Instant,
}

impl Player {
    fn seat(profile: PlayerProfile, color: Color, now: Instant) -> Self {
        Self {
            id: profile.id,
            name: profile.name,
            color,
            is_bot: profile.is_bot,
            connected: true,
            last_seen: now,
        }
    }

    pub fn info(&self) -> PlayerInfo {
        PlayerInfo {
            id: self.id,
            name: self.name.clone(),
            color: self.color,
            is_bot: self.is_bot,
            connected: self.connected,
        }
    }
}

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// Result of an accepted move.
#[derive(Debug, Clone)]
pub struct MoveOutcome {
    pub applied: Move,
    /// `true` if this move ended the game.
    pub finished: bool,
}

/// What leaves the registry when a session finishes: the client notice
/// and the storage record.
#[derive(Debug, Clone)]
pub struct Ending {
    pub notice: ServerMessage,
    pub record: GameRecord,
}

// ---------------------------------------------------------------------------
// GameSession
// ---------------------------------------------------------------------------

/// A single four-in-a-row game between two seats.
#[derive(Debug, Clone)]
pub struct GameSession {
    id: SessionId,
    status: GameStatus,
    board: Board,
    players: [Player; 2],
    current_turn: Color,
    winner: Option<Color>,
    end_reason: Option<EndReason>,
    started: Instant,
    created_at: u64,
    finished: Option<Instant>,
    finished_at: Option<u64>,
    last_move: Option<Move>,
    move_count: usize,
}

impl GameSession {
    /// Seats `first` as Red (with the opening move) and `second` as Yellow.
    pub fn new(id: SessionId, first: PlayerProfile, second: PlayerProfile, now: Instant) -> Self {
        Self {
            id,
            status: GameStatus::Playing,
            board: Board::new(),
            players: [
                Player::seat(first, Color::Red, now),
                Player::seat(second, Color::Yellow, now),
            ],
            current_turn: Color::Red,
            winner: None,
            end_reason: None,
            started: now,
            created_at: unix_millis(),
            finished: None,
            finished_at: None,
            last_move: None,
            move_count: 0,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn status(&self) -> GameStatus {
        self.status
    }

    pub fn is_playing(&self) -> bool {
        self.status == GameStatus::Playing
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn players(&self) -> &[Player; 2] {
        &self.players
    }

    pub fn current_turn(&self) -> Color {
        self.current_turn
    }

    pub fn winner(&self) -> Option<Color> {
        self.winner
    }

    pub fn end_reason(&self) -> Option<EndReason> {
        self.end_reason
    }

    pub fn move_count(&self) -> usize {
        self.move_count
    }

    /// When the session finished, on the monotonic clock.
    pub fn finished_instant(&self) -> Option<Instant> {
        self.finished
    }

    pub fn player(&self, player_id: PlayerId) -> Option<&Player> {
        self.players.iter().find(|p| p.id == player_id)
    }

    fn player_mut(&mut self, player_id: PlayerId) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| p.id == player_id)
    }

    fn player_by_color(&self, color: Color) -> &Player {
        if self.players[0].color == color {
            &self.players[0]
        } else {
            &self.players[1]
        }
    }

    fn not_in_session(&self, player_id: PlayerId) -> GameError {
        GameError::PlayerNotInSession {
            player_id,
            session_id: self.id,
        }
    }

    /// Applies `player_id`'s move in `column`.
    ///
    /// Checks run in a fixed order and the first failure wins: session in
    /// play, player seated, player's turn, column accepted by the board.
    /// A rejected move changes nothing.
    ///
    /// # Errors
    /// [`GameError::SessionNotActive`], [`GameError::PlayerNotInSession`],
    /// [`GameError::NotPlayersTurn`], or [`GameError::InvalidMove`].
    pub fn apply_move(
        &mut self,
        player_id: PlayerId,
        column: usize,
        now: Instant,
    ) -> Result<MoveOutcome, GameError> {
        if !self.is_playing() {
            return Err(GameError::SessionNotActive(self.id));
        }
        let color = self
            .player(player_id)
            .ok_or_else(|| self.not_in_session(player_id))?
            .color;
        if color != self.current_turn {
            return Err(GameError::NotPlayersTurn {
                player_id,
                session_id: self.id,
            });
        }

        let placement = self.board.apply_move(column, color)?;
        let applied = Move {
            player_id,
            column: placement.column,
            row: placement.row,
            color,
            timestamp: unix_millis(),
        };
        self.last_move = Some(applied);
        self.move_count += 1;
        if let Some(player) = self.player_mut(player_id) {
            player.last_seen = now;
        }

        if let Some(winner) = self.board.check_winner() {
            self.finish(Some(winner), EndReason::Win, now);
        } else if self.board.is_full() {
            self.finish(None, EndReason::Draw, now);
        } else {
            self.current_turn = color.opponent();
        }

        Ok(MoveOutcome {
            applied,
            finished: !self.is_playing(),
        })
    }

    /// Marks `player_id` connected. Returns how long they were offline if
    /// they had been disconnected.
    pub fn mark_connected(
        &mut self,
        player_id: PlayerId,
        now: Instant,
    ) -> Result<Option<Duration>, GameError> {
        let err = self.not_in_session(player_id);
        let player = self.player_mut(player_id).ok_or(err)?;
        let offline = (!player.connected).then(|| now.saturating_duration_since(player.last_seen));
        player.connected = true;
        player.last_seen = now;
        Ok(offline)
    }

    /// Marks `player_id` disconnected. Returns `false` if they already
    /// were (or are not seated here).
    pub fn mark_disconnected(&mut self, player_id: PlayerId, now: Instant) -> bool {
        match self.player_mut(player_id) {
            Some(player) if player.connected => {
                player.connected = false;
                player.last_seen = now;
                true
            }
            _ => false,
        }
    }

    /// Refreshes `player_id`'s activity timestamp.
    ///
    /// A disconnected seat keeps the time it went away: only a new
    /// connection restarts its clock. Returns `false` if nothing changed.
    pub fn touch(&mut self, player_id: PlayerId, now: Instant) -> bool {
        match self.player_mut(player_id) {
            Some(player) if player.connected => {
                player.last_seen = now;
                true
            }
            _ => false,
        }
    }

    /// Ends the game by forfeit if a seat has been disconnected for longer
    /// than `grace`. Returns the forfeiting player.
    ///
    /// If both seats qualify, the one that went quiet first forfeits. The
    /// other seat is always recorded as the winner.
    pub fn forfeit_if_expired(&mut self, grace: Duration, now: Instant) -> Option<PlayerId> {
        if !self.is_playing() {
            return None;
        }
        let loser = self
            .players
            .iter()
            .filter(|p| !p.connected && now.saturating_duration_since(p.last_seen) > grace)
            .min_by_key(|p| p.last_seen)?;
        let (loser_id, winner) = (loser.id, loser.color.opponent());

        self.finish(Some(winner), EndReason::Disconnect, now);
        Some(loser_id)
    }

    fn finish(&mut self, winner: Option<Color>, reason: EndReason, now: Instant) {
        debug_assert!(self.is_playing(), "finish called twice");
        self.status = GameStatus::Finished;
        self.winner = winner;
        self.end_reason = Some(reason);
        self.finished = Some(now);
        self.finished_at = Some(unix_millis());
    }

    fn duration(&self) -> Duration {
        self.finished
            .unwrap_or_else(Instant::now)
            .saturating_duration_since(self.started)
    }

    /// A copy of the current state.
    pub fn snapshot(&self) -> GameSnapshot {
        GameSnapshot {
            id: self.id,
            status: self.status,
            board: self.board,
            players: [self.players[0].info(), self.players[1].info()],
            current_turn: self.current_turn,
            winner: self.winner,
            created_at: self.created_at,
            finished_at: self.finished_at,
            last_move: self.last_move,
            move_count: self.move_count,
        }
    }

    /// The client notice and storage record for a finished session.
    /// `None` while the game is in play.
    pub fn ending(&self) -> Option<Ending> {
        let reason = self.end_reason?;
        let winner = self.winner.map(|color| self.player_by_color(color).info());
        let is_draw = reason == EndReason::Draw;
        let duration_secs = self.duration().as_secs();
        let snapshot = self.snapshot();

        let record = GameRecord {
            session_id: self.id,
            players: snapshot.players.clone(),
            board: self.board,
            winner: winner.as_ref().map(|w| w.id),
            winner_color: self.winner,
            is_draw,
            reason,
            move_count: self.move_count,
            duration_secs,
            finished_at: self.finished_at.unwrap_or_default(),
        };
        let notice = ServerMessage::GameEnd {
            session_id: self.id,
            winner,
            winner_color: self.winner,
            is_draw,
            reason,
            duration_secs,
            state: snapshot,
        };
        Some(Ending { notice, record })
    }
}

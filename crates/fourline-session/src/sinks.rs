//! Analytics and persistence collaborators.
//!
//! The registry reports what happens to sessions through two traits:
//!
//! - [`EventSink`]: best-effort lifecycle notifications (analytics)
//! - [`ResultSink`]: one [`GameRecord`] per finished session (storage)
//!
//! Both are called after the registry's lock is released, and neither can
//! affect game state: an event sink returns nothing, and a result sink's
//! error is logged and dropped.

use std::sync::Mutex;

use fourline_board::{Board, Color};
use fourline_protocol::{EndReason, Move, PlayerId, PlayerInfo, SessionId};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::SinkError;

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// A session lifecycle notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum GameEvent {
    SessionStarted {
        session_id: SessionId,
        players: [PlayerInfo; 2],
        vs_bot: bool,
    },
    MovePlayed {
        session_id: SessionId,
        #[serde(rename = "move")]
        applied: Move,
        move_number: usize,
    },
    SessionEnded {
        session_id: SessionId,
        winner: Option<PlayerId>,
        reason: EndReason,
        move_count: usize,
        duration_secs: u64,
    },
    PlayerDisconnected {
        session_id: SessionId,
        player_id: PlayerId,
    },
    PlayerReconnected {
        session_id: SessionId,
        player_id: PlayerId,
        offline_ms: u64,
    },
}

/// Receives [`GameEvent`]s. Must return quickly and never panic.
pub trait EventSink: Send + Sync + 'static {
    fn publish(&self, event: GameEvent);
}

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// Everything storage needs to know about a finished session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameRecord {
    pub session_id: SessionId,
    pub players: [PlayerInfo; 2],
    pub board: Board,
    pub winner: Option<PlayerId>,
    pub winner_color: Option<Color>,
    pub is_draw: bool,
    pub reason: EndReason,
    pub move_count: usize,
    pub duration_secs: u64,
    /// Unix milliseconds.
    pub finished_at: u64,
}

impl GameRecord {
    /// The analytics event matching this record.
    pub fn ended_event(&self) -> GameEvent {
        GameEvent::SessionEnded {
            session_id: self.session_id,
            winner: self.winner,
            reason: self.reason,
            move_count: self.move_count,
            duration_secs: self.duration_secs,
        }
    }
}

/// Accepts finished sessions for storage.
///
/// Called once per session, after it finished. Implementations that do
/// slow I/O should queue the record and return.
pub trait ResultSink: Send + Sync + 'static {
    /// # Errors
    /// Any [`SinkError`] is logged by the registry and otherwise ignored.
    fn store(&self, record: GameRecord) -> Result<(), SinkError>;
}

// ---------------------------------------------------------------------------
// Implementations
// ---------------------------------------------------------------------------

/// Discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl EventSink for NoopSink {
    fn publish(&self, _event: GameEvent) {}
}

impl ResultSink for NoopSink {
    fn store(&self, _record: GameRecord) -> Result<(), SinkError> {
        Ok(())
    }
}

/// Writes each event as one JSON line on the `fourline::analytics` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn publish(&self, event: GameEvent) {
        match serde_json::to_string(&event) {
            Ok(json) => tracing::info!(target: "fourline::analytics", event = %json),
            Err(e) => tracing::warn!(error = %e, "failed to encode analytics event"),
        }
    }
}

impl EventSink for mpsc::UnboundedSender<GameEvent> {
    fn publish(&self, event: GameEvent) {
        // Nobody listening is fine for analytics.
        let _ = self.send(event);
    }
}

impl ResultSink for mpsc::UnboundedSender<GameRecord> {
    fn store(&self, record: GameRecord) -> Result<(), SinkError> {
        self.send(record).map_err(|_| SinkError::Unavailable)
    }
}

/// Keeps every record in memory. Useful for tests and the demo.
#[derive(Debug, Default)]
pub struct MemoryArchive {
    records: Mutex<Vec<GameRecord>>,
}

impl MemoryArchive {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copies of everything stored so far, oldest first.
    pub fn records(&self) -> Vec<GameRecord> {
        match self.records.lock() {
            Ok(records) => records.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn len(&self) -> usize {
        self.records().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ResultSink for MemoryArchive {
    fn store(&self, record: GameRecord) -> Result<(), SinkError> {
        self.records
            .lock()
            .map_err(|_| SinkError::Rejected("archive lock poisoned".into()))?
            .push(record);
        Ok(())
    }
}

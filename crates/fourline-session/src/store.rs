//! The session store: every session and every connection binding.
//!
//! # Concurrency note
//!
//! `SessionStore` is NOT thread-safe by itself. It is plain `HashMap`s,
//! owned by [`SessionRegistry`](crate::SessionRegistry) behind a single
//! `RwLock`. Every method here is synchronous and does no I/O, so the lock
//! is never held across a send.

use std::collections::HashMap;
use std::sync::Arc;

use fourline_protocol::{GameSnapshot, PlayerId, SessionId};
use tokio::time::Instant;

use crate::{Ending, GameError, GameSession, MoveOutcome, PlayerHandle, PlayerProfile, RegistryConfig};

/// Shared handle to a player's transport.
pub type SharedHandle = Arc<dyn PlayerHandle>;

/// An accepted move plus everything needed to announce it.
pub struct AppliedMove {
    pub outcome: MoveOutcome,
    pub snapshot: GameSnapshot,
    pub ending: Option<Ending>,
    pub recipients: Vec<SharedHandle>,
}

/// Result of binding a handle.
pub struct Bound {
    /// How long the player had been offline, if they were.
    pub offline: Option<std::time::Duration>,
    pub snapshot: GameSnapshot,
    /// Handles of the *other* seat, for the reconnect notice.
    pub others: Vec<SharedHandle>,
}

/// Result of removing a handle from a session still in play.
pub struct Unbound {
    pub session_id: SessionId,
    /// Handles of the seat that is still here.
    pub others: Vec<SharedHandle>,
}

/// A session the sweep ended by forfeit.
pub struct Forfeit {
    pub session_id: SessionId,
    pub loser: PlayerId,
    pub ending: Ending,
    pub recipients: Vec<SharedHandle>,
}

/// All sessions plus the player → session and player → handle maps.
///
/// ```text
/// create() ──→ [Playing] ──apply move──→ [Finished] ──retain_finished──→ reaped
///                  │  ↑
///        unbind()  │  │  bind()
///                  ↓  │
///            (disconnected) ──grace exceeded──→ [Finished] (forfeit)
/// ```
pub struct SessionStore {
    sessions: HashMap<SessionId, GameSession>,

    /// Which session each player is seated in. A player seated in a newer
    /// session is re-pointed; the old session keeps its copy of the seat.
    seats: HashMap<PlayerId, SessionId>,

    /// Live transport handles. Absent means disconnected (or a bot).
    connections: HashMap<PlayerId, SharedHandle>,

    next_id: u64,
    config: RegistryConfig,
}

impl SessionStore {
    pub fn new(config: RegistryConfig) -> Self {
        Self {
            sessions: HashMap::new(),
            seats: HashMap::new(),
            connections: HashMap::new(),
            next_id: 1,
            config,
        }
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Creates a Playing session. `first` gets Red and the opening move.
    pub fn create(
        &mut self,
        first: PlayerProfile,
        second: PlayerProfile,
        now: Instant,
    ) -> &GameSession {
        let id = SessionId(self.next_id);
        self.next_id += 1;

        self.seats.insert(first.id, id);
        self.seats.insert(second.id, id);
        self.sessions
            .entry(id)
            .or_insert_with(|| GameSession::new(id, first, second, now))
    }

    pub fn get(&self, session_id: SessionId) -> Option<&GameSession> {
        self.sessions.get(&session_id)
    }

    fn get_mut(&mut self, session_id: SessionId) -> Result<&mut GameSession, GameError> {
        self.sessions
            .get_mut(&session_id)
            .ok_or(GameError::SessionNotFound(session_id))
    }

    /// The session `player_id` was most recently seated in.
    pub fn session_of(&self, player_id: PlayerId) -> Option<SessionId> {
        self.seats.get(&player_id).copied()
    }

    /// Applies a move and collects what the caller must send once the lock
    /// is released.
    ///
    /// # Errors
    /// [`GameError::SessionNotFound`] or anything
    /// [`GameSession::apply_move`] returns.
    pub fn apply_move(
        &mut self,
        session_id: SessionId,
        player_id: PlayerId,
        column: usize,
        now: Instant,
    ) -> Result<AppliedMove, GameError> {
        let session = self.get_mut(session_id)?;
        let outcome = session.apply_move(player_id, column, now)?;
        let snapshot = session.snapshot();
        let ending = if outcome.finished {
            session.ending()
        } else {
            None
        };
        Ok(AppliedMove {
            outcome,
            snapshot,
            ending,
            recipients: self.recipients(session_id, None),
        })
    }

    /// Binds `handle` as `player_id`'s connection to `session_id`.
    ///
    /// A previous handle for the same player is replaced and closed.
    ///
    /// # Errors
    /// - [`GameError::SessionNotFound`]
    /// - [`GameError::PlayerNotInSession`]
    /// - [`GameError::SessionNotActive`] when `require_playing` is set and
    ///   the session has finished
    pub fn bind(
        &mut self,
        player_id: PlayerId,
        session_id: SessionId,
        handle: SharedHandle,
        require_playing: bool,
        now: Instant,
    ) -> Result<Bound, GameError> {
        let session = self.get_mut(session_id)?;
        if session.player(player_id).is_none() {
            return Err(GameError::PlayerNotInSession {
                player_id,
                session_id,
            });
        }
        if require_playing && !session.is_playing() {
            return Err(GameError::SessionNotActive(session_id));
        }
        let offline = session.mark_connected(player_id, now)?;
        let snapshot = session.snapshot();

        self.seats.insert(player_id, session_id);
        if let Some(old) = self.connections.insert(player_id, handle.clone()) {
            if !Arc::ptr_eq(&old, &handle) {
                old.close();
            }
        }

        Ok(Bound {
            offline,
            snapshot,
            others: self.recipients(session_id, Some(player_id)),
        })
    }

    /// Drops `player_id`'s connection and marks them disconnected.
    ///
    /// Returns `Some` only if this turned a connected player in a game
    /// still in play into a disconnected one.
    pub fn unbind(&mut self, player_id: PlayerId, now: Instant) -> Option<Unbound> {
        self.connections.remove(&player_id);
        let session_id = self.session_of(player_id)?;
        let session = self.sessions.get_mut(&session_id)?;
        if !session.is_playing() || !session.mark_disconnected(player_id, now) {
            return None;
        }
        Some(Unbound {
            session_id,
            others: self.recipients(session_id, Some(player_id)),
        })
    }

    /// Like [`unbind`](Self::unbind), but only if `handle` is still the
    /// player's bound connection. A connection that was already replaced
    /// by a reconnect leaves the newer one alone.
    pub fn unbind_handle(
        &mut self,
        player_id: PlayerId,
        handle: &SharedHandle,
        now: Instant,
    ) -> Option<Unbound> {
        let bound = self.connections.get(&player_id)?;
        if !Arc::ptr_eq(bound, handle) {
            return None;
        }
        self.unbind(player_id, now)
    }

    /// Checks that `handle` may act for `player_id` in `session_id`.
    ///
    /// # Errors
    /// [`GameError::StaleConnection`] if the player holds a seat in that
    /// session while it is in play and `handle` is not their bound
    /// connection (it was replaced by a reconnect, or released).
    pub fn check_connection(
        &self,
        session_id: SessionId,
        player_id: PlayerId,
        handle: &SharedHandle,
    ) -> Result<(), GameError> {
        let seated = self
            .sessions
            .get(&session_id)
            .is_some_and(|s| s.is_playing() && s.player(player_id).is_some());
        let bound = self
            .connections
            .get(&player_id)
            .is_some_and(|b| Arc::ptr_eq(b, handle));
        if seated && !bound {
            return Err(GameError::StaleConnection(player_id));
        }
        Ok(())
    }

    /// Refreshes `player_id`'s activity timestamp in their current session.
    /// Returns `false` if there was nothing to refresh.
    ///
    /// # Errors
    /// As [`check_connection`](Self::check_connection).
    pub fn touch(
        &mut self,
        player_id: PlayerId,
        handle: &SharedHandle,
        now: Instant,
    ) -> Result<bool, GameError> {
        let Some(session_id) = self.session_of(player_id) else {
            return Ok(false);
        };
        self.check_connection(session_id, player_id, handle)?;
        Ok(self
            .sessions
            .get_mut(&session_id)
            .is_some_and(|s| s.touch(player_id, now)))
    }

    /// Handles bound to `session_id`, optionally leaving one player out.
    ///
    /// A player whose seat has moved on to a newer session is skipped:
    /// their connection belongs to that session now.
    pub fn recipients(&self, session_id: SessionId, except: Option<PlayerId>) -> Vec<SharedHandle> {
        let Some(session) = self.sessions.get(&session_id) else {
            return Vec::new();
        };
        session
            .players()
            .iter()
            .filter(|p| Some(p.id) != except)
            .filter(|p| self.seats.get(&p.id) == Some(&session_id))
            .filter_map(|p| self.connections.get(&p.id).cloned())
            .collect()
    }

    /// Ends every Playing session with a seat disconnected past the grace
    /// period.
    pub fn expire_disconnected(&mut self, now: Instant) -> Vec<Forfeit> {
        let grace = self.config.grace_period;
        let mut forfeits = Vec::new();

        for session in self.sessions.values_mut() {
            let Some(loser) = session.forfeit_if_expired(grace, now) else {
                continue;
            };
            if let Some(ending) = session.ending() {
                forfeits.push(Forfeit {
                    session_id: session.id(),
                    loser,
                    ending,
                    recipients: Vec::new(),
                });
            }
        }
        for forfeit in &mut forfeits {
            forfeit.recipients = self.recipients(forfeit.session_id, None);
        }
        forfeits
    }

    /// Removes sessions that finished more than `retain_finished` ago,
    /// along with seats and connections that still point at them.
    pub fn reap_finished(&mut self, now: Instant) -> Vec<SessionId> {
        let retain = self.config.retain_finished;
        let reaped: Vec<SessionId> = self
            .sessions
            .values()
            .filter(|s| {
                s.finished_instant()
                    .is_some_and(|at| now.saturating_duration_since(at) >= retain)
            })
            .map(GameSession::id)
            .collect();

        for id in &reaped {
            self.sessions.remove(id);
        }
        let stale: Vec<PlayerId> = self
            .seats
            .iter()
            .filter(|(_, sid)| reaped.contains(*sid))
            .map(|(&pid, _)| pid)
            .collect();
        for pid in stale {
            self.seats.remove(&pid);
            self.connections.remove(&pid);
        }
        reaped
    }

    /// Number of sessions held (any state).
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Number of sessions in play.
    pub fn active_count(&self) -> usize {
        self.sessions.values().filter(|s| s.is_playing()).count()
    }

    pub fn is_connected(&self, player_id: PlayerId) -> bool {
        self.connections.contains_key(&player_id)
    }
}

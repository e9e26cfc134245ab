//! The session registry: the single point of mutation for game state.
//!
//! [`SessionRegistry`] wraps a [`SessionStore`] in an `RwLock` and pairs
//! every mutation with its side effects (client notices, analytics,
//! storage). Each method follows the same shape:
//!
//! 1. take the lock, mutate, copy out snapshots and recipient handles
//! 2. release the lock
//! 3. send, publish, store
//!
//! so a slow or dead peer can never stall a move.

use std::sync::Arc;

use fourline_protocol::{GameSnapshot, Move, PlayerId, ServerMessage, SessionId};
use fourline_tick::{TickConfig, Ticker};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::store::{SharedHandle, Unbound};
use crate::{
    Ending, EventSink, GameError, GameEvent, NoopSink, PlayerProfile, RegistryConfig, ResultSink,
    SessionStore,
};

struct Shared {
    store: RwLock<SessionStore>,
    config: RegistryConfig,
    events: Arc<dyn EventSink>,
    results: Arc<dyn ResultSink>,
}

/// Cloneable handle to the registry. All clones share one store.
#[derive(Clone)]
pub struct SessionRegistry {
    inner: Arc<Shared>,
}

impl SessionRegistry {
    /// A registry that discards analytics and results.
    pub fn new(config: RegistryConfig) -> Self {
        Self::with_sinks(config, Arc::new(NoopSink), Arc::new(NoopSink))
    }

    pub fn with_sinks(
        config: RegistryConfig,
        events: Arc<dyn EventSink>,
        results: Arc<dyn ResultSink>,
    ) -> Self {
        Self {
            inner: Arc::new(Shared {
                store: RwLock::new(SessionStore::new(config.clone())),
                config,
                events,
                results,
            }),
        }
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.inner.config
    }

    /// Creates a Playing session. `first` plays Red and moves first.
    pub async fn create_session(&self, first: PlayerProfile, second: PlayerProfile) -> GameSnapshot {
        let snapshot = {
            let mut store = self.inner.store.write().await;
            store.create(first, second, Instant::now()).snapshot()
        };

        tracing::info!(
            session_id = %snapshot.id,
            red = %snapshot.players[0].id,
            yellow = %snapshot.players[1].id,
            "session created"
        );
        self.inner.events.publish(GameEvent::SessionStarted {
            session_id: snapshot.id,
            players: snapshot.players.clone(),
            vs_bot: snapshot.players.iter().any(|p| p.is_bot),
        });
        snapshot
    }

    /// Applies a move for `player_id` and announces it.
    ///
    /// On success both seats receive `move_result`; if the move ended the
    /// game they also receive `game_end`, and the result is handed to the
    /// result sink.
    ///
    /// # Errors
    /// [`GameError::SessionNotFound`], [`GameError::SessionNotActive`],
    /// [`GameError::PlayerNotInSession`], [`GameError::NotPlayersTurn`],
    /// [`GameError::InvalidMove`]. Errors have no side effects.
    pub async fn make_move(
        &self,
        session_id: SessionId,
        player_id: PlayerId,
        column: usize,
    ) -> Result<Move, GameError> {
        self.play(session_id, player_id, column, None).await
    }

    /// [`make_move`](Self::make_move) on behalf of a client connection.
    ///
    /// # Errors
    /// As [`make_move`](Self::make_move), plus
    /// [`GameError::StaleConnection`] if `handle` is no longer the
    /// player's bound connection.
    pub async fn make_move_from(
        &self,
        session_id: SessionId,
        player_id: PlayerId,
        column: usize,
        handle: &SharedHandle,
    ) -> Result<Move, GameError> {
        self.play(session_id, player_id, column, Some(handle)).await
    }

    async fn play(
        &self,
        session_id: SessionId,
        player_id: PlayerId,
        column: usize,
        via: Option<&SharedHandle>,
    ) -> Result<Move, GameError> {
        let applied = {
            let mut store = self.inner.store.write().await;
            if let Some(handle) = via {
                store.check_connection(session_id, player_id, handle)?;
            }
            store.apply_move(session_id, player_id, column, Instant::now())?
        };
        let mv = applied.outcome.applied;

        tracing::debug!(
            %session_id,
            %player_id,
            column = mv.column,
            row = mv.row,
            "move applied"
        );
        deliver(
            &applied.recipients,
            &ServerMessage::MoveResult {
                success: true,
                applied: Some(mv),
                state: Some(applied.snapshot.clone()),
                error: None,
            },
        );
        self.inner.events.publish(GameEvent::MovePlayed {
            session_id,
            applied: mv,
            move_number: applied.snapshot.move_count,
        });

        if let Some(ending) = applied.ending {
            self.conclude(ending, &applied.recipients);
        }
        Ok(mv)
    }

    /// Binds `handle` as `player_id`'s connection to `session_id`.
    ///
    /// If the player had been disconnected, the other seat is told they
    /// are back.
    ///
    /// # Errors
    /// [`GameError::SessionNotFound`] or [`GameError::PlayerNotInSession`].
    pub async fn add_connection(
        &self,
        player_id: PlayerId,
        session_id: SessionId,
        handle: SharedHandle,
    ) -> Result<(), GameError> {
        self.bind(player_id, session_id, handle, false).await?;
        Ok(())
    }

    /// Resumes a session in play on a new connection and returns its
    /// current state.
    ///
    /// # Errors
    /// As [`add_connection`](Self::add_connection), plus
    /// [`GameError::SessionNotActive`] if the game already finished.
    pub async fn reconnect(
        &self,
        session_id: SessionId,
        player_id: PlayerId,
        handle: SharedHandle,
    ) -> Result<GameSnapshot, GameError> {
        self.bind(player_id, session_id, handle, true).await
    }

    async fn bind(
        &self,
        player_id: PlayerId,
        session_id: SessionId,
        handle: SharedHandle,
        require_playing: bool,
    ) -> Result<GameSnapshot, GameError> {
        let bound = {
            let mut store = self.inner.store.write().await;
            store.bind(player_id, session_id, handle, require_playing, Instant::now())?
        };

        match bound.offline {
            Some(offline) => {
                let offline_ms = offline.as_millis() as u64;
                tracing::info!(%session_id, %player_id, offline_ms, "player reconnected");
                deliver(
                    &bound.others,
                    &ServerMessage::PlayerReconnected {
                        session_id,
                        player_id,
                        offline_ms,
                    },
                );
                self.inner.events.publish(GameEvent::PlayerReconnected {
                    session_id,
                    player_id,
                    offline_ms,
                });
            }
            None => tracing::debug!(%session_id, %player_id, "connection bound"),
        }
        Ok(bound.snapshot)
    }

    /// Unbinds `player_id`'s connection.
    ///
    /// The session is not ended here. If it is still in play, the other
    /// seat is warned and the disconnect sweep takes over.
    pub async fn remove_connection(&self, player_id: PlayerId) {
        let unbound = {
            let mut store = self.inner.store.write().await;
            store.unbind(player_id, Instant::now())
        };
        if let Some(unbound) = unbound {
            self.announce_disconnect(player_id, unbound);
        }
    }

    /// [`remove_connection`](Self::remove_connection) for a specific
    /// connection. Does nothing if `handle` has since been replaced.
    pub async fn release_connection(&self, player_id: PlayerId, handle: &SharedHandle) {
        let unbound = {
            let mut store = self.inner.store.write().await;
            store.unbind_handle(player_id, handle, Instant::now())
        };
        if let Some(unbound) = unbound {
            self.announce_disconnect(player_id, unbound);
        }
    }

    fn announce_disconnect(&self, player_id: PlayerId, unbound: Unbound) {
        let session_id = unbound.session_id;
        tracing::info!(%session_id, %player_id, "player disconnected, grace period started");
        deliver(
            &unbound.others,
            &ServerMessage::PlayerDisconnected {
                session_id,
                player_id,
                grace_period_secs: self.inner.config.grace_period.as_secs(),
            },
        );
        self.inner.events.publish(GameEvent::PlayerDisconnected {
            session_id,
            player_id,
        });
    }

    /// Records activity for `player_id` (heartbeat) arriving on `handle`.
    /// Returns `false` if there is no connected seat to refresh.
    ///
    /// # Errors
    /// [`GameError::StaleConnection`] if the player is in a game and
    /// `handle` is not their bound connection.
    pub async fn touch(
        &self,
        player_id: PlayerId,
        handle: &SharedHandle,
    ) -> Result<bool, GameError> {
        self.inner
            .store
            .write()
            .await
            .touch(player_id, handle, Instant::now())
    }

    /// Delivers `message` to every handle bound to `session_id`.
    ///
    /// Best-effort: unbound seats and closed handles are skipped.
    pub async fn broadcast(&self, session_id: SessionId, message: ServerMessage) {
        let recipients = self.inner.store.read().await.recipients(session_id, None);
        deliver(&recipients, &message);
    }

    pub async fn snapshot(&self, session_id: SessionId) -> Option<GameSnapshot> {
        self.inner
            .store
            .read()
            .await
            .get(session_id)
            .map(|s| s.snapshot())
    }

    /// The session `player_id` is currently seated in.
    pub async fn session_of(&self, player_id: PlayerId) -> Option<SessionId> {
        self.inner.store.read().await.session_of(player_id)
    }

    /// `true` if `player_id` is seated in a session still in play.
    pub async fn is_playing(&self, player_id: PlayerId) -> bool {
        let store = self.inner.store.read().await;
        store
            .session_of(player_id)
            .and_then(|id| store.get(id))
            .is_some_and(|s| s.is_playing())
    }

    /// Number of sessions in play.
    pub async fn active_sessions(&self) -> usize {
        self.inner.store.read().await.active_count()
    }

    /// One pass of the disconnect sweep.
    ///
    /// Forfeits every session with a seat disconnected past the grace
    /// period, announces each result with the winner filled in, and drops
    /// finished sessions past their retention. Returns the forfeited ids.
    pub async fn sweep(&self) -> Vec<SessionId> {
        let (forfeits, reaped) = {
            let mut store = self.inner.store.write().await;
            let now = Instant::now();
            (store.expire_disconnected(now), store.reap_finished(now))
        };

        if !reaped.is_empty() {
            tracing::debug!(count = reaped.len(), "finished sessions reaped");
        }

        let mut ended = Vec::with_capacity(forfeits.len());
        for forfeit in forfeits {
            tracing::info!(
                session_id = %forfeit.session_id,
                loser = %forfeit.loser,
                winner = ?forfeit.ending.record.winner,
                "session forfeited after disconnect"
            );
            ended.push(forfeit.session_id);
            self.conclude(forfeit.ending, &forfeit.recipients);
        }
        ended
    }

    /// Starts the periodic disconnect sweep. Abort the handle to stop it.
    pub fn spawn_sweeper(&self) -> JoinHandle<()> {
        let registry = self.clone();
        let mut ticker =
            Ticker::new(TickConfig::every(self.inner.config.sweep_interval)).with_label("sweep");
        tokio::spawn(async move {
            loop {
                ticker.wait_for_tick().await;
                registry.sweep().await;
                ticker.record_tick_end();
            }
        })
    }

    fn conclude(&self, ending: Ending, recipients: &[SharedHandle]) {
        let record = ending.record;
        tracing::info!(
            session_id = %record.session_id,
            reason = ?record.reason,
            winner = ?record.winner,
            moves = record.move_count,
            "session finished"
        );
        deliver(recipients, &ending.notice);
        self.inner.events.publish(record.ended_event());
        if let Err(e) = self.inner.results.store(record) {
            tracing::warn!(error = %e, "failed to hand off game result");
        }
    }
}

/// Sends a copy of `message` to each handle. Failures are dropped.
fn deliver(recipients: &[SharedHandle], message: &ServerMessage) {
    for handle in recipients {
        if let Err(e) = handle.send(message.clone()) {
            tracing::trace!(error = %e, "dropped outbound message");
        }
    }
}

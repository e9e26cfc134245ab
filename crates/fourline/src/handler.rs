//! Per-connection request dispatcher.
//!
//! A transport creates one [`ClientSession`] per connection (through
//! [`GameServer::connect`](crate::GameServer::connect)), feeds it decoded
//! [`ClientRequest`]s, and forwards whatever arrives on the connection's
//! [`PlayerHandle`](fourline_session::PlayerHandle). Replies and pushes
//! (`game_found`, `move_result`, `game_end`, ...) all travel through that
//! one handle.
//!
//! When the connection goes away, call [`ClientSession::disconnect`]. If
//! the session is dropped without it, the same cleanup is spawned from
//! `Drop`.

use fourline_matchmaking::{QueueError, QueueHandle};
use fourline_protocol::{
    ClientRequest, MatchPreferences, PlayerId, ServerMessage, SessionId, unix_millis,
};
use fourline_session::{SessionRegistry, SharedHandle};
use tracing::{debug, info};

use crate::FourlineError;

/// Longest accepted display name, in characters.
pub const MAX_NAME_LEN: usize = 32;

pub struct ClientSession {
    registry: SessionRegistry,
    queue: QueueHandle,
    handle: SharedHandle,
    player_id: Option<PlayerId>,
    closed: bool,
}

impl ClientSession {
    pub(crate) fn new(registry: SessionRegistry, queue: QueueHandle, handle: SharedHandle) -> Self {
        Self {
            registry,
            queue,
            handle,
            player_id: None,
            closed: false,
        }
    }

    /// The identity this connection acts as. Assigned on the first
    /// `join_queue`, or taken over by a successful `reconnect`.
    pub fn player_id(&self) -> Option<PlayerId> {
        self.player_id
    }

    /// Handles one request. The reply (or an `error` message) has been
    /// sent through the connection's handle by the time this returns; the
    /// returned error is for the caller's logs.
    pub async fn handle(&mut self, request: ClientRequest) -> Result<(), FourlineError> {
        let result = match request {
            ClientRequest::JoinQueue { name, preferences } => {
                self.join_queue(name, preferences).await.map(|()| None)
            }
            ClientRequest::LeaveQueue => self.leave_queue().await.map(Some),
            ClientRequest::MakeMove { session_id, column } => {
                return self.make_move(session_id, column).await;
            }
            ClientRequest::Reconnect {
                session_id,
                player_id,
                last_seen,
            } => self
                .reconnect(session_id, player_id, last_seen)
                .await
                .map(Some),
            ClientRequest::Heartbeat { client_time } => {
                self.heartbeat(client_time).await.map(Some)
            }
        };

        match result {
            Ok(reply) => {
                if let Some(reply) = reply {
                    self.reply(reply);
                }
                Ok(())
            }
            Err(e) => {
                debug!(player_id = ?self.player_id, error = %e, "request rejected");
                self.reply(e.to_message());
                Err(e)
            }
        }
    }

    /// The coordinator answers with `queue_joined` through the handle
    /// itself, so it cannot be overtaken by a `game_found` from a pairing
    /// made on this join.
    async fn join_queue(
        &mut self,
        name: String,
        preferences: MatchPreferences,
    ) -> Result<(), FourlineError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(FourlineError::InvalidRequest("name must not be empty".into()));
        }
        if name.chars().count() > MAX_NAME_LEN {
            return Err(FourlineError::InvalidRequest(format!(
                "name must be at most {MAX_NAME_LEN} characters"
            )));
        }

        let player_id = *self.player_id.get_or_insert_with(PlayerId::random);
        if self.registry.is_playing(player_id).await {
            return Err(FourlineError::InvalidRequest(
                "already playing a game".into(),
            ));
        }

        self.queue
            .join(player_id, name, preferences, self.handle.clone())
            .await?;
        Ok(())
    }

    async fn leave_queue(&mut self) -> Result<ServerMessage, FourlineError> {
        let player_id = self
            .player_id
            .ok_or_else(|| FourlineError::InvalidRequest("not in the queue".into()))?;
        self.queue.leave(player_id).await?;
        Ok(ServerMessage::QueueLeft { player_id })
    }

    /// On success the registry broadcasts `move_result` to both seats, so
    /// nothing is sent here. A rejected move is answered to this
    /// connection only, with the current state when there is one. Only the
    /// connection currently bound to the seat may move.
    async fn make_move(&mut self, session_id: SessionId, column: usize) -> Result<(), FourlineError> {
        let result = match self.player_id {
            Some(player_id) => self
                .registry
                .make_move_from(session_id, player_id, column, &self.handle)
                .await
                .map(|_| ())
                .map_err(FourlineError::from),
            None => Err(FourlineError::InvalidRequest(
                "join the queue before moving".into(),
            )),
        };

        if let Err(e) = &result {
            debug!(player_id = ?self.player_id, %session_id, column, error = %e, "move rejected");
            let state = self.registry.snapshot(session_id).await;
            self.reply(ServerMessage::MoveResult {
                success: false,
                applied: None,
                state,
                error: Some(e.to_string()),
            });
        }
        result
    }

    async fn reconnect(
        &mut self,
        session_id: SessionId,
        player_id: PlayerId,
        last_seen: Option<u64>,
    ) -> Result<ServerMessage, FourlineError> {
        let session = self
            .registry
            .reconnect(session_id, player_id, self.handle.clone())
            .await?;
        if let Some(previous) = self.player_id.replace(player_id) {
            if previous != player_id {
                self.abandon_queue(previous).await;
            }
        }
        info!(%session_id, %player_id, ?last_seen, "client resumed session");
        Ok(ServerMessage::Reconnected { session })
    }

    /// A connection that lost its seat to a reconnect elsewhere gets an
    /// error instead of an ack, and refreshes nothing.
    async fn heartbeat(&mut self, client_time: u64) -> Result<ServerMessage, FourlineError> {
        if let Some(player_id) = self.player_id {
            self.registry.touch(player_id, &self.handle).await?;
        }
        Ok(ServerMessage::HeartbeatAck {
            client_time,
            server_time: unix_millis(),
        })
    }

    /// Leaves the queue and releases this connection's seat. Idempotent.
    pub async fn disconnect(&mut self) {
        if std::mem::replace(&mut self.closed, true) {
            return;
        }
        if let Some(player_id) = self.player_id {
            cleanup(&self.registry, &self.queue, player_id, &self.handle).await;
        }
    }

    async fn abandon_queue(&self, player_id: PlayerId) {
        match self.queue.leave(player_id).await {
            Ok(()) | Err(QueueError::NotInQueue(_)) => {}
            Err(e) => debug!(%player_id, error = %e, "queue cleanup failed"),
        }
    }

    fn reply(&self, message: ServerMessage) {
        if let Err(e) = self.handle.send(message) {
            debug!(player_id = ?self.player_id, error = %e, "reply not delivered");
        }
    }
}

async fn cleanup(
    registry: &SessionRegistry,
    queue: &QueueHandle,
    player_id: PlayerId,
    handle: &SharedHandle,
) {
    match queue.leave(player_id).await {
        Ok(()) => debug!(%player_id, "left queue on disconnect"),
        Err(QueueError::NotInQueue(_)) => {}
        Err(e) => debug!(%player_id, error = %e, "queue cleanup failed"),
    }
    registry.release_connection(player_id, handle).await;
}

impl Drop for ClientSession {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        let Some(player_id) = self.player_id else {
            return;
        };
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            return;
        };
        let registry = self.registry.clone();
        let queue = self.queue.clone();
        let handle = self.handle.clone();
        runtime.spawn(async move {
            cleanup(&registry, &queue, player_id, &handle).await;
        });
    }
}

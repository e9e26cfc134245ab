//! The matchmaking coordinator: an actor that owns the [`WaitingQueue`].
//!
//! Joins, leaves, and status requests arrive as commands with a oneshot
//! reply. The actor also runs the pairing pass on its own ticker and
//! receives bot escalations from per-entry timer tasks. Because a single
//! task handles all three, whichever of pairing, leave, or escalation
//! reaches an entry first removes it and the others find nothing to do.
//!
//! ```text
//! QueueHandle ──Join/Leave/Status──▶ ┌─────────────┐
//! timer task ──Escalate{ticket}────▶ │ Coordinator │──▶ SessionRegistry
//! ticker ──────pairing pass────────▶ └─────────────┘──▶ BotDriver
//! ```

use std::time::Duration;

use fourline_bot::{BotConfig, BotDriver, BotExit, BotRoster};
use fourline_protocol::{GameSnapshot, MatchPreferences, PlayerId, ServerMessage};
use fourline_session::{SessionRegistry, SharedHandle};
use fourline_tick::Ticker;
use tokio::sync::{mpsc, oneshot};
use tokio::task::{AbortHandle, JoinSet};
use tokio::time::Instant;
use tracing::{debug, info, trace, warn};

use crate::queue::{Placement, QueueEntry, QueueStats, WaitingQueue};
use crate::{QueueConfig, QueueError};

pub(crate) enum QueueCommand {
    Join {
        player_id: PlayerId,
        name: String,
        preferences: MatchPreferences,
        handle: SharedHandle,
        reply: oneshot::Sender<Result<Placement, QueueError>>,
    },

    Leave {
        player_id: PlayerId,
        reply: oneshot::Sender<Result<(), QueueError>>,
    },

    /// Sent by an entry's timer task when its wait runs out.
    Escalate { player_id: PlayerId, ticket: u64 },

    Status {
        reply: oneshot::Sender<QueueStats>,
    },

    Shutdown,
}

/// Cloneable handle to the running coordinator.
#[derive(Clone)]
pub struct QueueHandle {
    sender: mpsc::Sender<QueueCommand>,
    request_timeout: Duration,
}

impl QueueHandle {
    /// Puts a player in the queue.
    ///
    /// On success `queue_joined` has already been pushed to `handle`, ahead
    /// of any `game_found` for the same player, so callers should not send
    /// their own.
    ///
    /// # Errors
    /// [`QueueError::AlreadyQueued`], [`QueueError::QueueFull`], or
    /// [`QueueError::RequestTimeout`] / [`QueueError::Unavailable`] if the
    /// coordinator does not answer.
    pub async fn join(
        &self,
        player_id: PlayerId,
        name: impl Into<String>,
        preferences: MatchPreferences,
        handle: SharedHandle,
    ) -> Result<Placement, QueueError> {
        let name = name.into();
        self.request(|reply| QueueCommand::Join {
            player_id,
            name,
            preferences,
            handle,
            reply,
        })
        .await?
    }

    /// Takes a player out of the queue and cancels their bot escalation.
    ///
    /// # Errors
    /// [`QueueError::NotInQueue`], or a timeout / unavailable error.
    pub async fn leave(&self, player_id: PlayerId) -> Result<(), QueueError> {
        self.request(|reply| QueueCommand::Leave { player_id, reply })
            .await?
    }

    pub async fn status(&self) -> Result<QueueStats, QueueError> {
        self.request(|reply| QueueCommand::Status { reply }).await
    }

    /// Stops the coordinator. Waiting entries are dropped and running bot
    /// drivers aborted.
    pub async fn shutdown(&self) -> Result<(), QueueError> {
        self.sender
            .send(QueueCommand::Shutdown)
            .await
            .map_err(|_| QueueError::Unavailable)
    }

    /// `false` once the coordinator has stopped.
    pub fn is_running(&self) -> bool {
        !self.sender.is_closed()
    }

    async fn request<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<T>) -> QueueCommand,
    ) -> Result<T, QueueError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        let deadline = Instant::now() + self.request_timeout;
        let exchange = async {
            self.sender
                .send(command(reply_tx))
                .await
                .map_err(|_| QueueError::Unavailable)?;
            reply_rx.await.map_err(|_| QueueError::Unavailable)
        };
        tokio::time::timeout_at(deadline, exchange)
            .await
            .map_err(|_| QueueError::RequestTimeout)?
    }
}

struct Coordinator {
    config: QueueConfig,
    queue: WaitingQueue,
    registry: SessionRegistry,
    bot_config: BotConfig,
    roster: BotRoster,
    drivers: JoinSet<BotExit>,
    receiver: mpsc::Receiver<QueueCommand>,
    timers: mpsc::WeakSender<QueueCommand>,
}

impl Coordinator {
    async fn run(mut self) {
        let mut ticker = Ticker::every(self.config.match_interval).with_label("matchmaking");
        let pair_on_join = ticker.is_disabled();
        info!(capacity = self.config.capacity, "matchmaking coordinator started");

        loop {
            tokio::select! {
                cmd = self.receiver.recv() => match cmd {
                    Some(QueueCommand::Shutdown) | None => break,
                    Some(cmd) => self.handle(cmd, pair_on_join).await,
                },
                _ = ticker.wait_for_tick() => {
                    self.pairing_pass().await;
                    self.reap_drivers();
                    ticker.record_tick_end();
                }
            }
        }

        let dropped = self.queue.len();
        self.queue.clear();
        self.drivers.abort_all();
        info!(dropped, "matchmaking coordinator stopped");
    }

    async fn handle(&mut self, cmd: QueueCommand, pair_on_join: bool) {
        match cmd {
            QueueCommand::Join {
                player_id,
                name,
                preferences,
                handle,
                reply,
            } => {
                let result = self.handle_join(player_id, name, preferences, handle);
                let joined = result.is_ok();
                let _ = reply.send(result);
                if joined && pair_on_join {
                    self.pairing_pass().await;
                }
            }
            QueueCommand::Leave { player_id, reply } => {
                let result = self.queue.remove(player_id).map(|entry| {
                    info!(%player_id, name = %entry.name, "player left queue");
                });
                let _ = reply.send(result);
            }
            QueueCommand::Escalate { player_id, ticket } => {
                self.escalate(player_id, ticket).await;
            }
            QueueCommand::Status { reply } => {
                let _ = reply.send(self.queue.stats());
            }
            QueueCommand::Shutdown => {}
        }
    }

    fn handle_join(
        &mut self,
        player_id: PlayerId,
        name: String,
        preferences: MatchPreferences,
        handle: SharedHandle,
    ) -> Result<Placement, QueueError> {
        let placed = self.queue.insert(
            player_id,
            name,
            preferences,
            handle.clone(),
            Instant::now(),
        )?;
        let joined = ServerMessage::QueueJoined {
            player_id,
            position: placed.position,
            queue_size: placed.queue_size,
        };
        if let Err(e) = handle.send(joined) {
            debug!(%player_id, error = %e, "queue_joined not delivered");
        }
        info!(
            %player_id,
            position = placed.position,
            queue_size = placed.queue_size,
            "player joined queue"
        );

        if self.config.enable_bots && preferences.allow_bots {
            let wait = preferences
                .max_wait_secs
                .filter(|&secs| secs > 0)
                .map_or(self.config.bot_timeout, Duration::from_secs);
            let timer = self.spawn_timer(player_id, placed.ticket, wait);
            self.queue.arm(player_id, placed.ticket, timer);
        }
        Ok(placed)
    }

    fn spawn_timer(&self, player_id: PlayerId, ticket: u64, wait: Duration) -> AbortHandle {
        let weak = self.timers.clone();
        tokio::spawn(async move {
            tokio::time::sleep(wait).await;
            if let Some(sender) = weak.upgrade() {
                let _ = sender.send(QueueCommand::Escalate { player_id, ticket }).await;
            }
        })
        .abort_handle()
    }

    /// Pairs waiting entries until no compatible pair is left.
    async fn pairing_pass(&mut self) {
        trace!(waiting = self.queue.len(), "pairing pass");
        while let Some((first, second)) = self.queue.next_pair(self.config.skill_tolerance) {
            let now = Instant::now();
            self.queue
                .record_match(&[first.waited(now), second.waited(now)], false);
            self.start_human_match(first, second).await;
        }
    }

    async fn start_human_match(&mut self, first: QueueEntry, second: QueueEntry) {
        let snapshot = self
            .registry
            .create_session(first.profile(), second.profile())
            .await;
        info!(
            session_id = %snapshot.id,
            red = %first.player_id,
            yellow = %second.player_id,
            "players matched"
        );

        for entry in [&first, &second] {
            self.seat(entry, &snapshot).await;
        }
    }

    async fn escalate(&mut self, player_id: PlayerId, ticket: u64) {
        let Some(entry) = self.queue.take_if_ticket(player_id, ticket) else {
            debug!(%player_id, ticket, "escalation for an entry already gone");
            return;
        };
        let now = Instant::now();
        self.queue.record_match(&[entry.waited(now)], true);

        let bot = self.roster.next_profile();
        let bot_id = bot.id;
        let bot_name = bot.name.clone();
        let snapshot = self.registry.create_session(entry.profile(), bot).await;
        info!(
            session_id = %snapshot.id,
            %player_id,
            %bot_id,
            bot = %bot_name,
            waited_ms = entry.waited(now).as_millis() as u64,
            "matched with bot"
        );

        self.seat(&entry, &snapshot).await;
        self.drivers.spawn(
            BotDriver::new(
                self.registry.clone(),
                snapshot.id,
                bot_id,
                self.bot_config.clone(),
            )
            .run(),
        );
    }

    /// Binds the entry's handle to its new session and sends `game_found`.
    async fn seat(&self, entry: &QueueEntry, snapshot: &GameSnapshot) {
        if let Err(e) = self
            .registry
            .add_connection(entry.player_id, snapshot.id, entry.handle.clone())
            .await
        {
            warn!(player_id = %entry.player_id, error = %e, "failed to bind matched player");
            return;
        }
        let found = ServerMessage::GameFound {
            session: snapshot.clone(),
            player_id: entry.player_id,
        };
        if let Err(e) = entry.handle.send(found) {
            debug!(player_id = %entry.player_id, error = %e, "game_found not delivered");
        }
    }

    fn reap_drivers(&mut self) {
        while let Some(done) = self.drivers.try_join_next() {
            if let Err(e) = done {
                if e.is_panic() {
                    warn!(error = %e, "bot driver panicked");
                }
            }
        }
    }
}

/// Spawns the coordinator and returns a handle to it.
pub fn spawn_queue(
    config: QueueConfig,
    registry: SessionRegistry,
    bot_config: BotConfig,
) -> QueueHandle {
    let (tx, rx) = mpsc::channel(config.channel_size.max(1));
    let request_timeout = config.request_timeout;

    let coordinator = Coordinator {
        queue: WaitingQueue::new(config.capacity),
        config,
        registry,
        bot_config,
        roster: BotRoster::new(),
        drivers: JoinSet::new(),
        receiver: rx,
        timers: tx.downgrade(),
    };
    tokio::spawn(coordinator.run());

    QueueHandle {
        sender: tx,
        request_timeout,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    fn outbox() -> SharedHandle {
        let (tx, _rx) = mpsc::unbounded_channel::<ServerMessage>();
        Arc::new(tx)
    }

    #[tokio::test(start_paused = true)]
    async fn test_unresponsive_coordinator_returns_request_timeout() {
        // A receiver nobody polls stands in for a stalled coordinator.
        let (tx, _rx) = mpsc::channel(1);
        let handle = QueueHandle {
            sender: tx,
            request_timeout: Duration::from_secs(5),
        };

        let start = Instant::now();
        let err = handle
            .join(PlayerId(1), "alice", MatchPreferences::default(), outbox())
            .await
            .unwrap_err();
        assert_eq!(err, QueueError::RequestTimeout);
        assert!(start.elapsed() >= Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_saturated_channel_returns_request_timeout() {
        let (tx, _rx) = mpsc::channel(1);
        let handle = QueueHandle {
            sender: tx,
            request_timeout: Duration::from_secs(1),
        };
        // Fill the only slot so the next send waits for capacity.
        assert!(handle.sender.send(QueueCommand::Shutdown).await.is_ok());

        let err = handle.leave(PlayerId(1)).await.unwrap_err();
        assert_eq!(err, QueueError::RequestTimeout);
    }

    #[tokio::test]
    async fn test_stopped_coordinator_is_unavailable() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let handle = QueueHandle {
            sender: tx,
            request_timeout: Duration::from_secs(1),
        };
        assert!(!handle.is_running());
        assert_eq!(handle.status().await.unwrap_err(), QueueError::Unavailable);
        assert_eq!(handle.shutdown().await.unwrap_err(), QueueError::Unavailable);
    }
}

//! The per-session bot task.
//!
//! A [`BotDriver`] polls its session on a fixed cadence. When it is the
//! bot's turn it waits a short "thinking" delay, picks a column with
//! [`decide`](crate::decide), and submits the move through the registry
//! like any other player. It stops once the session is over or gone.

use std::time::Duration;

use fourline_protocol::{PlayerId, SessionId};
use fourline_session::{GameError, SessionRegistry};
use fourline_tick::Ticker;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::strategy;

#[derive(Debug, Clone)]
pub struct BotConfig {
    /// How often the driver checks whose turn it is. Must be non-zero.
    pub poll_interval: Duration,
    /// Pause before submitting a move.
    pub think_delay: Duration,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            think_delay: Duration::from_millis(500),
        }
    }
}

/// Why a driver stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BotExit {
    /// The session reached a terminal state.
    Finished,
    /// The session is no longer in the registry.
    SessionGone,
    /// The bot id is not seated in the session.
    NotSeated,
}

pub struct BotDriver {
    registry: SessionRegistry,
    session_id: SessionId,
    bot_id: PlayerId,
    config: BotConfig,
}

impl BotDriver {
    pub fn new(
        registry: SessionRegistry,
        session_id: SessionId,
        bot_id: PlayerId,
        config: BotConfig,
    ) -> Self {
        Self {
            registry,
            session_id,
            bot_id,
            config,
        }
    }

    pub fn spawn(self) -> JoinHandle<BotExit> {
        tokio::spawn(self.run())
    }

    pub async fn run(self) -> BotExit {
        let mut ticker = Ticker::every(self.config.poll_interval).with_label("bot");
        debug!(session_id = %self.session_id, bot_id = %self.bot_id, "bot driver started");

        loop {
            ticker.wait_for_tick().await;
            let step = self.step().await;
            ticker.record_tick_end();

            if let Some(exit) = step {
                info!(
                    session_id = %self.session_id,
                    bot_id = %self.bot_id,
                    ?exit,
                    "bot driver stopped"
                );
                return exit;
            }
        }
    }

    /// One poll. `Some` means the driver should stop.
    async fn step(&self) -> Option<BotExit> {
        let Some(snapshot) = self.registry.snapshot(self.session_id).await else {
            return Some(BotExit::SessionGone);
        };
        if !snapshot.is_playing() {
            return Some(BotExit::Finished);
        }
        let Some(color) = snapshot.color_of(self.bot_id) else {
            return Some(BotExit::NotSeated);
        };
        if !snapshot.is_turn_of(self.bot_id) {
            return None;
        }

        tokio::time::sleep(self.config.think_delay).await;

        let Some(decision) = strategy::decide(&snapshot.board, color, &mut rand::rng()) else {
            return Some(BotExit::Finished);
        };
        debug!(
            session_id = %self.session_id,
            column = decision.column,
            reason = ?decision.reason,
            "bot chose column"
        );

        match self
            .registry
            .make_move(self.session_id, self.bot_id, decision.column)
            .await
        {
            Ok(_) => None,
            Err(GameError::SessionNotFound(_)) => Some(BotExit::SessionGone),
            Err(GameError::SessionNotActive(_)) => Some(BotExit::Finished),
            Err(e) => {
                warn!(session_id = %self.session_id, error = %e, "bot move rejected");
                None
            }
        }
    }
}

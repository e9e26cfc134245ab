//! # Fourline
//!
//! Matchmaking and session server for two-player Connect Four.
//!
//! Players join a queue and are paired with each other, or with a bot if
//! nobody compatible turns up in time. The server owns every game in
//! progress, enforces turns, detects wins and draws, and forfeits games
//! whose player stays disconnected past the grace period.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use fourline::prelude::*;
//! use tokio::sync::mpsc;
//!
//! # async fn run() -> Result<(), FourlineError> {
//! fourline::init_tracing();
//! let server = GameServer::builder().build();
//!
//! let (tx, mut outbox) = mpsc::unbounded_channel::<ServerMessage>();
//! let mut client = server.connect(Arc::new(tx));
//! client
//!     .handle(ClientRequest::JoinQueue {
//!         name: "alice".into(),
//!         preferences: MatchPreferences::default(),
//!     })
//!     .await?;
//! // outbox: queue_joined, then game_found...
//! # Ok(())
//! # }
//! ```

mod config;
mod error;
mod handler;
mod server;

pub use config::{ConfigError, ServerConfig};
pub use error::FourlineError;
pub use handler::{ClientSession, MAX_NAME_LEN};
pub use server::{GameServer, GameServerBuilder};

pub use fourline_board as board;
pub use fourline_bot as bot;
pub use fourline_matchmaking as matchmaking;
pub use fourline_protocol as protocol;
pub use fourline_session as session;
pub use fourline_tick as tick;

/// Installs a `fmt` subscriber filtered by `RUST_LOG` (default `info`).
/// Does nothing if a global subscriber is already set.
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}

pub mod prelude {
    pub use crate::{
        ClientSession, ConfigError, FourlineError, GameServer, GameServerBuilder, ServerConfig,
    };
    pub use fourline_board::{Board, Color};
    pub use fourline_bot::BotConfig;
    pub use fourline_matchmaking::{QueueConfig, QueueError, QueueStats};
    pub use fourline_protocol::{
        ClientRequest, EndReason, ErrorKind, GameSnapshot, GameStatus, MatchPreferences,
        PlayerId, ServerMessage, SessionId,
    };
    pub use fourline_session::{
        EventSink, GameError, GameEvent, GameRecord, MemoryArchive, PlayerHandle, RegistryConfig,
        ResultSink, SessionRegistry,
    };
}

//! `GameServer` builder and lifecycle.
//!
//! The server wires the layers together and owns the background tasks:
//!
//! - the disconnect sweep (registry)
//! - the matchmaking coordinator, which in turn owns the bot drivers
//!
//! It does not listen on a socket. A transport accepts connections, calls
//! [`GameServer::connect`] for each one, and feeds decoded requests to the
//! returned [`ClientSession`].

use std::sync::Arc;

use fourline_matchmaking::{QueueHandle, spawn_queue};
use fourline_session::{
    EventSink, NoopSink, ResultSink, SessionRegistry, SharedHandle, TracingSink,
};
use tokio::task::JoinHandle;

use crate::{ClientSession, ServerConfig};

/// Builder for configuring and starting a Fourline server.
///
/// # Example
///
/// ```rust,no_run
/// use fourline::prelude::*;
///
/// # async fn run() -> Result<(), FourlineError> {
/// let server = GameServer::builder()
///     .config(ServerConfig::from_env()?)
///     .build();
/// // hand `server.connect(handle)` to each accepted connection...
/// server.shutdown().await;
/// # Ok(())
/// # }
/// ```
pub struct GameServerBuilder {
    config: ServerConfig,
    events: Arc<dyn EventSink>,
    results: Arc<dyn ResultSink>,
}

impl GameServerBuilder {
    /// Default config; analytics go to the log, results are discarded.
    pub fn new() -> Self {
        Self {
            config: ServerConfig::default(),
            events: Arc::new(TracingSink),
            results: Arc::new(NoopSink),
        }
    }

    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Where lifecycle events are published.
    pub fn events(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.events = sink;
        self
    }

    /// Where finished games are handed off.
    pub fn results(mut self, sink: Arc<dyn ResultSink>) -> Self {
        self.results = sink;
        self
    }

    /// Starts the background tasks. Must be called inside a Tokio runtime.
    pub fn build(self) -> GameServer {
        let registry =
            SessionRegistry::with_sinks(self.config.registry.clone(), self.events, self.results);
        let sweeper = registry.spawn_sweeper();
        let queue = spawn_queue(
            self.config.queue.clone(),
            registry.clone(),
            self.config.bot.clone(),
        );

        tracing::info!(
            grace_secs = self.config.registry.grace_period.as_secs(),
            bot_timeout_secs = self.config.queue.bot_timeout.as_secs(),
            bots = self.config.queue.enable_bots,
            "fourline server started"
        );

        GameServer {
            registry,
            queue,
            sweeper,
            config: self.config,
        }
    }
}

impl Default for GameServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A running Fourline server.
pub struct GameServer {
    registry: SessionRegistry,
    queue: QueueHandle,
    sweeper: JoinHandle<()>,
    config: ServerConfig,
}

impl GameServer {
    pub fn builder() -> GameServerBuilder {
        GameServerBuilder::new()
    }

    /// A dispatcher for a new connection. Everything for this client is
    /// sent through `handle`.
    pub fn connect(&self, handle: SharedHandle) -> ClientSession {
        ClientSession::new(self.registry.clone(), self.queue.clone(), handle)
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    pub fn queue(&self) -> &QueueHandle {
        &self.queue
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Stops matchmaking (dropping waiting entries and bot drivers) and
    /// the disconnect sweep. Sessions already in memory stay readable
    /// through [`registry`](Self::registry).
    pub async fn shutdown(self) {
        if let Err(e) = self.queue.shutdown().await {
            tracing::debug!(error = %e, "matchmaking already stopped");
        }
        self.sweeper.abort();
        tracing::info!("fourline server stopped");
    }
}

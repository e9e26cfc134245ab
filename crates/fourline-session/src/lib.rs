//! Session registry for Fourline.
//!
//! This crate owns every game in progress:
//!
//! 1. **Turn authority**: [`GameSession`] decides whose move it is and
//!    when the game is over
//! 2. **Connection bindings**: which [`PlayerHandle`] reaches which player
//! 3. **Disconnect grace**: a periodic sweep forfeits games whose player
//!    stayed away too long
//! 4. **Hand-off**: finished games go to a [`ResultSink`], lifecycle
//!    events to an [`EventSink`]
//!
//! # How it fits in the stack
//!
//! ```text
//! Matchmaking / Bot driver / client handlers (above)  ← call the registry
//!     ↕
//! Session Layer (this crate)  ← single writer for game state
//!     ↕
//! Board + Protocol (below)  ← rules and snapshot types
//! ```

mod config;
mod error;
mod game;
mod handle;
mod registry;
mod sinks;
mod store;

pub use config::RegistryConfig;
pub use error::{GameError, HandleError, SinkError};
pub use game::{Ending, GameSession, MoveOutcome, Player, PlayerProfile};
pub use handle::PlayerHandle;
pub use registry::SessionRegistry;
pub use sinks::{EventSink, GameEvent, GameRecord, MemoryArchive, NoopSink, ResultSink, TracingSink};
pub use store::{AppliedMove, Bound, Forfeit, SessionStore, SharedHandle, Unbound};

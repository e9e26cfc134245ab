//! Shared vocabulary for Fourline.
//!
//! This crate defines the types every other layer speaks:
//!
//! - **Identity**: [`PlayerId`], [`SessionId`]
//! - **Snapshots**: [`GameSnapshot`], [`PlayerInfo`], [`Move`], plain
//!   copies of session state that are safe to hand to other tasks
//! - **Client vocabulary**: [`ClientRequest`] in, [`ServerMessage`] out
//!
//! All of it is `serde`-ready, but the encoding is left to whoever owns
//! the transport. Nothing here knows about JSON, sockets, or frames.

mod messages;
mod types;

pub use messages::{ClientRequest, ErrorKind, ServerMessage};
pub use types::{
    EndReason, GameSnapshot, GameStatus, MatchPreferences, Move, PlayerId, PlayerInfo, SessionId,
    unix_millis,
};

//! Matchmaking for Fourline.
//!
//! Waiting players sit in a [`WaitingQueue`] owned by a single coordinator
//! task. Every `match_interval` the coordinator pairs the two oldest
//! compatible entries and creates their session; an entry that waits past
//! its bot timeout is matched with a bot instead, and a
//! [`BotDriver`](fourline_bot::BotDriver) is started for it.
//!
//! Callers talk to the coordinator through a [`QueueHandle`] obtained
//! from [`spawn_queue`]. Every request has a bounded wait.

mod config;
mod coordinator;
mod error;
mod queue;

pub use config::QueueConfig;
pub use coordinator::{QueueHandle, spawn_queue};
pub use error::QueueError;
pub use queue::{Placement, QueueEntry, QueueStats, WaitingQueue};

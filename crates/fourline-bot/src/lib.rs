//! Bot opponent for Fourline.
//!
//! [`decide`] is a pure function of the board; [`BotDriver`] is the task
//! that plays it in a live session, and [`BotRoster`] names the bots.

mod driver;
mod roster;
mod strategy;

pub use driver::{BotConfig, BotDriver, BotExit};
pub use roster::BotRoster;
pub use strategy::{CENTER_ORDER, Decision, Reason, choose_column, decide, winning_column};

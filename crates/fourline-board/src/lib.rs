//! Board rules for Fourline.
//!
//! A 6×7 grid where pieces fall to the lowest empty row of their column
//! and four same-colored cells in a line win. Everything in this crate is
//! pure: no clocks, no I/O, no locking. The session layer owns a [`Board`]
//! per game and serializes access to it.
//!
//! # Coordinates
//!
//! Row 0 is the **top** row, row 5 the bottom. Columns run 0..7 from left
//! to right. This matches how snapshots are rendered to clients.
//!
//! ```text
//!   0 1 2 3 4 5 6
//! 0 . . . . . . .
//! 1 . . . . . . .
//! 2 . . . . . . .
//! 3 . . . . . . .
//! 4 . . . . . . .
//! 5 . . . R Y . .   <- first pieces land here
//! ```

mod board;
mod error;
#[doc(hidden)]
pub mod fixtures;

pub use board::{Board, COLS, CONNECT, Color, Direction, Placement, ROWS, WinLine};
pub use error::BoardError;

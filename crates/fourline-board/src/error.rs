//! Error types for board moves.

use crate::COLS;

/// Why a piece could not be placed.
///
/// Both variants leave the board untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum BoardError {
    /// The column index is outside `0..COLS`.
    #[error("column {0} is out of range (expected 0..{max})", max = COLS)]
    ColumnOutOfRange(usize),

    /// Every row of the column is already occupied.
    #[error("column {0} is full")]
    ColumnFull(usize),
}

//! Column choice for the bot.
//!
//! Priorities, first match wins:
//!
//! 1. **Win**: a column that completes four for the bot
//! 2. **Block**: a column that would complete four for the opponent
//! 3. **Center**: first playable column in [`CENTER_ORDER`]
//! 4. **Random**: any playable column
//!
//! Steps 1 and 2 scan columns in ascending order.

use fourline_board::{Board, COLS, Color};
use rand::Rng;
use rand::seq::IndexedRandom;

/// Column preference when nothing is urgent: middle out.
pub const CENTER_ORDER: [usize; COLS] = [3, 2, 4, 1, 5, 0, 6];

/// Why a column was picked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reason {
    Win,
    Block,
    Center,
    Random,
}

/// A chosen column and the rule that chose it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    pub column: usize,
    pub reason: Reason,
}

/// The lowest column where dropping `color` wins on the spot.
pub fn winning_column(board: &Board, color: Color) -> Option<usize> {
    board.valid_columns().find(|&column| {
        let mut trial = *board;
        trial.apply_move(column, color).is_ok() && trial.check_winner() == Some(color)
    })
}

/// Picks a column for `color`. `None` only if the board is full.
pub fn decide<R: Rng + ?Sized>(board: &Board, color: Color, rng: &mut R) -> Option<Decision> {
    if let Some(column) = winning_column(board, color) {
        return Some(Decision {
            column,
            reason: Reason::Win,
        });
    }
    if let Some(column) = winning_column(board, color.opponent()) {
        return Some(Decision {
            column,
            reason: Reason::Block,
        });
    }
    if let Some(&column) = CENTER_ORDER.iter().find(|&&c| board.is_valid_move(c)) {
        return Some(Decision {
            column,
            reason: Reason::Center,
        });
    }
    let open: Vec<usize> = board.valid_columns().collect();
    open.choose(rng).map(|&column| Decision {
        column,
        reason: Reason::Random,
    })
}

/// [`decide`] with the thread-local RNG, returning just the column.
pub fn choose_column(board: &Board, color: Color) -> Option<usize> {
    decide(board, color, &mut rand::rng()).map(|d| d.column)
}

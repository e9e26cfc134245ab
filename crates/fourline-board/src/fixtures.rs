//! Known positions shared by tests across the workspace.

use crate::{Board, COLS, Color, ROWS};

/// Alternating Red/Yellow columns, Red first, that fill the board without
/// ever producing four in a row.
pub const DRAW_SEQUENCE: [usize; ROWS * COLS] = [
    0, 1, 2, 3, 4, 5, 6, 0, 1, 2, 3, 4, 5, 6, 0, 1, 2, 3, 4, 5, 6, 1, 0, 3, 2, 5, 4, 0, 6, 1, 2,
    3, 4, 5, 6, 0, 1, 2, 3, 4, 5, 6,
];

/// The full, winnerless board [`DRAW_SEQUENCE`] ends on.
pub fn drawn_board() -> Board {
    let mut board = Board::new();
    let mut color = Color::Red;
    for column in DRAW_SEQUENCE {
        // Every column in the sequence has room when it is played.
        let _ = board.apply_move(column, color);
        color = color.opponent();
    }
    board
}

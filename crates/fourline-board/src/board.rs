//! The grid, gravity, and win detection.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::BoardError;

/// Number of rows. Row 0 is the top.
pub const ROWS: usize = 6;

/// Number of columns.
pub const COLS: usize = 7;

/// Pieces in a row needed to win.
pub const CONNECT: usize = 4;

// ---------------------------------------------------------------------------
// Color
// ---------------------------------------------------------------------------

/// The two piece colors. Red always opens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    Red,
    Yellow,
}

impl Color {
    /// The color that moves after this one.
    pub fn opponent(self) -> Self {
        match self {
            Self::Red => Self::Yellow,
            Self::Yellow => Self::Red,
        }
    }

    fn symbol(self) -> char {
        match self {
            Self::Red => 'R',
            Self::Yellow => 'Y',
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Red => write!(f, "red"),
            Self::Yellow => write!(f, "yellow"),
        }
    }
}

// ---------------------------------------------------------------------------
// Placement / WinLine
// ---------------------------------------------------------------------------

/// Where a piece ended up after gravity resolved it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Placement {
    pub row: usize,
    pub column: usize,
    pub color: Color,
}

/// The four scan directions, in the order they are tested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Left to right along a row.
    Horizontal,
    /// Top to bottom along a column.
    Vertical,
    DiagonalDownRight,
    DiagonalDownLeft,
}

impl Direction {
    /// Scan order for every cell. Changing it changes which line
    /// [`Board::winning_line`] reports first.
    pub const SCAN_ORDER: [Direction; 4] = [
        Direction::Horizontal,
        Direction::Vertical,
        Direction::DiagonalDownRight,
        Direction::DiagonalDownLeft,
    ];

    /// `(row step, column step)`.
    fn delta(self) -> (isize, isize) {
        match self {
            Self::Horizontal => (0, 1),
            Self::Vertical => (1, 0),
            Self::DiagonalDownRight => (1, 1),
            Self::DiagonalDownLeft => (1, -1),
        }
    }
}

/// Four connected cells of one color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WinLine {
    pub color: Color,
    pub direction: Direction,
    /// `(row, column)` pairs starting at the scan origin.
    pub cells: [(usize, usize); CONNECT],
}

// ---------------------------------------------------------------------------
// Board
// ---------------------------------------------------------------------------

/// A 6×7 four-in-a-row board.
///
/// The only mutation is [`apply_move`](Self::apply_move), which fills
/// exactly one empty cell. Nothing ever clears or overwrites a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Board {
    cells: [[Option<Color>; COLS]; ROWS],
}

impl Board {
    /// An empty board.
    pub fn new() -> Self {
        Self::default()
    }

    /// The piece at `(row, column)`, or `None` if the cell is empty or
    /// the coordinates are off the board.
    pub fn get(&self, row: usize, column: usize) -> Option<Color> {
        self.cells.get(row)?.get(column).copied().flatten()
    }

    /// Raw grid, row 0 first.
    pub fn rows(&self) -> &[[Option<Color>; COLS]; ROWS] {
        &self.cells
    }

    /// `true` iff `column` is on the board and its top cell is empty.
    pub fn is_valid_move(&self, column: usize) -> bool {
        column < COLS && self.cells[0][column].is_none()
    }

    /// Columns that can still take a piece, ascending.
    pub fn valid_columns(&self) -> impl Iterator<Item = usize> + '_ {
        (0..COLS).filter(|&c| self.is_valid_move(c))
    }

    /// Drops a piece into `column`.
    ///
    /// The piece lands in the lowest empty row, scanning from the bottom
    /// row upward.
    ///
    /// # Errors
    /// - [`BoardError::ColumnOutOfRange`] if `column >= COLS`
    /// - [`BoardError::ColumnFull`] if the column has no empty cell
    pub fn apply_move(&mut self, column: usize, color: Color) -> Result<Placement, BoardError> {
        if column >= COLS {
            return Err(BoardError::ColumnOutOfRange(column));
        }
        let row = (0..ROWS)
            .rev()
            .find(|&r| self.cells[r][column].is_none())
            .ok_or(BoardError::ColumnFull(column))?;

        self.cells[row][column] = Some(color);
        Ok(Placement { row, column, color })
    }

    /// The first four-in-a-row found by a top-to-bottom, left-to-right
    /// scan, testing [`Direction::SCAN_ORDER`] at each occupied cell.
    pub fn winning_line(&self) -> Option<WinLine> {
        for row in 0..ROWS {
            for column in 0..COLS {
                let Some(color) = self.cells[row][column] else {
                    continue;
                };
                for direction in Direction::SCAN_ORDER {
                    if let Some(cells) = self.line_from(row, column, direction, color) {
                        return Some(WinLine {
                            color,
                            direction,
                            cells,
                        });
                    }
                }
            }
        }
        None
    }

    /// Color of the first winning line, if any.
    pub fn check_winner(&self) -> Option<Color> {
        self.winning_line().map(|line| line.color)
    }

    /// `true` iff every column's top cell is occupied.
    pub fn is_full(&self) -> bool {
        self.cells[0].iter().all(Option::is_some)
    }

    /// Number of pieces on the board.
    pub fn piece_count(&self) -> usize {
        self.cells.iter().flatten().filter(|c| c.is_some()).count()
    }

    /// How many pieces are stacked in `column` (0 for out-of-range).
    pub fn column_height(&self, column: usize) -> usize {
        if column >= COLS {
            return 0;
        }
        (0..ROWS).filter(|&r| self.cells[r][column].is_some()).count()
    }

    fn line_from(
        &self,
        row: usize,
        column: usize,
        direction: Direction,
        color: Color,
    ) -> Option<[(usize, usize); CONNECT]> {
        let (dr, dc) = direction.delta();
        let mut cells = [(0, 0); CONNECT];
        for (step, slot) in cells.iter_mut().enumerate() {
            let r = row.checked_add_signed(dr * step as isize)?;
            let c = column.checked_add_signed(dc * step as isize)?;
            if self.get(r, c) != Some(color) {
                return None;
            }
            *slot = (r, c);
        }
        Some(cells)
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, row) in self.cells.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            for (j, cell) in row.iter().enumerate() {
                if j > 0 {
                    write!(f, " ")?;
                }
                write!(f, "{}", cell.map_or('.', Color::symbol))?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{DRAW_SEQUENCE, drawn_board};

    fn play(columns: &[usize]) -> Board {
        let mut board = Board::new();
        let mut color = Color::Red;
        for &c in columns {
            board.apply_move(c, color).expect("legal move");
            color = color.opponent();
        }
        board
    }

    // =====================================================================
    // apply_move
    // =====================================================================

    #[test]
    fn test_apply_move_lands_on_bottom_row() {
        let mut board = Board::new();
        let placed = board.apply_move(3, Color::Red).unwrap();
        assert_eq!(
            placed,
            Placement {
                row: 5,
                column: 3,
                color: Color::Red
            }
        );
        assert_eq!(board.get(5, 3), Some(Color::Red));
        assert_eq!(board.piece_count(), 1);
    }

    #[test]
    fn test_apply_move_stacks_upward() {
        let mut board = Board::new();
        board.apply_move(2, Color::Red).unwrap();
        let second = board.apply_move(2, Color::Yellow).unwrap();
        assert_eq!(second.row, 4);
        assert_eq!(board.column_height(2), 2);
    }

    #[test]
    fn test_apply_move_full_column_rejected() {
        let mut board = Board::new();
        for i in 0..ROWS {
            let color = if i % 2 == 0 { Color::Red } else { Color::Yellow };
            board.apply_move(0, color).unwrap();
        }
        let before = board;
        assert_eq!(
            board.apply_move(0, Color::Red),
            Err(BoardError::ColumnFull(0))
        );
        assert_eq!(board, before);
        assert!(!board.is_valid_move(0));
    }

    #[test]
    fn test_apply_move_out_of_range_rejected() {
        let mut board = Board::new();
        assert_eq!(
            board.apply_move(COLS, Color::Red),
            Err(BoardError::ColumnOutOfRange(COLS))
        );
        assert_eq!(board.piece_count(), 0);
    }

    #[test]
    fn test_occupied_cells_never_change() {
        let mut board = Board::new();
        let mut color = Color::Red;
        for &c in &DRAW_SEQUENCE {
            let before = board;
            let placed = board.apply_move(c, color).unwrap();
            for r in 0..ROWS {
                for col in 0..COLS {
                    if (r, col) == (placed.row, placed.column) {
                        assert_eq!(before.get(r, col), None);
                    } else {
                        assert_eq!(before.get(r, col), board.get(r, col));
                    }
                }
            }
            color = color.opponent();
        }
    }

    // =====================================================================
    // is_valid_move
    // =====================================================================

    #[test]
    fn test_is_valid_move_bounds() {
        let board = Board::new();
        assert!((0..COLS).all(|c| board.is_valid_move(c)));
        assert!(!board.is_valid_move(7));
        assert!(!board.is_valid_move(usize::MAX));
        assert_eq!(board.valid_columns().count(), COLS);
    }

    // =====================================================================
    // check_winner
    // =====================================================================

    #[test]
    fn test_check_winner_bottom_row() {
        let mut board = Board::new();
        for c in 0..3 {
            board.apply_move(c, Color::Red).unwrap();
            assert_eq!(board.check_winner(), None);
        }
        board.apply_move(3, Color::Red).unwrap();
        assert_eq!(board.check_winner(), Some(Color::Red));

        let line = board.winning_line().unwrap();
        assert_eq!(line.direction, Direction::Horizontal);
        assert_eq!(line.cells, [(5, 0), (5, 1), (5, 2), (5, 3)]);
    }

    #[test]
    fn test_check_winner_vertical() {
        // Red stacks column 6, Yellow wastes moves in column 0.
        let board = play(&[6, 0, 6, 0, 6, 0, 6]);
        let line = board.winning_line().unwrap();
        assert_eq!(line.color, Color::Red);
        assert_eq!(line.direction, Direction::Vertical);
        assert_eq!(line.cells[0], (2, 6));
    }

    #[test]
    fn test_check_winner_diagonal_down_right() {
        // Yellow builds a staircase from (2,0) down to (5,3).
        let mut board = Board::new();
        let setup: &[(usize, Color)] = &[
            (0, Color::Red),
            (0, Color::Red),
            (0, Color::Red),
            (0, Color::Yellow),
            (1, Color::Red),
            (1, Color::Red),
            (1, Color::Yellow),
            (2, Color::Red),
            (2, Color::Yellow),
            (3, Color::Yellow),
        ];
        for &(c, color) in setup {
            board.apply_move(c, color).unwrap();
        }
        let line = board.winning_line().unwrap();
        assert_eq!(line.color, Color::Yellow);
        assert_eq!(line.direction, Direction::DiagonalDownRight);
        assert_eq!(line.cells, [(2, 0), (3, 1), (4, 2), (5, 3)]);
    }

    #[test]
    fn test_check_winner_diagonal_down_left() {
        let mut board = Board::new();
        let setup: &[(usize, Color)] = &[
            (6, Color::Red),
            (6, Color::Red),
            (6, Color::Red),
            (6, Color::Yellow),
            (5, Color::Red),
            (5, Color::Red),
            (5, Color::Yellow),
            (4, Color::Red),
            (4, Color::Yellow),
            (3, Color::Yellow),
        ];
        for &(c, color) in setup {
            board.apply_move(c, color).unwrap();
        }
        let line = board.winning_line().unwrap();
        assert_eq!(line.direction, Direction::DiagonalDownLeft);
        assert_eq!(line.cells, [(2, 6), (3, 5), (4, 4), (5, 3)]);
    }

    #[test]
    fn test_check_winner_scan_order_prefers_top_left() {
        // Two lines on one board (not reachable in play): the scan hits
        // Yellow's row 4 line before Red's row 5 line.
        let mut board = Board::new();
        for c in 0..4 {
            board.apply_move(c, Color::Red).unwrap();
            board.apply_move(c, Color::Yellow).unwrap();
        }
        assert_eq!(board.check_winner(), Some(Color::Yellow));
    }

    #[test]
    fn test_check_winner_independent_of_move_order() {
        let a = play(&[0, 0, 1, 1, 2, 2]);
        let b = play(&[2, 2, 0, 0, 1, 1]);
        assert_eq!(a, b);
        assert_eq!(a.check_winner(), b.check_winner());
        assert_eq!(a.check_winner(), None);
    }

    // =====================================================================
    // is_full
    // =====================================================================

    #[test]
    fn test_draw_sequence_fills_board_without_winner() {
        let mut board = Board::new();
        let mut color = Color::Red;
        for &c in &DRAW_SEQUENCE {
            assert!(!board.is_full());
            board.apply_move(c, color).unwrap();
            assert_eq!(board.check_winner(), None);
            color = color.opponent();
        }
        assert!(board.is_full());
        assert_eq!(board.piece_count(), ROWS * COLS);
        assert_eq!(board.valid_columns().count(), 0);
        assert_eq!(board, drawn_board());
    }

    #[test]
    fn test_display_renders_rows_top_first() {
        let board = play(&[3]);
        let text = board.to_string();
        let last = text.lines().last().unwrap();
        assert_eq!(last, ". . . R . . .");
        assert_eq!(text.lines().count(), ROWS);
    }

    #[test]
    fn test_color_serializes_lowercase() {
        assert_eq!(Color::Red.to_string(), "red");
        assert_eq!(Color::Yellow.opponent(), Color::Red);
    }
}

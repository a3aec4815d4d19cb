//! The Connect 4 grid: dropping pieces and spotting four in a row.
//!
//! Row 0 is the top of the board, so a piece dropped into an empty
//! column lands in row `ROWS - 1`.

use std::fmt;

use serde::{Deserialize, Serialize};

pub const ROWS: usize = 6;
pub const COLUMNS: usize = 7;

/// Highest valid slot (column) index.
pub const MAX_SLOT: usize = COLUMNS - 1;

/// Four of the same piece in a line wins.
const WINNING_RUN: usize = 4;

/// Contents of one cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Piece {
    #[default]
    Unclaimed,
    Red,
    Black,
}

impl Piece {
    fn symbol(self) -> char {
        match self {
            Piece::Unclaimed => '-',
            Piece::Red => 'R',
            Piece::Black => 'B',
        }
    }
}

/// A rejected drop.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BoardError {
    #[error("slot {0} exceeds the slot maximum of {max}", max = MAX_SLOT)]
    SlotOutOfRange(usize),

    #[error("slot {0} is full and cannot accept another piece")]
    ColumnFull(usize),
}

/// What a move did to the game.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameResult {
    Won,
    NotWon,
}

/// A 6 × 7 grid, serialized as an array of rows from top to bottom.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Board {
    cells: [[Piece; COLUMNS]; ROWS],
}

impl Board {
    /// An empty board.
    pub fn new() -> Self {
        Self::default()
    }

    /// A board with the given contents, top row first.
    pub fn from_rows(cells: [[Piece; COLUMNS]; ROWS]) -> Self {
        Self { cells }
    }

    pub fn rows(&self) -> &[[Piece; COLUMNS]; ROWS] {
        &self.cells
    }

    /// The piece at (`row`, `slot`), or `None` off the board.
    pub fn get(&self, row: usize, slot: usize) -> Option<Piece> {
        self.cells.get(row).and_then(|r| r.get(slot)).copied()
    }

    /// Drops `piece` into `slot` and returns the row it landed in.
    ///
    /// # Errors
    /// [`BoardError::SlotOutOfRange`] past the last column,
    /// [`BoardError::ColumnFull`] when the column has no free cell.
    /// The board is unchanged on error.
    pub fn drop_piece(&mut self, piece: Piece, slot: usize) -> Result<usize, BoardError> {
        if slot > MAX_SLOT {
            return Err(BoardError::SlotOutOfRange(slot));
        }
        let row = (0..ROWS)
            .rev()
            .find(|&row| self.cells[row][slot] == Piece::Unclaimed)
            .ok_or(BoardError::ColumnFull(slot))?;
        self.cells[row][slot] = piece;
        Ok(row)
    }

    /// Checks whether the piece at (`row`, `slot`) completes a run of four
    /// vertically, horizontally, or on either diagonal.
    ///
    /// An unclaimed or off-board cell never wins.
    pub fn analyze_move(&self, slot: usize, row: usize) -> GameResult {
        let piece = match self.get(row, slot) {
            None | Some(Piece::Unclaimed) => return GameResult::NotWon,
            Some(piece) => piece,
        };

        // (column step, row step) for each line through the cell.
        const LINES: [(isize, isize); 4] = [(0, 1), (1, 0), (1, 1), (-1, 1)];

        for (dx, dy) in LINES {
            let run = 1 + self.run_length(piece, slot, row, dx, dy)
                + self.run_length(piece, slot, row, -dx, -dy);
            if run >= WINNING_RUN {
                return GameResult::Won;
            }
        }
        GameResult::NotWon
    }

    /// `true` once every cell holds a piece.
    pub fn is_full(&self) -> bool {
        self.cells.iter().flatten().all(|&p| p != Piece::Unclaimed)
    }

    /// Counts consecutive `piece`s starting next to (`row`, `slot`) and
    /// walking in direction (`dx`, `dy`), up to three.
    fn run_length(&self, piece: Piece, slot: usize, row: usize, dx: isize, dy: isize) -> usize {
        (1..WINNING_RUN as isize)
            .map_while(|i| {
                let x = slot.checked_add_signed(dx * i)?;
                let y = row.checked_add_signed(dy * i)?;
                (self.get(y, x)? == piece).then_some(())
            })
            .count()
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in &self.cells {
            write!(f, "[")?;
            for piece in row {
                write!(f, " {}", piece.symbol())?;
            }
            writeln!(f, " ]")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const X: Piece = Piece::Unclaimed;
    const R: Piece = Piece::Red;
    const B: Piece = Piece::Black;

    const EMPTY: [[Piece; COLUMNS]; ROWS] = [[X; COLUMNS]; ROWS];

    // =====================================================================
    // drop_piece
    // =====================================================================

    #[test]
    fn test_drop_piece_empty_first_column() {
        let mut board = Board::new();
        assert_eq!(board.drop_piece(R, 0), Ok(5));
        assert_eq!(board.get(5, 0), Some(R));
    }

    #[test]
    fn test_drop_piece_empty_last_column() {
        let mut board = Board::new();
        assert_eq!(board.drop_piece(R, 6), Ok(5));
        assert_eq!(board.get(5, 6), Some(R));
    }

    #[test]
    fn test_drop_piece_stacks_on_same_color() {
        let mut rows = EMPTY;
        rows[5] = [B, B, B, B, X, X, X];
        let mut board = Board::from_rows(rows);

        assert_eq!(board.drop_piece(B, 3), Ok(4));

        rows[4][3] = B;
        assert_eq!(board, Board::from_rows(rows));
    }

    #[test]
    fn test_drop_piece_stacks_on_other_color() {
        let mut rows = EMPTY;
        rows[5] = [B, B, B, R, X, X, X];
        let mut board = Board::from_rows(rows);

        assert_eq!(board.drop_piece(B, 3), Ok(4));
        assert_eq!(board.get(4, 3), Some(B));
        assert_eq!(board.get(5, 3), Some(R));
    }

    #[test]
    fn test_drop_piece_full_column_leaves_board_unchanged() {
        let rows = [
            [B, X, X, X, X, X, X],
            [B, X, X, X, X, X, X],
            [B, X, X, X, X, X, X],
            [B, X, X, X, X, X, X],
            [B, X, X, X, X, X, X],
            [B, B, B, R, X, X, X],
        ];
        let mut board = Board::from_rows(rows);

        let err = board.drop_piece(B, 0).unwrap_err();

        assert_eq!(err, BoardError::ColumnFull(0));
        assert_eq!(err.to_string(), "slot 0 is full and cannot accept another piece");
        assert_eq!(board, Board::from_rows(rows));
    }

    #[test]
    fn test_drop_piece_slot_too_high() {
        let mut board = Board::new();
        let err = board.drop_piece(B, COLUMNS).unwrap_err();
        assert_eq!(err, BoardError::SlotOutOfRange(7));
        assert_eq!(err.to_string(), "slot 7 exceeds the slot maximum of 6");
        assert_eq!(board, Board::new());
    }

    // =====================================================================
    // analyze_move
    // =====================================================================

    #[test]
    fn test_analyze_unclaimed_cell_never_wins() {
        assert_eq!(Board::new().analyze_move(3, 5), GameResult::NotWon);
    }

    #[test]
    fn test_analyze_off_board_never_wins() {
        assert_eq!(Board::new().analyze_move(COLUMNS, ROWS), GameResult::NotWon);
    }

    #[test]
    fn test_analyze_horizontal_win_from_either_end_or_middle() {
        let mut rows = EMPTY;
        rows[5] = [X, R, R, R, R, X, X];
        let board = Board::from_rows(rows);
        for slot in 1..=4 {
            assert_eq!(board.analyze_move(slot, 5), GameResult::Won, "slot {slot}");
        }
    }

    #[test]
    fn test_analyze_three_in_a_row_is_not_a_win() {
        let mut rows = EMPTY;
        rows[5] = [R, R, R, B, X, X, X];
        let board = Board::from_rows(rows);
        assert_eq!(board.analyze_move(2, 5), GameResult::NotWon);
    }

    #[test]
    fn test_analyze_vertical_win() {
        let mut rows = EMPTY;
        for row in 2..6 {
            rows[row][6] = B;
        }
        let board = Board::from_rows(rows);
        assert_eq!(board.analyze_move(6, 2), GameResult::Won);
        assert_eq!(board.analyze_move(6, 5), GameResult::Won);
    }

    #[test]
    fn test_analyze_rising_diagonal_win() {
        let board = Board::from_rows([
            [X, X, X, X, X, X, X],
            [X, X, X, X, X, X, X],
            [X, X, X, R, X, X, X],
            [X, X, R, B, X, X, X],
            [X, R, B, B, X, X, X],
            [R, B, B, R, X, X, X],
        ]);
        assert_eq!(board.analyze_move(0, 5), GameResult::Won);
        assert_eq!(board.analyze_move(3, 2), GameResult::Won);
        assert_eq!(board.analyze_move(2, 3), GameResult::Won);
    }

    #[test]
    fn test_analyze_falling_diagonal_win() {
        let board = Board::from_rows([
            [X, X, X, X, X, X, X],
            [X, X, X, X, X, X, X],
            [X, X, X, B, X, X, X],
            [X, X, X, R, B, X, X],
            [X, X, X, R, R, B, X],
            [X, X, X, R, R, R, B],
        ]);
        assert_eq!(board.analyze_move(6, 5), GameResult::Won);
        assert_eq!(board.analyze_move(3, 2), GameResult::Won);
    }

    #[test]
    fn test_analyze_run_broken_by_other_color() {
        let mut rows = EMPTY;
        rows[5] = [R, R, B, R, R, X, X];
        let board = Board::from_rows(rows);
        assert_eq!(board.analyze_move(4, 5), GameResult::NotWon);
    }

    // =====================================================================
    // misc
    // =====================================================================

    #[test]
    fn test_is_full_after_every_column_filled() {
        let mut board = Board::new();
        assert!(!board.is_full());
        for slot in 0..COLUMNS {
            for _ in 0..ROWS {
                board.drop_piece(R, slot).unwrap();
            }
        }
        assert!(board.is_full());
    }

    #[test]
    fn test_display_renders_rows_top_down() {
        let mut board = Board::new();
        board.drop_piece(R, 0).unwrap();
        board.drop_piece(B, 6).unwrap();
        let rendered = board.to_string();
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines.len(), ROWS);
        assert_eq!(lines[0], "[ - - - - - - - ]");
        assert_eq!(lines[5], "[ R - - - - - B ]");
    }

    #[test]
    fn test_board_serializes_as_rows_of_names() {
        let mut board = Board::new();
        board.drop_piece(R, 1).unwrap();
        let json = serde_json::to_value(&board).unwrap();
        assert_eq!(json.as_array().unwrap().len(), ROWS);
        assert_eq!(json[5][1], "Red");
        assert_eq!(json[0][0], "Unclaimed");
    }
}

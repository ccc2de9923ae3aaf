//! The 6x7 Connect Four grid and win/draw detection.

use serde::{Deserialize, Serialize};

pub const ROWS: usize = 6;
pub const COLS: usize = 7;

/// The four axes a run of four can lie on, as (row, col) steps.
const AXES: [(i64, i64); 4] = [(0, 1), (1, 0), (1, 1), (1, -1)];

/// 6 rows x 7 columns; row 0 is the top, pieces fall toward row 5.
/// A cell holds the id of the player who placed there, or None.
/// Serializes as the plain 2D array the clients and the games table use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Board(pub [[Option<i64>; COLS]; ROWS]);

impl Board {
    pub fn empty() -> Self {
        Board([[None; COLS]; ROWS])
    }

    pub fn cell(&self, row: usize, col: usize) -> Option<i64> {
        self.0[row][col]
    }

    /// The lowest unoccupied row of a column, scanning from the bottom up.
    /// None means the column is full.
    pub fn lowest_empty_row(&self, col: usize) -> Option<usize> {
        (0..ROWS).rev().find(|&row| self.0[row][col].is_none())
    }

    pub fn place(&mut self, row: usize, col: usize, player: i64) {
        self.0[row][col] = Some(player);
    }

    pub fn is_full(&self) -> bool {
        self.0[0].iter().all(|cell| cell.is_some())
    }

    /// Whether the piece just placed at (row, col) completes a run of four.
    ///
    /// Scans the 7-cell window centered on the placed cell along each axis,
    /// counting consecutive cells owned by `player` and resetting on any
    /// gap or opponent piece.
    pub fn is_winning_cell(&self, row: usize, col: usize, player: i64) -> bool {
        AXES.iter()
            .any(|&(row_step, col_step)| self.longest_run(row, col, row_step, col_step, player) >= 4)
    }

    fn longest_run(&self, row: usize, col: usize, row_step: i64, col_step: i64, player: i64) -> u32 {
        let mut best = 0u32;
        let mut run = 0u32;
        for i in -3i64..=3 {
            let r = row as i64 + i * row_step;
            let c = col as i64 + i * col_step;
            let owned = (0..ROWS as i64).contains(&r)
                && (0..COLS as i64).contains(&c)
                && self.0[r as usize][c as usize] == Some(player);
            if owned {
                run += 1;
                best = best.max(run);
            } else {
                run = 0;
            }
        }
        best
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).expect("board serialization should not fail")
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Drop a piece the way a move would: lowest empty row of the column.
    fn drop(board: &mut Board, col: usize, player: i64) -> usize {
        let row = board.lowest_empty_row(col).expect("column full");
        board.place(row, col, player);
        row
    }

    #[test]
    fn test_pieces_stack_from_the_bottom() {
        let mut board = Board::empty();
        assert_eq!(drop(&mut board, 3, 1), 5);
        assert_eq!(drop(&mut board, 3, 2), 4);
        assert_eq!(drop(&mut board, 3, 1), 3);
        assert_eq!(board.cell(5, 3), Some(1));
        assert_eq!(board.cell(4, 3), Some(2));
    }

    #[test]
    fn test_full_column_has_no_empty_row() {
        let mut board = Board::empty();
        for _ in 0..ROWS {
            drop(&mut board, 0, 1);
        }
        assert_eq!(board.lowest_empty_row(0), None);
    }

    #[test]
    fn test_horizontal_win_detected_on_completing_piece() {
        let mut board = Board::empty();
        for col in 0..3 {
            let row = drop(&mut board, col, 7);
            assert!(!board.is_winning_cell(row, col, 7));
        }
        let row = drop(&mut board, 3, 7);
        assert!(board.is_winning_cell(row, 3, 7));
    }

    #[test]
    fn test_horizontal_win_detected_from_middle_of_run() {
        // Place c0 c1 c3, then fill the gap at c2 — the run is completed
        // by a piece that is not at either end.
        let mut board = Board::empty();
        for col in [0, 1, 3] {
            drop(&mut board, col, 7);
        }
        let row = drop(&mut board, 2, 7);
        assert!(board.is_winning_cell(row, 2, 7));
    }

    #[test]
    fn test_vertical_win() {
        let mut board = Board::empty();
        let mut last = 0;
        for _ in 0..4 {
            last = drop(&mut board, 6, 9);
        }
        assert!(board.is_winning_cell(last, 6, 9));
    }

    #[test]
    fn test_diagonal_wins_both_directions() {
        // Rising diagonal for player 1: (5,0) (4,1) (3,2) (2,3)
        let mut board = Board::empty();
        for (i, col) in (0..4).enumerate() {
            for _ in 0..i {
                drop(&mut board, col, 2); // filler from player 2
            }
            let row = drop(&mut board, col, 1);
            if col == 3 {
                assert!(board.is_winning_cell(row, col, 1));
            } else {
                assert!(!board.is_winning_cell(row, col, 1));
            }
        }

        // Falling diagonal for player 2: (2,0) (3,1) (4,2) (5,3)
        let mut board = Board::empty();
        for (i, col) in (0..4).enumerate() {
            for _ in 0..(3 - i) {
                drop(&mut board, col, 1);
            }
            let row = drop(&mut board, col, 2);
            if col == 3 {
                assert!(board.is_winning_cell(row, col, 2));
            } else {
                assert!(!board.is_winning_cell(row, col, 2));
            }
        }
    }

    #[test]
    fn test_opponent_piece_breaks_the_run() {
        // 1 1 2 1 1 on the bottom row — no window of four for player 1.
        let mut board = Board::empty();
        for (col, player) in [(0, 1), (1, 1), (2, 2), (3, 1), (4, 1)] {
            drop(&mut board, col, player);
        }
        for col in [0, 1, 3, 4] {
            assert!(!board.is_winning_cell(5, col, 1));
        }
    }

    #[test]
    fn test_three_in_a_row_is_not_a_win() {
        let mut board = Board::empty();
        for col in 0..3 {
            drop(&mut board, col, 1);
        }
        assert!(!board.is_winning_cell(5, 1, 1));
    }

    #[test]
    fn test_json_roundtrip() {
        let mut board = Board::empty();
        drop(&mut board, 2, 11);
        drop(&mut board, 2, 12);
        let json = board.to_json();
        assert_eq!(Board::from_json(&json).unwrap(), board);
        // Wire format is the plain nested array, empty cells as null
        assert!(json.starts_with("[["));
        assert!(json.contains("null"));
    }
}

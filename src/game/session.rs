//! One game's authoritative state and the turn/win protocol.

use crate::db::models::{GameRow, GameStatus};
use crate::game::board::{Board, COLS};

/// Why a move was rejected. Reported to the originating connection only,
/// never broadcast.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveError {
    NotYourTurn,
    InvalidColumn,
    ColumnFull,
    GameAlreadyOver,
}

impl MoveError {
    pub fn reason(&self) -> &'static str {
        match self {
            Self::NotYourTurn => "It is not your turn",
            Self::InvalidColumn => "Column is out of range",
            Self::ColumnFull => "Column is full",
            Self::GameAlreadyOver => "Game is already over",
        }
    }
}

/// What a validated move did to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    /// Piece placed, turn passed to the other player.
    Placed { row: usize, col: usize },
    /// Piece placed and it completed a run of four.
    Won { row: usize, col: usize },
    /// Piece placed, no winner, and the board is now full.
    Drawn { row: usize, col: usize },
}

/// Authoritative state of one game. The live-game table holds one of these
/// per active game behind a per-game mutex; the persisted row in the games
/// table is the durable copy used for reconnects.
#[derive(Debug, Clone)]
pub struct GameSession {
    pub game_id: i64,
    pub player1_id: i64,
    pub player2_id: i64,
    pub board: Board,
    pub current_turn: i64,
    pub status: GameStatus,
    pub winner_id: Option<i64>,
}

impl GameSession {
    pub fn from_row(row: &GameRow) -> Result<Self, String> {
        let board = Board::from_json(&row.board)
            .map_err(|e| format!("Corrupt board for game {}: {}", row.game_id, e))?;
        Ok(Self {
            game_id: row.game_id,
            player1_id: row.player1_id,
            player2_id: row.player2_id,
            board,
            current_turn: row.current_turn,
            status: row.status,
            winner_id: row.winner_id,
        })
    }

    fn other_player(&self, player: i64) -> i64 {
        if player == self.player1_id {
            self.player2_id
        } else {
            self.player1_id
        }
    }

    /// Validate and apply one move.
    ///
    /// The identity check runs before anything else, so a third party that
    /// replays a move message is rejected with NotYourTurn — its id never
    /// equals the turn pointer.
    pub fn apply_move(&mut self, acting_user: i64, column: i64) -> Result<MoveOutcome, MoveError> {
        if self.status.is_terminal() {
            return Err(MoveError::GameAlreadyOver);
        }
        if acting_user != self.current_turn {
            return Err(MoveError::NotYourTurn);
        }
        if !(0..COLS as i64).contains(&column) {
            return Err(MoveError::InvalidColumn);
        }
        let col = column as usize;
        let row = self.board.lowest_empty_row(col).ok_or(MoveError::ColumnFull)?;

        self.board.place(row, col, acting_user);

        if self.board.is_winning_cell(row, col, acting_user) {
            self.status = GameStatus::Won;
            self.winner_id = Some(acting_user);
            return Ok(MoveOutcome::Won { row, col });
        }

        if self.board.is_full() {
            self.status = GameStatus::Drawn;
            return Ok(MoveOutcome::Drawn { row, col });
        }

        self.current_turn = self.other_player(acting_user);
        Ok(MoveOutcome::Placed { row, col })
    }
}

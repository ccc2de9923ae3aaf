//! Live game coordination: one mutex per game serializes moves, the games
//! table stays the durable copy, and every applied move is relayed to the
//! game room.

pub mod board;
pub mod session;

use axum::{extract::State, http::StatusCode, Json};
use dashmap::DashMap;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::db::store;
use crate::game::session::{GameSession, MoveError, MoveOutcome};
use crate::state::AppState;
use crate::ws::protocol::ServerEvent;
use crate::ws::rooms::{self, RoomKey};

/// Live game table: game id -> session behind a per-game mutex.
/// Holding the mutex across the whole read-validate-persist-relay sequence
/// is what keeps two racing moves from both passing the turn check.
pub type LiveGames = Arc<DashMap<i64, Arc<Mutex<GameSession>>>>;

pub fn new_live_games() -> LiveGames {
    Arc::new(DashMap::new())
}

/// Why a move request failed end to end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoveFailure {
    GameNotFound,
    Rejected(MoveError),
    Persistence(String),
}

impl MoveFailure {
    pub fn reason(&self) -> String {
        match self {
            Self::GameNotFound => "Game was not found!".to_string(),
            Self::Rejected(e) => e.reason().to_string(),
            Self::Persistence(_) => "Failed to save move".to_string(),
        }
    }
}

/// The live session for a game, loading from the store on first touch.
/// Terminal games are not cached: a move against one reports
/// GameAlreadyOver straight from the persisted record.
async fn live_session(
    state: &AppState,
    game_id: i64,
) -> Result<Arc<Mutex<GameSession>>, MoveFailure> {
    if let Some(entry) = state.games.get(&game_id) {
        return Ok(entry.clone());
    }

    let db = state.db.clone();
    let row = tokio::task::spawn_blocking(move || {
        let conn = db
            .lock()
            .map_err(|e| format!("DB lock: {}", e))?;
        store::load_game(&conn, game_id).map_err(|e| e.to_string())
    })
    .await
    .map_err(|e| MoveFailure::Persistence(e.to_string()))?
    .map_err(MoveFailure::Persistence)?
    .ok_or(MoveFailure::GameNotFound)?;

    let session = GameSession::from_row(&row).map_err(MoveFailure::Persistence)?;
    if session.status.is_terminal() {
        return Err(MoveFailure::Rejected(MoveError::GameAlreadyOver));
    }

    Ok(state
        .games
        .entry(game_id)
        .or_insert_with(|| Arc::new(Mutex::new(session)))
        .clone())
}

/// Validate, persist, and relay one move.
///
/// The session is advanced on a copy; the stored state only moves forward
/// after the save succeeds, so a persistence failure is reported to the
/// mover and nothing is broadcast. The winning (or drawing) piece is
/// relayed as a move event before the terminal event so every board in the
/// room renders it.
pub async fn make_move(
    state: &AppState,
    acting_user: i64,
    game_id: i64,
    column: i64,
) -> Result<(), MoveFailure> {
    let entry = live_session(state, game_id).await?;
    let mut guard = entry.lock().await;

    let mut next = guard.clone();
    let outcome = next
        .apply_move(acting_user, column)
        .map_err(MoveFailure::Rejected)?;

    let db = state.db.clone();
    let board_json = next.board.to_json();
    let current_turn = next.current_turn;
    let winner_id = next.winner_id;
    tokio::task::spawn_blocking(move || {
        let conn = db.lock().map_err(|e| format!("DB lock: {}", e))?;
        store::save_game_state(&conn, game_id, &board_json, current_turn)
            .map_err(|e| e.to_string())?;
        match outcome {
            MoveOutcome::Won { .. } => {
                if let Some(winner_id) = winner_id {
                    store::save_winner(&conn, game_id, winner_id).map_err(|e| e.to_string())?;
                }
            }
            MoveOutcome::Drawn { .. } => {
                store::save_draw(&conn, game_id).map_err(|e| e.to_string())?;
            }
            MoveOutcome::Placed { .. } => {}
        }
        Ok::<_, String>(())
    })
    .await
    .map_err(|e| MoveFailure::Persistence(e.to_string()))?
    .map_err(MoveFailure::Persistence)?;

    let terminal = next.status.is_terminal();
    *guard = next;

    // Relay while still holding the game mutex so room members observe
    // moves in the order they were committed.
    let (row, col) = match outcome {
        MoveOutcome::Placed { row, col }
        | MoveOutcome::Won { row, col }
        | MoveOutcome::Drawn { row, col } => (row, col),
    };
    rooms::relay(
        &state.rooms,
        RoomKey::Game(game_id),
        &ServerEvent::Move {
            game_id,
            row,
            col,
            placed_by: acting_user,
        },
    );
    match outcome {
        MoveOutcome::Won { .. } => {
            if let Some(winner_id) = winner_id {
                rooms::relay(
                    &state.rooms,
                    RoomKey::Game(game_id),
                    &ServerEvent::Winner { game_id, winner_id },
                );
                tracing::info!(game_id, winner_id, "Game won");
            }
        }
        MoveOutcome::Drawn { .. } => {
            rooms::relay(
                &state.rooms,
                RoomKey::Game(game_id),
                &ServerEvent::Draw { game_id },
            );
            tracing::info!(game_id, "Game drawn");
        }
        MoveOutcome::Placed { .. } => {}
    }
    drop(guard);

    if terminal {
        state.games.remove(&game_id);
    }

    Ok(())
}

// --- HTTP endpoint (board reload for the game screen / reconnects) ---

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameInformationRequest {
    pub game_id: i64,
}

/// POST /getGameInformation — the persisted game record, board included.
pub async fn get_game_information(
    State(state): State<AppState>,
    Json(req): Json<GameInformationRequest>,
) -> Result<Json<serde_json::Value>, (StatusCode, Json<serde_json::Value>)> {
    let db = state.db.clone();
    let game_id = req.game_id;

    let row = tokio::task::spawn_blocking(move || {
        let conn = db.lock().map_err(|e| format!("DB lock: {}", e))?;
        store::load_game(&conn, game_id).map_err(|e| e.to_string())
    })
    .await
    .map_err(|e| e.to_string())
    .and_then(|r| r)
    .map_err(|e| {
        tracing::warn!(game_id, error = %e, "getGameInformation failed");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "An error occured getting the game board!" })),
        )
    })?;

    let row = row.ok_or((
        StatusCode::NOT_FOUND,
        Json(json!({ "error": "Game was not found!" })),
    ))?;

    let board: serde_json::Value = serde_json::from_str(&row.board).map_err(|e| {
        tracing::error!(game_id, error = %e, "Corrupt board in games table");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "An error occured getting the game board!" })),
        )
    })?;

    Ok(Json(json!({
        "message": {
            "game_state": board,
            "player1_id": row.player1_id,
            "player2_id": row.player2_id,
            "current_turn": row.current_turn,
            "winner_id": row.winner_id,
            "status": row.status.as_str(),
        }
    })))
}

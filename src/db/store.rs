//! Storage collaborator for the coordination core: user, session, lobby
//! message, challenge, and game queries over the shared SQLite connection.
//!
//! All functions are synchronous and take a locked `Connection` — callers
//! hold the pool lock inside `tokio::task::spawn_blocking`.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use crate::db::models::{ChallengeRow, ChallengeStatus, GameRow, GameStatus, UserRow};

// --- Users ---

pub fn create_user(
    conn: &Connection,
    username: &str,
    password_hash: &str,
    now: DateTime<Utc>,
) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO users (username, password, created_at) VALUES (?1, ?2, ?3)",
        params![username, password_hash, now.to_rfc3339()],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn user_by_username(conn: &Connection, username: &str) -> rusqlite::Result<Option<UserRow>> {
    conn.query_row(
        "SELECT user_id, username, password, created_at FROM users WHERE username = ?1",
        params![username],
        |row| {
            Ok(UserRow {
                user_id: row.get(0)?,
                username: row.get(1)?,
                password: row.get(2)?,
                created_at: row.get(3)?,
            })
        },
    )
    .optional()
}

pub fn username_by_id(conn: &Connection, user_id: i64) -> rusqlite::Result<Option<String>> {
    conn.query_row(
        "SELECT username FROM users WHERE user_id = ?1",
        params![user_id],
        |row| row.get(0),
    )
    .optional()
}

pub fn all_usernames(conn: &Connection) -> rusqlite::Result<Vec<(i64, String)>> {
    let mut stmt = conn.prepare("SELECT user_id, username FROM users ORDER BY user_id")?;
    let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
    rows.collect()
}

// --- Sessions ---

pub fn create_session(
    conn: &Connection,
    user_id: i64,
    token: &str,
    expires_at: DateTime<Utc>,
    now: DateTime<Utc>,
) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO sessions (user_id, token, expires_at, created_at) VALUES (?1, ?2, ?3, ?4)",
        params![user_id, token, expires_at.to_rfc3339(), now.to_rfc3339()],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Look up the stored token for a non-expired session. Absence means the
/// session does not exist or has expired.
pub fn stored_session_token(
    conn: &Connection,
    session_id: i64,
    user_id: i64,
    now: DateTime<Utc>,
) -> rusqlite::Result<Option<String>> {
    conn.query_row(
        "SELECT token FROM sessions WHERE session_id = ?1 AND user_id = ?2 AND expires_at > ?3",
        params![session_id, user_id, now.to_rfc3339()],
        |row| row.get(0),
    )
    .optional()
}

// --- Lobby messages ---

pub fn append_lobby_message(
    conn: &Connection,
    sender_id: i64,
    message: &str,
    sent_at: DateTime<Utc>,
) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO lobby_messages (sender_id, message, sent_at) VALUES (?1, ?2, ?3)",
        params![sender_id, message, sent_at.to_rfc3339()],
    )?;
    Ok(conn.last_insert_rowid())
}

// --- Challenges ---

pub fn create_challenge(
    conn: &Connection,
    sender_id: i64,
    recipient_id: i64,
    now: DateTime<Utc>,
) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO challenges (sender_id, recipient_id, status, created_at)
         VALUES (?1, ?2, 'pending', ?3)",
        params![sender_id, recipient_id, now.to_rfc3339()],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn load_challenge(
    conn: &Connection,
    challenge_id: i64,
) -> rusqlite::Result<Option<ChallengeRow>> {
    conn.query_row(
        "SELECT challenge_id, sender_id, recipient_id, status, created_at
         FROM challenges WHERE challenge_id = ?1",
        params![challenge_id],
        |row| {
            let status_str: String = row.get(3)?;
            let status = ChallengeStatus::from_str(&status_str).ok_or_else(|| {
                rusqlite::Error::FromSqlConversionFailure(
                    3,
                    rusqlite::types::Type::Text,
                    format!("unknown challenge status: {}", status_str).into(),
                )
            })?;
            Ok(ChallengeRow {
                challenge_id: row.get(0)?,
                sender_id: row.get(1)?,
                recipient_id: row.get(2)?,
                status,
                created_at: row.get(4)?,
            })
        },
    )
    .optional()
}

/// Transition a pending challenge to a terminal state. Returns false when
/// the challenge was not pending — the atomic guard for the state machine
/// (a second reply must not overwrite the first).
pub fn update_challenge_status(
    conn: &Connection,
    challenge_id: i64,
    status: ChallengeStatus,
) -> rusqlite::Result<bool> {
    let changed = conn.execute(
        "UPDATE challenges SET status = ?1 WHERE challenge_id = ?2 AND status = 'pending'",
        params![status.as_str(), challenge_id],
    )?;
    Ok(changed > 0)
}

// --- Games ---

pub fn create_game(
    conn: &Connection,
    player1_id: i64,
    player2_id: i64,
    current_turn: i64,
    created_at: DateTime<Utc>,
    board_json: &str,
) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO games (player1_id, player2_id, board, current_turn, status, created_at)
         VALUES (?1, ?2, ?3, ?4, 'active', ?5)",
        params![
            player1_id,
            player2_id,
            board_json,
            current_turn,
            created_at.to_rfc3339()
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn load_game(conn: &Connection, game_id: i64) -> rusqlite::Result<Option<GameRow>> {
    conn.query_row(
        "SELECT game_id, player1_id, player2_id, board, current_turn, status, winner_id, created_at
         FROM games WHERE game_id = ?1",
        params![game_id],
        |row| {
            let status_str: String = row.get(5)?;
            let status = GameStatus::from_str(&status_str).ok_or_else(|| {
                rusqlite::Error::FromSqlConversionFailure(
                    5,
                    rusqlite::types::Type::Text,
                    format!("unknown game status: {}", status_str).into(),
                )
            })?;
            Ok(GameRow {
                game_id: row.get(0)?,
                player1_id: row.get(1)?,
                player2_id: row.get(2)?,
                board: row.get(3)?,
                current_turn: row.get(4)?,
                status,
                winner_id: row.get(6)?,
                created_at: row.get(7)?,
            })
        },
    )
    .optional()
}

pub fn save_game_state(
    conn: &Connection,
    game_id: i64,
    board_json: &str,
    current_turn: i64,
) -> rusqlite::Result<bool> {
    let changed = conn.execute(
        "UPDATE games SET board = ?1, current_turn = ?2 WHERE game_id = ?3",
        params![board_json, current_turn, game_id],
    )?;
    Ok(changed > 0)
}

pub fn save_winner(conn: &Connection, game_id: i64, winner_id: i64) -> rusqlite::Result<bool> {
    let changed = conn.execute(
        "UPDATE games SET winner_id = ?1, status = 'won' WHERE game_id = ?2",
        params![winner_id, game_id],
    )?;
    Ok(changed > 0)
}

pub fn save_draw(conn: &Connection, game_id: i64) -> rusqlite::Result<bool> {
    let changed = conn.execute(
        "UPDATE games SET status = 'drawn' WHERE game_id = ?1",
        params![game_id],
    )?;
    Ok(changed > 0)
}

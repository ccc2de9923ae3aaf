//! Lobby chat: persist first, then relay to every lobby member.
//!
//! The order matters — a message that failed to reach the chat log is
//! reported to the sender and never broadcast, so the log stays consistent
//! with what everyone saw.

use chrono::Utc;

use crate::db::store;
use crate::state::AppState;
use crate::ws::protocol::ServerEvent;
use crate::ws::rooms::{self, RoomKey};
use crate::ws::ConnectionSender;

pub async fn broadcast_chat(state: &AppState, sender_id: i64, text: String, tx: &ConnectionSender) {
    let db = state.db.clone();
    let message = text.clone();

    let persisted = tokio::task::spawn_blocking(move || {
        let conn = db.lock().map_err(|e| format!("DB lock: {}", e))?;
        store::append_lobby_message(&conn, sender_id, &message, Utc::now())
            .map_err(|e| e.to_string())
    })
    .await;

    match persisted {
        Ok(Ok(_)) => {
            rooms::relay(
                &state.rooms,
                RoomKey::Lobby,
                &ServerEvent::LobbyChat { sender_id, text },
            );
        }
        Ok(Err(e)) => {
            tracing::warn!(sender_id, error = %e, "Failed to persist lobby message");
            rooms::send_error(tx, "Failed to save message");
        }
        Err(e) => {
            tracing::warn!(sender_id, error = %e, "Lobby persist task failed");
            rooms::send_error(tx, "Failed to save message");
        }
    }
}

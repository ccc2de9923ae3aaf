use axum::{
    extract::{
        ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade},
        ConnectInfo, Query, State,
    },
    http::HeaderMap,
    response::Response,
};
use chrono::Utc;
use serde::Deserialize;
use std::net::SocketAddr;

use crate::auth::session;
use crate::db::store;
use crate::state::AppState;
use crate::ws::actor;

/// Query parameters for the WebSocket connection. Auth is the session
/// issued at login, passed as query params since WS upgrades carry no body.
#[derive(Debug, Deserialize)]
pub struct WsAuthQuery {
    pub user_id: i64,
    pub session_id: i64,
}

/// WebSocket close codes:
/// 4001 = session expired or unknown
/// 4002 = session invalid (token mismatch)
const CLOSE_SESSION_EXPIRED: u16 = 4001;
const CLOSE_SESSION_INVALID: u16 = 4002;

/// GET /ws?user_id=&session_id=
/// WebSocket upgrade endpoint. Validates the session against the store,
/// recomputing the token from the client address.
/// On auth failure, upgrades then immediately closes with the close code.
/// On success, spawns an actor for the connection.
pub async fn ws_upgrade(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Query(params): Query<WsAuthQuery>,
    ws: WebSocketUpgrade,
) -> Response {
    let ip = session::client_ip(&headers, &addr);

    let db = state.db.clone();
    let user_id = params.user_id;
    let session_id = params.session_id;

    let lookup = tokio::task::spawn_blocking(move || {
        let conn = db.lock().map_err(|e| format!("DB lock: {}", e))?;
        let username = store::username_by_id(&conn, user_id).map_err(|e| e.to_string())?;
        let stored = store::stored_session_token(&conn, session_id, user_id, Utc::now())
            .map_err(|e| e.to_string())?;
        Ok::<_, String>((username, stored))
    })
    .await;

    let verdict = match lookup {
        Ok(Ok((Some(username), Some(stored)))) => {
            if stored == session::session_token(&ip, user_id, &username) {
                Ok(username)
            } else {
                Err((CLOSE_SESSION_INVALID, "Session invalid"))
            }
        }
        Ok(Ok(_)) => Err((CLOSE_SESSION_EXPIRED, "Session expired or unknown")),
        _ => Err((CLOSE_SESSION_INVALID, "Session check failed")),
    };

    match verdict {
        Ok(username) => {
            tracing::info!(user_id, %username, "WebSocket connection authenticated");
            ws.on_upgrade(move |socket| handle_authenticated(socket, state, user_id, username))
        }
        Err((close_code, reason)) => {
            tracing::warn!(user_id, close_code, reason, "WebSocket auth failed");

            // Upgrade the connection, then immediately close with the error code
            ws.on_upgrade(move |mut socket| async move {
                let close_frame = CloseFrame {
                    code: close_code,
                    reason: reason.into(),
                };
                let _ = socket.send(Message::Close(Some(close_frame))).await;
            })
        }
    }
}

/// Handle an authenticated WebSocket connection by spawning the actor.
async fn handle_authenticated(socket: WebSocket, state: AppState, user_id: i64, username: String) {
    actor::run_connection(socket, state, user_id, username).await;
}

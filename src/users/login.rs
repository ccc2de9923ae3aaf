use axum::{
    extract::{ConnectInfo, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use std::net::SocketAddr;

use crate::auth::{password, session};
use crate::db::store;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// POST /login
/// Verify the password and issue a session bound to the client address.
pub async fn login(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Json(req): Json<LoginRequest>,
) -> Result<Json<serde_json::Value>, (StatusCode, Json<serde_json::Value>)> {
    if req.password.is_empty() {
        return Err((
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": "Please enter a password!" })),
        ));
    }
    let username = password::validate_username(&req.username)
        .ok_or((
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": "Username or password incorrect!" })),
        ))?
        .to_string();

    let ip = session::client_ip(&headers, &addr);

    let db = state.db.clone();
    let candidate = req.password.clone();
    let result = tokio::task::spawn_blocking(move || {
        let conn = db.lock().map_err(|e| format!("DB lock: {}", e))?;

        let user = match store::user_by_username(&conn, &username).map_err(|e| e.to_string())? {
            Some(user) => user,
            None => return Ok(None),
        };
        if !password::verify_password(&candidate, &user.password) {
            return Ok(None);
        }

        let now = Utc::now();
        let token = session::session_token(&ip, user.user_id, &user.username);
        let session_id =
            store::create_session(&conn, user.user_id, &token, session::session_expiry(now), now)
                .map_err(|e| e.to_string())?;

        Ok::<_, String>(Some((user.user_id, session_id)))
    })
    .await
    .map_err(|e| e.to_string())
    .and_then(|r| r)
    .map_err(|e| {
        tracing::error!(error = %e, "login failed");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "Internal Server Error Occured" })),
        )
    })?;

    match result {
        Some((user_id, session_id)) => {
            tracing::info!(user_id, session_id, "Login succeeded");
            Ok(Json(
                json!({ "message": { "userId": user_id, "sessionId": session_id } }),
            ))
        }
        None => Err((
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": "Username or password incorrect!" })),
        )),
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckSessionRequest {
    pub user_id: i64,
    pub session_id: i64,
}

/// POST /checkSession
/// Recompute the session token from the caller's address and compare it
/// to the stored one. Success returns the username for the id.
pub async fn check_session(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Json(req): Json<CheckSessionRequest>,
) -> Result<Json<serde_json::Value>, (StatusCode, Json<serde_json::Value>)> {
    let ip = session::client_ip(&headers, &addr);

    let db = state.db.clone();
    let result = tokio::task::spawn_blocking(move || {
        let conn = db.lock().map_err(|e| format!("DB lock: {}", e))?;
        let username = store::username_by_id(&conn, req.user_id).map_err(|e| e.to_string())?;
        let stored = store::stored_session_token(&conn, req.session_id, req.user_id, Utc::now())
            .map_err(|e| e.to_string())?;
        Ok::<_, String>((username, stored))
    })
    .await
    .map_err(|e| e.to_string())
    .and_then(|r| r)
    .map_err(|e| {
        tracing::error!(error = %e, "checkSession failed");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "An error occured on the server!" })),
        )
    })?;

    match result {
        (Some(username), Some(stored))
            if stored == session::session_token(&ip, req.user_id, &username) =>
        {
            Ok(Json(json!({ "message": username })))
        }
        _ => Err((
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": "Session is not verified!" })),
        )),
    }
}

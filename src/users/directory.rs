use axum::{extract::State, http::StatusCode, Json};
use serde::Deserialize;
use serde_json::json;

use crate::db::store;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetUsernameRequest {
    pub user_id: i64,
}

/// POST /getUsername — resolve one user id to its username.
pub async fn get_username(
    State(state): State<AppState>,
    Json(req): Json<GetUsernameRequest>,
) -> Result<Json<serde_json::Value>, (StatusCode, Json<serde_json::Value>)> {
    let db = state.db.clone();
    let username = tokio::task::spawn_blocking(move || {
        let conn = db.lock().map_err(|e| format!("DB lock: {}", e))?;
        store::username_by_id(&conn, req.user_id).map_err(|e| e.to_string())
    })
    .await
    .map_err(|e| e.to_string())
    .and_then(|r| r)
    .map_err(|e| {
        tracing::error!(error = %e, "getUsername failed");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "An error occurred on the server" })),
        )
    })?;

    match username {
        Some(username) => Ok(Json(json!({ "message": username }))),
        None => Err((
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "No user found!" })),
        )),
    }
}

/// GET /usernames — every registered user, for the challenge dropdown.
pub async fn list_usernames(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, (StatusCode, Json<serde_json::Value>)> {
    let db = state.db.clone();
    let users = tokio::task::spawn_blocking(move || {
        let conn = db.lock().map_err(|e| format!("DB lock: {}", e))?;
        store::all_usernames(&conn).map_err(|e| e.to_string())
    })
    .await
    .map_err(|e| e.to_string())
    .and_then(|r| r)
    .map_err(|e| {
        tracing::error!(error = %e, "usernames failed");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "An error occurred on the server" })),
        )
    })?;

    let users: Vec<serde_json::Value> = users
        .into_iter()
        .map(|(user_id, username)| json!({ "user_id": user_id, "username": username }))
        .collect();

    Ok(Json(json!({ "message": users })))
}

use axum::{extract::State, http::StatusCode, Json};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;

use crate::auth::password;
use crate::db::store;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAccountRequest {
    pub username: String,
    pub password: String,
    pub confirm_password: String,
}

/// POST /createAccount
/// Validate the username and password pair, hash, and insert the user.
pub async fn create_account(
    State(state): State<AppState>,
    Json(req): Json<CreateAccountRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>), (StatusCode, Json<serde_json::Value>)> {
    if req.password.is_empty() || req.confirm_password.is_empty() {
        return Err((
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": "Passwords are blank!" })),
        ));
    }
    if req.password != req.confirm_password {
        return Err((
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": "Passwords are not matching!" })),
        ));
    }
    let username = password::validate_username(&req.username)
        .ok_or((
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": "Username is not valid!" })),
        ))?
        .to_string();

    let db = state.db.clone();
    let plaintext = req.password.clone();
    let result = tokio::task::spawn_blocking(move || {
        // Bcrypt is deliberately slow; keep it off the async threads.
        let password_hash = password::hash_password(&plaintext)?;

        let conn = db.lock().map_err(|e| format!("DB lock: {}", e))?;

        // Check username uniqueness before inserting
        if store::user_by_username(&conn, &username)
            .map_err(|e| e.to_string())?
            .is_some()
        {
            return Ok(None);
        }

        let user_id =
            store::create_user(&conn, &username, &password_hash, Utc::now()).map_err(|e| e.to_string())?;
        Ok::<_, String>(Some(user_id))
    })
    .await
    .map_err(|e| e.to_string())
    .and_then(|r| r)
    .map_err(|e| {
        tracing::error!(error = %e, "createAccount failed");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "An error occurred on the server" })),
        )
    })?;

    match result {
        Some(user_id) => {
            tracing::info!(user_id, "Account created");
            Ok((
                StatusCode::CREATED,
                Json(json!({ "message": { "userId": user_id } })),
            ))
        }
        None => Err((
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Username already exists" })),
        )),
    }
}

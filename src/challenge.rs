//! The challenge handshake: propose, accept, decline.
//!
//! A challenge is persisted pending, delivered live to the recipient when
//! they are online, and moved to exactly one terminal state by the reply.
//! Accepting creates the game and notifies both parties; declining
//! notifies the original sender only.

use axum::{extract::State, http::StatusCode, Json};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;

use crate::db::models::ChallengeStatus;
use crate::db::store;
use crate::game::board::Board;
use crate::state::AppState;
use crate::ws::protocol::{ChallengeReply, ServerEvent};
use crate::ws::rooms;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChallengeError {
    /// No challenge with that id.
    NotFound,
    /// The challenged user does not exist.
    RecipientUnknown,
    /// Already accepted or declined; a second reply must not overwrite.
    NotPending,
    /// Over the live channel only the challenged user may reply.
    NotRecipient,
    Persistence(String),
}

impl ChallengeError {
    pub fn reason(&self) -> String {
        match self {
            Self::NotFound => "Challenge was not found!".to_string(),
            Self::RecipientUnknown => "Challenger not found!".to_string(),
            Self::NotPending => "Challenge is not pending".to_string(),
            Self::NotRecipient => "Only the challenged user can reply".to_string(),
            Self::Persistence(_) => "Failed to save challenge".to_string(),
        }
    }
}

/// What an accepted challenge produced.
#[derive(Debug, Clone, Copy)]
pub struct AcceptedChallenge {
    pub challenge_id: i64,
    pub game_id: i64,
    pub player1_id: i64,
    pub player2_id: i64,
}

/// Persist a pending challenge and deliver the offer to the recipient's
/// current connection. An offline recipient is not an error: the challenge
/// is recorded, just not deliverable right now.
pub async fn propose(
    state: &AppState,
    sender_id: i64,
    recipient_id: i64,
    text: String,
) -> Result<i64, ChallengeError> {
    let db = state.db.clone();

    let challenge_id = tokio::task::spawn_blocking(move || {
        let conn = db
            .lock()
            .map_err(|e| ChallengeError::Persistence(format!("DB lock: {}", e)))?;
        if store::username_by_id(&conn, recipient_id)
            .map_err(|e| ChallengeError::Persistence(e.to_string()))?
            .is_none()
        {
            return Err(ChallengeError::RecipientUnknown);
        }
        store::create_challenge(&conn, sender_id, recipient_id, Utc::now())
            .map_err(|e| ChallengeError::Persistence(e.to_string()))
    })
    .await
    .map_err(|e| ChallengeError::Persistence(e.to_string()))??;

    let delivered = rooms::send_to_user(
        &state.connections,
        recipient_id,
        &ServerEvent::ChallengeOffer {
            challenge_id,
            sender_id,
            text,
        },
    );
    if !delivered {
        tracing::debug!(
            challenge_id,
            recipient_id,
            "Recipient offline, challenge persisted undelivered"
        );
    }

    Ok(challenge_id)
}

/// Reply over the live channel. The actor knows who is replying, so a
/// reply from anyone but the challenged user is rejected here before the
/// state machine runs.
pub async fn reply(
    state: &AppState,
    acting_user: i64,
    challenge_id: i64,
    reply: ChallengeReply,
) -> Result<(), ChallengeError> {
    let row = load(state, challenge_id).await?;
    if row.recipient_id != acting_user {
        return Err(ChallengeError::NotRecipient);
    }

    match reply {
        ChallengeReply::Accept => accept(state, challenge_id).await.map(|_| ()),
        ChallengeReply::Decline => decline(state, challenge_id).await.map(|_| ()),
    }
}

/// Transition to accepted and create the game: player1 is the original
/// sender, player2 the recipient, player1 to move on an empty board.
/// The status flip and the game insert commit in one transaction. Both
/// parties that are online are notified.
pub async fn accept(
    state: &AppState,
    challenge_id: i64,
) -> Result<AcceptedChallenge, ChallengeError> {
    let db = state.db.clone();

    let accepted = tokio::task::spawn_blocking(move || {
        let mut conn = db
            .lock()
            .map_err(|e| ChallengeError::Persistence(format!("DB lock: {}", e)))?;
        let tx = conn
            .transaction()
            .map_err(|e| ChallengeError::Persistence(e.to_string()))?;

        let row = store::load_challenge(&tx, challenge_id)
            .map_err(|e| ChallengeError::Persistence(e.to_string()))?
            .ok_or(ChallengeError::NotFound)?;

        if !store::update_challenge_status(&tx, challenge_id, ChallengeStatus::Accepted)
            .map_err(|e| ChallengeError::Persistence(e.to_string()))?
        {
            return Err(ChallengeError::NotPending);
        }

        let game_id = store::create_game(
            &tx,
            row.sender_id,
            row.recipient_id,
            row.sender_id,
            Utc::now(),
            &Board::empty().to_json(),
        )
        .map_err(|e| ChallengeError::Persistence(e.to_string()))?;

        tx.commit()
            .map_err(|e| ChallengeError::Persistence(e.to_string()))?;

        Ok(AcceptedChallenge {
            challenge_id,
            game_id,
            player1_id: row.sender_id,
            player2_id: row.recipient_id,
        })
    })
    .await
    .map_err(|e| ChallengeError::Persistence(e.to_string()))??;

    let event = ServerEvent::ChallengeAccepted {
        challenge_id: accepted.challenge_id,
        game_id: accepted.game_id,
        player1_id: accepted.player1_id,
        player2_id: accepted.player2_id,
    };
    rooms::send_to_user(&state.connections, accepted.player1_id, &event);
    rooms::send_to_user(&state.connections, accepted.player2_id, &event);

    tracing::info!(
        challenge_id,
        game_id = accepted.game_id,
        "Challenge accepted, game created"
    );

    Ok(accepted)
}

/// Transition to declined and notify the original sender, if online.
pub async fn decline(state: &AppState, challenge_id: i64) -> Result<(), ChallengeError> {
    let db = state.db.clone();

    let row = tokio::task::spawn_blocking(move || {
        let conn = db
            .lock()
            .map_err(|e| ChallengeError::Persistence(format!("DB lock: {}", e)))?;
        let row = store::load_challenge(&conn, challenge_id)
            .map_err(|e| ChallengeError::Persistence(e.to_string()))?
            .ok_or(ChallengeError::NotFound)?;
        if !store::update_challenge_status(&conn, challenge_id, ChallengeStatus::Declined)
            .map_err(|e| ChallengeError::Persistence(e.to_string()))?
        {
            return Err(ChallengeError::NotPending);
        }
        Ok(row)
    })
    .await
    .map_err(|e| ChallengeError::Persistence(e.to_string()))??;

    rooms::send_to_user(
        &state.connections,
        row.sender_id,
        &ServerEvent::ChallengeDeclined {
            challenge_id,
            decliner_id: row.recipient_id,
        },
    );

    Ok(())
}

async fn load(
    state: &AppState,
    challenge_id: i64,
) -> Result<crate::db::models::ChallengeRow, ChallengeError> {
    let db = state.db.clone();
    tokio::task::spawn_blocking(move || {
        let conn = db
            .lock()
            .map_err(|e| ChallengeError::Persistence(format!("DB lock: {}", e)))?;
        store::load_challenge(&conn, challenge_id)
            .map_err(|e| ChallengeError::Persistence(e.to_string()))?
            .ok_or(ChallengeError::NotFound)
    })
    .await
    .map_err(|e| ChallengeError::Persistence(e.to_string()))?
}

// --- HTTP endpoints (the out-of-band surface the lobby screen uses) ---

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendChallengeRequest {
    pub user_id: i64,
    pub challenger_id: i64,
}

/// POST /sendChallenge — persist a challenge from userId to challengerId
/// and deliver the offer if the recipient is online.
pub async fn send_challenge(
    State(state): State<AppState>,
    Json(req): Json<SendChallengeRequest>,
) -> Result<Json<serde_json::Value>, (StatusCode, Json<serde_json::Value>)> {
    match propose(&state, req.user_id, req.challenger_id, String::new()).await {
        Ok(challenge_id) => Ok(Json(json!({ "message": challenge_id }))),
        Err(ChallengeError::RecipientUnknown) => Err((
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "Challenger not found!" })),
        )),
        Err(e) => {
            tracing::warn!(error = ?e, "sendChallenge failed");
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "An error occured on the server!" })),
            ))
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChallengeResponseRequest {
    pub challenge_id: i64,
    pub reply: String,
}

/// POST /challengeResponse — accept or decline by challenge id.
pub async fn challenge_response(
    State(state): State<AppState>,
    Json(req): Json<ChallengeResponseRequest>,
) -> Result<Json<serde_json::Value>, (StatusCode, Json<serde_json::Value>)> {
    let outcome = match req.reply.as_str() {
        "accept" => accept(&state, req.challenge_id)
            .await
            .map(|a| json!({ "message": { "gameId": a.game_id } })),
        "decline" => decline(&state, req.challenge_id)
            .await
            .map(|_| json!({ "message": true })),
        _ => {
            return Err((
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": "There was an error sending the reply!" })),
            ))
        }
    };

    match outcome {
        Ok(body) => Ok(Json(body)),
        Err(ChallengeError::NotFound) => Err((
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "Challenge was not found!" })),
        )),
        Err(ChallengeError::NotPending) => Err((
            StatusCode::CONFLICT,
            Json(json!({ "error": "Challenge is not pending" })),
        )),
        Err(e) => {
            tracing::warn!(error = ?e, "challengeResponse failed");
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "An error occured on the server!" })),
            ))
        }
    }
}

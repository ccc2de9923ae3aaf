//! The real-time event surface: JSON text frames tagged by `action`.
//!
//! Inbound frames decode to [`ClientEvent`] and are dispatched to the
//! lobby, challenge, and game coordinators; outbound traffic is a
//! [`ServerEvent`] serialized once and fanned out by the room router.

use serde::{Deserialize, Serialize};

use crate::challenge;
use crate::game;
use crate::lobby;
use crate::state::AppState;
use crate::ws::rooms::{self, RoomKey};
use crate::ws::ConnectionSender;

/// Events a client may send.
#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum ClientEvent {
    #[serde(rename_all = "camelCase")]
    Register { user_id: i64 },
    #[serde(rename_all = "camelCase")]
    LobbyChat { text: String },
    #[serde(rename_all = "camelCase")]
    ProposeChallenge {
        recipient_id: i64,
        #[serde(default)]
        text: String,
    },
    #[serde(rename_all = "camelCase")]
    ReplyChallenge {
        challenge_id: i64,
        reply: ChallengeReply,
    },
    #[serde(rename_all = "camelCase")]
    JoinGameRoom { game_id: i64 },
    #[serde(rename_all = "camelCase")]
    LeaveGameRoom { game_id: i64 },
    #[serde(rename_all = "camelCase")]
    GameChat { game_id: i64, text: String },
    #[serde(rename_all = "camelCase")]
    MakeMove { game_id: i64, column: i64 },
}

/// The recipient's answer to a challenge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChallengeReply {
    Accept,
    Decline,
}

/// Events the server sends.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum ServerEvent {
    #[serde(rename_all = "camelCase")]
    LobbyChat { sender_id: i64, text: String },
    #[serde(rename_all = "camelCase")]
    ChallengeOffer {
        challenge_id: i64,
        sender_id: i64,
        text: String,
    },
    #[serde(rename_all = "camelCase")]
    ChallengeAccepted {
        challenge_id: i64,
        game_id: i64,
        player1_id: i64,
        player2_id: i64,
    },
    #[serde(rename_all = "camelCase")]
    ChallengeDeclined {
        challenge_id: i64,
        decliner_id: i64,
    },
    #[serde(rename_all = "camelCase")]
    GameChat {
        game_id: i64,
        sender_id: i64,
        text: String,
    },
    #[serde(rename_all = "camelCase")]
    Move {
        game_id: i64,
        row: usize,
        col: usize,
        placed_by: i64,
    },
    #[serde(rename_all = "camelCase")]
    Winner { game_id: i64, winner_id: i64 },
    #[serde(rename_all = "camelCase")]
    Draw { game_id: i64 },
    Error { reason: String },
}

/// Handle an incoming text frame: decode the event and dispatch.
/// `current_game` is the actor's game-room membership (at most one).
pub async fn handle_text_message(
    text: &str,
    tx: &ConnectionSender,
    state: &AppState,
    user_id: i64,
    conn_id: u64,
    current_game: &mut Option<i64>,
) {
    let event: ClientEvent = match serde_json::from_str(text) {
        Ok(event) => event,
        Err(e) => {
            tracing::debug!(user_id, error = %e, "Failed to decode client event");
            rooms::send_error(tx, format!("Invalid message: {}", e));
            return;
        }
    };

    dispatch_event(event, tx, state, user_id, conn_id, current_game).await;
}

async fn dispatch_event(
    event: ClientEvent,
    tx: &ConnectionSender,
    state: &AppState,
    user_id: i64,
    conn_id: u64,
    current_game: &mut Option<i64>,
) {
    match event {
        ClientEvent::Register { user_id: requested } => {
            // The session was authenticated at upgrade; a register for any
            // other identity is rejected rather than honored.
            if requested == user_id {
                crate::ws::register(&state.connections, user_id, conn_id, tx.clone());
            } else {
                rooms::send_error(tx, "Cannot register as another user");
            }
        }
        ClientEvent::LobbyChat { text } => {
            lobby::broadcast_chat(state, user_id, text, tx).await;
        }
        ClientEvent::ProposeChallenge { recipient_id, text } => {
            if let Err(e) = challenge::propose(state, user_id, recipient_id, text).await {
                rooms::send_error(tx, e.reason());
            }
        }
        ClientEvent::ReplyChallenge {
            challenge_id,
            reply,
        } => {
            if let Err(e) = challenge::reply(state, user_id, challenge_id, reply).await {
                rooms::send_error(tx, e.reason());
            }
        }
        ClientEvent::JoinGameRoom { game_id } => {
            // A connection is in at most one game room; joining another
            // leaves the previous one.
            if let Some(previous) = current_game.take() {
                if previous != game_id {
                    rooms::leave(&state.rooms, RoomKey::Game(previous), conn_id);
                }
            }
            rooms::join(&state.rooms, RoomKey::Game(game_id), conn_id, tx.clone());
            *current_game = Some(game_id);
        }
        ClientEvent::LeaveGameRoom { game_id } => {
            if *current_game == Some(game_id) {
                rooms::leave(&state.rooms, RoomKey::Game(game_id), conn_id);
                *current_game = None;
            } else {
                rooms::send_error(tx, "User is not in the specified game room");
            }
        }
        ClientEvent::GameChat { game_id, text } => {
            if *current_game == Some(game_id) {
                rooms::relay(
                    &state.rooms,
                    RoomKey::Game(game_id),
                    &ServerEvent::GameChat {
                        game_id,
                        sender_id: user_id,
                        text,
                    },
                );
            } else {
                rooms::send_error(tx, "Game room does not exist");
            }
        }
        ClientEvent::MakeMove { game_id, column } => {
            if *current_game != Some(game_id) {
                rooms::send_error(tx, "Game room does not exist");
                return;
            }
            if let Err(e) = game::make_move(state, user_id, game_id, column).await {
                rooms::send_error(tx, e.reason());
            }
        }
    }
}

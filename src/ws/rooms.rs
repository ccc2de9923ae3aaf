//! Room membership and relay: the lobby plus one room per game.
//!
//! A room is a relay scope, nothing more — membership does not require a
//! registered user id, and relaying to an empty room is a silent success.
//! Every relay is a full-room broadcast including the sender: clients
//! render from the relayed event, not from their local action.

use dashmap::DashMap;
use std::sync::Arc;

use crate::ws::protocol::ServerEvent;
use crate::ws::{ConnectionRegistry, ConnectionSender};

/// Relay scope key: the shared lobby or a specific game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RoomKey {
    Lobby,
    Game(i64),
}

/// One connection's membership in a room.
#[derive(Clone)]
pub struct RoomMember {
    pub conn_id: u64,
    pub tx: ConnectionSender,
}

/// Room registry: room key -> connections currently joined.
pub type RoomRegistry = Arc<DashMap<RoomKey, Vec<RoomMember>>>;

/// Create a new empty room registry.
pub fn new_room_registry() -> RoomRegistry {
    Arc::new(DashMap::new())
}

/// Add a connection to a room. Joining twice is a no-op.
pub fn join(rooms: &RoomRegistry, key: RoomKey, conn_id: u64, tx: ConnectionSender) {
    let mut members = rooms.entry(key).or_default();
    if !members.iter().any(|m| m.conn_id == conn_id) {
        members.push(RoomMember { conn_id, tx });
    }
    tracing::debug!(?key, conn_id, members = members.len(), "Joined room");
}

/// Remove a connection from a room. An emptied game room is garbage
/// collected; rejoining later creates a fresh set. The lobby entry stays.
pub fn leave(rooms: &RoomRegistry, key: RoomKey, conn_id: u64) {
    let mut remove_room = false;

    if let Some(mut members) = rooms.get_mut(&key) {
        members.retain(|m| m.conn_id != conn_id);
        if members.is_empty() && key != RoomKey::Lobby {
            remove_room = true;
        }
    }

    if remove_room {
        rooms.remove(&key);
    }

    tracing::debug!(?key, conn_id, "Left room");
}

/// Send an event to every current member of a room. Zero members is a
/// silent success. Send failures mean the receiving actor is already
/// tearing down; membership is cleaned up there.
pub fn relay(rooms: &RoomRegistry, key: RoomKey, event: &ServerEvent) {
    let json = match serde_json::to_string(event) {
        Ok(json) => json,
        Err(_) => return,
    };
    let msg = axum::extract::ws::Message::Text(json.into());

    if let Some(members) = rooms.get(&key) {
        for member in members.iter() {
            let _ = member.tx.send(msg.clone());
        }
    }
}

/// Send an event to one specific user via the connection registry.
/// Returns false when the user has no current connection (offline).
pub fn send_to_user(registry: &ConnectionRegistry, user_id: i64, event: &ServerEvent) -> bool {
    let json = match serde_json::to_string(event) {
        Ok(json) => json,
        Err(_) => return false,
    };

    match crate::ws::lookup(registry, user_id) {
        Some(tx) => tx
            .send(axum::extract::ws::Message::Text(json.into()))
            .is_ok(),
        None => false,
    }
}

/// Send an event to one connection directly.
pub fn send_to_conn(tx: &ConnectionSender, event: &ServerEvent) {
    if let Ok(json) = serde_json::to_string(event) {
        let _ = tx.send(axum::extract::ws::Message::Text(json.into()));
    }
}

/// Report an error to one connection only — validation failures are never
/// broadcast.
pub fn send_error(tx: &ConnectionSender, reason: impl Into<String>) {
    send_to_conn(
        tx,
        &ServerEvent::Error {
            reason: reason.into(),
        },
    );
}

pub mod actor;
pub mod handler;
pub mod protocol;
pub mod rooms;

use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Type alias for the sender half of a WebSocket connection's channel.
/// Other parts of the system can clone this to push messages to a specific client.
pub type ConnectionSender = mpsc::UnboundedSender<axum::extract::ws::Message>;

/// A live connection bound to a user: the channel sender plus a
/// process-unique id used to detect stale disconnect events.
#[derive(Clone)]
pub struct RegisteredConnection {
    pub conn_id: u64,
    pub tx: ConnectionSender,
}

/// Connection registry: the current live connection per user.
/// A user has at most one current connection; registering again supersedes
/// the previous entry without force-closing the old channel.
pub type ConnectionRegistry = Arc<DashMap<i64, RegisteredConnection>>;

/// Create a new empty connection registry.
pub fn new_connection_registry() -> ConnectionRegistry {
    Arc::new(DashMap::new())
}

static NEXT_CONN_ID: AtomicU64 = AtomicU64::new(1);

/// Allocate a process-unique connection id.
pub fn next_conn_id() -> u64 {
    NEXT_CONN_ID.fetch_add(1, Ordering::Relaxed)
}

/// Bind a user to a connection, replacing any prior binding. Idempotent.
pub fn register(registry: &ConnectionRegistry, user_id: i64, conn_id: u64, tx: ConnectionSender) {
    registry.insert(user_id, RegisteredConnection { conn_id, tx });
    tracing::debug!(user_id, conn_id, "Connection registered");
}

/// The current connection for a user, if any. Absence means the user is
/// offline — "cannot deliver now", not an error.
pub fn lookup(registry: &ConnectionRegistry, user_id: i64) -> Option<ConnectionSender> {
    registry.get(&user_id).map(|entry| entry.tx.clone())
}

/// Remove a user's binding, but only if it still points at the
/// disconnecting connection. A disconnect for a superseded connection
/// must not erase the newer registration.
pub fn unregister(registry: &ConnectionRegistry, user_id: i64, conn_id: u64) {
    let removed = registry
        .remove_if(&user_id, |_, entry| entry.conn_id == conn_id)
        .is_some();
    tracing::debug!(user_id, conn_id, removed, "Connection unregistered");
}

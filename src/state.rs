use crate::db::DbPool;
use crate::game::LiveGames;
use crate::ws::rooms::RoomRegistry;
use crate::ws::ConnectionRegistry;

/// Shared application state passed to all handlers via axum State extractor.
#[derive(Clone)]
pub struct AppState {
    /// SQLite connection wrapped in Arc<Mutex>
    pub db: DbPool,
    /// Current WebSocket connection per user
    pub connections: ConnectionRegistry,
    /// Room membership: lobby plus one room per game
    pub rooms: RoomRegistry,
    /// In-memory sessions for games with moves in flight
    pub games: LiveGames,
}

impl AppState {
    pub fn new(db: DbPool) -> Self {
        Self {
            db,
            connections: crate::ws::new_connection_registry(),
            rooms: crate::ws::rooms::new_room_registry(),
            games: crate::game::new_live_games(),
        }
    }
}

use axum::Router;
use std::sync::Arc;
use tower_governor::key_extractor::PeerIpKeyExtractor;
use tower_governor::{governor::GovernorConfigBuilder, GovernorLayer};

use crate::challenge;
use crate::game;
use crate::state::AppState;
use crate::users::{directory, login, registration};
use crate::ws::handler as ws_handler;

/// Build the full axum Router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    // Rate limiting: 5 requests per minute per IP on auth endpoints
    // Uses PeerIpKeyExtractor which reads from ConnectInfo<SocketAddr>
    let governor_config = Arc::new(
        GovernorConfigBuilder::default()
            .key_extractor(PeerIpKeyExtractor)
            .per_second(12) // 1 token every 12 seconds = 5 per minute
            .burst_size(5) // Allow burst of 5
            .finish()
            .expect("Failed to build governor config"),
    );
    let governor_limiter = governor_config.limiter().clone();

    // Spawn background task to clean up rate limiter state
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(std::time::Duration::from_secs(60)).await;
            governor_limiter.retain_recent();
        }
    });

    // Auth routes with rate limiting
    let auth_routes = Router::new()
        .route("/login", axum::routing::post(login::login))
        .route(
            "/createAccount",
            axum::routing::post(registration::create_account),
        )
        .layer(GovernorLayer::new(governor_config));

    // Session and directory routes
    let user_routes = Router::new()
        .route("/checkSession", axum::routing::post(login::check_session))
        .route("/getUsername", axum::routing::post(directory::get_username))
        .route("/usernames", axum::routing::get(directory::list_usernames));

    // Challenge and game routes (the out-of-band lobby/game screens)
    let game_routes = Router::new()
        .route(
            "/sendChallenge",
            axum::routing::post(challenge::send_challenge),
        )
        .route(
            "/challengeResponse",
            axum::routing::post(challenge::challenge_response),
        )
        .route(
            "/getGameInformation",
            axum::routing::post(game::get_game_information),
        );

    // WebSocket endpoint (auth via query params, validated at upgrade)
    let ws_routes = Router::new().route("/ws", axum::routing::get(ws_handler::ws_upgrade));

    // Health check
    let health = Router::new().route("/health", axum::routing::get(health_check));

    Router::new()
        .merge(auth_routes)
        .merge(user_routes)
        .merge(game_routes)
        .merge(ws_routes)
        .merge(health)
        .with_state(state)
}

/// Basic health check endpoint
async fn health_check() -> &'static str {
    "ok"
}

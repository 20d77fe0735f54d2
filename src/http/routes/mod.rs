pub mod game;
pub mod lobby;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use super::identity::identity_middleware;
use super::rate_limit::RateLimitLayer;
use super::state::AppState;
use crate::realtime::ws::{lobby_socket, voice_socket};

/// Wires every HTTP/WebSocket route onto the shared [`AppState`]. Layers are
/// applied outermost-last, so the identity middleware (added last) runs
/// before the rate limiter and gives it an `Identity` to key buckets on.
pub fn build_router(state: Arc<AppState>) -> Router {
    let rate_limit = RateLimitLayer::new(state.config.rate_limit_per_second);

    Router::new()
        .route("/lobbies", post(lobby::create_lobby).get(lobby::list_lobbies))
        .route("/lobbies/{id}", get(lobby::get_lobby))
        .route("/lobbies/{id}/join", post(lobby::join_lobby))
        .route("/lobbies/{id}/leave", post(lobby::leave_lobby))
        .route("/lobbies/{id}/start", post(lobby::start_game))
        .route("/lobbies/{id}/ws", get(lobby_socket))
        .route("/lobbies/{id}/voice/ws", get(voice_socket))
        .route("/game/{id}", get(game::get_game))
        .route("/game/{id}/place-tile", post(game::place_tile))
        .route("/game/{id}/choose-corporation", post(game::choose_corporation))
        .route("/game/{id}/buy-stocks", post(game::buy_stocks))
        .route("/game/{id}/merge-decision", post(game::merge_decision))
        .route("/game/{id}/end-turn", post(game::end_turn))
        .route("/game/{id}/end-early", post(game::end_game_early))
        .layer(rate_limit)
        .layer(axum::middleware::from_fn(identity_middleware))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

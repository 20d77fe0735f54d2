use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::http::identity::Identity;
use crate::http::state::AppState;
use crate::lobby::{Lobby, LobbySettings};
use crate::realtime::hub::ServerEvent;

#[derive(Deserialize)]
pub struct CreateLobbyRequest {
    pub name: String,
    pub username: String,
    #[serde(default)]
    pub min_players: Option<usize>,
    #[serde(default)]
    pub max_players: Option<usize>,
}

#[derive(Serialize)]
pub struct CreateLobbyResponse {
    pub id: Uuid,
}

pub async fn create_lobby(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreateLobbyRequest>,
) -> Result<Json<CreateLobbyResponse>, AppError> {
    if request.name.trim().is_empty() {
        return Err(AppError::Validation("lobby name must not be empty".into()));
    }
    if request.username.trim().is_empty() {
        return Err(AppError::Validation("username must not be empty".into()));
    }
    let defaults = LobbySettings::default();
    let settings = LobbySettings {
        min_players: request.min_players.unwrap_or(defaults.min_players),
        max_players: request.max_players.unwrap_or(defaults.max_players),
    };
    if settings.min_players < 1 || settings.min_players > settings.max_players {
        return Err(AppError::Validation("invalid min/max players".into()));
    }

    let id = state.lobbies.create(request.name, settings, request.username, Utc::now())?;
    Ok(Json(CreateLobbyResponse { id }))
}

/// Lobbies that haven't started a game yet, newest first.
pub async fn list_lobbies(State(state): State<Arc<AppState>>) -> Json<Vec<Lobby>> {
    Json(state.lobbies.list_open_lobbies())
}

pub async fn get_lobby(State(state): State<Arc<AppState>>, Path(id): Path<Uuid>) -> Result<Json<Lobby>, AppError> {
    Ok(Json(state.lobbies.lobby_snapshot(id)?))
}

#[derive(Deserialize)]
pub struct JoinLobbyRequest {
    pub username: String,
}

pub async fn join_lobby(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(request): Json<JoinLobbyRequest>,
) -> Result<Json<Lobby>, AppError> {
    if request.username.trim().is_empty() {
        return Err(AppError::Validation("username must not be empty".into()));
    }
    state.lobbies.join(id, request.username, Utc::now())?;
    let lobby = state.lobbies.lobby_snapshot(id)?;
    state.hub.publish(id, ServerEvent::LobbyUpdated);
    Ok(Json(lobby))
}

pub async fn leave_lobby(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(request): Json<JoinLobbyRequest>,
) -> Result<Json<Lobby>, AppError> {
    state.lobbies.leave(id, &request.username, Utc::now())?;
    let lobby = state.lobbies.lobby_snapshot(id)?;
    state.hub.publish(id, ServerEvent::LobbyUpdated);
    Ok(Json(lobby))
}

pub async fn start_game(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    _identity: Identity,
    Json(request): Json<JoinLobbyRequest>,
) -> Result<Json<Lobby>, AppError> {
    state.lobbies.start_game(id, &request.username, Utc::now())?;
    state.hub.publish(id, ServerEvent::GameStarted);
    Ok(Json(state.lobbies.lobby_snapshot(id)?))
}

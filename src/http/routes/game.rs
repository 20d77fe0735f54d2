use std::str::FromStr;
use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::game::corporation::{Corporation, CorporationId, CorporationMap};
use crate::game::engine::Game;
use crate::game::player::Player;
use crate::game::position::Position;
use crate::game::state_machine::GameState;
use crate::game::tile::Hand;
use crate::game::turn::TurnRecord;
use crate::http::state::AppState;
use crate::realtime::hub::ServerEvent;

/// A caller-shaped view of one [`Player`]: hand and balance are hidden
/// information (spec §4.7) and are only populated when the view is being
/// rendered for that same player.
#[derive(Serialize)]
pub struct PlayerView {
    pub username: String,
    pub balance: Option<u32>,
    pub hand: Option<Hand>,
    pub shares: CorporationMap<u8>,
    pub taking_turn: bool,
    pub newly_refilled_tile: Option<Position>,
}

impl PlayerView {
    fn render(player: &Player, caller: Option<&str>) -> Self {
        let is_self = caller == Some(player.username.as_str());
        Self {
            username: player.username.clone(),
            balance: is_self.then_some(player.balance),
            hand: is_self.then(|| player.hand.clone()),
            shares: player.shares,
            taking_turn: player.taking_turn,
            newly_refilled_tile: if is_self { player.newly_refilled_tile } else { None },
        }
    }
}

/// A read-only snapshot of a [`Game`], shaped for the wire and redacted for
/// whoever asked for it: every player's hand/balance is visible to nobody
/// but that player. `Game` itself isn't `Serialize` — its draw pile
/// deliberately hides tile order from clients — so every read endpoint goes
/// through this view instead.
#[derive(Serialize)]
pub struct GameView {
    pub players: Vec<PlayerView>,
    pub active_player: String,
    pub ledger: Vec<(CorporationId, Corporation)>,
    pub state: GameState,
    pub tiles_remaining: usize,
    pub transcript: Vec<TurnRecord>,
    /// Players sorted by final balance, descending. Populated once `state`
    /// reaches `GameState::Finished`.
    pub final_ranking: Option<Vec<String>>,
}

impl GameView {
    fn render(game: &Game, caller: Option<&str>) -> Self {
        Self {
            players: game.players.iter().map(|p| PlayerView::render(p, caller)).collect(),
            active_player: game.active_player().username.clone(),
            ledger: game.ledger.iter().map(|(id, corp)| (id, *corp)).collect(),
            state: game.state.clone(),
            tiles_remaining: game.stack.len(),
            transcript: game.recorder.transcript().to_vec(),
            final_ranking: game.final_ranking.clone(),
        }
    }
}

/// Checks that `username` belongs to this game and is the one allowed to
/// act right now: the active player for every phase except a merge's
/// shareholder decision, where it's whoever the state names as `holder`. Not
/// a member at all -> `Forbidden`; a member whose turn it isn't ->
/// `Unauthorized`, matching spec §6.1/§7's "not current player" contract.
fn authorize_actor(game: &Game, username: &str) -> Result<(), AppError> {
    if !game.players.iter().any(|p| p.username == username) {
        return Err(AppError::Forbidden);
    }
    let actor = match &game.state {
        GameState::AwaitingMergeDecision { holder, .. } => holder.as_str(),
        _ => game.active_player().username.as_str(),
    };
    if actor != username {
        return Err(AppError::Unauthorized);
    }
    Ok(())
}

#[derive(Deserialize)]
pub struct GameViewQuery {
    #[serde(default)]
    pub username: Option<String>,
}

pub async fn get_game(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Query(query): Query<GameViewQuery>,
) -> Result<Json<GameView>, AppError> {
    let view = state.lobbies.with_game(id, |game| GameView::render(game, query.username.as_deref()))?;
    Ok(Json(view))
}

#[derive(Deserialize)]
pub struct PlaceTileRequest {
    pub username: String,
    pub position: String,
}

pub async fn place_tile(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(request): Json<PlaceTileRequest>,
) -> Result<Json<GameView>, AppError> {
    let position = Position::from_str(&request.position).map_err(|e| AppError::Validation(e.to_string()))?;
    let view = state.lobbies.with_game(id, |game| -> Result<GameView, AppError> {
        authorize_actor(game, &request.username)?;
        game.place_tile(position)?;
        Ok(GameView::render(game, Some(&request.username)))
    })??;
    publish_state_change(&state, id);
    Ok(Json(view))
}

#[derive(Deserialize)]
pub struct ChooseCorporationRequest {
    pub username: String,
    pub corporation: String,
}

pub async fn choose_corporation(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(request): Json<ChooseCorporationRequest>,
) -> Result<Json<GameView>, AppError> {
    let corp = CorporationId::from_str(&request.corporation)
        .map_err(|_| AppError::Validation("unknown corporation".into()))?;
    let view = state.lobbies.with_game(id, |game| -> Result<GameView, AppError> {
        authorize_actor(game, &request.username)?;
        game.choose_corporation(corp)?;
        Ok(GameView::render(game, Some(&request.username)))
    })??;
    publish_state_change(&state, id);
    Ok(Json(view))
}

#[derive(Deserialize)]
pub struct StockPurchase {
    pub name: String,
    #[serde(default)]
    #[allow(dead_code)]
    pub price: Option<u32>,
}

#[derive(Deserialize)]
pub struct BuyStocksRequest {
    pub username: String,
    pub purchases: Vec<StockPurchase>,
}

pub async fn buy_stocks(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(request): Json<BuyStocksRequest>,
) -> Result<Json<GameView>, AppError> {
    let ids: Vec<CorporationId> =
        request.purchases.iter().filter_map(|p| CorporationId::from_str(&p.name).ok()).collect();
    let view = state.lobbies.with_game(id, |game| -> Result<GameView, AppError> {
        authorize_actor(game, &request.username)?;
        game.buy_stocks(&ids)?;
        Ok(GameView::render(game, Some(&request.username)))
    })??;
    publish_state_change(&state, id);
    Ok(Json(view))
}

#[derive(Deserialize)]
pub struct MergeDecisionRequest {
    pub username: String,
    #[serde(default)]
    pub trade: u8,
    #[serde(default)]
    pub sell: u8,
}

pub async fn merge_decision(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(request): Json<MergeDecisionRequest>,
) -> Result<Json<GameView>, AppError> {
    let view = state.lobbies.with_game(id, |game| -> Result<GameView, AppError> {
        authorize_actor(game, &request.username)?;
        game.resolve_merge_decision(request.trade, request.sell)?;
        Ok(GameView::render(game, Some(&request.username)))
    })??;
    publish_state_change(&state, id);
    Ok(Json(view))
}

#[derive(Deserialize)]
pub struct EndTurnRequest {
    pub username: String,
}

pub async fn end_turn(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(request): Json<EndTurnRequest>,
) -> Result<Json<GameView>, AppError> {
    let view = state.lobbies.with_game(id, |game| -> Result<GameView, AppError> {
        authorize_actor(game, &request.username)?;
        game.end_turn()?;
        Ok(GameView::render(game, Some(&request.username)))
    })??;
    if view.state.is_finished() {
        let _ = state.lobbies.mark_finished(id, chrono::Utc::now());
        state.hub.publish(id, ServerEvent::GameFinished);
    }
    publish_state_change(&state, id);
    Ok(Json(view))
}

#[derive(Deserialize)]
pub struct EndGameEarlyRequest {
    pub username: String,
}

/// Host-only: ends the game immediately without waiting for a natural
/// end-game condition, settling bonuses and liquidation the same way.
pub async fn end_game_early(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(request): Json<EndGameEarlyRequest>,
) -> Result<Json<GameView>, AppError> {
    let lobby = state.lobbies.lobby_snapshot(id)?;
    if lobby.host() != Some(request.username.as_str()) {
        return Err(AppError::Forbidden);
    }
    let view = state.lobbies.with_game(id, |game| {
        game.end_early();
        GameView::render(game, Some(&request.username))
    })?;
    let _ = state.lobbies.mark_finished(id, chrono::Utc::now());
    state.hub.publish(id, ServerEvent::GameFinished);
    publish_state_change(&state, id);
    Ok(Json(view))
}

fn publish_state_change(state: &AppState, id: Uuid) {
    state.hub.publish(id, ServerEvent::GameStateChanged);
}

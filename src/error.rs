use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::game::EngineError;
use crate::game::stock_market::{BuyError, SellError, TradeError};
use crate::lobby::{LobbyError, ManagerError};

/// Every error an HTTP handler can return, rolled up into the handful of
/// kinds that map onto HTTP status codes.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),
    #[error("not found")]
    NotFound,
    #[error("unauthorized")]
    Unauthorized,
    #[error("forbidden")]
    Forbidden,
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("at capacity")]
    Capacity,
    #[error("internal error")]
    Internal,
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Capacity => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if matches!(self, AppError::Internal) {
            tracing::error!(error = %self, "internal error");
        }
        (self.status(), Json(ErrorBody { error: self.to_string() })).into_response()
    }
}

impl From<ManagerError> for AppError {
    fn from(error: ManagerError) -> Self {
        match error {
            ManagerError::NotFound => AppError::NotFound,
            ManagerError::Lobby(LobbyError::AlreadyJoined) => AppError::Conflict("already joined".into()),
            ManagerError::Lobby(LobbyError::Full) => AppError::Conflict("lobby is full".into()),
            ManagerError::CapacityReached => AppError::Capacity,
            ManagerError::NotEnoughPlayers => AppError::Validation("not enough players to start".into()),
            ManagerError::AlreadyStarted => AppError::Conflict("game already started".into()),
            ManagerError::GameNotStarted => AppError::Conflict("game hasn't started".into()),
            ManagerError::NotHost => AppError::Forbidden,
        }
    }
}

impl From<EngineError> for AppError {
    fn from(error: EngineError) -> Self {
        AppError::Validation(error.to_string())
    }
}

impl From<BuyError> for AppError {
    fn from(error: BuyError) -> Self {
        AppError::Validation(error.to_string())
    }
}

impl From<SellError> for AppError {
    fn from(error: SellError) -> Self {
        AppError::Validation(error.to_string())
    }
}

impl From<TradeError> for AppError {
    fn from(error: TradeError) -> Self {
        AppError::Validation(error.to_string())
    }
}

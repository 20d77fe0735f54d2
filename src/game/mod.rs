pub mod board;
pub mod corporation;
pub mod engine;
pub mod merger;
pub mod player;
pub mod position;
pub mod state_machine;
pub mod stock_market;
pub mod tile;
pub mod turn;

pub use board::{Affiliation, Board};
pub use corporation::{Corporation, CorporationId, CorporationMap, ALL_CORPORATIONS};
pub use engine::{EngineError, Game};
pub use player::Player;
pub use position::Position;
pub use state_machine::{ChoicePurpose, GameState};
pub use turn::{Activity, TurnRecord};

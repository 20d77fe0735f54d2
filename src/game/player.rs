use serde::{Deserialize, Serialize};

use super::corporation::CorporationMap;
use super::position::Position;
use super::tile::Hand;

/// A player's view of the game: hand, balance, and shareholdings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    pub username: String,
    pub balance: u32,
    pub hand: Hand,
    pub shares: CorporationMap<u8>,
    pub taking_turn: bool,
    /// The position of the tile most recently drawn to refill this player's
    /// hand, surfaced to the client so it can highlight the new tile.
    pub newly_refilled_tile: Option<Position>,
}

impl Player {
    pub const HAND_SIZE: usize = super::tile::Hand::CAPACITY;

    pub fn new(username: String, starting_balance: u32) -> Self {
        Self {
            username,
            balance: starting_balance,
            hand: Hand::default(),
            shares: CorporationMap::new(0),
            taking_turn: false,
            newly_refilled_tile: None,
        }
    }
}

use serde::{Deserialize, Serialize};

use super::corporation::CorporationId;
use super::position::Position;

/// The game's phase, carrying whatever data that phase needs. A runtime enum
/// rather than a generic per-state type: the lobby registry stores games
/// behind a `Mutex` in a map keyed by lobby id, and a generic-per-state type
/// can't live uniformly in that map. See DESIGN.md.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum GameState {
    /// Waiting for the active player to place a tile.
    AwaitingTilePlacement,
    /// The just-placed tile either founded a new corporation (the player
    /// picks which inactive one) or triggered a tie among equally-sized
    /// corporations for acquirer in a merge; waiting on the active player's
    /// pick from `candidates`.
    AwaitingCorporationChoice { placed: Position, candidates: Vec<CorporationId>, purpose: ChoicePurpose },
    /// A merger is in progress; the acquirer has been decided, and we're
    /// walking defunct corporations from smallest to largest collecting
    /// trade/sell decisions from their holders.
    AwaitingMergeDecision { acquirer: CorporationId, defunct: CorporationId, holder: String },
    /// The active player may buy up to 3 shares before ending the turn.
    AwaitingStockPurchase,
    /// Terminal: the game has ended (boneyard exhausted, or every active
    /// corporation is safe and at least one has reached the 41-tile
    /// threshold).
    Finished,
}

/// What an [`GameState::AwaitingCorporationChoice`] resolves into once the
/// active player picks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChoicePurpose {
    Founding,
    AcquirerTie,
    /// A multi-merge step where two or more remaining defunct corporations
    /// are tied for smallest size; the active player picks which one
    /// resolves next.
    DefunctTie,
}

impl GameState {
    pub fn is_finished(&self) -> bool {
        matches!(self, GameState::Finished)
    }

    /// Whether `to` is a legal next phase from `self`.
    pub fn can_transition_to(&self, to: &GameState) -> bool {
        use GameState::*;
        match (self, to) {
            (AwaitingTilePlacement, AwaitingCorporationChoice { .. }) => true,
            (AwaitingTilePlacement, AwaitingMergeDecision { .. }) => true,
            (AwaitingTilePlacement, AwaitingStockPurchase) => true,
            (AwaitingTilePlacement, Finished) => true,
            (AwaitingCorporationChoice { .. }, AwaitingMergeDecision { .. }) => true,
            (AwaitingCorporationChoice { .. }, AwaitingCorporationChoice { .. }) => true,
            (AwaitingCorporationChoice { .. }, AwaitingStockPurchase) => true,
            (AwaitingMergeDecision { .. }, AwaitingMergeDecision { .. }) => true,
            (AwaitingMergeDecision { .. }, AwaitingCorporationChoice { .. }) => true,
            (AwaitingMergeDecision { .. }, AwaitingStockPurchase) => true,
            (AwaitingStockPurchase, AwaitingTilePlacement) => true,
            (AwaitingStockPurchase, Finished) => true,
            _ => false,
        }
    }

    /// Forces the transition, panicking on an illegal one. The engine is the
    /// only caller, and every call site already checked the precondition
    /// that makes the transition legal, so a panic here means the engine
    /// itself has a bug, not that a client sent a bad request.
    pub fn force(&mut self, to: GameState) {
        assert!(self.can_transition_to(&to), "illegal transition {self:?} -> {to:?}");
        *self = to;
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::game::corporation::CorporationId::*;

    #[test]
    fn placement_can_lead_to_purchase_directly() {
        let state = GameState::AwaitingTilePlacement;
        assert!(state.can_transition_to(&GameState::AwaitingStockPurchase));
    }

    #[test]
    fn purchase_cannot_jump_back_into_merge_decision() {
        let state = GameState::AwaitingStockPurchase;
        assert!(!state.can_transition_to(&GameState::AwaitingMergeDecision {
            acquirer: Phoenix,
            defunct: Quantum,
            holder: "alice".into(),
        }));
    }

    #[test]
    #[should_panic]
    fn force_panics_on_illegal_transition() {
        let mut state = GameState::Finished;
        state.force(GameState::AwaitingTilePlacement);
    }
}

use super::board::{Affiliation, Board};
use super::corporation::{Corporation, CorporationId, CorporationMap};
use super::merger::{order_defunct_smallest_to_largest, MergerProcess};
use super::player::Player;
use super::position::Position;
use super::state_machine::{ChoicePurpose, GameState};
use super::stock_market::StockMarket;
use super::tile::{Tile, TileStack};
use super::turn::{Activity, TurnRecorder};

const STARTING_BALANCE: u32 = 6000;
const SAFE_SIZE: u32 = 11;
const END_GAME_MIN_SIZE: u32 = 41;

/// The full state of one game in progress: board, corporation ledger,
/// players in turn order, draw pile, current phase, and turn transcript.
/// A plain struct with `&mut self` methods rather than a generic typestate;
/// see DESIGN.md for why.
pub struct Game {
    pub board: Board,
    pub ledger: CorporationMap<Corporation>,
    pub players: Vec<Player>,
    pub active: usize,
    pub stack: TileStack,
    pub state: GameState,
    pub recorder: TurnRecorder,
    /// Players sorted by final balance, descending. `None` until the game
    /// reaches `GameState::Finished`.
    pub final_ranking: Option<Vec<String>>,
    merger: Option<MergerProcess>,
}

impl Game {
    /// Deals 6 tiles to each player (in the order given — the lobby decides
    /// turn order before handing off to the engine) and opens the first
    /// turn.
    pub fn new(usernames: Vec<String>, shuffle: impl FnOnce(&mut Vec<Position>)) -> Self {
        let mut stack = TileStack::new(shuffle);
        let mut players: Vec<Player> = usernames
            .into_iter()
            .map(|name| Player::new(name, STARTING_BALANCE))
            .collect();

        for player in players.iter_mut() {
            for tile in stack.draw_many(Player::HAND_SIZE) {
                let _ = player.hand.insert(tile);
            }
        }
        players[0].taking_turn = true;

        let mut recorder = TurnRecorder::default();
        recorder.begin(players[0].username.clone());

        Self {
            board: Board::new(),
            ledger: CorporationMap::new(Corporation::default()),
            players,
            active: 0,
            stack,
            state: GameState::AwaitingTilePlacement,
            recorder,
            final_ranking: None,
            merger: None,
        }
    }

    pub fn active_player(&self) -> &Player {
        &self.players[self.active]
    }

    /// Places a tile from the active player's hand, applying whatever
    /// consequence follows: a lone placement, a corporation's growth, a
    /// founding (possibly requiring the player to pick among several
    /// inactive corporations), or a merge (possibly requiring the player to
    /// break an acquirer-size tie).
    pub fn place_tile(&mut self, pos: Position) -> Result<(), EngineError> {
        if self.state != GameState::AwaitingTilePlacement {
            return Err(EngineError::WrongPhase);
        }
        let tile = self.players[self.active]
            .hand
            .tiles()
            .iter()
            .find(|t| t.position == pos)
            .ok_or(EngineError::TileNotInHand)?;
        if tile.exchangeable {
            return Err(EngineError::TileExchangeable);
        }

        self.players[self.active].hand.remove(pos);
        self.board.place(pos, Affiliation::Incorporated);
        self.recorder.record(Activity::PlacedTile { position: pos });

        let component = self.board.connected_component(pos);
        let grouped = self.board.group_by_corporation(&component);

        match grouped.by_corporation.len() {
            0 if grouped.incorporated.len() <= 1 => {
                self.state.force(GameState::AwaitingStockPurchase);
            }
            0 => {
                let candidates: Vec<CorporationId> = super::corporation::ALL_CORPORATIONS
                    .into_iter()
                    .filter(|id| !self.ledger[*id].active)
                    .collect();
                if candidates.is_empty() {
                    // No inactive corporation left to found; the tile just sits
                    // incorporated, same as a lone placement.
                    self.state.force(GameState::AwaitingStockPurchase);
                } else {
                    self.state.force(GameState::AwaitingCorporationChoice {
                        placed: pos,
                        candidates,
                        purpose: ChoicePurpose::Founding,
                    });
                }
            }
            1 => {
                let (id, _) = &grouped.by_corporation[0];
                let id = *id;
                let crossed_safety = self.ledger[id].grow(grouped.incorporated.len() as u32);
                self.board.assign(&grouped.incorporated, id);
                if crossed_safety {
                    self.recompute_unplayable_tiles();
                }
                self.state.force(GameState::AwaitingStockPurchase);
            }
            _ => self.begin_merge(pos, grouped.by_corporation)?,
        }

        Ok(())
    }

    /// Resolves a founding choice or an acquirer tie raised by `place_tile`.
    pub fn choose_corporation(&mut self, choice: CorporationId) -> Result<(), EngineError> {
        let (placed, candidates, purpose) = match &self.state {
            GameState::AwaitingCorporationChoice { placed, candidates, purpose } => {
                (*placed, candidates.clone(), *purpose)
            }
            _ => return Err(EngineError::WrongPhase),
        };
        if !candidates.contains(&choice) {
            return Err(EngineError::InvalidChoice);
        }

        match purpose {
            ChoicePurpose::Founding => {
                let component = self.board.connected_component(placed);
                self.ledger[choice].establish(component.len() as u32);
                self.board.assign(&component, choice);
                self.grant_founders_share(choice);
                self.recorder.record(Activity::FoundedCorporation { corporation: choice, founding_tiles: component });
                if self.ledger[choice].safe {
                    self.recompute_unplayable_tiles();
                }
                self.state.force(GameState::AwaitingStockPurchase);
                Ok(())
            }
            ChoicePurpose::AcquirerTie => {
                let grouped = self.board.group_by_corporation(&self.board.connected_component(placed));
                let defunct: Vec<(CorporationId, u32)> = grouped
                    .by_corporation
                    .iter()
                    .filter(|(id, _)| *id != choice)
                    .map(|(id, _)| (*id, self.ledger[*id].size))
                    .collect();
                self.start_merger(choice, placed, defunct)
            }
            ChoicePurpose::DefunctTie => self.resolve_defunct_tie(choice),
        }
    }

    /// Resolves a tie among equally-sized remaining defunct corporations
    /// during a multi-merge, raised by `advance_merger`.
    fn resolve_defunct_tie(&mut self, choice: CorporationId) -> Result<(), EngineError> {
        let process = self.merger.as_mut().ok_or(EngineError::WrongPhase)?;
        let acquirer = process.acquirer();
        let holders = self.holders_in_turn_order(Some(choice));
        let process = self.merger.as_mut().ok_or(EngineError::WrongPhase)?;
        let defunct = process.begin_chosen_defunct(choice, holders).ok_or(EngineError::InvalidChoice)?;
        let holder = process.next_holder();
        match holder {
            Some(holder) => {
                self.state.force(GameState::AwaitingMergeDecision { acquirer, defunct, holder });
                Ok(())
            }
            None => self.advance_merger(),
        }
    }

    fn begin_merge(&mut self, placed: Position, buckets: Vec<(CorporationId, Vec<Position>)>) -> Result<(), EngineError> {
        let mut by_size: Vec<(CorporationId, u32)> =
            buckets.iter().map(|(id, _)| (*id, self.ledger[*id].size)).collect();
        by_size.sort_by_key(|(_, size)| std::cmp::Reverse(*size));

        let top_size = by_size[0].1;
        let tied_for_top: Vec<CorporationId> = by_size.iter().filter(|(_, s)| *s == top_size).map(|(id, _)| *id).collect();

        if tied_for_top.len() > 1 {
            self.state.force(GameState::AwaitingCorporationChoice {
                placed,
                candidates: tied_for_top,
                purpose: ChoicePurpose::AcquirerTie,
            });
            return Ok(());
        }

        let acquirer = tied_for_top[0];
        let defunct: Vec<(CorporationId, u32)> = by_size.into_iter().filter(|(id, _)| *id != acquirer).collect();
        self.start_merger(acquirer, placed, defunct)
    }

    fn start_merger(&mut self, acquirer: CorporationId, placed: Position, defunct: Vec<(CorporationId, u32)>) -> Result<(), EngineError> {
        let order = order_defunct_smallest_to_largest(defunct.clone());
        for (id, _) in &defunct {
            StockMarket::distribute_bonuses(*id, &mut self.players, &self.ledger);
        }

        let mut process = MergerProcess::new(acquirer, placed, order);
        self.recorder.record(Activity::MergedCorporations {
            acquirer,
            defunct: defunct.iter().map(|(id, _)| *id).collect(),
        });

        let tie = process.smallest_tie();
        if tie.len() > 1 {
            self.merger = Some(process);
            self.state.force(GameState::AwaitingCorporationChoice { placed, candidates: tie, purpose: ChoicePurpose::DefunctTie });
            return Ok(());
        }

        let holders = self.holders_in_turn_order(process.peek_next_defunct());
        let first_defunct = process.begin_next_defunct(holders);

        match first_defunct {
            Some(defunct_id) => {
                let holder = process.next_holder();
                self.merger = Some(process);
                match holder {
                    Some(holder) => {
                        self.state.force(GameState::AwaitingMergeDecision { acquirer, defunct: defunct_id, holder });
                        Ok(())
                    }
                    None => self.advance_merger(),
                }
            }
            None => {
                self.merger = None;
                self.state.force(GameState::AwaitingStockPurchase);
                Ok(())
            }
        }
    }

    fn holders_in_turn_order(&self, defunct: Option<CorporationId>) -> Vec<String> {
        let Some(defunct) = defunct else { return Vec::new() };
        let n = self.players.len();
        (0..n)
            .map(|offset| (self.active + offset) % n)
            .filter(|&i| self.players[i].shares[defunct] > 0)
            .map(|i| self.players[i].username.clone())
            .collect()
    }

    /// Applies a shareholder's trade/sell/keep decision during a merge, then
    /// advances to the next holder or defunct corporation.
    pub fn resolve_merge_decision(&mut self, trade: u8, sell: u8) -> Result<(), EngineError> {
        let (acquirer, defunct, holder) = match &self.state {
            GameState::AwaitingMergeDecision { acquirer, defunct, holder } => (*acquirer, *defunct, holder.clone()),
            _ => return Err(EngineError::WrongPhase),
        };
        let player_idx = self
            .players
            .iter()
            .position(|p| p.username == holder)
            .ok_or(EngineError::InvalidChoice)?;

        if trade > 0 {
            StockMarket::trade(&mut self.players[player_idx], defunct, acquirer, trade, &mut self.ledger)
                .map_err(|_| EngineError::InvalidChoice)?;
            self.recorder.record(Activity::TradedStock { defunct, acquirer, count: trade });
        }
        if sell > 0 {
            StockMarket::sell(&mut self.players[player_idx], defunct, sell, &mut self.ledger)
                .map_err(|_| EngineError::InvalidChoice)?;
            self.recorder.record(Activity::SoldStock { corporation: defunct, count: sell });
        }

        self.advance_merger()
    }

    /// Advances the in-progress merge by one step: the next shareholder
    /// decision, the next defunct corporation, or completion. Each access to
    /// `self.merger` is its own statement so it never overlaps with the
    /// whole-`self` borrow `holders_in_turn_order` needs.
    fn advance_merger(&mut self) -> Result<(), EngineError> {
        if self.merger.is_none() {
            self.state.force(GameState::AwaitingStockPurchase);
            return Ok(());
        }

        loop {
            let next_holder = self.merger.as_mut().unwrap().next_holder();
            if let Some(holder) = next_holder {
                let acquirer = self.merger.as_ref().unwrap().acquirer();
                let defunct = self
                    .merger
                    .as_ref()
                    .unwrap()
                    .current_defunct()
                    .expect("a holder implies a current defunct corporation");
                self.state.force(GameState::AwaitingMergeDecision { acquirer, defunct, holder });
                return Ok(());
            }

            let acquirer = self.merger.as_ref().unwrap().acquirer();
            let tie = self.merger.as_ref().unwrap().smallest_tie();
            if tie.len() > 1 {
                let placed = self.merger.as_ref().unwrap().placed();
                self.state.force(GameState::AwaitingCorporationChoice { placed, candidates: tie, purpose: ChoicePurpose::DefunctTie });
                return Ok(());
            }
            let peek = self.merger.as_ref().unwrap().peek_next_defunct();
            let holders = self.holders_in_turn_order(peek);
            let next_defunct = self.merger.as_mut().unwrap().begin_next_defunct(holders);

            match next_defunct {
                Some(defunct) => {
                    let crossed_safety = self.ledger[acquirer].grow(self.ledger[defunct].size);
                    let positions: Vec<Position> = Position::all()
                        .filter(|p| self.board.placed_at(*p) == Some(Affiliation::Corporation(defunct)))
                        .collect();
                    self.board.assign(&positions, acquirer);
                    StockMarket::liquidate(defunct, &mut self.players, &mut self.ledger);
                    if crossed_safety {
                        self.recompute_unplayable_tiles();
                    }
                    continue;
                }
                None => {
                    self.merger = None;
                    self.state.force(GameState::AwaitingStockPurchase);
                    return Ok(());
                }
            }
        }
    }

    fn grant_founders_share(&mut self, id: CorporationId) {
        if self.ledger[id].remaining_shares > 0 {
            self.players[self.active].shares[id] += 1;
            self.ledger[id].remaining_shares -= 1;
        }
    }

    /// Marks every unplaced hand tile exchangeable if two or more of its
    /// board neighbors belong to a now-safe corporation. Called whenever a
    /// corporation's `grow`/`establish` crosses the safety threshold.
    fn recompute_unplayable_tiles(&mut self) {
        let board = &self.board;
        let ledger = &self.ledger;
        for player in self.players.iter_mut() {
            let candidates: Vec<Position> =
                player.hand.iter().filter(|t| !t.exchangeable).map(|t| t.position).collect();
            for pos in candidates {
                let safe_neighbors = board.bordering_corporations(pos).into_iter().filter(|id| ledger[*id].safe).count();
                if safe_neighbors >= 2 {
                    player.hand.mark_exchangeable(pos);
                }
            }
        }
    }

    /// Buys up to 3 shares total for the active player; a batch over 3 is
    /// truncated to the first 3 rather than rejected. Ignores any individual
    /// purchase that fails (insufficient funds or stock).
    pub fn buy_stocks(&mut self, ids: &[CorporationId]) -> Result<(), EngineError> {
        if self.state != GameState::AwaitingStockPurchase {
            return Err(EngineError::WrongPhase);
        }
        let ids = &ids[..ids.len().min(3)];
        let result = StockMarket::buy_batch(&mut self.players[self.active], ids, &mut self.ledger);
        if !result.purchased.is_empty() {
            let stats: Vec<(CorporationId, u32)> =
                result.purchased.iter().map(|id| (*id, self.ledger[*id].stats(*id).price)).collect();
            self.recorder.record(Activity::BoughtStock { purchases: stats });
        }
        Ok(())
    }

    /// Ends the active player's turn: refills their hand, checks for
    /// end-game eligibility, and advances to the next player.
    pub fn end_turn(&mut self) -> Result<(), EngineError> {
        if self.state != GameState::AwaitingStockPurchase {
            return Err(EngineError::WrongPhase);
        }
        self.recorder.record(Activity::EndedTurn);

        let refill = Player::HAND_SIZE.saturating_sub(self.players[self.active].hand.len());
        let drawn = self.stack.draw_many(refill);
        self.players[self.active].newly_refilled_tile = drawn.last().map(|t: &Tile| t.position);
        for tile in drawn {
            let _ = self.players[self.active].hand.insert(tile);
        }

        // Tiles already marked exchangeable (from a prior turn's safety
        // crossing) are swapped for fresh ones now, on top of the slot the
        // just-played tile freed above.
        while let Some(pos) = self.players[self.active].hand.first_exchangeable() {
            self.players[self.active].hand.remove(pos);
            match self.stack.draw() {
                Some(tile) => {
                    self.players[self.active].newly_refilled_tile = Some(tile.position);
                    let _ = self.players[self.active].hand.insert(tile);
                }
                None => break,
            }
        }

        if self.is_game_over() {
            self.settle_game_end();
            self.state.force(GameState::Finished);
            self.recorder.finish();
            return Ok(());
        }

        self.players[self.active].taking_turn = false;
        self.active = (self.active + 1) % self.players.len();
        self.players[self.active].taking_turn = true;
        self.state.force(GameState::AwaitingTilePlacement);
        self.recorder.begin(self.players[self.active].username.clone());
        Ok(())
    }

    /// Ends the game immediately regardless of phase, settling bonuses and
    /// liquidating active corporations the same way a natural game-end
    /// does. A host's end-game-early action, not a client move, so it
    /// bypasses `GameState`'s normal transition table rather than going
    /// through `force`. A no-op if the game already finished naturally.
    pub fn end_early(&mut self) {
        if self.state.is_finished() {
            return;
        }
        self.settle_game_end();
        self.state = GameState::Finished;
        self.recorder.finish();
    }

    /// Pays out majority/minority bonuses and liquidates every still-active
    /// corporation once, then ranks players by final balance, descending.
    /// Called exactly once, from `end_turn`, the moment `is_game_over`
    /// becomes true.
    fn settle_game_end(&mut self) {
        let active: Vec<CorporationId> = self.ledger.iter().filter(|(_, c)| c.active).map(|(id, _)| id).collect();
        for id in active {
            StockMarket::distribute_bonuses(id, &mut self.players, &self.ledger);
            StockMarket::liquidate(id, &mut self.players, &mut self.ledger);
        }

        let mut ranking: Vec<(String, u32)> =
            self.players.iter().map(|p| (p.username.clone(), p.balance)).collect();
        ranking.sort_by_key(|(_, balance)| std::cmp::Reverse(*balance));
        self.final_ranking = Some(ranking.into_iter().map(|(name, _)| name).collect());
    }

    /// At least one corporation must be active, and then either the
    /// boneyard is empty or every active corporation is safe with at least
    /// one at or past the 41-tile threshold.
    pub fn is_game_over(&self) -> bool {
        let active: Vec<&Corporation> = self.ledger.iter().map(|(_, c)| c).filter(|c| c.active).collect();
        if active.is_empty() {
            return false;
        }
        self.stack.is_empty() || (active.iter().all(|c| c.safe) && active.iter().any(|c| c.size >= END_GAME_MIN_SIZE))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    #[error("that action isn't legal in the game's current phase")]
    WrongPhase,
    #[error("that tile isn't in the active player's hand")]
    TileNotInHand,
    #[error("that choice wasn't among the offered candidates")]
    InvalidChoice,
    #[error("that tile is marked exchangeable and cannot be played")]
    TileExchangeable,
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::game::tile::identity_shuffle;

    fn two_player_game() -> Game {
        Game::new(vec!["alice".into(), "bob".into()], identity_shuffle)
    }

    #[test]
    fn deals_six_tiles_each() {
        let game = two_player_game();
        assert_eq!(game.players[0].hand.len(), 6);
        assert_eq!(game.players[1].hand.len(), 6);
        assert_eq!(game.state, GameState::AwaitingTilePlacement);
    }

    #[test]
    fn lone_placement_goes_straight_to_stock_purchase() {
        let mut game = two_player_game();
        let pos = game.players[0].hand.tiles()[0].position;
        game.place_tile(pos).unwrap();
        assert_eq!(game.state, GameState::AwaitingStockPurchase);
        assert!(game.board.is_placed(pos));
    }

    #[test]
    fn end_turn_advances_active_player_and_refills_hand() {
        let mut game = two_player_game();
        let pos = game.players[0].hand.tiles()[0].position;
        game.place_tile(pos).unwrap();
        game.end_turn().unwrap();
        assert_eq!(game.active, 1);
        assert_eq!(game.players[0].hand.len(), 6);
        assert!(!game.players[0].taking_turn);
        assert!(game.players[1].taking_turn);
    }

    #[test]
    fn exhausting_the_stack_with_no_active_corporation_does_not_end_the_game() {
        let mut game = two_player_game();
        let len = game.stack.len();
        game.stack.draw_many(len);

        let pos = game.players[0].hand.tiles()[0].position;
        game.place_tile(pos).unwrap();
        game.end_turn().unwrap();

        assert_ne!(game.state, GameState::Finished);
    }

    #[test]
    fn exhausting_the_stack_with_an_active_corporation_settles_bonuses_and_ranks_players() {
        let mut game = two_player_game();
        game.ledger[CorporationId::Phoenix].establish(2);

        let len = game.stack.len();
        game.stack.draw_many(len);

        let pos = game.players[0].hand.tiles()[0].position;
        game.place_tile(pos).unwrap();
        game.end_turn().unwrap();

        assert_eq!(game.state, GameState::Finished);
        let ranking = game.final_ranking.as_ref().unwrap();
        assert_eq!(ranking.len(), 2);
        assert!(ranking.contains(&"alice".to_string()));
        assert!(ranking.contains(&"bob".to_string()));
    }

    #[test]
    fn playing_an_exchangeable_tile_is_rejected() {
        let mut game = two_player_game();
        let pos = game.players[0].hand.tiles()[0].position;
        game.players[0].hand.mark_exchangeable(pos);
        assert_eq!(game.place_tile(pos), Err(EngineError::TileExchangeable));
    }

    #[test]
    fn buy_stocks_truncates_a_batch_over_three() {
        let mut game = two_player_game();
        let pos = game.players[0].hand.tiles()[0].position;
        game.place_tile(pos).unwrap();
        game.ledger[CorporationId::Phoenix].establish(2);
        game.ledger[CorporationId::Quantum].establish(2);
        game.ledger[CorporationId::Hydra].establish(2);
        game.ledger[CorporationId::Fusion].establish(2);

        game.buy_stocks(&[CorporationId::Phoenix, CorporationId::Quantum, CorporationId::Hydra, CorporationId::Fusion])
            .unwrap();

        let player = &game.players[0];
        assert_eq!(player.shares[CorporationId::Fusion], 0);
        let bought: u8 = [CorporationId::Phoenix, CorporationId::Quantum, CorporationId::Hydra]
            .into_iter()
            .map(|id| player.shares[id])
            .sum();
        assert_eq!(bought, 3);
    }

    #[test]
    fn placing_a_tile_not_in_hand_is_rejected() {
        let mut game = two_player_game();
        let foreign = Position::all().find(|p| !game.players[0].hand.contains(*p)).unwrap();
        assert_eq!(game.place_tile(foreign), Err(EngineError::TileNotInHand));
    }
}

use std::collections::VecDeque;

use super::corporation::CorporationId;
use super::position::Position;

/// Orders defunct corporations smallest-to-largest for a multi-way merge.
/// Ties keep the caller's original relative order (a stable sort), which in
/// practice is board discovery order; see DESIGN.md for why this was chosen
/// over an explicit tie-break rule.
pub fn order_defunct_smallest_to_largest(mut candidates: Vec<(CorporationId, u32)>) -> Vec<(CorporationId, u32)> {
    candidates.sort_by_key(|(_, size)| *size);
    candidates
}

struct CurrentMerge {
    defunct: CorporationId,
    holders: VecDeque<String>,
}

/// Walks a merge to completion: one acquirer absorbs one or more defunct
/// corporations, processed smallest first; within each defunct corporation,
/// its shareholders decide trade/sell/keep in turn order starting from the
/// active player. The process itself holds no share or board data — the
/// engine drives [`super::stock_market::StockMarket`] for each holder and
/// advances this process once that holder's decision is applied.
///
/// Sizes are kept alongside each remaining defunct id so the engine can
/// detect a tie for smallest-remaining and stop to ask the active player to
/// break it, rather than silently picking one.
pub struct MergerProcess {
    acquirer: CorporationId,
    /// The board position whose placement triggered this merge, kept so a
    /// defunct-tie choice can be reported to the client the same way a
    /// founding/acquirer choice is.
    placed: Position,
    remaining_defunct: VecDeque<(CorporationId, u32)>,
    current: Option<CurrentMerge>,
}

impl MergerProcess {
    pub fn new(acquirer: CorporationId, placed: Position, defunct_by_size_asc: Vec<(CorporationId, u32)>) -> Self {
        Self {
            acquirer,
            placed,
            remaining_defunct: defunct_by_size_asc.into(),
            current: None,
        }
    }

    pub fn acquirer(&self) -> CorporationId {
        self.acquirer
    }

    pub fn placed(&self) -> Position {
        self.placed
    }

    /// Closes out whatever defunct corporation was in progress (if any) and
    /// starts the next one, handing it the shareholders who need to decide,
    /// in turn order. Returns `None` once every defunct corporation has been
    /// processed.
    pub fn begin_next_defunct(&mut self, holders_in_turn_order: Vec<String>) -> Option<CorporationId> {
        self.current = self.remaining_defunct.pop_front().map(|(defunct, _)| CurrentMerge {
            defunct,
            holders: holders_in_turn_order.into(),
        });
        self.current_defunct()
    }

    /// Starts a specific defunct corporation chosen by the active player to
    /// break a tie among equally-sized remaining defuncts, removing it from
    /// the queue out of order.
    pub fn begin_chosen_defunct(&mut self, choice: CorporationId, holders_in_turn_order: Vec<String>) -> Option<CorporationId> {
        if let Some(pos) = self.remaining_defunct.iter().position(|(id, _)| *id == choice) {
            self.remaining_defunct.remove(pos);
        }
        self.current = Some(CurrentMerge { defunct: choice, holders: holders_in_turn_order.into() });
        self.current_defunct()
    }

    pub fn current_defunct(&self) -> Option<CorporationId> {
        self.current.as_ref().map(|c| c.defunct)
    }

    /// The defunct corporation that will start once the current one's
    /// holders are exhausted and `begin_next_defunct` is called, without
    /// consuming it from the queue.
    pub fn peek_next_defunct(&self) -> Option<CorporationId> {
        self.remaining_defunct.front().map(|(id, _)| *id)
    }

    /// Every remaining defunct corporation tied for smallest size, if more
    /// than one. `begin_next_defunct`/`begin_chosen_defunct` would otherwise
    /// pick the first by queue order, which is only a stable default and not
    /// a client-visible decision.
    pub fn smallest_tie(&self) -> Vec<CorporationId> {
        let Some(&(_, smallest)) = self.remaining_defunct.front() else { return Vec::new() };
        let tied: Vec<CorporationId> =
            self.remaining_defunct.iter().filter(|(_, size)| *size == smallest).map(|(id, _)| *id).collect();
        if tied.len() > 1 {
            tied
        } else {
            Vec::new()
        }
    }

    /// Pops the next shareholder who still owes a trade/sell/keep decision
    /// for the current defunct corporation.
    pub fn next_holder(&mut self) -> Option<String> {
        self.current.as_mut().and_then(|c| c.holders.pop_front())
    }

    /// `true` once every defunct corporation's every holder has decided.
    pub fn is_done(&self) -> bool {
        self.current.is_none() && self.remaining_defunct.is_empty()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::game::corporation::CorporationId::*;

    fn origin() -> Position {
        Position::new(0, 0)
    }

    #[test]
    fn orders_by_size_ascending() {
        let order = order_defunct_smallest_to_largest(vec![(Phoenix, 12), (Quantum, 4), (Hydra, 8)]);
        assert_eq!(order, vec![(Quantum, 4), (Hydra, 8), (Phoenix, 12)]);
    }

    #[test]
    fn walks_holders_then_advances_to_next_defunct() {
        let mut process = MergerProcess::new(Fusion, origin(), vec![(Quantum, 4), (Phoenix, 12)]);
        assert_eq!(process.begin_next_defunct(vec!["alice".into(), "bob".into()]), Some(Quantum));
        assert_eq!(process.next_holder(), Some("alice".into()));
        assert_eq!(process.next_holder(), Some("bob".into()));
        assert_eq!(process.next_holder(), None);
        assert!(!process.is_done());

        assert_eq!(process.begin_next_defunct(vec!["carol".into()]), Some(Phoenix));
        assert_eq!(process.next_holder(), Some("carol".into()));
        assert_eq!(process.begin_next_defunct(vec![]), None);
        assert!(process.is_done());
    }

    #[test]
    fn smallest_tie_detects_equal_sized_remaining_defuncts() {
        let process = MergerProcess::new(Fusion, origin(), vec![(Quantum, 4), (Hydra, 4), (Phoenix, 12)]);
        let mut tied = process.smallest_tie();
        tied.sort_by_key(|id| id.id());
        let mut expected = vec![Quantum, Hydra];
        expected.sort_by_key(|id| id.id());
        assert_eq!(tied, expected);
    }

    #[test]
    fn begin_chosen_defunct_removes_it_from_the_queue_out_of_order() {
        let mut process = MergerProcess::new(Fusion, origin(), vec![(Quantum, 4), (Hydra, 4)]);
        assert_eq!(process.begin_chosen_defunct(Hydra, vec!["alice".into()]), Some(Hydra));
        assert_eq!(process.begin_next_defunct(vec![]), Some(Quantum));
    }
}

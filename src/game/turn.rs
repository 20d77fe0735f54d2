use serde::{Deserialize, Serialize};

use super::corporation::CorporationId;
use super::position::Position;

/// One recorded event within a turn. The supplemented transcript/replay
/// feature (SPEC_FULL.md §3) persists these so a reconnecting client, or the
/// lobby's spectator feed, can catch up without replaying the whole engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Activity {
    PlacedTile { position: Position },
    FoundedCorporation { corporation: CorporationId, founding_tiles: Vec<Position> },
    MergedCorporations { acquirer: CorporationId, defunct: Vec<CorporationId> },
    BoughtStock { purchases: Vec<(CorporationId, u32)> },
    TradedStock { defunct: CorporationId, acquirer: CorporationId, count: u8 },
    SoldStock { corporation: CorporationId, count: u8 },
    EndedTurn,
}

/// Accumulates the ordered list of [`Activity`] a single player's turn
/// produces. The engine appends as each sub-step completes; the lobby keeps
/// the finished record around for replay and for late-joining spectators.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TurnRecord {
    pub player: String,
    pub activities: Vec<Activity>,
}

impl TurnRecord {
    pub fn new(player: String) -> Self {
        Self { player, activities: Vec::new() }
    }

    pub fn push(&mut self, activity: Activity) {
        self.activities.push(activity);
    }
}

/// Keeps the completed turns of a game, oldest first, for transcript replay.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TurnRecorder {
    completed: Vec<TurnRecord>,
    current: Option<TurnRecord>,
}

impl TurnRecorder {
    pub fn begin(&mut self, player: String) {
        self.finish();
        self.current = Some(TurnRecord::new(player));
    }

    pub fn record(&mut self, activity: Activity) {
        if let Some(turn) = self.current.as_mut() {
            turn.push(activity);
        }
    }

    /// Closes out the in-progress turn, if any, moving it into the completed
    /// transcript.
    pub fn finish(&mut self) {
        if let Some(turn) = self.current.take() {
            self.completed.push(turn);
        }
    }

    pub fn transcript(&self) -> &[TurnRecord] {
        &self.completed
    }

    pub fn current(&self) -> Option<&TurnRecord> {
        self.current.as_ref()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::game::corporation::CorporationId::*;

    #[test]
    fn finish_without_begin_is_a_no_op() {
        let mut recorder = TurnRecorder::default();
        recorder.finish();
        assert!(recorder.transcript().is_empty());
    }

    #[test]
    fn begin_closes_out_the_previous_turn() {
        let mut recorder = TurnRecorder::default();
        recorder.begin("alice".into());
        recorder.record(Activity::PlacedTile { position: Position::new(0, 0) });
        recorder.begin("bob".into());
        assert_eq!(recorder.transcript().len(), 1);
        assert_eq!(recorder.transcript()[0].player, "alice");
        assert_eq!(recorder.current().unwrap().player, "bob");
    }

    #[test]
    fn records_activities_in_order() {
        let mut recorder = TurnRecorder::default();
        recorder.begin("alice".into());
        recorder.record(Activity::PlacedTile { position: Position::new(1, 1) });
        recorder.record(Activity::BoughtStock { purchases: vec![(Phoenix, 400)] });
        recorder.finish();
        let turn = &recorder.transcript()[0];
        assert_eq!(turn.activities.len(), 2);
        assert_eq!(turn.activities[1], Activity::BoughtStock { purchases: vec![(Phoenix, 400)] });
    }
}

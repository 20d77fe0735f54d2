use serde::{Deserialize, Serialize};

use super::position::Position;

/// A tile in a player's hand (or in the stack, prior to being dealt). Once
/// played it leaves the hand and becomes a placed tile on the [`super::board::Board`];
/// this struct only needs to track the flag that matters while it's still in
/// a hand: whether playing it is currently illegal and marked exchangeable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tile {
    pub position: Position,
    pub exchangeable: bool,
}

impl Tile {
    pub fn new(position: Position) -> Self {
        Self { position, exchangeable: false }
    }
}

/// A player's hand of up to 6 tiles.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Hand {
    tiles: Vec<Tile>,
}

impl Hand {
    pub const CAPACITY: usize = 6;

    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.tiles.len() >= Self::CAPACITY
    }

    pub fn contains(&self, position: Position) -> bool {
        self.tiles.iter().any(|t| t.position == position)
    }

    /// Inserts a tile, returning it back if the hand is already full.
    pub fn insert(&mut self, tile: Tile) -> Result<(), Tile> {
        if self.is_full() {
            Err(tile)
        } else {
            self.tiles.push(tile);
            Ok(())
        }
    }

    /// Removes a tile by position. Returns `true` if it was present.
    pub fn remove(&mut self, position: Position) -> bool {
        let before = self.tiles.len();
        self.tiles.retain(|t| t.position != position);
        self.tiles.len() != before
    }

    /// The first tile marked exchangeable, if any. Used by the engine's
    /// end-of-turn refill step.
    pub fn first_exchangeable(&self) -> Option<Position> {
        self.tiles.iter().find(|t| t.exchangeable).map(|t| t.position)
    }

    pub fn mark_exchangeable(&mut self, position: Position) {
        if let Some(tile) = self.tiles.iter_mut().find(|t| t.position == position) {
            tile.exchangeable = true;
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Tile> {
        self.tiles.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Tile> {
        self.tiles.iter_mut()
    }
}

/// The shuffled draw pile. The shuffle itself is an injected dependency so
/// tests can supply identity or reverse permutations for determinism instead
/// of depending on `rand`.
#[derive(Debug, Clone)]
pub struct TileStack {
    /// Tiles remaining to be drawn; the back of the vec is the head of the
    /// pile so `draw` is an O(1) pop.
    remaining: Vec<Position>,
}

impl TileStack {
    pub fn new(shuffle: impl FnOnce(&mut Vec<Position>)) -> Self {
        let mut positions: Vec<Position> = Position::all().collect();
        shuffle(&mut positions);
        Self { remaining: positions }
    }

    pub fn len(&self) -> usize {
        self.remaining.len()
    }

    pub fn is_empty(&self) -> bool {
        self.remaining.is_empty()
    }

    pub fn draw(&mut self) -> Option<Tile> {
        self.remaining.pop().map(Tile::new)
    }

    /// Removes up to `n` tiles from the head of the pile.
    pub fn draw_many(&mut self, n: usize) -> Vec<Tile> {
        let mut out = Vec::with_capacity(n);
        for _ in 0..n {
            match self.draw() {
                Some(tile) => out.push(tile),
                None => break,
            }
        }
        out
    }
}

/// Shuffles in place using [`rand::seq::SliceRandom`]; the production
/// entry point passed to [`TileStack::new`].
pub fn random_shuffle(positions: &mut Vec<Position>) {
    use rand::seq::SliceRandom;
    positions.shuffle(&mut rand::thread_rng());
}

/// Leaves the order untouched; useful for deterministic tests.
pub fn identity_shuffle(_positions: &mut Vec<Position>) {}

/// Reverses the natural order; the other deterministic permutation useful
/// for tests.
pub fn reverse_shuffle(positions: &mut Vec<Position>) {
    positions.reverse();
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn identity_shuffle_draws_in_board_order() {
        let mut stack = TileStack::new(identity_shuffle);
        assert_eq!(stack.len(), 108);
        let first = stack.draw().unwrap();
        // identity_shuffle leaves Position::all()'s order untouched, and draw
        // pops from the back, so the first draw is the last position listed.
        assert_eq!(first.position, Position::new(8, 11));
    }

    #[test]
    fn draw_many_stops_when_exhausted() {
        let mut stack = TileStack::new(identity_shuffle);
        let drained = stack.draw_many(200);
        assert_eq!(drained.len(), 108);
        assert!(stack.is_empty());
    }

    #[test]
    fn hand_capacity_enforced() {
        let mut hand = Hand::default();
        for i in 0..6 {
            hand.insert(Tile::new(Position::new(0, i))).unwrap();
        }
        assert!(hand.is_full());
        let rejected = hand.insert(Tile::new(Position::new(1, 0)));
        assert!(rejected.is_err());
    }
}

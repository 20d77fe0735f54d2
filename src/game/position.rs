use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A cell on the board. `row` ranges over `[0, NUM_ROWS)`, `col` over
/// `[0, NUM_COLS)`. Serializes as the compact `"row-col"` form, e.g. `"3-7"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Position {
    row: u8,
    col: u8,
}

impl Position {
    pub const NUM_ROWS: u8 = 9;
    pub const NUM_COLS: u8 = 12;

    pub fn new(row: u8, col: u8) -> Self {
        assert!(row < Self::NUM_ROWS, "row out of range: {row}");
        assert!(col < Self::NUM_COLS, "col out of range: {col}");
        Self { row, col }
    }

    pub fn try_new(row: u8, col: u8) -> Option<Self> {
        if row < Self::NUM_ROWS && col < Self::NUM_COLS {
            Some(Self { row, col })
        } else {
            None
        }
    }

    pub fn row(&self) -> u8 {
        self.row
    }

    pub fn col(&self) -> u8 {
        self.col
    }

    /// Index into a flat `[T; 108]`-shaped array.
    pub fn index(&self) -> usize {
        self.row as usize * Self::NUM_COLS as usize + self.col as usize
    }

    pub fn all() -> impl Iterator<Item = Position> {
        (0..Self::NUM_ROWS)
            .flat_map(|row| (0..Self::NUM_COLS).map(move |col| Position { row, col }))
    }

    pub fn north(&self) -> Option<Position> {
        (self.row > 0).then(|| Position { row: self.row - 1, col: self.col })
    }

    pub fn south(&self) -> Option<Position> {
        (self.row + 1 < Self::NUM_ROWS).then(|| Position { row: self.row + 1, col: self.col })
    }

    pub fn east(&self) -> Option<Position> {
        (self.col + 1 < Self::NUM_COLS).then(|| Position { row: self.row, col: self.col + 1 })
    }

    pub fn west(&self) -> Option<Position> {
        (self.col > 0).then(|| Position { row: self.row, col: self.col - 1 })
    }

    /// The up to four orthogonal neighbors of this cell.
    pub fn neighbors(&self) -> impl Iterator<Item = Position> {
        [self.north(), self.south(), self.east(), self.west()]
            .into_iter()
            .flatten()
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.row, self.col)
    }
}

impl FromStr for Position {
    type Err = PositionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        use PositionParseError::*;

        let mut parts = s.split('-');
        let row_str = parts.next().ok_or(Malformed)?;
        let col_str = parts.next().ok_or(Malformed)?;
        if parts.next().is_some() {
            return Err(Malformed);
        }

        let row: u8 = row_str.parse().map_err(|_| Malformed)?;
        let col: u8 = col_str.parse().map_err(|_| Malformed)?;

        Position::try_new(row, col).ok_or(OutOfRange)
    }
}

impl Serialize for Position {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Position {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let string = String::deserialize(deserializer)?;
        string.parse().map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PositionParseError {
    #[error("expected \"row-col\"")]
    Malformed,
    #[error("row or column out of range")]
    OutOfRange,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parses_round_trip() {
        let pos = Position::new(8, 11);
        assert_eq!(pos.to_string(), "8-11");
        assert_eq!("8-11".parse(), Ok(pos));
    }

    #[test]
    fn rejects_out_of_range() {
        assert_eq!("9-0".parse::<Position>(), Err(PositionParseError::OutOfRange));
        assert_eq!("0-12".parse::<Position>(), Err(PositionParseError::OutOfRange));
    }

    #[test]
    fn neighbors_of_corner_are_two() {
        let corner = Position::new(0, 0);
        assert_eq!(corner.neighbors().count(), 2);
    }

    #[test]
    fn neighbors_of_interior_are_four() {
        let middle = Position::new(4, 6);
        assert_eq!(middle.neighbors().count(), 4);
    }

    #[test]
    fn all_covers_108_cells() {
        assert_eq!(Position::all().count(), 108);
    }
}

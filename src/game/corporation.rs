use std::fmt;
use std::ops;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The seven tradeable corporations. The "incorporated but not yet founded"
/// sentinel is represented separately by [`crate::game::board::Affiliation`]
/// rather than as an eighth variant here, since it is never active nor
/// tradeable and giving it its own identity would force every match on
/// `CorporationId` to carry a dead arm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CorporationId {
    Phoenix,
    Quantum,
    Hydra,
    Fusion,
    America,
    Sackson,
    Zeta,
}

use CorporationId::*;

pub const ALL_CORPORATIONS: [CorporationId; 7] =
    [Phoenix, Quantum, Hydra, Fusion, America, Sackson, Zeta];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    Premium,
    Standard,
    Budget,
}

impl Tier {
    pub fn base_price(&self) -> u32 {
        match self {
            Tier::Premium => 300,
            Tier::Standard => 200,
            Tier::Budget => 100,
        }
    }
}

impl CorporationId {
    pub fn id(&self) -> usize {
        match self {
            Phoenix => 0,
            Quantum => 1,
            Hydra => 2,
            Fusion => 3,
            America => 4,
            Sackson => 5,
            Zeta => 6,
        }
    }

    pub fn tier(&self) -> Tier {
        match self {
            Phoenix | Quantum => Tier::Premium,
            Hydra | Fusion | America => Tier::Standard,
            Sackson | Zeta => Tier::Budget,
        }
    }
}

impl fmt::Display for CorporationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let str = match self {
            Phoenix => "phoenix",
            Quantum => "quantum",
            Hydra => "hydra",
            Fusion => "fusion",
            America => "america",
            Sackson => "sackson",
            Zeta => "zeta",
        };
        write!(f, "{str}")
    }
}

impl FromStr for CorporationId {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match &*s.to_ascii_lowercase() {
            "phoenix" => Ok(Phoenix),
            "quantum" => Ok(Quantum),
            "hydra" => Ok(Hydra),
            "fusion" => Ok(Fusion),
            "america" => Ok(America),
            "sackson" => Ok(Sackson),
            "zeta" => Ok(Zeta),
            _ => Err(()),
        }
    }
}

/// Size → price-band addition on top of a corporation's tier base price.
fn size_band_addition(size: u32) -> u32 {
    match size {
        0 | 1 => 0,
        2 => 100,
        3 => 200,
        4 => 300,
        5 => 400,
        6..=10 => 500,
        11..=20 => 600,
        21..=30 => 700,
        31..=40 => 800,
        _ => 900,
    }
}

/// Derived values for an active corporation at its current size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CorporationStats {
    pub price: u32,
    pub majority_bonus: u32,
    pub minority_bonus: u32,
}

/// Per-chain ledger entry: active flag, size, remaining shares, safety.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Corporation {
    pub active: bool,
    pub size: u32,
    pub remaining_shares: u8,
    pub safe: bool,
}

impl Default for Corporation {
    fn default() -> Self {
        Self { active: false, size: 0, remaining_shares: 25, safe: false }
    }
}

impl Corporation {
    /// Establishes the corporation at the given founding size (the number of
    /// tiles in the connected "incorporated" component that founded it).
    pub fn establish(&mut self, founding_size: u32) {
        self.active = true;
        self.size = founding_size;
        self.remaining_shares = 25;
        self.safe = founding_size >= 11;
    }

    /// Grows the corporation by `n` tiles, marking it safe once size reaches
    /// 11. Returns `true` the first time safety is crossed (this lifetime).
    pub fn grow(&mut self, n: u32) -> bool {
        self.size += n;
        if !self.safe && self.size >= 11 {
            self.safe = true;
            return true;
        }
        false
    }

    pub fn stats(&self, id: CorporationId) -> CorporationStats {
        let price = id.tier().base_price() + size_band_addition(self.size);
        CorporationStats {
            price,
            majority_bonus: price * 10,
            minority_bonus: price * 5,
        }
    }

    /// Resets the corporation to its never-founded state (post-liquidation).
    pub fn liquidate(&mut self) {
        self.active = false;
        self.size = 0;
        self.remaining_shares = 25;
        self.safe = false;
    }
}

/// Maps every [`CorporationId`] to a value using a fixed-size array rather
/// than a hash map, since the key set is small and closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CorporationMap<T> {
    slots: [T; 7],
}

impl<T> CorporationMap<T> {
    pub fn iter(&self) -> impl Iterator<Item = (CorporationId, &T)> {
        ALL_CORPORATIONS.into_iter().zip(self.slots.iter())
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (CorporationId, &mut T)> {
        ALL_CORPORATIONS.into_iter().zip(self.slots.iter_mut())
    }
}

impl<T: Clone> CorporationMap<T> {
    pub fn new(value: T) -> Self {
        Self { slots: [value.clone(), value.clone(), value.clone(), value.clone(), value.clone(), value.clone(), value] }
    }
}

impl<T> ops::Index<CorporationId> for CorporationMap<T> {
    type Output = T;

    fn index(&self, index: CorporationId) -> &Self::Output {
        &self.slots[index.id()]
    }
}

impl<T> ops::IndexMut<CorporationId> for CorporationMap<T> {
    fn index_mut(&mut self, index: CorporationId) -> &mut Self::Output {
        &mut self.slots[index.id()]
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn price_bands() {
        let mut c = Corporation::default();
        c.establish(2);
        assert_eq!(c.stats(Phoenix).price, 400); // premium base 300 + 100
        c.grow(8); // size 10
        assert_eq!(c.stats(Sackson).price, 600); // budget base 100 + 500
    }

    #[test]
    fn becomes_safe_exactly_once() {
        let mut c = Corporation::default();
        c.establish(2);
        assert!(!c.grow(8)); // size 10, not yet safe
        assert!(c.grow(1)); // size 11, crosses safety
        assert!(c.safe);
        assert!(!c.grow(5)); // already safe, no repeated crossing
    }

    #[test]
    fn majority_minority_bonus_multiples() {
        let mut c = Corporation::default();
        c.establish(5);
        let stats = c.stats(Quantum); // size 5 -> price 300+400=700
        assert_eq!(stats.price, 700);
        assert_eq!(stats.majority_bonus, 7000);
        assert_eq!(stats.minority_bonus, 3500);
    }
}

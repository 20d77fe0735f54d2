use super::corporation::{Corporation, CorporationId, CorporationMap};
use super::player::Player;

/// The sole authority for all share movements: buying, selling, trading
/// during a merge, majority/minority bonus computation, and liquidation.
/// Stateless: every operation takes the players and ledger it needs to
/// mutate as plain arguments rather than holding any state of its own.
pub struct StockMarket;

impl StockMarket {
    /// Buys one share of `id` for `player`. A no-op (returning `Err`) if the
    /// corporation isn't active, is out of shares, or the player can't afford
    /// it — the caller is never left partially charged.
    pub fn buy(
        player: &mut Player,
        id: CorporationId,
        ledger: &mut CorporationMap<Corporation>,
    ) -> Result<(), BuyError> {
        let corp = ledger[id];
        if !corp.active {
            return Err(BuyError::NotActive);
        }
        if corp.remaining_shares == 0 {
            return Err(BuyError::OutOfStock);
        }
        let price = corp.stats(id).price;
        if player.balance < price {
            return Err(BuyError::InsufficientFunds { deficit: price - player.balance });
        }

        player.balance -= price;
        player.shares[id] += 1;
        ledger[id].remaining_shares -= 1;
        Ok(())
    }

    /// Applies `buy` for each corporation in order. Shares already added
    /// within the batch count against availability and the player's
    /// remaining balance, so a player cannot overdraw by batching. Purchases
    /// that fail are silently skipped rather than reported as errors.
    pub fn buy_batch(
        player: &mut Player,
        ids: &[CorporationId],
        ledger: &mut CorporationMap<Corporation>,
    ) -> BuyBatchResult {
        let mut purchased = Vec::new();
        for &id in ids {
            if Self::buy(player, id, ledger).is_ok() {
                purchased.push(id);
            }
        }
        BuyBatchResult { purchased }
    }

    /// Sells `n` shares of `id` back to the corporation at the current price.
    pub fn sell(
        player: &mut Player,
        id: CorporationId,
        n: u8,
        ledger: &mut CorporationMap<Corporation>,
    ) -> Result<(), SellError> {
        if player.shares[id] < n {
            return Err(SellError::InsufficientShares);
        }
        let price = ledger[id].stats(id).price;
        player.balance += n as u32 * price;
        player.shares[id] -= n;
        ledger[id].remaining_shares += n;
        Ok(())
    }

    /// Converts `n` shares of a defunct corporation into `n / 2` shares of the
    /// acquirer, 2-for-1. An odd `n` discards the half-share; the player
    /// simply loses it.
    pub fn trade(
        player: &mut Player,
        defunct: CorporationId,
        acquirer: CorporationId,
        n: u8,
        ledger: &mut CorporationMap<Corporation>,
    ) -> Result<(), TradeError> {
        if player.shares[defunct] < n {
            return Err(TradeError::InsufficientShares);
        }
        let converted = n / 2;
        if converted > ledger[acquirer].remaining_shares {
            return Err(TradeError::OutOfStock);
        }

        player.shares[defunct] -= n;
        ledger[defunct].remaining_shares += n;
        player.shares[acquirer] += converted;
        ledger[acquirer].remaining_shares -= converted;
        Ok(())
    }

    /// Partitions players holding `id` shares by count, descending. Ties at
    /// the top all belong to `majority`; `minority` is the next distinct
    /// (lower) count. If no second distinct count exists, `minority` is the
    /// same player set as `majority` — see DESIGN.md for why this reading was
    /// chosen over a literally-empty minority.
    pub fn shareholder_groups(id: CorporationId, players: &[Player]) -> ShareholderGroups {
        let mut holders: Vec<(usize, u8)> = players
            .iter()
            .enumerate()
            .filter(|(_, p)| p.shares[id] > 0)
            .map(|(i, p)| (i, p.shares[id]))
            .collect();

        if holders.is_empty() {
            return ShareholderGroups { majority: Vec::new(), minority: Vec::new() };
        }

        holders.sort_by(|a, b| b.1.cmp(&a.1));
        let top = holders[0].1;
        let majority: Vec<usize> = holders.iter().filter(|(_, c)| *c == top).map(|(i, _)| *i).collect();
        let rest: Vec<(usize, u8)> = holders.into_iter().filter(|(_, c)| *c < top).collect();

        let minority = match rest.first() {
            Some(&(_, second)) => rest.iter().filter(|(_, c)| *c == second).map(|(i, _)| *i).collect(),
            None => majority.clone(),
        };

        ShareholderGroups { majority, minority }
    }

    /// Pays out majority/minority bonuses for `id` once. Integer division
    /// throughout; residuals vanish.
    pub fn distribute_bonuses(id: CorporationId, players: &mut [Player], ledger: &CorporationMap<Corporation>) {
        let stats = ledger[id].stats(id);
        let ShareholderGroups { majority, minority } = Self::shareholder_groups(id, players);

        if majority.is_empty() {
            return;
        }

        if majority.len() > 1 || minority.is_empty() {
            let pool = stats.majority_bonus + stats.minority_bonus;
            let share = pool / majority.len() as u32;
            for &i in &majority {
                players[i].balance += share;
            }
        } else {
            players[majority[0]].balance += stats.majority_bonus;
            if !minority.is_empty() {
                let share = stats.minority_bonus / minority.len() as u32;
                for &i in &minority {
                    players[i].balance += share;
                }
            }
        }
    }

    /// Every player holding `id` sells their shares at the current price, then
    /// the corporation is reset to its never-founded state.
    pub fn liquidate(id: CorporationId, players: &mut [Player], ledger: &mut CorporationMap<Corporation>) {
        let price = ledger[id].stats(id).price;
        for player in players.iter_mut() {
            let n = player.shares[id];
            if n > 0 {
                player.balance += n as u32 * price;
                player.shares[id] = 0;
            }
        }
        ledger[id].liquidate();
    }
}

#[derive(Debug, Clone, Default)]
pub struct BuyBatchResult {
    pub purchased: Vec<CorporationId>,
}

#[derive(Debug, Clone, Default)]
pub struct ShareholderGroups {
    pub majority: Vec<usize>,
    pub minority: Vec<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum BuyError {
    #[error("corporation is not active")]
    NotActive,
    #[error("no shares remain to purchase")]
    OutOfStock,
    #[error("insufficient funds, short by {deficit}")]
    InsufficientFunds { deficit: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SellError {
    #[error("player does not hold that many shares")]
    InsufficientShares,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TradeError {
    #[error("player does not hold that many shares")]
    InsufficientShares,
    #[error("no shares remain in the acquirer to trade for")]
    OutOfStock,
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::game::corporation::CorporationId::*;

    fn ledger_with(id: CorporationId, size: u32) -> CorporationMap<Corporation> {
        let mut ledger = CorporationMap::new(Corporation::default());
        ledger[id].establish(size);
        ledger
    }

    #[test]
    fn buy_debits_balance_and_share_bank() {
        let mut player = Player::new("p1".into(), 6000);
        let mut ledger = ledger_with(Phoenix, 2); // price 400
        StockMarket::buy(&mut player, Phoenix, &mut ledger).unwrap();
        assert_eq!(player.balance, 5600);
        assert_eq!(player.shares[Phoenix], 1);
        assert_eq!(ledger[Phoenix].remaining_shares, 24);
    }

    #[test]
    fn sell_then_buy_restores_balance_at_same_price() {
        let mut player = Player::new("p1".into(), 6000);
        let mut ledger = ledger_with(Quantum, 2);
        StockMarket::buy(&mut player, Quantum, &mut ledger).unwrap();
        let after_buy = player.balance;
        StockMarket::sell(&mut player, Quantum, 1, &mut ledger).unwrap();
        StockMarket::buy(&mut player, Quantum, &mut ledger).unwrap();
        assert_eq!(player.balance, after_buy);
    }

    #[test]
    fn trade_of_one_share_loses_the_half_share() {
        let mut player = Player::new("p1".into(), 0);
        player.shares[Hydra] = 1;
        let mut ledger = ledger_with(Hydra, 3);
        ledger[Fusion].establish(5);
        StockMarket::trade(&mut player, Hydra, Fusion, 1, &mut ledger).unwrap();
        assert_eq!(player.shares[Hydra], 0);
        assert_eq!(player.shares[Fusion], 0);
    }

    #[test]
    fn majority_minority_tie_splits_pool() {
        // p1=5, p2=5, p3=2 shares outstanding, price $200.
        let mut ledger = CorporationMap::new(Corporation::default());
        ledger[Phoenix].establish(2); // will hand-correct price to 200 below
        // Force the exact price the scenario specifies by growing to a band
        // that prices at 200: tier base for Phoenix is 300, so use Sackson
        // (budget, base 100) at size 6..10 (+500) is wrong; instead just grow
        // America (standard, base 200) to size 1 (+0 band) for price 200.
        ledger[America].size = 1;
        ledger[America].active = true;
        ledger[America].remaining_shares = 25 - 12;

        let mut p1 = Player::new("p1".into(), 0);
        p1.shares[America] = 5;
        let mut p2 = Player::new("p2".into(), 0);
        p2.shares[America] = 5;
        let mut p3 = Player::new("p3".into(), 0);
        p3.shares[America] = 2;
        let mut players = [p1, p2, p3];

        StockMarket::distribute_bonuses(America, &mut players, &ledger);

        assert_eq!(players[0].balance, 1500);
        assert_eq!(players[1].balance, 1500);
        assert_eq!(players[2].balance, 0);
    }

    #[test]
    fn liquidate_sells_all_holdings_and_deactivates() {
        let mut ledger = ledger_with(Zeta, 3);
        let mut p1 = Player::new("p1".into(), 0);
        p1.shares[Zeta] = 4;
        let mut players = [p1];
        StockMarket::liquidate(Zeta, &mut players, &mut ledger);
        assert_eq!(players[0].shares[Zeta], 0);
        assert!(players[0].balance > 0);
        assert!(!ledger[Zeta].active);
        assert_eq!(ledger[Zeta].remaining_shares, 25);
    }
}

//! Bet Ledger
//!
//! Authoritative record of every bet. Records are append-only and keyed by a
//! sequential id; the only mutation ever applied to a stored bet is the
//! single unresolved → resolved transition, which writes `won` and
//! `payout_amount` in the same step so no partially-resolved record is
//! observable.
//!
//! # Invariants
//!
//! 1. Ids are unique, assigned in creation order, and never reused.
//! 2. A bet resolves at most once; later attempts fail `AlreadyResolved`.
//! 3. `resolve_at` is fixed at creation and never recomputed.
//! 4. `payout_amount > 0` implies `won`.

use crate::wager::clock::Nanos;
use crate::wager::types::{Amount, Asset, BetId, Direction, OwnerId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// A single wager record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bet {
    pub id: BetId,
    pub owner: OwnerId,
    pub asset: Asset,
    pub direction: Direction,
    pub stake: Amount,
    pub strike_price: i64,
    pub strike_expo: i32,
    pub placed_at: Nanos,
    pub resolve_at: Nanos,
    pub resolved: bool,
    /// Meaningful only when `resolved`.
    pub won: bool,
    /// Payout-asset amount credited to the owner; zero unless `won`.
    pub payout_amount: Amount,
}

impl Bet {
    /// Zero-valued record returned for ids that were never allocated.
    /// Id 0 is never handed out, so a zeroed record is unambiguous.
    pub fn zeroed() -> Self {
        Self {
            id: 0,
            owner: OwnerId::new(""),
            asset: Asset::Btc,
            direction: Direction::Up,
            stake: 0,
            strike_price: 0,
            strike_expo: 0,
            placed_at: 0,
            resolve_at: 0,
            resolved: false,
            won: false,
            payout_amount: 0,
        }
    }
}

/// Ledger failure modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerError {
    NotFound(BetId),
    AlreadyResolved(BetId),
}

impl fmt::Display for LedgerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LedgerError::NotFound(id) => write!(f, "bet {} not found", id),
            LedgerError::AlreadyResolved(id) => write!(f, "bet {} already resolved", id),
        }
    }
}

impl std::error::Error for LedgerError {}

/// Ledger statistics.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LedgerStats {
    pub bets_created: u64,
    pub bets_resolved: u64,
    pub wins: u64,
    pub losses: u64,
}

/// Append-only store of bets plus a per-owner index of ids in insertion
/// order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BetLedger {
    /// Bets indexed by `id - 1`.
    bets: Vec<Bet>,
    by_owner: HashMap<OwnerId, Vec<BetId>>,
    pub stats: LedgerStats,
}

impl BetLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a new unresolved bet and return its id. Callers validate inputs
    /// before reaching the ledger; creation itself has no failure path.
    #[allow(clippy::too_many_arguments)]
    pub fn create(
        &mut self,
        owner: &OwnerId,
        asset: Asset,
        direction: Direction,
        stake: Amount,
        strike_price: i64,
        strike_expo: i32,
        placed_at: Nanos,
        resolve_at: Nanos,
    ) -> BetId {
        let id = self.bets.len() as BetId + 1;
        self.bets.push(Bet {
            id,
            owner: owner.clone(),
            asset,
            direction,
            stake,
            strike_price,
            strike_expo,
            placed_at,
            resolve_at,
            resolved: false,
            won: false,
            payout_amount: 0,
        });
        self.by_owner.entry(owner.clone()).or_default().push(id);
        self.stats.bets_created += 1;
        id
    }

    pub fn lookup(&self, id: BetId) -> Result<&Bet, LedgerError> {
        id.checked_sub(1)
            .and_then(|i| self.bets.get(i as usize))
            .ok_or(LedgerError::NotFound(id))
    }

    /// Flip a bet to resolved, storing outcome and payout in one step.
    pub fn mark_resolved(
        &mut self,
        id: BetId,
        won: bool,
        payout_amount: Amount,
    ) -> Result<(), LedgerError> {
        let bet = id
            .checked_sub(1)
            .and_then(|i| self.bets.get_mut(i as usize))
            .ok_or(LedgerError::NotFound(id))?;
        if bet.resolved {
            return Err(LedgerError::AlreadyResolved(id));
        }
        bet.resolved = true;
        bet.won = won;
        bet.payout_amount = payout_amount;
        self.stats.bets_resolved += 1;
        if won {
            self.stats.wins += 1;
        } else {
            self.stats.losses += 1;
        }
        Ok(())
    }

    /// Ids of an owner's bets in insertion order; empty for unknown owners.
    pub fn bets_of(&self, owner: &OwnerId) -> &[BetId] {
        self.by_owner.get(owner).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Batch lookup. Missing ids yield a zeroed record, not an error.
    pub fn get_bets(&self, ids: &[BetId]) -> Vec<Bet> {
        ids.iter()
            .map(|&id| self.lookup(id).cloned().unwrap_or_else(|_| Bet::zeroed()))
            .collect()
    }

    /// All unresolved bets, for reserve-policy accounting.
    pub fn unresolved(&self) -> impl Iterator<Item = &Bet> {
        self.bets.iter().filter(|b| !b.resolved)
    }

    pub fn len(&self) -> usize {
        self.bets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bets.is_empty()
    }

    /// Rebuild a ledger from persisted records. Records must be in id order
    /// and contiguous from 1.
    pub fn restore(bets: Vec<Bet>) -> Self {
        let mut ledger = Self::new();
        for bet in bets {
            debug_assert_eq!(bet.id, ledger.bets.len() as BetId + 1, "non-contiguous bet ids");
            ledger.by_owner.entry(bet.owner.clone()).or_default().push(bet.id);
            ledger.stats.bets_created += 1;
            if bet.resolved {
                ledger.stats.bets_resolved += 1;
                if bet.won {
                    ledger.stats.wins += 1;
                } else {
                    ledger.stats.losses += 1;
                }
            }
            ledger.bets.push(bet);
        }
        ledger
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owner(s: &str) -> OwnerId {
        OwnerId::new(s)
    }

    fn create_one(ledger: &mut BetLedger, who: &str) -> BetId {
        ledger.create(
            &owner(who),
            Asset::Eth,
            Direction::Up,
            10_000_000,
            300_000,
            -2,
            1_000,
            61_000,
        )
    }

    #[test]
    fn test_ids_sequential_from_one() {
        let mut ledger = BetLedger::new();
        assert_eq!(create_one(&mut ledger, "alice"), 1);
        assert_eq!(create_one(&mut ledger, "bob"), 2);
        assert_eq!(create_one(&mut ledger, "alice"), 3);
    }

    #[test]
    fn test_lookup_unknown_id() {
        let ledger = BetLedger::new();
        assert_eq!(ledger.lookup(1), Err(LedgerError::NotFound(1)));
        assert_eq!(ledger.lookup(0), Err(LedgerError::NotFound(0)));
    }

    #[test]
    fn test_mark_resolved_once() {
        let mut ledger = BetLedger::new();
        let id = create_one(&mut ledger, "alice");

        ledger.mark_resolved(id, true, 42).unwrap();
        let bet = ledger.lookup(id).unwrap();
        assert!(bet.resolved);
        assert!(bet.won);
        assert_eq!(bet.payout_amount, 42);

        // Second attempt fails and leaves the first outcome untouched.
        assert_eq!(
            ledger.mark_resolved(id, false, 0),
            Err(LedgerError::AlreadyResolved(id))
        );
        let bet = ledger.lookup(id).unwrap();
        assert!(bet.won);
        assert_eq!(bet.payout_amount, 42);
    }

    #[test]
    fn test_owner_index_insertion_order() {
        let mut ledger = BetLedger::new();
        let a1 = create_one(&mut ledger, "alice");
        let _b1 = create_one(&mut ledger, "bob");
        let a2 = create_one(&mut ledger, "alice");

        assert_eq!(ledger.bets_of(&owner("alice")), &[a1, a2]);
        assert!(ledger.bets_of(&owner("carol")).is_empty());
    }

    #[test]
    fn test_get_bets_zeroes_missing() {
        let mut ledger = BetLedger::new();
        let id = create_one(&mut ledger, "alice");

        let bets = ledger.get_bets(&[id, 99]);
        assert_eq!(bets.len(), 2);
        assert_eq!(bets[0].id, id);
        assert_eq!(bets[1], Bet::zeroed());
    }

    #[test]
    fn test_restore_rebuilds_index_and_stats() {
        let mut ledger = BetLedger::new();
        let id = create_one(&mut ledger, "alice");
        create_one(&mut ledger, "bob");
        ledger.mark_resolved(id, true, 7).unwrap();

        let restored = BetLedger::restore(ledger.get_bets(&[1, 2]));
        assert_eq!(restored.len(), 2);
        assert_eq!(restored.bets_of(&owner("alice")), &[1]);
        assert_eq!(restored.stats.bets_resolved, 1);
        assert_eq!(restored.stats.wins, 1);
        assert_eq!(restored.unresolved().count(), 1);
    }
}

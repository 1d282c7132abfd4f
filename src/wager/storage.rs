//! Durable State Storage
//!
//! Write-through SQLite persistence for the wager core. The layout mirrors
//! the core's state exactly: an append-only `bets` table keyed by the
//! sequential bet id (the per-owner index is a covering index on it) and a
//! single-row `pool` table holding the two balances. Amounts are stored as
//! decimal text so the full u128 range survives the round trip.
//!
//! The engine stays the single source of truth in memory; the service layer
//! writes each committed mutation through here and restores everything at
//! startup.

use crate::wager::ledger::Bet;
use crate::wager::types::{Amount, Asset, BetId, Direction, OwnerId};
use anyhow::{anyhow, Context, Result};
use parking_lot::Mutex;
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

const SCHEMA_SQL: &str = r#"
PRAGMA journal_mode = WAL;
PRAGMA synchronous = NORMAL;

CREATE TABLE IF NOT EXISTS bets (
    id INTEGER PRIMARY KEY,
    owner TEXT NOT NULL,
    asset TEXT NOT NULL,
    direction TEXT NOT NULL,
    stake TEXT NOT NULL,
    strike_price INTEGER NOT NULL,
    strike_expo INTEGER NOT NULL,
    placed_at INTEGER NOT NULL,
    resolve_at INTEGER NOT NULL,
    resolved INTEGER NOT NULL DEFAULT 0,
    won INTEGER NOT NULL DEFAULT 0,
    payout TEXT NOT NULL DEFAULT '0'
);

CREATE INDEX IF NOT EXISTS idx_bets_owner ON bets(owner, id);

CREATE TABLE IF NOT EXISTS pool (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    stable TEXT NOT NULL,
    payout TEXT NOT NULL
);

INSERT OR IGNORE INTO pool (id, stable, payout) VALUES (1, '0', '0');
"#;

/// SQLite-backed store for bets and pool balances.
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path.as_ref())
            .with_context(|| format!("opening database at {}", path.as_ref().display()))?;
        conn.execute_batch(SCHEMA_SQL).context("applying schema")?;
        info!(path = %path.as_ref().display(), "wager store opened");
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("opening in-memory database")?;
        conn.execute_batch(SCHEMA_SQL).context("applying schema")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Persist a freshly placed bet together with the pool balances it left
    /// behind, in one transaction.
    pub fn record_placement(&self, bet: &Bet, pool_stable: Amount, pool_payout: Amount) -> Result<()> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction().context("starting placement transaction")?;
        tx.execute(
            "INSERT INTO bets (id, owner, asset, direction, stake, strike_price, strike_expo,
                               placed_at, resolve_at, resolved, won, payout)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, 0, 0, '0')",
            params![
                bet.id as i64,
                bet.owner.0,
                bet.asset.as_str(),
                bet.direction.as_str(),
                bet.stake.to_string(),
                bet.strike_price,
                bet.strike_expo,
                bet.placed_at,
                bet.resolve_at,
            ],
        )
        .context("inserting bet")?;
        Self::write_pool(&tx, pool_stable, pool_payout)?;
        tx.commit().context("committing placement")
    }

    /// Persist a resolution outcome and the post-resolution pool balances in
    /// one transaction, so no partially-resolved row is ever durable.
    pub fn record_resolution(
        &self,
        id: BetId,
        won: bool,
        payout: Amount,
        pool_stable: Amount,
        pool_payout: Amount,
    ) -> Result<()> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction().context("starting resolution transaction")?;
        let updated = tx
            .execute(
                "UPDATE bets SET resolved = 1, won = ?2, payout = ?3 WHERE id = ?1 AND resolved = 0",
                params![id as i64, won as i64, payout.to_string()],
            )
            .context("updating bet")?;
        if updated != 1 {
            return Err(anyhow!("bet {} missing or already resolved in store", id));
        }
        Self::write_pool(&tx, pool_stable, pool_payout)?;
        tx.commit().context("committing resolution")
    }

    /// Persist pool balances after a funding or withdrawal mutation.
    pub fn record_pool(&self, pool_stable: Amount, pool_payout: Amount) -> Result<()> {
        let conn = self.conn.lock();
        Self::write_pool(&conn, pool_stable, pool_payout)
    }

    fn write_pool(conn: &Connection, stable: Amount, payout: Amount) -> Result<()> {
        conn.execute(
            "UPDATE pool SET stable = ?1, payout = ?2 WHERE id = 1",
            params![stable.to_string(), payout.to_string()],
        )
        .context("writing pool balances")?;
        Ok(())
    }

    /// Load every bet in id order plus the pool balances.
    pub fn load(&self) -> Result<(Vec<Bet>, Amount, Amount)> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare(
                "SELECT id, owner, asset, direction, stake, strike_price, strike_expo,
                        placed_at, resolve_at, resolved, won, payout
                 FROM bets ORDER BY id",
            )
            .context("preparing bet query")?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, i64>(5)?,
                    row.get::<_, i32>(6)?,
                    row.get::<_, i64>(7)?,
                    row.get::<_, i64>(8)?,
                    row.get::<_, i64>(9)?,
                    row.get::<_, i64>(10)?,
                    row.get::<_, String>(11)?,
                ))
            })
            .context("querying bets")?;

        let mut bets = Vec::new();
        for row in rows {
            let (id, owner, asset, direction, stake, strike_price, strike_expo,
                 placed_at, resolve_at, resolved, won, payout) = row.context("reading bet row")?;
            bets.push(Bet {
                id: id as BetId,
                owner: OwnerId::new(owner),
                asset: Asset::parse(&asset)
                    .ok_or_else(|| anyhow!("unknown asset {:?} in bet {}", asset, id))?,
                direction: Direction::parse(&direction)
                    .ok_or_else(|| anyhow!("unknown direction {:?} in bet {}", direction, id))?,
                stake: parse_amount(&stake).context("parsing stake")?,
                strike_price,
                strike_expo,
                placed_at,
                resolve_at,
                resolved: resolved != 0,
                won: won != 0,
                payout_amount: parse_amount(&payout).context("parsing payout")?,
            });
        }

        let (stable, payout): (String, String) = conn
            .query_row("SELECT stable, payout FROM pool WHERE id = 1", [], |row| {
                Ok((row.get(0)?, row.get(1)?))
            })
            .context("reading pool balances")?;

        Ok((bets, parse_amount(&stable)?, parse_amount(&payout)?))
    }
}

fn parse_amount(s: &str) -> Result<Amount> {
    s.parse::<Amount>()
        .map_err(|e| anyhow!("bad amount {:?}: {}", s, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_bet(id: BetId) -> Bet {
        Bet {
            id,
            owner: OwnerId::new("alice"),
            asset: Asset::Eth,
            direction: Direction::Up,
            stake: 10_000_000,
            strike_price: 300_000,
            strike_expo: -2,
            placed_at: 100,
            resolve_at: 60_000_000_100,
            resolved: false,
            won: false,
            payout_amount: 0,
        }
    }

    #[test]
    fn test_placement_roundtrip() {
        let store = SqliteStore::open_in_memory().unwrap();
        let bet = sample_bet(1);
        store.record_placement(&bet, 110_000_000, 0).unwrap();

        let (bets, stable, payout) = store.load().unwrap();
        assert_eq!(bets, vec![bet]);
        assert_eq!(stable, 110_000_000);
        assert_eq!(payout, 0);
    }

    #[test]
    fn test_resolution_roundtrip_and_replay_guard() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.record_placement(&sample_bet(1), 110_000_000, 0).unwrap();

        store.record_resolution(1, true, 17_600_000, 92_400_000, 0).unwrap();
        let (bets, stable, _) = store.load().unwrap();
        assert!(bets[0].resolved && bets[0].won);
        assert_eq!(bets[0].payout_amount, 17_600_000);
        assert_eq!(stable, 92_400_000);

        // A second resolution write is refused at the store too.
        assert!(store.record_resolution(1, false, 0, 92_400_000, 0).is_err());
        let (bets, _, _) = store.load().unwrap();
        assert!(bets[0].won);
    }

    #[test]
    fn test_large_amounts_survive_text_encoding() {
        let store = SqliteStore::open_in_memory().unwrap();
        let mut bet = sample_bet(1);
        bet.stake = u128::MAX / 2;
        store.record_placement(&bet, u128::MAX, u128::MAX - 1).unwrap();

        let (bets, stable, payout) = store.load().unwrap();
        assert_eq!(bets[0].stake, u128::MAX / 2);
        assert_eq!(stable, u128::MAX);
        assert_eq!(payout, u128::MAX - 1);
    }

    #[test]
    fn test_persisted_file_reopens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wager.db");
        {
            let store = SqliteStore::open(&path).unwrap();
            store.record_placement(&sample_bet(1), 50, 0).unwrap();
        }
        let store = SqliteStore::open(&path).unwrap();
        let (bets, stable, _) = store.load().unwrap();
        assert_eq!(bets.len(), 1);
        assert_eq!(stable, 50);
    }
}

//! Integration tests for the wager service
//!
//! Exercises the full placement → persistence → restart → resolution path
//! through the public library surface, the way the service binary wires it.

use flashwager_backend::wager::{
    Amount, Asset, Direction, FeedRegistry, OwnerId, SettlementEngine, SimOracle, SimSwap,
    SqliteStore, WagerConfig, NANOS_PER_SEC,
};

const ORACLE_FEE: Amount = 100;
const STAKE: Amount = 10_000_000;

fn secs(s: i64) -> i64 {
    s * NANOS_PER_SEC
}

fn new_engine(oracle: &SimOracle, venue: &SimSwap) -> SettlementEngine {
    SettlementEngine::new(
        WagerConfig::default(),
        FeedRegistry::with_default_feeds(),
        OwnerId::new("house-ops"),
        Box::new(oracle.clone()),
        Box::new(venue.clone()),
    )
}

#[test]
fn full_lifecycle_survives_a_restart() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("wager.db");

    let oracle = SimOracle::new(ORACLE_FEE);
    let venue = SimSwap::new(1, 1);
    let feeds = FeedRegistry::with_default_feeds();
    let eth = feeds.feed_for(Asset::Eth).unwrap();
    let alice = OwnerId::new("alice");

    // First process: fund, place, persist.
    let bet_id = {
        let store = SqliteStore::open(&db_path).unwrap();
        let mut engine = new_engine(&oracle, &venue);
        engine.fund(1_000_000_000);

        oracle.push_quote(eth, 300_000, -2, secs(100));
        let receipt = engine
            .place(&alice, Asset::Eth, Direction::Up, STAKE, b"strike", ORACLE_FEE, secs(100))
            .unwrap();
        assert_eq!(receipt.resolve_at, secs(160));

        let balances = engine.balances();
        let bet = engine.lookup(receipt.bet_id).unwrap().clone();
        store.record_placement(&bet, balances.stable, balances.payout).unwrap();
        receipt.bet_id
    };

    // Second process: restore, resolve a win, persist the outcome.
    {
        let store = SqliteStore::open(&db_path).unwrap();
        let (bets, stable, payout) = store.load().unwrap();
        assert_eq!(bets.len(), 1);
        assert_eq!(stable, 1_000_000_000 + STAKE);

        let mut engine = SettlementEngine::restore(
            WagerConfig::default(),
            FeedRegistry::with_default_feeds(),
            OwnerId::new("house-ops"),
            Box::new(oracle.clone()),
            Box::new(venue.clone()),
            bets,
            stable,
            payout,
        );

        oracle.push_quote(eth, 310_000, -2, secs(160));
        let outcome = engine.resolve(bet_id, b"resolution", ORACLE_FEE, secs(160)).unwrap();
        assert!(outcome.won);
        assert_eq!(outcome.swap_input, 17_600_000);
        assert_eq!(venue.credited_to(&alice), outcome.payout_amount);

        let balances = engine.balances();
        store
            .record_resolution(bet_id, outcome.won, outcome.payout_amount, balances.stable, balances.payout)
            .unwrap();
    }

    // Third process: the resolved bet is durable and final.
    {
        let store = SqliteStore::open(&db_path).unwrap();
        let (bets, stable, _) = store.load().unwrap();
        assert!(bets[0].resolved && bets[0].won);
        assert_eq!(stable, 1_000_000_000 + STAKE - 17_600_000);

        let mut engine = SettlementEngine::restore(
            WagerConfig::default(),
            FeedRegistry::with_default_feeds(),
            OwnerId::new("house-ops"),
            Box::new(oracle.clone()),
            Box::new(venue.clone()),
            bets,
            stable,
            0,
        );
        oracle.push_quote(eth, 290_000, -2, secs(170));
        assert!(engine.resolve(bet_id, b"resolution", ORACLE_FEE, secs(170)).is_err());
    }
}

#[test]
fn losing_bet_keeps_stake_in_pool_across_restart() {
    let oracle = SimOracle::new(ORACLE_FEE);
    let venue = SimSwap::new(1, 1);
    let feeds = FeedRegistry::with_default_feeds();
    let eth = feeds.feed_for(Asset::Eth).unwrap();
    let alice = OwnerId::new("alice");

    let store = SqliteStore::open_in_memory().unwrap();
    let mut engine = new_engine(&oracle, &venue);
    engine.fund(100_000_000);

    oracle.push_quote(eth, 300_000, -2, secs(100));
    let receipt = engine
        .place(&alice, Asset::Eth, Direction::Up, STAKE, b"strike", ORACLE_FEE, secs(100))
        .unwrap();
    let balances = engine.balances();
    let bet = engine.lookup(receipt.bet_id).unwrap().clone();
    store.record_placement(&bet, balances.stable, balances.payout).unwrap();

    oracle.push_quote(eth, 290_000, -2, secs(160));
    let outcome = engine
        .resolve(receipt.bet_id, b"resolution", ORACLE_FEE, secs(160))
        .unwrap();
    assert!(!outcome.won);
    let balances = engine.balances();
    store
        .record_resolution(receipt.bet_id, false, 0, balances.stable, balances.payout)
        .unwrap();

    let (bets, stable, _) = store.load().unwrap();
    assert!(bets[0].resolved && !bets[0].won);
    assert_eq!(stable, 100_000_000 + STAKE);
    assert_eq!(venue.credited_to(&alice), 0);
}

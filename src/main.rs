//! Flashwager - Short-Duration Price Wager Service
//!
//! Wires the settlement engine behind the HTTP API. The oracle and swap
//! venue run as simulated in-process collaborators in this binary;
//! deployments against a live oracle network and swap venue implement the
//! `PriceOracle` and `SwapVenue` traits with their own adapters and swap
//! them in here.

use anyhow::{Context, Result};
use clap::Parser;
use dotenv::dotenv;
use flashwager_backend::api::{build_router, AppState};
use flashwager_backend::wager::{
    FeedRegistry, OwnerId, SettlementEngine, SimOracle, SimSwap, SqliteStore, WagerConfig,
};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "flashwager", about = "Short-duration price wager service")]
struct Args {
    /// Port to listen on
    #[arg(long, default_value_t = 8080, env = "FLASHWAGER_PORT")]
    port: u16,

    /// SQLite database path; omit to run without persistence
    #[arg(long, env = "FLASHWAGER_DB")]
    db: Option<String>,

    /// Identity allowed to withdraw from the house pool
    #[arg(long, default_value = "house-ops", env = "FLASHWAGER_OPERATOR")]
    operator: String,

    /// Fee the simulated oracle charges per update, smallest stable unit
    #[arg(long, default_value_t = 100, env = "FLASHWAGER_ORACLE_FEE")]
    oracle_fee: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args = Args::parse();
    let config = WagerConfig::default();
    let feeds = FeedRegistry::with_default_feeds();
    let operator = OwnerId::new(args.operator.clone());

    let oracle = SimOracle::new(args.oracle_fee as u128);
    let venue = SimSwap::new(1, 1);

    let store = match &args.db {
        Some(path) => Some(SqliteStore::open(path)?),
        None => None,
    };

    let engine = match &store {
        Some(store) => {
            let (bets, stable, payout) = store.load().context("restoring wager state")?;
            info!(bets = bets.len(), stable, payout, "restored state from store");
            SettlementEngine::restore(
                config,
                feeds,
                operator,
                Box::new(oracle.clone()),
                Box::new(venue.clone()),
                bets,
                stable,
                payout,
            )
        }
        None => SettlementEngine::new(
            config,
            feeds,
            operator,
            Box::new(oracle.clone()),
            Box::new(venue.clone()),
        ),
    };

    let state = AppState {
        engine: Arc::new(Mutex::new(engine)),
        store,
        sim_oracle: Some(oracle),
    };

    let app = build_router(state).layer(CorsLayer::permissive());
    let addr = format!("0.0.0.0:{}", args.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {}", addr))?;
    info!(%addr, "flashwager listening");
    axum::serve(listener, app).await.context("serving")
}

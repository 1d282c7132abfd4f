//! Short-Duration Price Wager Core
//!
//! Bet lifecycle and settlement for fixed-delay up/down price wagers: a
//! player stakes a stable amount on an asset's direction, the strike price
//! is captured from the oracle at placement, and after a fixed delay the bet
//! resolves against a fresh oracle price inside a bounded window. Winners
//! are paid a fixed multiple of the stake, converted to the payout asset at
//! the swap venue.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      SettlementEngine                       │
//! │   (placement + resolution paths, single serialization       │
//! │    point for all state-changing operations)                 │
//! └─────────────────────────────────────────────────────────────┘
//!          │                  │                    │
//!          ▼                  ▼                    ▼
//!   ┌────────────┐     ┌────────────┐      ┌──────────────┐
//!   │ BetLedger  │     │ HousePool  │      │ FeedRegistry │
//!   │ (records + │     │ (stable +  │      │ (asset→feed) │
//!   │  own index)│     │  payout)   │      └──────────────┘
//!   └────────────┘     └────────────┘
//!          │
//!          ▼                capability seams (trait objects)
//!   ┌────────────┐     ┌─────────────┐     ┌────────────┐
//!   │ SqliteStore│     │ PriceOracle │     │ SwapVenue  │
//!   │ (restore + │     │ (update fee,│     │ (exact-in, │
//!   │  write-thr)│     │  windows)   │     │  any-out)  │
//!   └────────────┘     └─────────────┘     └────────────┘
//! ```
//!
//! # Determinism Guarantees
//!
//! - No wall-clock reads in the core: `now` is passed into each operation.
//! - No floating point in money paths: integral amounts and
//!   mantissa/exponent prices throughout.
//! - All-or-nothing operations: state mutates only after every check and
//!   capability call has succeeded.

pub mod clock;
pub mod config;
pub mod ledger;
pub mod oracle;
pub mod pool;
pub mod settlement;
pub mod sim;
pub mod storage;
pub mod swap;
pub mod types;


// Re-exports for convenience
pub use clock::{unix_nanos_now, Nanos, NANOS_PER_MILLI, NANOS_PER_SEC};
pub use config::WagerConfig;
pub use ledger::{Bet, BetLedger, LedgerError, LedgerStats};
pub use oracle::{FeedRegistry, OracleError, PriceOracle};
pub use pool::{HousePool, PoolBalances, PoolError};
pub use settlement::{
    EngineStats, PlaceError, PlacementReceipt, ResolutionOutcome, ResolveError, SettlementEngine,
};
pub use sim::{SimOracle, SimSwap};
pub use storage::SqliteStore;
pub use swap::{SwapError, SwapVenue};
pub use types::{Amount, Asset, BetId, Direction, FeedId, OwnerId, PriceQuote, TokenKind};

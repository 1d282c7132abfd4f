//! Price Oracle Capability
//!
//! The core consumes prices through this trait and never talks to a concrete
//! oracle network. Update payloads are opaque bytes; applying one costs a
//! quoted fee. Calls are synchronous and all-or-nothing: either a usable
//! quote comes back or the enclosing operation aborts with no state change.

use crate::wager::clock::Nanos;
use crate::wager::types::{Amount, Asset, FeedId, PriceQuote};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Oracle failure modes surfaced to the settlement paths.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OracleError {
    /// Fee payment or update application failed.
    UpdateFailed(String),
    /// Freshest available price is older than the requested bound.
    Stale { publish_time: Nanos, oldest_accepted: Nanos },
    /// Price publish time falls outside the requested acceptance window.
    OutOfWindow {
        publish_time: Nanos,
        lower: Nanos,
        upper: Nanos,
    },
}

impl fmt::Display for OracleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OracleError::UpdateFailed(reason) => write!(f, "oracle update failed: {}", reason),
            OracleError::Stale { publish_time, oldest_accepted } => write!(
                f,
                "price published at {} is older than accepted bound {}",
                publish_time, oldest_accepted
            ),
            OracleError::OutOfWindow { publish_time, lower, upper } => write!(
                f,
                "price published at {} outside window [{}, {}]",
                publish_time, lower, upper
            ),
        }
    }
}

impl std::error::Error for OracleError {}

/// Capability contract with the external price oracle.
pub trait PriceOracle {
    /// Fee required to apply `payload`.
    fn quote_update_fee(&self, payload: &[u8]) -> Amount;

    /// Apply an update payload, paying `fee_value`.
    fn apply_update(&mut self, payload: &[u8], fee_value: Amount) -> Result<(), OracleError>;

    /// Freshest price for `feed`, failing `Stale` when it was published more
    /// than `max_age` before `now`.
    fn price_no_older_than(
        &self,
        feed: FeedId,
        max_age: Nanos,
        now: Nanos,
    ) -> Result<PriceQuote, OracleError>;

    /// Apply `payload` (paying `fee_value`) and return a price for `feed`
    /// whose publish time falls inside `[lower, upper]`.
    fn price_in_window(
        &mut self,
        feed: FeedId,
        payload: &[u8],
        fee_value: Amount,
        lower: Nanos,
        upper: Nanos,
    ) -> Result<PriceQuote, OracleError>;
}

/// Static asset → feed mapping. One entry per supported asset; placement
/// rejects assets with no registered feed.
#[derive(Debug, Clone, Default)]
pub struct FeedRegistry {
    entries: HashMap<Asset, FeedId>,
}

impl FeedRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, asset: Asset, feed: FeedId) {
        self.entries.insert(asset, feed);
    }

    pub fn feed_for(&self, asset: Asset) -> Option<FeedId> {
        self.entries.get(&asset).copied()
    }

    /// Registry with placeholder ids for both supported assets; deployments
    /// register real feed ids instead.
    pub fn with_default_feeds() -> Self {
        let mut btc = [0u8; 32];
        btc[0] = 0xb7;
        btc[1] = 0xc0;
        let mut eth = [0u8; 32];
        eth[0] = 0xe7;
        eth[1] = 0x40;
        let mut registry = Self::new();
        registry.register(Asset::Btc, FeedId(btc));
        registry.register(Asset::Eth, FeedId(eth));
        registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_maps_each_asset() {
        let reg = FeedRegistry::with_default_feeds();
        assert_ne!(reg.feed_for(Asset::Btc), reg.feed_for(Asset::Eth));
        assert!(reg.feed_for(Asset::Btc).is_some());
    }

    #[test]
    fn test_empty_registry_maps_nothing() {
        let reg = FeedRegistry::new();
        assert!(reg.feed_for(Asset::Btc).is_none());
    }
}

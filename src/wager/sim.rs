//! Simulated Collaborators
//!
//! Deterministic in-process oracle and swap venue used by the test suite and
//! by the service binary's reference wiring. Both are cheap clones around a
//! shared inner state, so a test can keep a handle, hand a clone to the
//! engine, and keep scripting prices or injecting failures mid-scenario.
//!
//! The sim oracle treats update payloads as pre-published quotes: scripts
//! push quotes with `push_quote`, and `apply_update` just charges the fee
//! and promotes the newest pushed quote to "latest". This mirrors how a real
//! pull oracle behaves without parsing wire payloads.

use crate::wager::clock::Nanos;
use crate::wager::oracle::{OracleError, PriceOracle};
use crate::wager::swap::{SwapError, SwapVenue};
use crate::wager::types::{Amount, FeedId, OwnerId, PriceQuote, TokenKind};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

// =============================================================================
// SIM ORACLE
// =============================================================================

#[derive(Debug, Default)]
struct SimOracleInner {
    fee: Amount,
    latest: HashMap<FeedId, PriceQuote>,
    /// When set, the next update attempt fails with this reason.
    fail_next_update: Option<String>,
    fees_collected: Amount,
}

/// Scriptable oracle. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct SimOracle {
    inner: Arc<Mutex<SimOracleInner>>,
}

impl SimOracle {
    pub fn new(fee: Amount) -> Self {
        let oracle = Self::default();
        oracle.inner.lock().fee = fee;
        oracle
    }

    /// Publish a quote for `feed`. Becomes the feed's latest immediately.
    pub fn push_quote(&self, feed: FeedId, price: i64, expo: i32, publish_time: Nanos) {
        self.inner
            .lock()
            .latest
            .insert(feed, PriceQuote::new(price, expo, publish_time));
    }

    /// Make the next `apply_update`/`price_in_window` fail.
    pub fn fail_next_update(&self, reason: &str) {
        self.inner.lock().fail_next_update = Some(reason.to_string());
    }

    pub fn fees_collected(&self) -> Amount {
        self.inner.lock().fees_collected
    }
}

impl PriceOracle for SimOracle {
    fn quote_update_fee(&self, _payload: &[u8]) -> Amount {
        self.inner.lock().fee
    }

    fn apply_update(&mut self, _payload: &[u8], fee_value: Amount) -> Result<(), OracleError> {
        let mut inner = self.inner.lock();
        if let Some(reason) = inner.fail_next_update.take() {
            return Err(OracleError::UpdateFailed(reason));
        }
        if fee_value < inner.fee {
            return Err(OracleError::UpdateFailed(format!(
                "update fee {} below quoted {}",
                fee_value, inner.fee
            )));
        }
        inner.fees_collected += inner.fee;
        Ok(())
    }

    fn price_no_older_than(
        &self,
        feed: FeedId,
        max_age: Nanos,
        now: Nanos,
    ) -> Result<PriceQuote, OracleError> {
        let inner = self.inner.lock();
        let quote = inner
            .latest
            .get(&feed)
            .copied()
            .ok_or_else(|| OracleError::UpdateFailed("no quote for feed".to_string()))?;
        let oldest_accepted = now - max_age;
        if quote.publish_time < oldest_accepted {
            return Err(OracleError::Stale {
                publish_time: quote.publish_time,
                oldest_accepted,
            });
        }
        Ok(quote)
    }

    fn price_in_window(
        &mut self,
        feed: FeedId,
        payload: &[u8],
        fee_value: Amount,
        lower: Nanos,
        upper: Nanos,
    ) -> Result<PriceQuote, OracleError> {
        self.apply_update(payload, fee_value)?;
        let inner = self.inner.lock();
        let quote = inner
            .latest
            .get(&feed)
            .copied()
            .ok_or_else(|| OracleError::UpdateFailed("no quote for feed".to_string()))?;
        if quote.publish_time < lower || quote.publish_time > upper {
            return Err(OracleError::OutOfWindow {
                publish_time: quote.publish_time,
                lower,
                upper,
            });
        }
        Ok(quote)
    }
}

// =============================================================================
// SIM SWAP VENUE
// =============================================================================

#[derive(Debug)]
struct SimSwapInner {
    /// Output per unit input, as a rational to keep the math integral.
    rate_num: Amount,
    rate_den: Amount,
    /// Recipient balances in the output asset's smallest unit.
    credited: HashMap<OwnerId, Amount>,
    fail_next: Option<String>,
    swaps_executed: u64,
}

/// Scriptable swap venue. Clones share state; tests read `credited_to` to
/// observe recipient balances.
#[derive(Debug, Clone)]
pub struct SimSwap {
    inner: Arc<Mutex<SimSwapInner>>,
}

impl SimSwap {
    /// Venue converting `rate_num / rate_den` output units per input unit.
    pub fn new(rate_num: Amount, rate_den: Amount) -> Self {
        assert!(rate_den > 0, "swap rate denominator must be nonzero");
        Self {
            inner: Arc::new(Mutex::new(SimSwapInner {
                rate_num,
                rate_den,
                credited: HashMap::new(),
                fail_next: None,
                swaps_executed: 0,
            })),
        }
    }

    /// Venue paying zero output for any input (degenerate but valid).
    pub fn zero_output() -> Self {
        Self::new(0, 1)
    }

    pub fn fail_next(&self, reason: &str) {
        self.inner.lock().fail_next = Some(reason.to_string());
    }

    pub fn set_rate(&self, rate_num: Amount, rate_den: Amount) {
        assert!(rate_den > 0, "swap rate denominator must be nonzero");
        let mut inner = self.inner.lock();
        inner.rate_num = rate_num;
        inner.rate_den = rate_den;
    }

    /// Total output-asset amount credited to `recipient` so far.
    pub fn credited_to(&self, recipient: &OwnerId) -> Amount {
        self.inner.lock().credited.get(recipient).copied().unwrap_or(0)
    }

    pub fn swaps_executed(&self) -> u64 {
        self.inner.lock().swaps_executed
    }
}

impl SwapVenue for SimSwap {
    fn swap_exact_input(
        &mut self,
        _input: TokenKind,
        _output: TokenKind,
        amount_in: Amount,
        recipient: &OwnerId,
    ) -> Result<Amount, SwapError> {
        let mut inner = self.inner.lock();
        if let Some(reason) = inner.fail_next.take() {
            return Err(SwapError::ExecutionFailed(reason));
        }
        let amount_out = amount_in * inner.rate_num / inner.rate_den;
        *inner.credited.entry(recipient.clone()).or_insert(0) += amount_out;
        inner.swaps_executed += 1;
        Ok(amount_out)
    }
}

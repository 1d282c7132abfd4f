//! Wager Engine Configuration

use crate::wager::clock::{secs, Nanos};
use crate::wager::types::Amount;
use serde::{Deserialize, Serialize};

/// Main configuration for the wager engine.
///
/// Amounts are in the stable asset's smallest unit (six decimals by
/// convention, so `1_000_000` = 1.00). The two `Option` fields are hardening
/// policies that default to off, matching the original contract behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WagerConfig {
    /// Smallest accepted stake (inclusive).
    pub min_bet: Amount,

    /// Largest accepted stake (inclusive).
    pub max_bet: Amount,

    /// Winning payout as basis points of the stake (17_600 = 1.76x).
    pub payout_multiplier_bps: u32,

    /// Delay between placement and the earliest valid resolution.
    pub resolve_delay_ns: Nanos,

    /// How long after `resolve_at` resolution stays permitted.
    pub resolve_window_ns: Nanos,

    /// Maximum age of the strike price relative to placement time.
    pub max_price_age_ns: Nanos,

    /// Resolution price may be published this much before `resolve_at`.
    pub resolve_price_early_slack_ns: Nanos,

    /// Resolution price may be published this much after `resolve_at`.
    pub resolve_price_late_slack_ns: Nanos,

    /// When set, a winning swap output below this floor fails the resolution
    /// instead of crediting a dust payout.
    pub min_swap_output: Option<Amount>,

    /// When set, operator withdrawals must leave the pool covering this
    /// fraction (in basis points) of the aggregate payout obligation of
    /// unresolved bets.
    pub withdraw_reserve_bps: Option<u32>,
}

impl Default for WagerConfig {
    fn default() -> Self {
        Self {
            min_bet: 1_000_000,       // 1.00
            max_bet: 250_000_000,     // 250.00
            payout_multiplier_bps: 17_600,
            resolve_delay_ns: secs(60),
            resolve_window_ns: secs(30),
            max_price_age_ns: secs(10),
            resolve_price_early_slack_ns: secs(10),
            resolve_price_late_slack_ns: secs(30),
            min_swap_output: None,
            withdraw_reserve_bps: None,
        }
    }
}

impl WagerConfig {
    /// Payout obligation for a given stake: `floor(stake × bps / 10_000)`.
    #[inline]
    pub fn payout_obligation(&self, stake: Amount) -> Amount {
        stake * self.payout_multiplier_bps as Amount / 10_000
    }
}

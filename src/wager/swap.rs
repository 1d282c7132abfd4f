//! Token Swap Capability
//!
//! Converts a fixed input amount of one pool asset into an
//! unspecified-but-nonnegative output amount of another, crediting the
//! recipient directly. The core enforces no minimum output by default;
//! slippage protection is the venue's concern (an optional policy floor
//! lives in the engine config, not here).

use crate::wager::types::{Amount, OwnerId, TokenKind};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Swap failure modes. Any failure aborts the enclosing resolution with no
/// state change, leaving the bet retryable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SwapError {
    /// Liquidity, path, or approval failure at the venue.
    ExecutionFailed(String),
}

impl fmt::Display for SwapError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SwapError::ExecutionFailed(reason) => write!(f, "swap failed: {}", reason),
        }
    }
}

impl std::error::Error for SwapError {}

/// Capability contract with the external swap venue.
pub trait SwapVenue {
    /// Swap exactly `amount_in` of `input` into `output`, crediting
    /// `recipient` with the full proceeds. Returns the output amount, which
    /// may be zero.
    fn swap_exact_input(
        &mut self,
        input: TokenKind,
        output: TokenKind,
        amount_in: Amount,
        recipient: &OwnerId,
    ) -> Result<Amount, SwapError>;
}

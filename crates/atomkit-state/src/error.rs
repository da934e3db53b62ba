//! Error types for the state module.

use thiserror::Error;

use atomkit_core::{Address, AmountError, Rri};

/// Errors that can occur while reducing particles into state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateError {
    /// Two balances for different keys were merged. Indicates a partitioning bug upstream.
    #[error("cannot merge balance for {other_rri} at {other_address} into {rri} at {address}")]
    BalanceKeyMismatch {
        rri: Rri,
        address: Address,
        other_rri: Rri,
        other_address: Address,
    },

    /// A running sum left the 256-bit range.
    #[error("amount error: {0}")]
    Amount(#[from] AmountError),
}

/// Result type for state operations.
pub type Result<T> = std::result::Result<T, StateError>;

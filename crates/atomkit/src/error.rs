//! Error types for the compiler and the kernel.

use atomkit_core::{
    Address, AmountError, CoreError, NonNegativeAmount, PositiveAmount, Rri, Supply,
    TokenPermission, Universe, ValidationError,
};
use atomkit_state::StateError;
use atomkit_store::StoreError;
use thiserror::Error;

use crate::action::ActionKind;

/// Why a single action could not be staged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActionError {
    /// No definition particle for the token is known.
    #[error("unknown token {0}")]
    UnknownToken(Rri),

    /// The sender does not hold enough tokens.
    #[error("insufficient funds of {rri}: have {available}, need {requested}")]
    InsufficientFunds {
        rri: Rri,
        available: NonNegativeAmount,
        requested: PositiveAmount,
    },

    /// The burner does not hold enough tokens.
    #[error("insufficient funds to burn {rri}: have {available}, need {requested}")]
    InsufficientBurnFunds {
        rri: Rri,
        available: NonNegativeAmount,
        requested: PositiveAmount,
    },

    /// Minting would push total supply past the 256-bit bound.
    #[error("minting {requested} of {rri} exceeds max supply {max_supply} (current {current_supply})")]
    OverMint {
        rri: Rri,
        max_supply: Supply,
        current_supply: Supply,
        requested: PositiveAmount,
    },

    /// The actor may not perform this transition on the token.
    #[error("{actor} lacks {permission} permission on {rri} owned by {owner}")]
    LackingPermission {
        rri: Rri,
        permission: TokenPermission,
        owner: Address,
        actor: Address,
    },

    #[error("amount {amount} is not a multiple of granularity {granularity}")]
    NotGranularityMultiple {
        amount: NonNegativeAmount,
        granularity: PositiveAmount,
    },

    #[error("token {0} has a fixed supply and cannot be minted")]
    CannotMintFixedSupply(Rri),

    #[error("token {0} has a fixed supply and cannot be burned")]
    CannotBurnFixedSupply(Rri),

    #[error("{0} is already claimed by a unique id")]
    RriInUseByUniqueId(Rri),

    #[error("{0} is already claimed by a mutable-supply token")]
    RriInUseByMutableToken(Rri),

    #[error("{0} is already claimed by a fixed-supply token")]
    RriInUseByFixedToken(Rri),

    /// The action itself is malformed.
    #[error("invalid action: {0}")]
    InvalidAction(String),

    #[error("core error: {0}")]
    Core(#[from] CoreError),

    #[error("amount error: {0}")]
    Amount(#[from] AmountError),
}

/// Why a transaction could not be compiled. No atom is produced.
#[derive(Debug, Error)]
pub enum CompileError {
    /// An action failed; later actions were not attempted.
    #[error("action {index} ({kind}) failed: {source}")]
    Action {
        index: usize,
        kind: ActionKind,
        #[source]
        source: ActionError,
    },

    /// Addresses in the transaction span more than one universe.
    #[error("transaction spans more than one universe: {expected} and {found}")]
    UniverseMismatch { expected: Universe, found: Universe },

    #[error("core error: {0}")]
    Core(CoreError),

    /// No mapper is registered for an action kind.
    #[error("no mapper registered for {0}")]
    UnregisteredMapper(ActionKind),

    /// A mapper was handed an action of another kind.
    #[error("mapper for {expected} received a {found} action")]
    MapperMismatch { expected: ActionKind, found: ActionKind },

    /// The assembled atom failed structural validation.
    #[error("compiled atom is invalid: {0}")]
    Validation(#[from] ValidationError),

    #[error("storage error: {0}")]
    Store(#[from] StoreError),
}

impl CompileError {
    /// Index of the failing action, when one action is to blame.
    pub fn action_index(&self) -> Option<usize> {
        match self {
            CompileError::Action { index, .. } => Some(*index),
            _ => None,
        }
    }

    /// The action-level cause, when one action is to blame.
    pub fn action_error(&self) -> Option<&ActionError> {
        match self {
            CompileError::Action { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Errors that can occur during Kernel operations.
#[derive(Debug, Error)]
pub enum KernelError {
    #[error("compile error: {0}")]
    Compile(#[from] CompileError),

    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    #[error("state error: {0}")]
    State(#[from] StateError),

    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),
}

/// Result type for compilation.
pub type Result<T> = std::result::Result<T, CompileError>;

/// Result type for Kernel operations.
pub type KernelResult<T> = std::result::Result<T, KernelError>;

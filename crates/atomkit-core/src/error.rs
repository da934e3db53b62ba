//! Error types for atomkit core.

use thiserror::Error;

use crate::address::Universe;
use crate::types::ParticleId;

/// Errors raised by checked amount construction and arithmetic.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AmountError {
    #[error("amount must be positive")]
    Zero,

    #[error("amount overflows the 256-bit bound")]
    Overflow,

    #[error("amount underflows zero")]
    Underflow,

    #[error("invalid amount: {0}")]
    Parse(String),
}

/// Core errors raised while constructing addresses, identifiers, groups and atoms.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    #[error("addresses span more than one universe: {expected} and {found}")]
    UniverseMismatch { expected: Universe, found: Universe },

    #[error("particle group is empty")]
    EmptyGroup,

    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("address checksum mismatch")]
    ChecksumMismatch,

    #[error("invalid rri: {0}")]
    InvalidRri(String),

    #[error("invalid public key")]
    InvalidPublicKey,

    #[error("amount error: {0}")]
    Amount(#[from] AmountError),
}

/// Structural validation errors for a compiled atom.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("atom contains no particle groups")]
    EmptyAtom,

    #[error("particle group {0} is empty")]
    EmptyGroup(usize),

    #[error("particle {0} is spent more than once")]
    DoubleSpend(ParticleId),

    #[error("particle {0} is created more than once")]
    DuplicateOutput(ParticleId),

    #[error("atom spans more than one universe: {expected} and {found}")]
    UniverseMismatch { expected: Universe, found: Universe },
}

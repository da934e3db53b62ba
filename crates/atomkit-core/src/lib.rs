//! # atomkit core
//!
//! Pure primitives for atomkit: amounts, addresses, particles, groups, atoms
//! and canonicalization.
//!
//! This crate contains no I/O, no storage, no networking. It is pure computation
//! over ledger data structures.
//!
//! ## Key Types
//!
//! - [`Particle`] - An immutable fragment of ledger state
//! - [`SpunParticle`] - A particle with its [`Spin`]
//! - [`ParticleGroup`] - Spun particles applied together
//! - [`Atom`] - A candidate ledger transaction
//! - [`ParticleId`] / [`AtomHash`] - Content-addressed identifiers (Blake3)
//!
//! ## Canonicalization
//!
//! Identity is derived from deterministic CBOR. See the [`canonical`] module.

pub mod address;
pub mod amount;
pub mod atom;
pub mod canonical;
pub mod crypto;
pub mod error;
pub mod group;
pub mod particle;
pub mod rri;
pub mod types;
pub mod units;
pub mod validation;

pub use address::{common_universe, Address, Universe};
pub use amount::{NonNegativeAmount, PositiveAmount, PositiveSupply, SignedAmount, Supply};
pub use atom::{Atom, TIMESTAMP_KEY};
pub use canonical::{atom_bytes, particle_bytes};
pub use crypto::{Blake3Hash, Ed25519PublicKey, Keypair};
pub use error::{AmountError, CoreError, ValidationError};
pub use group::{ParticleGroup, ParticleGroupBuilder};
pub use particle::{
    FixedSupplyTokenDefinition, MessageParticle, MutableSupplyTokenDefinition, Particle,
    ParticleKind, RriParticle, Spin, SpunParticle, TokenPermission, TokenPermissions,
    TokenTransition, TransferrableTokens, UnallocatedTokens, UniqueParticle,
};
pub use rri::Rri;
pub use types::{AtomHash, ParticleId};
pub use validation::validate_atom;

/// Re-exported so downstream crates name the same 256-bit type.
pub use primitive_types::U256;

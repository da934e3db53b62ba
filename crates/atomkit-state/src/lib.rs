//! # atomkit state
//!
//! Reducers that fold observed particles into application state.
//!
//! ## Overview
//!
//! The store records which particles are spun up or down at each address.
//! Applications want token definitions, supply and balances instead. The
//! reducers here compute those views by replaying spun particles, either
//! incrementally as observations arrive or in bulk from a store snapshot.
//!
//! ## Key Types
//!
//! - [`ParticleReducer`] - Fold, and combine states built from disjoint particle sets
//! - [`TokenDefinitionsReducer`] / [`TokenState`] - Definition and supply per token
//! - [`TokenBalanceReducer`] / [`TokenBalance`] - Balance per token at one address
//!
//! ## Usage
//!
//! ```rust,no_run
//! use atomkit_state::{reduce, ParticleReducer, TokenBalanceReducer};
//! # fn example(address: atomkit_core::Address, rri: atomkit_core::Rri, ups: Vec<atomkit_core::SpunParticle>) -> atomkit_state::Result<()> {
//! let definitions = reduce(&ups)?;
//! let supply = definitions.total_supply(&rri);
//!
//! let balances = TokenBalanceReducer::new(address).reduce_all(&ups)?;
//! let gold = balances.balance(&rri);
//! # Ok(())
//! # }
//! ```

pub mod balance;
pub mod error;
pub mod reducer;
pub mod token;

pub use balance::{TokenBalance, TokenBalanceReducer, TokenBalanceState};
pub use error::{Result, StateError};
pub use reducer::ParticleReducer;
pub use token::{reduce, TokenDefinition, TokenDefinitionsReducer, TokenDefinitionsState, TokenState};

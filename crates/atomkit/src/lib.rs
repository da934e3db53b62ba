//! # atomkit
//!
//! Client-side transaction compiler and token-state reducers for an
//! atom-based ledger.
//!
//! ## Overview
//!
//! A wallet describes what it wants to do as a list of [`UserAction`]s.
//! The [`TransactionCompiler`] turns that list into a single [`Atom`]: a set
//! of particle groups that spin particles up (create) and down (consume).
//! Each action is handled by a mapper that reads the particles already up
//! in the local ledger store, plus whatever earlier actions in the same
//! transaction produced, and emits the groups that realize it.
//!
//! - **Transfers** consume the sender's tokens greedily and return change.
//! - **Mints and burns** move tokens between a token's unallocated pool and
//!   holders, subject to the token's permissions.
//! - **Token creation** claims a resource name and publishes a definition.
//! - **Unique ids** claim a resource name without a token.
//! - **Messages** carry opaque data between two addresses.
//!
//! Compiled atoms are applied to the local store as soft observations. The
//! reducers in [`state`] fold the resulting up-particles into balances and
//! token definitions.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use atomkit::{CreateTokenAction, Kernel, KernelConfig, TransferTokensAction};
//! use atomkit::core::{Address, Keypair, PositiveAmount, Universe};
//! use atomkit::store::MemoryStore;
//!
//! fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let me = Address::from_keypair(Universe(1), &Keypair::generate());
//!     let you = Address::from_keypair(Universe(1), &Keypair::generate());
//!     let kernel = Kernel::new(MemoryStore::new(), KernelConfig::default());
//!
//!     let create = CreateTokenAction::fixed(me, "GOLD", "Gold", PositiveAmount::from_u64(100)?.into(), PositiveAmount::one())?;
//!     let rri = create.rri.clone();
//!     kernel.execute(&[create.into()], &me)?;
//!
//!     let send = TransferTokensAction::new(me, you, rri.clone(), PositiveAmount::from_u64(30)?);
//!     kernel.execute(&[send.into()], &me)?;
//!
//!     println!("{}", kernel.token_balance(&you, &rri)?.amount());
//!     Ok(())
//! }
//! ```
//!
//! ## Re-exports
//!
//! - `atomkit::core` - particles, atoms, amounts and addresses
//! - `atomkit::store` - the ledger store abstraction, in-memory and SQLite
//! - `atomkit::state` - balance and token-definition reducers

pub mod action;
pub mod clock;
pub mod compiler;
pub mod config;
pub mod error;
pub mod kernel;
pub mod mapper;
pub mod nonce;
pub mod registry;
pub mod transitioner;

// Re-export component crates
pub use atomkit_core as core;
pub use atomkit_state as state;
pub use atomkit_store as store;

pub use action::{
    ActionKind, BurnTokensAction, CreateTokenAction, MintTokensAction, PutUniqueIdAction,
    SendMessageAction, TokenSupply, TransferTokensAction, UserAction,
};
pub use clock::{Clock, FixedClock, SystemClock};
pub use compiler::TransactionCompiler;
pub use config::{CompilerConfig, KernelConfig};
pub use error::{ActionError, CompileError, KernelError, KernelResult, Result};
pub use kernel::Kernel;
pub use mapper::{MapperContext, StateRequirement, StateView, StatefulMapper};
pub use nonce::{NonceSource, RandomNonces, SequentialNonces};
pub use registry::{ErasedMapper, MapperRegistry};

pub use atomkit_core::{Address, Atom, Rri, Universe};

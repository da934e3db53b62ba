//! # atomkit store
//!
//! The local ledger store: what one client has observed about each address.
//! Provides a trait-based interface with SQLite and in-memory
//! implementations.
//!
//! ## Overview
//!
//! The store abstracts local ledger state behind the [`LedgerStore`] trait,
//! keeping the compiler and kernel storage-agnostic. [`SqliteStore`] persists
//! to disk; [`MemoryStore`] keeps everything in memory.
//!
//! ## Key Types
//!
//! - [`LedgerStore`] - The trait for all storage operations
//! - [`AtomObservation`] - A store, delete or head observation
//! - [`NotifyMode`] - Whether a store call publishes events
//! - [`ObservationStream`] - An ordered, replayable per-address event stream
//!
//! ## Usage
//!
//! ```rust,no_run
//! use atomkit_store::{AtomObservation, LedgerStore, MemoryStore, NotifyMode};
//! # fn example(address: atomkit_core::Address, atom: atomkit_core::Atom) -> atomkit_store::Result<()> {
//! let store = MemoryStore::new();
//! let mut stream = store.observations(&address)?;
//! store.store(&address, AtomObservation::stored(atom, 0), NotifyMode::NotifyOnUpdate)?;
//! let event = stream.try_next();
//! let unspent = store.up_particles(&address, None)?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Design Notes
//!
//! - **Idempotent stores**: storing an observation that is already reflected is a no-op
//! - **Soft atoms**: locally applied atoms are evicted by conflicting confirmed ones
//! - **Exactly-once delivery**: subscribers see each published event once, in order

pub mod error;
pub mod memory;
pub mod migration;
pub mod observation;
pub mod sqlite;
pub mod subscription;
pub mod traits;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use observation::{AtomObservation, NotifyMode, ObservationKind, StoreOutcome, StoredAtom};
pub use sqlite::SqliteStore;
pub use subscription::{ObservationHub, ObservationStream, SubscriberId, SubscriberIdGenerator};
pub use traits::{LedgerStore, LedgerStoreExt};

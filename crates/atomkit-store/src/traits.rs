//! LedgerStore trait: the abstract interface for local ledger state.
//!
//! This trait keeps the compiler and the kernel storage-agnostic.
//! Implementations include in-memory (tests, short-lived clients) and SQLite.

use atomkit_core::{Address, AtomHash, ParticleKind, SpunParticle};

use crate::error::Result;
use crate::observation::{AtomObservation, NotifyMode, StoreOutcome, StoredAtom};
use crate::subscription::ObservationStream;

/// The LedgerStore trait: what one client knows about each address.
///
/// # Design Notes
///
/// - **Atomic writes**: each `store` call is applied as a unit with respect to
///   every read and every subscription.
/// - **Idempotent stores**: an observation identical to what is already
///   recorded changes nothing and publishes nothing.
/// - **Up-particles**: a particle is up at an address when some stored atom
///   spins it up and no stored atom spins it down.
/// - **Ordering**: up-particles are returned in ascending `ParticleId` order.
pub trait LedgerStore: Send + Sync {
    // ─────────────────────────────────────────────────────────────────────────
    // Observation Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Record an observation at `address`.
    ///
    /// # Returns
    /// - `Updated` if the store's state changed.
    /// - `Unchanged` if the observation was already reflected.
    fn store(
        &self,
        address: &Address,
        observation: AtomObservation,
        mode: NotifyMode,
    ) -> Result<StoreOutcome>;

    // ─────────────────────────────────────────────────────────────────────────
    // Query Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Particles currently up at `address`, optionally of one kind only.
    fn up_particles(
        &self,
        address: &Address,
        kind: Option<ParticleKind>,
    ) -> Result<Vec<SpunParticle>>;

    /// Atoms recorded at `address`, in the order they were first stored.
    fn stored_atoms(&self, address: &Address) -> Result<Vec<StoredAtom>>;

    /// Whether an atom is recorded at `address`.
    fn contains_atom(&self, address: &Address, hash: &AtomHash) -> Result<bool>;

    /// Whether `address` has been marked synchronized.
    fn is_synced(&self, address: &Address) -> Result<bool>;

    // ─────────────────────────────────────────────────────────────────────────
    // Subscription Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Every past and future published observation for `address`, in order.
    fn observations(&self, address: &Address) -> Result<ObservationStream>;
}

/// Extension trait for common store patterns.
pub trait LedgerStoreExt: LedgerStore {
    /// Record an atom observation under every address its atom touches.
    ///
    /// Head observations carry no atom and are not fanned out.
    fn store_everywhere(
        &self,
        observation: AtomObservation,
        mode: NotifyMode,
    ) -> Result<Vec<(Address, StoreOutcome)>> {
        let addresses = match &observation.atom {
            Some(atom) => atom.addresses(),
            None => return Ok(Vec::new()),
        };
        let mut outcomes = Vec::with_capacity(addresses.len());
        for address in addresses {
            let outcome = self.store(&address, observation.clone(), mode)?;
            outcomes.push((address, outcome));
        }
        Ok(outcomes)
    }

    /// Particles up at `address` of a single kind.
    fn up_particles_of(&self, address: &Address, kind: ParticleKind) -> Result<Vec<SpunParticle>> {
        self.up_particles(address, Some(kind))
    }
}

impl<S: LedgerStore + ?Sized> LedgerStoreExt for S {}

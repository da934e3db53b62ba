//! In-memory implementation of the LedgerStore trait.
//!
//! Same semantics as SQLite but everything lives in memory with no
//! persistence. Thread-safe via RwLock.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::RwLock;

use tracing::{debug, warn};

use atomkit_core::{
    Address, Atom, AtomHash, Particle, ParticleId, ParticleKind, Spin, SpunParticle,
};

use crate::error::{Result, StoreError};
use crate::observation::{AtomObservation, NotifyMode, ObservationKind, StoreOutcome, StoredAtom};
use crate::subscription::{ObservationHub, ObservationStream};
use crate::traits::LedgerStore;

/// In-memory store implementation.
///
/// All data is lost when the store is dropped.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<MemoryStoreInner>,
    hub: ObservationHub,
}

#[derive(Debug, Default)]
struct MemoryStoreInner {
    addresses: HashMap<Address, AddressState>,
}

/// Everything known about one address.
#[derive(Debug, Default)]
struct AddressState {
    /// Atom hashes in first-stored order.
    order: Vec<AtomHash>,

    atoms: HashMap<AtomHash, StoredAtom>,

    /// Spin index over particles that concern this address.
    particles: BTreeMap<ParticleId, ParticleRecord>,

    /// Published events, replayed to new subscribers.
    log: Vec<AtomObservation>,

    synced: bool,
}

#[derive(Debug)]
struct ParticleRecord {
    particle: Particle,
    ups: BTreeSet<AtomHash>,
    downs: BTreeSet<AtomHash>,
}

impl ParticleRecord {
    fn is_up(&self) -> bool {
        !self.ups.is_empty() && self.downs.is_empty()
    }
}

/// Ids of the particles `atom` spins down that concern `address`.
pub(crate) fn down_ids(atom: &Atom, address: &Address) -> BTreeSet<ParticleId> {
    atom.particles(Spin::Down)
        .filter(|p| p.concerns(address))
        .map(Particle::id)
        .collect()
}

impl AddressState {
    fn insert_atom(&mut self, address: &Address, hash: AtomHash, atom: Atom, soft: bool) {
        for spun in atom.spun_particles() {
            if spun.spin == Spin::Neutral || !spun.particle.concerns(address) {
                continue;
            }
            let record = self
                .particles
                .entry(spun.id())
                .or_insert_with(|| ParticleRecord {
                    particle: spun.particle.clone(),
                    ups: BTreeSet::new(),
                    downs: BTreeSet::new(),
                });
            if spun.spin == Spin::Up {
                record.ups.insert(hash);
            } else {
                record.downs.insert(hash);
            }
        }
        self.order.push(hash);
        self.atoms.insert(hash, StoredAtom { atom, soft });
    }

    fn remove_atom(&mut self, hash: &AtomHash) -> Option<StoredAtom> {
        let stored = self.atoms.remove(hash)?;
        self.order.retain(|h| h != hash);
        self.particles.retain(|_, record| {
            record.ups.remove(hash);
            record.downs.remove(hash);
            !(record.ups.is_empty() && record.downs.is_empty())
        });
        Some(stored)
    }

    /// Soft atoms other than `hash` that spin down any of `downs`.
    fn conflicting_soft_atoms(&self, hash: &AtomHash, downs: &BTreeSet<ParticleId>) -> Vec<AtomHash> {
        let conflicting: BTreeSet<AtomHash> = downs
            .iter()
            .filter_map(|id| self.particles.get(id))
            .flat_map(|record| record.downs.iter().copied())
            .filter(|h| h != hash && self.atoms.get(h).map_or(false, |s| s.soft))
            .collect();
        // Evict in stored order.
        self.order
            .iter()
            .filter(|h| conflicting.contains(h))
            .copied()
            .collect()
    }

    /// Evict soft atoms conflicting with a hard store of `atom`.
    ///
    /// Evicted atoms are pushed to `evicted` so they can be removed from
    /// the other addresses they were stored under.
    fn evict_conflicts(
        &mut self,
        address: &Address,
        hash: &AtomHash,
        atom: &Atom,
        timestamp: i64,
        events: &mut Vec<AtomObservation>,
        evicted: &mut Vec<Atom>,
    ) {
        for conflicting in self.conflicting_soft_atoms(hash, &down_ids(atom, address)) {
            if let Some(stored) = self.remove_atom(&conflicting) {
                warn!(%address, atom = %conflicting, "evicting conflicting soft atom");
                events.push(AtomObservation::deleted(stored.atom.clone(), timestamp));
                evicted.push(stored.atom);
            }
        }
    }

    /// Remove `hash` if it is recorded here as soft.
    fn remove_soft(&mut self, hash: &AtomHash) -> Option<StoredAtom> {
        if self.atoms.get(hash).map_or(false, |s| s.soft) {
            self.remove_atom(hash)
        } else {
            None
        }
    }

    fn apply(
        &mut self,
        address: &Address,
        observation: AtomObservation,
        mode: NotifyMode,
        events: &mut Vec<AtomObservation>,
        evicted: &mut Vec<Atom>,
    ) -> Result<StoreOutcome> {
        if observation.kind == ObservationKind::Head {
            if self.synced {
                return Ok(StoreOutcome::Unchanged);
            }
            self.synced = true;
            if mode.notifies_sync() {
                events.push(observation);
            }
            return Ok(StoreOutcome::Updated);
        }

        let atom = observation
            .atom
            .as_ref()
            .ok_or_else(|| StoreError::InvalidData(format!("{} observation without atom", observation.kind)))?;
        let hash = atom.hash();

        match observation.kind {
            ObservationKind::Store => match self.atoms.get(&hash).map(|s| s.soft) {
                // Soft recorded, hard incoming: upgrade.
                Some(true) if !observation.soft => {
                    self.evict_conflicts(address, &hash, atom, observation.timestamp, events, evicted);
                    if let Some(stored) = self.atoms.get_mut(&hash) {
                        stored.soft = false;
                    }
                    events.push(observation);
                    Ok(StoreOutcome::Updated)
                }
                Some(_) => Ok(StoreOutcome::Unchanged),
                None => {
                    if !observation.soft {
                        self.evict_conflicts(address, &hash, atom, observation.timestamp, events, evicted);
                    }
                    self.insert_atom(address, hash, atom.clone(), observation.soft);
                    events.push(observation);
                    Ok(StoreOutcome::Updated)
                }
            },
            ObservationKind::Delete => match self.remove_atom(&hash) {
                Some(_) => {
                    events.push(observation);
                    Ok(StoreOutcome::Updated)
                }
                None => Ok(StoreOutcome::Unchanged),
            },
            ObservationKind::Head => Ok(StoreOutcome::Unchanged),
        }
    }
}

impl MemoryStoreInner {
    /// Remove an evicted soft atom from every address other than `origin`.
    fn evict_elsewhere(
        &mut self,
        origin: &Address,
        atom: &Atom,
        timestamp: i64,
        published: &mut Vec<(Address, AtomObservation)>,
    ) {
        let hash = atom.hash();
        for other in atom.addresses() {
            if &other == origin {
                continue;
            }
            let Some(state) = self.addresses.get_mut(&other) else {
                continue;
            };
            if let Some(stored) = state.remove_soft(&hash) {
                warn!(address = %other, atom = %hash, "evicting conflicting soft atom");
                published.push((other, AtomObservation::deleted(stored.atom, timestamp)));
            }
        }
    }
}

impl MemoryStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl LedgerStore for MemoryStore {
    fn store(
        &self,
        address: &Address,
        observation: AtomObservation,
        mode: NotifyMode,
    ) -> Result<StoreOutcome> {
        let mut inner = self.inner.write().map_err(|_| StoreError::LockPoisoned)?;

        let kind = observation.kind;
        let timestamp = observation.timestamp;
        let mut events = Vec::new();
        let mut evicted = Vec::new();
        let outcome = inner
            .addresses
            .entry(*address)
            .or_default()
            .apply(address, observation, mode, &mut events, &mut evicted)?;

        match outcome {
            StoreOutcome::Updated => debug!(%address, %kind, events = events.len(), "store updated"),
            StoreOutcome::Unchanged => debug!(%address, %kind, "duplicate observation ignored"),
        }

        let mut published: Vec<(Address, AtomObservation)> =
            events.into_iter().map(|event| (*address, event)).collect();
        for atom in &evicted {
            inner.evict_elsewhere(address, atom, timestamp, &mut published);
        }

        if mode.notifies() {
            for (at, event) in &published {
                inner.addresses.entry(*at).or_default().log.push(event.clone());
            }
            for (at, event) in &published {
                self.hub.publish(at, event)?;
            }
        }

        Ok(outcome)
    }

    fn up_particles(
        &self,
        address: &Address,
        kind: Option<ParticleKind>,
    ) -> Result<Vec<SpunParticle>> {
        let inner = self.inner.read().map_err(|_| StoreError::LockPoisoned)?;
        let Some(state) = inner.addresses.get(address) else {
            return Ok(Vec::new());
        };
        Ok(state
            .particles
            .values()
            .filter(|r| r.is_up())
            .filter(|r| kind.map_or(true, |k| r.particle.kind() == k))
            .map(|r| SpunParticle::up(r.particle.clone()))
            .collect())
    }

    fn stored_atoms(&self, address: &Address) -> Result<Vec<StoredAtom>> {
        let inner = self.inner.read().map_err(|_| StoreError::LockPoisoned)?;
        let Some(state) = inner.addresses.get(address) else {
            return Ok(Vec::new());
        };
        Ok(state
            .order
            .iter()
            .filter_map(|h| state.atoms.get(h).cloned())
            .collect())
    }

    fn contains_atom(&self, address: &Address, hash: &AtomHash) -> Result<bool> {
        let inner = self.inner.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(inner
            .addresses
            .get(address)
            .map_or(false, |s| s.atoms.contains_key(hash)))
    }

    fn is_synced(&self, address: &Address) -> Result<bool> {
        let inner = self.inner.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(inner.addresses.get(address).map_or(false, |s| s.synced))
    }

    fn observations(&self, address: &Address) -> Result<ObservationStream> {
        // Write lock: no store may publish between replay and registration.
        let inner = self.inner.write().map_err(|_| StoreError::LockPoisoned)?;
        let backlog = inner
            .addresses
            .get(address)
            .map(|s| s.log.clone())
            .unwrap_or_default();
        self.hub.subscribe(*address, backlog)
    }
}

//! Atoms: candidate ledger transactions.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::address::{common_universe, Address, Universe};
use crate::canonical::atom_bytes;
use crate::error::CoreError;
use crate::group::ParticleGroup;
use crate::particle::{Particle, Spin, SpunParticle};
use crate::types::AtomHash;

/// Metadata key holding the creation time in milliseconds since the epoch.
pub const TIMESTAMP_KEY: &str = "timestamp";

/// An ordered list of particle groups plus metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Atom {
    groups: Vec<ParticleGroup>,
    metadata: BTreeMap<String, String>,
}

impl Atom {
    /// Build an atom, rejecting groups from different universes.
    pub fn new(
        groups: Vec<ParticleGroup>,
        metadata: BTreeMap<String, String>,
    ) -> Result<Self, CoreError> {
        let atom = Self { groups, metadata };
        let addresses = atom.addresses();
        common_universe(&addresses)?;
        Ok(atom)
    }

    pub fn groups(&self) -> &[ParticleGroup] {
        &self.groups
    }

    pub fn metadata(&self) -> &BTreeMap<String, String> {
        &self.metadata
    }

    /// Content hash of the whole atom.
    pub fn hash(&self) -> AtomHash {
        AtomHash(blake3::hash(&atom_bytes(self)).into())
    }

    /// All spun particles in group order.
    pub fn spun_particles(&self) -> impl Iterator<Item = &SpunParticle> {
        self.groups.iter().flat_map(|g| g.particles().iter())
    }

    /// All particles with the given spin, in group order.
    pub fn particles(&self, spin: Spin) -> impl Iterator<Item = &Particle> {
        self.spun_particles()
            .filter(move |sp| sp.spin == spin)
            .map(|sp| &sp.particle)
    }

    /// Every address referenced by any particle.
    pub fn addresses(&self) -> BTreeSet<Address> {
        self.spun_particles()
            .flat_map(|sp| sp.particle.addresses())
            .collect()
    }

    pub fn universe(&self) -> Option<Universe> {
        self.addresses().iter().next().map(Address::universe)
    }

    /// The `timestamp` metadata entry, if present and numeric.
    pub fn timestamp(&self) -> Option<i64> {
        self.metadata.get(TIMESTAMP_KEY)?.parse().ok()
    }
}

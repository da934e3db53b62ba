//! Particle groups: atomically applied lists of spun particles.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::address::{common_universe, Address, Universe};
use crate::error::CoreError;
use crate::particle::{Particle, Spin, SpunParticle};

/// An ordered list of spun particles plus free-form metadata.
///
/// Every address referenced by the particles belongs to one universe; this is
/// checked when the group is built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticleGroup {
    particles: Vec<SpunParticle>,
    metadata: BTreeMap<String, String>,
}

impl ParticleGroup {
    /// Build a group, rejecting empty groups and mixed universes.
    pub fn new(
        particles: Vec<SpunParticle>,
        metadata: BTreeMap<String, String>,
    ) -> Result<Self, CoreError> {
        if particles.is_empty() {
            return Err(CoreError::EmptyGroup);
        }
        let addresses: Vec<Address> = particles
            .iter()
            .flat_map(|sp| sp.particle.addresses())
            .collect();
        common_universe(&addresses)?;
        Ok(Self {
            particles,
            metadata,
        })
    }

    pub fn builder() -> ParticleGroupBuilder {
        ParticleGroupBuilder::default()
    }

    pub fn particles(&self) -> &[SpunParticle] {
        &self.particles
    }

    /// Particles with the given spin, in group order.
    pub fn particles_with_spin(&self, spin: Spin) -> impl Iterator<Item = &Particle> {
        self.particles
            .iter()
            .filter(move |sp| sp.spin == spin)
            .map(|sp| &sp.particle)
    }

    pub fn metadata(&self) -> &BTreeMap<String, String> {
        &self.metadata
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    /// The universe of the group's addresses.
    pub fn universe(&self) -> Option<Universe> {
        self.particles
            .iter()
            .flat_map(|sp| sp.particle.addresses())
            .map(|a| a.universe())
            .next()
    }

    pub fn into_particles(self) -> Vec<SpunParticle> {
        self.particles
    }
}

/// Incremental builder for a [`ParticleGroup`].
#[derive(Debug, Default)]
pub struct ParticleGroupBuilder {
    particles: Vec<SpunParticle>,
    metadata: BTreeMap<String, String>,
}

impl ParticleGroupBuilder {
    pub fn add(mut self, spun: SpunParticle) -> Self {
        self.particles.push(spun);
        self
    }

    pub fn add_all(mut self, spun: impl IntoIterator<Item = SpunParticle>) -> Self {
        self.particles.extend(spun);
        self
    }

    pub fn spin_up(self, particle: impl Into<Particle>) -> Self {
        self.add(SpunParticle::up(particle))
    }

    pub fn spin_down(self, particle: impl Into<Particle>) -> Self {
        self.add(SpunParticle::down(particle))
    }

    pub fn metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn build(self) -> Result<ParticleGroup, CoreError> {
        ParticleGroup::new(self.particles, self.metadata)
    }
}

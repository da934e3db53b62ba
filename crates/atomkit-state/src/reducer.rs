//! The reducer abstraction.
//!
//! A reducer folds spun particles into some application state. States built
//! from disjoint particle sets can be combined, so reduction can be done
//! incrementally as observations arrive or in bulk from a store snapshot.

use atomkit_core::SpunParticle;

use crate::error::Result;

/// Folds spun particles into a state.
pub trait ParticleReducer {
    type State;

    /// The state before any particle is seen.
    fn initial_state(&self) -> Self::State;

    /// Apply one spun particle. Particles the reducer does not track pass through.
    fn reduce(&self, state: Self::State, particle: &SpunParticle) -> Result<Self::State>;

    /// Combine two states built from disjoint particle sets.
    fn combine(&self, a: Self::State, b: Self::State) -> Result<Self::State>;

    /// Fold a whole sequence starting from the initial state.
    fn reduce_all<'a, I>(&self, particles: I) -> Result<Self::State>
    where
        I: IntoIterator<Item = &'a SpunParticle>,
    {
        particles
            .into_iter()
            .try_fold(self.initial_state(), |state, particle| self.reduce(state, particle))
    }
}

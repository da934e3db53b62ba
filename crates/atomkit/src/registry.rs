//! Mapper registry keyed by action kind.
//!
//! Mappers are typed over their action struct. The registry stores them
//! behind a kind-checked erased interface: an action is only ever handed to
//! the mapper registered for its kind, and a mismatch is an error rather
//! than a bad cast.

use std::collections::HashMap;

use atomkit_core::ParticleGroup;

use crate::action::{ActionKind, UserAction};
use crate::error::{ActionError, CompileError, Result};
use crate::mapper::{
    ActionVariant, BurnTokensMapper, CreateTokenMapper, MapperContext, MintTokensMapper,
    PutUniqueIdMapper, SendMessageMapper, StateRequirement, StateView, StatefulMapper,
    TransferTokensMapper,
};

/// A mapper with its action type erased.
pub trait ErasedMapper: Send + Sync {
    fn kind(&self) -> ActionKind;

    fn required_state(&self, action: &UserAction) -> Result<Vec<StateRequirement>>;

    fn particle_groups(
        &self,
        action: &UserAction,
        state: StateView<'_>,
        context: &MapperContext<'_>,
    ) -> Result<std::result::Result<Vec<ParticleGroup>, ActionError>>;
}

struct Typed<M>(M);

impl<M> Typed<M>
where
    M: StatefulMapper,
{
    fn extract<'a>(&self, action: &'a UserAction) -> Result<&'a M::Action> {
        M::Action::extract(action).ok_or(CompileError::MapperMismatch {
            expected: M::Action::KIND,
            found: action.kind(),
        })
    }
}

impl<M> ErasedMapper for Typed<M>
where
    M: StatefulMapper,
{
    fn kind(&self) -> ActionKind {
        M::Action::KIND
    }

    fn required_state(&self, action: &UserAction) -> Result<Vec<StateRequirement>> {
        Ok(self.0.required_state(self.extract(action)?))
    }

    fn particle_groups(
        &self,
        action: &UserAction,
        state: StateView<'_>,
        context: &MapperContext<'_>,
    ) -> Result<std::result::Result<Vec<ParticleGroup>, ActionError>> {
        Ok(self.0.particle_groups(self.extract(action)?, state, context))
    }
}

/// Mappers by action kind.
pub struct MapperRegistry {
    mappers: HashMap<ActionKind, Box<dyn ErasedMapper>>,
}

impl MapperRegistry {
    /// A registry with no mappers.
    pub fn empty() -> Self {
        Self {
            mappers: HashMap::new(),
        }
    }

    /// A registry with a mapper for every action kind.
    pub fn standard() -> Self {
        let mut registry = Self::empty();
        registry.register(TransferTokensMapper);
        registry.register(MintTokensMapper);
        registry.register(BurnTokensMapper);
        registry.register(CreateTokenMapper);
        registry.register(PutUniqueIdMapper);
        registry.register(SendMessageMapper);
        registry
    }

    /// Register `mapper` for its action kind, replacing any earlier one.
    pub fn register<M>(&mut self, mapper: M) -> &mut Self
    where
        M: StatefulMapper + 'static,
    {
        self.mappers.insert(M::Action::KIND, Box::new(Typed(mapper)));
        self
    }

    pub fn contains(&self, kind: ActionKind) -> bool {
        self.mappers.contains_key(&kind)
    }

    /// The mapper for `kind`.
    ///
    /// A missing mapper is a wiring bug: debug builds panic, release builds
    /// return [`CompileError::UnregisteredMapper`].
    pub fn get(&self, kind: ActionKind) -> Result<&dyn ErasedMapper> {
        let mapper = self.mappers.get(&kind);
        debug_assert!(mapper.is_some(), "no mapper registered for {}", kind);
        mapper
            .map(|m| m.as_ref())
            .ok_or(CompileError::UnregisteredMapper(kind))
    }
}

impl Default for MapperRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

impl std::fmt::Debug for MapperRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut kinds: Vec<_> = self.mappers.keys().collect();
        kinds.sort();
        f.debug_struct("MapperRegistry").field("kinds", &kinds).finish()
    }
}

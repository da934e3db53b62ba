//! The transaction compiler.
//!
//! Turns an ordered list of user actions into one atom. Each action sees the
//! store's up-particles for the partitions its mapper asks for, overlaid with
//! everything earlier actions in the same transaction produced, so a later
//! action can spend what an earlier one created before any of it is stored.
//!
//! Compilation is all-or-nothing: the first failing action aborts it, and a
//! successful result has passed structural validation.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use atomkit_core::{
    common_universe, validate_atom, Address, Atom, CoreError, ParticleGroup, ParticleId, Spin,
    SpunParticle, ValidationError, TIMESTAMP_KEY,
};
use atomkit_store::LedgerStore;
use tracing::{debug, info};

use crate::action::UserAction;
use crate::clock::{Clock, SystemClock};
use crate::config::CompilerConfig;
use crate::error::{CompileError, Result};
use crate::mapper::{MapperContext, StateRequirement, StateView};
use crate::nonce::{NonceSource, RandomNonces};
use crate::registry::MapperRegistry;

/// Compiles user actions into atoms against a ledger store.
///
/// Holds no per-transaction state, so one compiler can serve concurrent
/// compilations.
pub struct TransactionCompiler {
    registry: Arc<MapperRegistry>,
    nonces: Arc<dyn NonceSource>,
    clock: Arc<dyn Clock>,
    config: CompilerConfig,
}

impl TransactionCompiler {
    /// A compiler with the standard mappers, random nonces and the system clock.
    pub fn new(config: CompilerConfig) -> Self {
        Self {
            registry: Arc::new(MapperRegistry::standard()),
            nonces: Arc::new(RandomNonces),
            clock: Arc::new(SystemClock),
            config,
        }
    }

    pub fn with_registry(mut self, registry: MapperRegistry) -> Self {
        self.registry = Arc::new(registry);
        self
    }

    pub fn with_nonces(mut self, nonces: Arc<dyn NonceSource>) -> Self {
        self.nonces = nonces;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    pub fn registry(&self) -> &MapperRegistry {
        &self.registry
    }

    /// Compile `actions`, initiated by `active`, into one atom.
    pub fn compile<S>(&self, store: &S, actions: &[UserAction], active: &Address) -> Result<Atom>
    where
        S: LedgerStore + ?Sized,
    {
        self.check_universe(actions, active)?;

        let context = MapperContext::new(*active, self.nonces.as_ref());
        let mut groups: Vec<ParticleGroup> = Vec::new();
        let mut staged: Vec<SpunParticle> = Vec::new();

        for (index, action) in actions.iter().enumerate() {
            let kind = action.kind();
            let mapper = self.registry.get(kind)?;
            let required = mapper.required_state(action)?;
            let view = self.state_for(store, &required, &staged)?;

            let produced = mapper
                .particle_groups(action, StateView::new(&view), &context)?
                .map_err(|source| CompileError::Action {
                    index,
                    kind,
                    source,
                })?;
            debug!(
                index,
                %kind,
                required = required.len(),
                visible = view.len(),
                groups = produced.len(),
                "staged action"
            );

            for group in produced {
                staged.extend(group.particles().iter().cloned());
                groups.push(group);
            }
        }

        let mut metadata = BTreeMap::new();
        if self.config.stamp_timestamp {
            metadata.insert(TIMESTAMP_KEY.to_string(), self.clock.now_millis().to_string());
        }
        let atom = Atom::new(groups, metadata).map_err(universe_error)?;
        if let (Some(expected), Some(found)) = (self.config.universe, atom.universe()) {
            if expected != found {
                return Err(CompileError::UniverseMismatch { expected, found });
            }
        }
        validate_atom(&atom).map_err(|e| match e {
            ValidationError::UniverseMismatch { expected, found } => {
                CompileError::UniverseMismatch { expected, found }
            }
            other => CompileError::Validation(other),
        })?;

        info!(
            hash = %atom.hash(),
            groups = atom.groups().len(),
            actions = actions.len(),
            "compiled atom"
        );
        Ok(atom)
    }

    /// Every address the transaction touches must share one universe.
    fn check_universe(&self, actions: &[UserAction], active: &Address) -> Result<()> {
        let addresses: Vec<Address> = std::iter::once(*active)
            .chain(actions.iter().flat_map(UserAction::addresses))
            .collect();
        let universe = common_universe(&addresses).map_err(universe_error)?;
        match (self.config.universe, universe) {
            (Some(expected), Some(found)) if expected != found => {
                Err(CompileError::UniverseMismatch { expected, found })
            }
            _ => Ok(()),
        }
    }

    /// Store up-particles for `required`, overlaid with staged particles.
    ///
    /// Keyed by content hash, so a staged spin replaces a stored one and the
    /// result comes out in ascending id order.
    fn state_for<S>(
        &self,
        store: &S,
        required: &[StateRequirement],
        staged: &[SpunParticle],
    ) -> Result<Vec<SpunParticle>>
    where
        S: LedgerStore + ?Sized,
    {
        let mut view: BTreeMap<ParticleId, SpunParticle> = BTreeMap::new();
        let partitions: BTreeSet<&StateRequirement> = required.iter().collect();

        for requirement in &partitions {
            for spun in store.up_particles(&requirement.address, Some(requirement.kind))? {
                view.insert(spun.id(), spun);
            }
        }

        for spun in staged {
            if partitions.iter().any(|r| r.matches(&spun.particle)) {
                view.insert(spun.id(), spun.clone());
            }
        }

        Ok(view.into_values().filter(|s| s.spin == Spin::Up).collect())
    }
}

impl Default for TransactionCompiler {
    fn default() -> Self {
        Self::new(CompilerConfig::default())
    }
}

impl std::fmt::Debug for TransactionCompiler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionCompiler")
            .field("registry", &self.registry)
            .field("config", &self.config)
            .finish()
    }
}

fn universe_error(error: CoreError) -> CompileError {
    match error {
        CoreError::UniverseMismatch { expected, found } => {
            CompileError::UniverseMismatch { expected, found }
        }
        other => CompileError::Core(other),
    }
}

//! The Kernel: unified API for atomkit.
//!
//! The Kernel brings together the compiler, a ledger store and the reducers
//! into a cohesive interface for building wallet-side applications.

use std::sync::Arc;

use atomkit_core::{validate_atom, Address, Atom, ParticleKind, Rri};
use atomkit_state::{
    reduce, ParticleReducer, TokenBalance, TokenBalanceReducer, TokenBalanceState,
    TokenDefinitionsState,
};
use atomkit_store::{AtomObservation, LedgerStore, LedgerStoreExt, ObservationStream, StoreOutcome};
use tracing::{debug, info};

use crate::action::UserAction;
use crate::clock::{Clock, SystemClock};
use crate::compiler::TransactionCompiler;
use crate::config::KernelConfig;
use crate::error::KernelResult;
use crate::nonce::{NonceSource, RandomNonces};
use crate::registry::MapperRegistry;

/// The main Kernel struct.
///
/// Provides a unified API for:
/// - Compiling user actions into atoms
/// - Applying compiled atoms to the local store
/// - Querying balances and token definitions
/// - Subscribing to per-address observations
pub struct Kernel<S: LedgerStore> {
    /// The storage backend.
    store: Arc<S>,
    compiler: TransactionCompiler,
    clock: Arc<dyn Clock>,
    config: KernelConfig,
}

impl<S: LedgerStore> Kernel<S> {
    /// Create a new kernel with random nonces and the system clock.
    pub fn new(store: S, config: KernelConfig) -> Self {
        Self::with_parts(
            Arc::new(store),
            config,
            MapperRegistry::standard(),
            Arc::new(RandomNonces),
            Arc::new(SystemClock),
        )
    }

    /// Create a kernel from explicit parts.
    pub fn with_parts(
        store: Arc<S>,
        config: KernelConfig,
        registry: MapperRegistry,
        nonces: Arc<dyn NonceSource>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let compiler = TransactionCompiler::new(config.compiler)
            .with_registry(registry)
            .with_nonces(nonces)
            .with_clock(Arc::clone(&clock));
        Self {
            store,
            compiler,
            clock,
            config,
        }
    }

    /// Get the store reference.
    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn compiler(&self) -> &TransactionCompiler {
        &self.compiler
    }

    pub fn config(&self) -> &KernelConfig {
        &self.config
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Transaction Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Compile `actions` initiated by `active` against the local store.
    pub fn compile(&self, actions: &[UserAction], active: &Address) -> KernelResult<Atom> {
        Ok(self.compiler.compile(self.store.as_ref(), actions, active)?)
    }

    /// Soft-store a compiled atom under every address it touches.
    ///
    /// The atom stays soft until a confirmed copy is stored. A confirmed atom
    /// that spends the same particles evicts it.
    pub fn apply_local(&self, atom: &Atom) -> KernelResult<Vec<(Address, StoreOutcome)>> {
        validate_atom(atom)?;
        let observation = AtomObservation::stored_soft(atom.clone(), self.clock.now_millis());
        let outcomes = self.store.store_everywhere(observation, self.config.local_notify)?;
        let updated = outcomes.iter().filter(|(_, o)| o.is_updated()).count();
        info!(hash = %atom.hash(), addresses = outcomes.len(), updated, "applied atom locally");
        Ok(outcomes)
    }

    /// Compile `actions` and apply the result locally.
    pub fn execute(&self, actions: &[UserAction], active: &Address) -> KernelResult<Atom> {
        let atom = self.compile(actions, active)?;
        self.apply_local(&atom)?;
        Ok(atom)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Query Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Balances of every token held at `address`.
    pub fn token_balances(&self, address: &Address) -> KernelResult<TokenBalanceState> {
        let ups = self.store.up_particles(address, Some(ParticleKind::TransferrableTokens))?;
        let state = TokenBalanceReducer::new(*address).reduce_all(&ups)?;
        debug!(%address, tokens = state.len(), "reduced balances");
        Ok(state)
    }

    /// Balance of one token at `address`; zero when none is held.
    pub fn token_balance(&self, address: &Address, rri: &Rri) -> KernelResult<TokenBalance> {
        let balance = self.token_balances(address)?.balance(rri);
        debug!(%address, %balance, "token balance");
        Ok(balance)
    }

    /// Definitions and supply of every token owned by `address`.
    pub fn token_definitions(&self, address: &Address) -> KernelResult<TokenDefinitionsState> {
        let ups = self.store.up_particles(address, None)?;
        Ok(reduce(&ups)?)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Subscription Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Every past and future observation for `address`, in order.
    pub fn observations(&self, address: &Address) -> KernelResult<ObservationStream> {
        Ok(self.store.observations(address)?)
    }
}

impl<S: LedgerStore> std::fmt::Debug for Kernel<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Kernel")
            .field("compiler", &self.compiler)
            .field("config", &self.config)
            .finish()
    }
}

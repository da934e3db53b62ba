//! Test fixtures and helpers.
//!
//! Common setup code for integration tests: deterministic parties and a
//! ledger harness with sequential nonces and a fixed clock.

use std::sync::Arc;

use atomkit::{
    CompilerConfig, CreateTokenAction, FixedClock, Kernel, KernelConfig, KernelResult,
    MapperRegistry, SequentialNonces, TransferTokensAction, UserAction,
};
use atomkit_core::units::to_subunits;
use atomkit_core::{
    Address, Atom, Keypair, NonNegativeAmount, PositiveAmount, PositiveSupply, Rri, SignedAmount,
    Universe,
};
use atomkit_store::{LedgerStore, MemoryStore, SqliteStore};

/// Universe every fixture lives in unless stated otherwise.
pub const TEST_UNIVERSE: Universe = Universe(0x7a);

/// Clock reading at ledger creation.
pub const GENESIS_MILLIS: i64 = 1_600_000_000_000;

/// A party: a keypair and its address.
pub struct TestFixture {
    pub seed: [u8; 32],
    pub keypair: Keypair,
    pub address: Address,
}

impl TestFixture {
    /// Create a new test fixture with a random seed.
    pub fn new() -> Self {
        Self::with_seed(rand::random())
    }

    /// Create with a deterministic keypair from seed.
    pub fn with_seed(seed: [u8; 32]) -> Self {
        Self::in_universe(seed, TEST_UNIVERSE)
    }

    pub fn in_universe(seed: [u8; 32], universe: Universe) -> Self {
        let keypair = Keypair::from_seed(&seed);
        let address = Address::from_keypair(universe, &keypair);
        Self {
            seed,
            keypair,
            address,
        }
    }

    /// The seed in hex, for reproducing a failing run.
    pub fn seed_hex(&self) -> String {
        hex::encode(self.seed)
    }

    /// The identifier of this party's token `symbol`.
    pub fn token(&self, symbol: &str) -> Rri {
        Rri::token(self.address, symbol).expect("valid token symbol")
    }

    /// The identifier of this party's unique claim `name`.
    pub fn unique(&self, name: &str) -> Rri {
        Rri::new(self.address, name).expect("valid unique name")
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// Create multiple test fixtures for multi-party tests.
pub fn multi_party_fixtures(count: usize) -> Vec<TestFixture> {
    (0..count)
        .map(|i| {
            let mut seed = [0u8; 32];
            seed[0] = i as u8;
            seed[31] = 0xa7;
            TestFixture::with_seed(seed)
        })
        .collect()
}

/// A positive amount from a literal. Panics on zero.
pub fn amount(value: u64) -> PositiveAmount {
    PositiveAmount::from_u64(value).expect("amount must be positive")
}

/// A positive amount of whole tokens, e.g. `"2.5"`. Panics on zero or bad input.
pub fn tokens(value: &str) -> PositiveAmount {
    to_subunits(value)
        .and_then(|subunits| subunits.to_positive())
        .expect("positive token amount")
}

/// A signed amount from a literal.
pub fn signed(value: u64) -> SignedAmount {
    SignedAmount::positive(value.into())
}

/// A kernel over a store, with deterministic nonces and time.
pub struct TestLedger<S: LedgerStore = MemoryStore> {
    pub kernel: Kernel<S>,
    pub clock: Arc<FixedClock>,
}

impl TestLedger<MemoryStore> {
    pub fn new() -> Self {
        Self::over(MemoryStore::new())
    }
}

impl Default for TestLedger<MemoryStore> {
    fn default() -> Self {
        Self::new()
    }
}

impl TestLedger<SqliteStore> {
    /// A ledger over an in-memory SQLite database.
    pub fn sqlite() -> Self {
        Self::over(SqliteStore::open_memory().expect("open in-memory sqlite"))
    }
}

impl<S: LedgerStore> TestLedger<S> {
    pub fn over(store: S) -> Self {
        let clock = Arc::new(FixedClock::new(GENESIS_MILLIS));
        let config = KernelConfig {
            compiler: CompilerConfig::for_universe(TEST_UNIVERSE),
            ..KernelConfig::default()
        };
        let kernel = Kernel::with_parts(
            Arc::new(store),
            config,
            MapperRegistry::standard(),
            Arc::new(SequentialNonces::new()),
            clock.clone(),
        );
        Self { kernel, clock }
    }

    pub fn store(&self) -> &S {
        self.kernel.store()
    }

    /// Compile and apply `actions` as `actor`, one millisecond after the last.
    pub fn execute(&self, actions: &[UserAction], actor: &Address) -> KernelResult<Atom> {
        self.clock.advance(1);
        self.kernel.execute(actions, actor)
    }

    /// Create a fixed-supply token owned by `owner` with granularity one.
    pub fn issue_fixed(&self, owner: &TestFixture, symbol: &str, supply: u64) -> KernelResult<Rri> {
        let supply = PositiveSupply::from(amount(supply));
        let action = CreateTokenAction::fixed(owner.address, symbol, symbol, supply, PositiveAmount::one())
            .expect("valid token symbol");
        let rri = action.rri.clone();
        self.execute(&[action.into()], &owner.address)?;
        Ok(rri)
    }

    /// Create a mutable-supply token owned by `owner`.
    pub fn issue_mutable(
        &self,
        owner: &TestFixture,
        symbol: &str,
        initial: u64,
        granularity: u64,
    ) -> KernelResult<Rri> {
        let action = CreateTokenAction::mutable(
            owner.address,
            symbol,
            symbol,
            NonNegativeAmount::from(initial),
            amount(granularity),
        )
        .expect("valid token symbol");
        let rri = action.rri.clone();
        self.execute(&[action.into()], &owner.address)?;
        Ok(rri)
    }

    pub fn transfer(&self, from: &Address, to: &Address, rri: &Rri, value: u64) -> KernelResult<Atom> {
        let action = TransferTokensAction::new(*from, *to, rri.clone(), amount(value));
        self.execute(&[action.into()], from)
    }

    /// Net balance of `rri` at `address`.
    pub fn balance(&self, address: &Address, rri: &Rri) -> KernelResult<SignedAmount> {
        Ok(self.kernel.token_balance(address, rri)?.amount())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_multi_party() {
        let parties = multi_party_fixtures(3);

        // Each party has unique keys
        let addresses: Vec<_> = parties.iter().map(|p| p.address).collect();
        assert_ne!(addresses[0], addresses[1]);
        assert_ne!(addresses[1], addresses[2]);
        assert_ne!(addresses[0], addresses[2]);
    }

    #[test]
    fn test_tokens_are_scaled_to_subunits() {
        assert_eq!(tokens("1"), amount(1_000_000_000_000_000_000));
        assert_eq!(tokens("0.5"), amount(500_000_000_000_000_000));
    }

    #[test]
    fn test_fixture_is_deterministic() {
        let a = TestFixture::with_seed([9; 32]);
        let b = TestFixture::with_seed([9; 32]);
        assert_eq!(a.address, b.address);
        assert_eq!(a.seed_hex(), "09".repeat(32));
    }

    #[test]
    fn test_ledger_issues_fixed_token() {
        let ledger = TestLedger::new();
        let owner = TestFixture::with_seed([1; 32]);
        let rri = ledger.issue_fixed(&owner, "GOLD", 100).unwrap();

        assert_eq!(rri, owner.token("GOLD"));
        assert_eq!(ledger.balance(&owner.address, &rri).unwrap(), signed(100));
    }

    #[test]
    fn test_sqlite_ledger_transfers() {
        let ledger = TestLedger::sqlite();
        let parties = multi_party_fixtures(2);
        let rri = ledger.issue_fixed(&parties[0], "SILVER", 50).unwrap();
        ledger
            .transfer(&parties[0].address, &parties[1].address, &rri, 20)
            .unwrap();

        assert_eq!(ledger.balance(&parties[0].address, &rri).unwrap(), signed(30));
        assert_eq!(ledger.balance(&parties[1].address, &rri).unwrap(), signed(20));
    }

    #[test]
    fn test_file_ledger_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.db");
        let owner = TestFixture::with_seed([4; 32]);

        let rri = {
            let ledger = TestLedger::over(SqliteStore::open(&path).unwrap());
            ledger.issue_fixed(&owner, "IRON", 12).unwrap()
        };

        let reopened = TestLedger::over(SqliteStore::open(&path).unwrap());
        assert_eq!(reopened.balance(&owner.address, &rri).unwrap(), signed(12));
    }

    #[tokio::test]
    async fn test_ledger_publishes_local_atoms() {
        let ledger = TestLedger::new();
        let owner = TestFixture::with_seed([5; 32]);
        let mut stream = ledger.kernel.observations(&owner.address).unwrap();

        ledger.issue_fixed(&owner, "TIN", 3).unwrap();

        let observation = stream.recv().await.expect("observation");
        assert!(observation.atom.is_some());
    }
}

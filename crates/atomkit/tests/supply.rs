//! Mint and burn flows, and the supply and balances reduced from the store.

use anyhow::Result;
use atomkit::core::{
    NonNegativeAmount, PositiveAmount, Supply, TokenPermission, TokenPermissions, U256,
};
use atomkit::state::{reduce, ParticleReducer, TokenBalanceReducer, TokenState};
use atomkit::store::LedgerStore;
use atomkit::{
    ActionError, BurnTokensAction, CompileError, CreateTokenAction, KernelError, MintTokensAction,
    TokenSupply, UserAction,
};
use atomkit_testkit::{amount, multi_party_fixtures, signed, TestFixture, TestLedger};
use proptest::prelude::*;

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn action_error(error: KernelError) -> ActionError {
    match error {
        KernelError::Compile(CompileError::Action { source, .. }) => source,
        other => panic!("expected an action failure, got {other}"),
    }
}

fn supply_of(ledger: &TestLedger, owner: &TestFixture, symbol: &str) -> Result<Option<U256>> {
    let definitions = ledger.kernel.token_definitions(&owner.address)?;
    Ok(definitions.total_supply(&owner.token(symbol)).map(|s| s.value()))
}

#[test]
fn test_supply_follows_mints_and_burns() -> Result<()> {
    init_tracing();
    let ledger = TestLedger::new();
    let owner = TestFixture::with_seed([1; 32]);
    let rri = ledger.issue_mutable(&owner, "FLUX", 0, 1)?;
    assert_eq!(supply_of(&ledger, &owner, "FLUX")?, Some(U256::zero()));

    let steps: [(bool, u64); 6] = [(true, 100), (false, 3), (true, 5), (false, 7), (true, 13), (false, 17)];
    for (is_mint, value) in steps {
        let action: UserAction = if is_mint {
            MintTokensAction::new(rri.clone(), amount(value), owner.address).into()
        } else {
            BurnTokensAction::new(rri.clone(), amount(value), owner.address).into()
        };
        ledger.execute(&[action], &owner.address)?;
    }

    assert_eq!(supply_of(&ledger, &owner, "FLUX")?, Some(U256::from(91)));
    assert_eq!(ledger.balance(&owner.address, &rri)?, signed(91));
    Ok(())
}

#[test]
fn test_mutable_token_with_initial_supply() -> Result<()> {
    let ledger = TestLedger::new();
    let owner = TestFixture::with_seed([2; 32]);
    let rri = ledger.issue_mutable(&owner, "SEED", 500, 10)?;

    assert_eq!(supply_of(&ledger, &owner, "SEED")?, Some(U256::from(500)));
    assert_eq!(ledger.balance(&owner.address, &rri)?, signed(500));

    let definitions = ledger.kernel.token_definitions(&owner.address)?;
    match definitions.get(&rri) {
        Some(state @ TokenState::Full { .. }) => {
            let definition = state.definition().expect("full state has a definition");
            assert!(definition.is_mutable());
            assert_eq!(definition.granularity(), amount(10));
        }
        other => panic!("expected a full token state, got {other:?}"),
    }
    Ok(())
}

#[test]
fn test_fixed_supply_cannot_change() -> Result<()> {
    let ledger = TestLedger::new();
    let owner = TestFixture::with_seed([3; 32]);
    let rri = ledger.issue_fixed(&owner, "ROCK", 1_000)?;
    assert_eq!(supply_of(&ledger, &owner, "ROCK")?, Some(U256::from(1_000)));

    let mint: UserAction = MintTokensAction::new(rri.clone(), amount(1), owner.address).into();
    let burn: UserAction = BurnTokensAction::new(rri.clone(), amount(1), owner.address).into();

    assert_eq!(
        action_error(ledger.kernel.compile(&[mint], &owner.address).unwrap_err()),
        ActionError::CannotMintFixedSupply(rri.clone())
    );
    assert_eq!(
        action_error(ledger.kernel.compile(&[burn], &owner.address).unwrap_err()),
        ActionError::CannotBurnFixedSupply(rri.clone())
    );
    Ok(())
}

#[test]
fn test_mint_of_unknown_token() -> Result<()> {
    let ledger = TestLedger::new();
    let owner = TestFixture::with_seed([4; 32]);
    let rri = owner.token("NONE");
    let mint: UserAction = MintTokensAction::new(rri.clone(), amount(1), owner.address).into();

    assert_eq!(
        action_error(ledger.kernel.compile(&[mint], &owner.address).unwrap_err()),
        ActionError::UnknownToken(rri)
    );
    Ok(())
}

#[test]
fn test_only_owner_may_mint() -> Result<()> {
    let ledger = TestLedger::new();
    let parties = multi_party_fixtures(2);
    let (owner, outsider) = (&parties[0], &parties[1]);
    let rri = ledger.issue_mutable(owner, "OWN", 0, 1)?;

    let mint: UserAction = MintTokensAction::new(rri.clone(), amount(5), outsider.address).into();
    let err = action_error(ledger.kernel.compile(&[mint], &outsider.address).unwrap_err());

    assert_eq!(
        err,
        ActionError::LackingPermission {
            rri: rri.clone(),
            permission: TokenPermission::TokenOwnerOnly,
            owner: owner.address,
            actor: outsider.address,
        }
    );
    Ok(())
}

#[test]
fn test_open_mint_permission_credits_anyone() -> Result<()> {
    let ledger = TestLedger::new();
    let parties = multi_party_fixtures(2);
    let (owner, minter) = (&parties[0], &parties[1]);
    let mut create = CreateTokenAction::mutable(
        owner.address,
        "OPEN",
        "Open",
        NonNegativeAmount::zero(),
        PositiveAmount::one(),
    )?;
    create.supply = TokenSupply::Mutable {
        initial: NonNegativeAmount::zero(),
        permissions: TokenPermissions {
            mint: TokenPermission::All,
            burn: TokenPermission::TokenOwnerOnly,
        },
    };
    let rri = create.rri.clone();
    ledger.execute(&[create.into()], &owner.address)?;

    let mint = MintTokensAction::new(rri.clone(), amount(9), minter.address);
    ledger.execute(&[mint.into()], &minter.address)?;

    assert_eq!(ledger.balance(&minter.address, &rri)?, signed(9));
    assert_eq!(supply_of(&ledger, owner, "OPEN")?, Some(U256::from(9)));
    Ok(())
}

#[test]
fn test_mint_to_another_address() -> Result<()> {
    let ledger = TestLedger::new();
    let parties = multi_party_fixtures(2);
    let (owner, recipient) = (&parties[0], &parties[1]);
    let rri = ledger.issue_mutable(owner, "GIFT", 0, 1)?;

    let mint = MintTokensAction::new(rri.clone(), amount(12), owner.address).credit_to(recipient.address);
    ledger.execute(&[mint.into()], &owner.address)?;

    assert!(ledger.balance(&owner.address, &rri)?.is_zero());
    assert_eq!(ledger.balance(&recipient.address, &rri)?, signed(12));
    Ok(())
}

#[test]
fn test_over_mint_reports_supply() -> Result<()> {
    let ledger = TestLedger::new();
    let owner = TestFixture::with_seed([6; 32]);
    let rri = ledger.issue_mutable(&owner, "MAX", 0, 1)?;
    ledger.execute(
        &[MintTokensAction::new(rri.clone(), PositiveAmount::max(), owner.address).into()],
        &owner.address,
    )?;

    let one_more: UserAction = MintTokensAction::new(rri.clone(), amount(1), owner.address).into();
    assert_eq!(
        action_error(ledger.kernel.compile(&[one_more], &owner.address).unwrap_err()),
        ActionError::OverMint {
            rri: rri.clone(),
            max_supply: Supply::max(),
            current_supply: Supply::max(),
            requested: amount(1),
        }
    );
    assert_eq!(supply_of(&ledger, &owner, "MAX")?, Some(U256::MAX));
    Ok(())
}

#[test]
fn test_burn_more_than_held() -> Result<()> {
    let ledger = TestLedger::new();
    let owner = TestFixture::with_seed([7; 32]);
    let rri = ledger.issue_mutable(&owner, "ASH", 20, 1)?;

    let burn: UserAction = BurnTokensAction::new(rri.clone(), amount(21), owner.address).into();
    assert_eq!(
        action_error(ledger.kernel.compile(&[burn], &owner.address).unwrap_err()),
        ActionError::InsufficientBurnFunds {
            rri: rri.clone(),
            available: NonNegativeAmount::from(20u64),
            requested: amount(21),
        }
    );
    Ok(())
}

#[test]
fn test_reducers_agree_with_kernel_queries() -> Result<()> {
    let ledger = TestLedger::new();
    let parties = multi_party_fixtures(2);
    let (owner, other) = (&parties[0], &parties[1]);
    let rri = ledger.issue_mutable(owner, "SYNC", 64, 1)?;
    ledger.transfer(&owner.address, &other.address, &rri, 24)?;

    let ups = ledger.store().up_particles(&owner.address, None)?;
    let bulk = TokenBalanceReducer::new(owner.address).reduce_all(&ups)?;

    // Folding two halves separately and combining gives the same state.
    let reducer = TokenBalanceReducer::new(owner.address);
    let (left, right) = ups.split_at(ups.len() / 2);
    let combined = reducer.combine(reducer.reduce_all(left)?, reducer.reduce_all(right)?)?;

    assert_eq!(bulk.balance(&rri).amount(), signed(40));
    assert_eq!(combined.balance(&rri).amount(), signed(40));
    assert_eq!(ledger.balance(&owner.address, &rri)?, signed(40));

    let definitions = reduce(&ups)?;
    assert_eq!(definitions.total_supply(&rri).map(|s| s.value()), Some(U256::from(64)));
    Ok(())
}

#[test]
fn test_missing_balance_is_zero() -> Result<()> {
    let ledger = TestLedger::new();
    let nobody = TestFixture::with_seed([9; 32]);
    let balance = ledger.kernel.token_balance(&nobody.address, &nobody.token("NADA"))?;

    assert!(balance.amount().is_zero());
    assert_eq!(balance.particles().count(), 0);
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn test_supply_is_mints_minus_burns(
        steps in prop::collection::vec((any::<bool>(), 1u64..=50u64), 1..12)
    ) {
        let ledger = TestLedger::new();
        let owner = TestFixture::with_seed([11; 32]);
        let rri = ledger.issue_mutable(&owner, "PROP", 0, 1).unwrap();

        let mut expected: u64 = 0;
        for (is_mint, value) in steps {
            let action: UserAction = if is_mint {
                MintTokensAction::new(rri.clone(), amount(value), owner.address).into()
            } else {
                BurnTokensAction::new(rri.clone(), amount(value), owner.address).into()
            };
            let outcome = ledger.execute(&[action], &owner.address);
            if is_mint {
                prop_assert!(outcome.is_ok());
                expected += value;
            } else if value <= expected {
                prop_assert!(outcome.is_ok());
                expected -= value;
            } else {
                prop_assert!(outcome.is_err());
            }
        }

        prop_assert_eq!(supply_of(&ledger, &owner, "PROP").unwrap(), Some(U256::from(expected)));
        prop_assert_eq!(ledger.balance(&owner.address, &rri).unwrap(), signed(expected));
    }
}

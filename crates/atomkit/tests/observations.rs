//! Local application of compiled atoms and the observations it publishes.

use anyhow::Result;
use atomkit::core::ParticleKind;
use atomkit::store::{
    AtomObservation, LedgerStore, LedgerStoreExt, MemoryStore, NotifyMode, ObservationKind,
    SqliteStore, StoreOutcome,
};
use atomkit::{Clock, KernelConfig, SendMessageAction, TransferTokensAction, UserAction};
use atomkit_testkit::{amount, multi_party_fixtures, signed, TestLedger};

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn message(ledger: &TestLedger<impl LedgerStore>, text: &'static str) -> Result<atomkit::Atom> {
    let parties = multi_party_fixtures(2);
    let action: UserAction =
        SendMessageAction::new(parties[0].address, parties[1].address, text.as_bytes()).into();
    Ok(ledger.kernel.compile(&[action], &parties[0].address)?)
}

fn assert_single_delivery<S: LedgerStore>(ledger: TestLedger<S>) -> Result<()> {
    let parties = multi_party_fixtures(2);
    let atom = message(&ledger, "twice")?;
    let mut stream = ledger.kernel.observations(&parties[1].address)?;

    let first = ledger.kernel.apply_local(&atom)?;
    let second = ledger.kernel.apply_local(&atom)?;

    assert!(first.iter().all(|(_, outcome)| *outcome == StoreOutcome::Updated));
    assert!(second.iter().all(|(_, outcome)| *outcome == StoreOutcome::Unchanged));

    let delivered = stream.drain();
    assert_eq!(delivered.len(), 1);
    assert_eq!(delivered[0].atom_hash(), Some(atom.hash()));
    assert!(delivered[0].soft);
    Ok(())
}

#[test]
fn test_identical_store_delivers_once_in_memory() -> Result<()> {
    init_tracing();
    assert_single_delivery(TestLedger::new())
}

#[test]
fn test_identical_store_delivers_once_in_sqlite() -> Result<()> {
    assert_single_delivery(TestLedger::sqlite())
}

#[test]
fn test_timestamp_does_not_make_a_store_distinct() -> Result<()> {
    let ledger = TestLedger::new();
    let parties = multi_party_fixtures(2);
    let atom = message(&ledger, "again")?;
    let mut stream = ledger.kernel.observations(&parties[0].address)?;

    let store = ledger.store();
    store.store(&parties[0].address, AtomObservation::stored(atom.clone(), 1), NotifyMode::NotifyOnUpdate)?;
    let outcome = store.store(&parties[0].address, AtomObservation::stored(atom, 2), NotifyMode::NotifyOnUpdate)?;

    assert_eq!(outcome, StoreOutcome::Unchanged);
    assert_eq!(stream.drain().len(), 1);
    Ok(())
}

#[test]
fn test_dont_notify_delivers_nothing() -> Result<()> {
    let parties = multi_party_fixtures(2);
    let mut ledger = TestLedger::new();
    ledger.kernel = atomkit::Kernel::with_parts(
        std::sync::Arc::new(MemoryStore::new()),
        KernelConfig {
            local_notify: NotifyMode::DontNotify,
            ..*ledger.kernel.config()
        },
        atomkit::MapperRegistry::standard(),
        std::sync::Arc::new(atomkit::SequentialNonces::new()),
        ledger.clock.clone(),
    );
    let atom = message(&ledger, "quiet")?;
    let mut stream = ledger.kernel.observations(&parties[1].address)?;

    let outcomes = ledger.kernel.apply_local(&atom)?;
    ledger.kernel.apply_local(&atom)?;

    // The store changed, but nobody heard about it.
    assert!(outcomes.iter().all(|(_, outcome)| outcome.is_updated()));
    assert!(stream.drain().is_empty());
    assert!(ledger.store().contains_atom(&parties[1].address, &atom.hash())?);
    Ok(())
}

#[test]
fn test_sync_marker_published_once() -> Result<()> {
    let ledger = TestLedger::new();
    let parties = multi_party_fixtures(1);
    let address = parties[0].address;
    let mut stream = ledger.kernel.observations(&address)?;

    let store = ledger.store();
    let now = ledger.clock.now_millis();
    assert_eq!(
        store.store(&address, AtomObservation::head(now), NotifyMode::NotifyOnUpdateAndSync)?,
        StoreOutcome::Updated
    );
    assert_eq!(
        store.store(&address, AtomObservation::head(now + 1), NotifyMode::NotifyOnUpdateAndSync)?,
        StoreOutcome::Unchanged
    );

    let delivered = stream.drain();
    assert_eq!(delivered.len(), 1);
    assert!(delivered[0].is_head());
    assert!(store.is_synced(&address)?);
    Ok(())
}

fn assert_conflict_evicts_everywhere<S: LedgerStore>(ledger: TestLedger<S>) -> Result<()> {
    let parties = multi_party_fixtures(3);
    let (alice, bob, carol) = (&parties[0], &parties[1], &parties[2]);
    let gold = ledger.issue_fixed(alice, "GOLD", 10)?;

    // Both spend the same particle; only one can be confirmed.
    let to_bob: UserAction = TransferTokensAction::new(alice.address, bob.address, gold.clone(), amount(4)).into();
    let to_carol: UserAction = TransferTokensAction::new(alice.address, carol.address, gold.clone(), amount(6)).into();
    let local = ledger.kernel.compile(&[to_bob], &alice.address)?;
    let confirmed = ledger.kernel.compile(&[to_carol], &alice.address)?;

    ledger.kernel.apply_local(&local)?;
    assert_eq!(ledger.balance(&bob.address, &gold)?, signed(4));

    let mut stream = ledger.kernel.observations(&alice.address)?;
    let mut bobs = ledger.kernel.observations(&bob.address)?;
    let replayed = stream.drain().len();
    assert_eq!(bobs.drain().len(), 1);
    ledger
        .store()
        .store_everywhere(AtomObservation::stored(confirmed.clone(), ledger.clock.now_millis()), NotifyMode::NotifyOnUpdate)?;

    let events = stream.drain();
    assert!(replayed >= 2);
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].kind, ObservationKind::Delete);
    assert_eq!(events[0].atom_hash(), Some(local.hash()));
    assert_eq!(events[1].atom_hash(), Some(confirmed.hash()));

    let bob_events = bobs.drain();
    assert_eq!(bob_events.len(), 1);
    assert_eq!(bob_events[0].kind, ObservationKind::Delete);
    assert_eq!(bob_events[0].atom_hash(), Some(local.hash()));

    assert_eq!(ledger.balance(&alice.address, &gold)?, signed(4));
    assert!(ledger.balance(&bob.address, &gold)?.is_zero());
    assert_eq!(ledger.balance(&carol.address, &gold)?, signed(6));
    assert!(!ledger.store().contains_atom(&alice.address, &local.hash())?);
    assert!(!ledger.store().contains_atom(&bob.address, &local.hash())?);
    Ok(())
}

#[test]
fn test_confirmed_conflict_evicts_local_atom_in_memory() -> Result<()> {
    init_tracing();
    assert_conflict_evicts_everywhere(TestLedger::new())
}

#[test]
fn test_confirmed_conflict_evicts_local_atom_in_sqlite() -> Result<()> {
    assert_conflict_evicts_everywhere(TestLedger::sqlite())
}

#[test]
fn test_confirming_a_local_atom_upgrades_it() -> Result<()> {
    let ledger = TestLedger::sqlite();
    let parties = multi_party_fixtures(2);
    let gold = ledger.issue_fixed(&parties[0], "GOLD", 10)?;
    let atom = ledger.transfer(&parties[0].address, &parties[1].address, &gold, 3)?;

    let outcomes = ledger
        .store()
        .store_everywhere(AtomObservation::stored(atom.clone(), ledger.clock.now_millis()), NotifyMode::NotifyOnUpdate)?;
    assert!(outcomes.iter().all(|(_, outcome)| outcome.is_updated()));

    let stored = ledger.store().stored_atoms(&parties[1].address)?;
    assert_eq!(stored.len(), 1);
    assert!(!stored[0].soft);
    assert_eq!(
        ledger
            .store()
            .up_particles_of(&parties[1].address, ParticleKind::TransferrableTokens)?
            .len(),
        1
    );
    Ok(())
}

#[tokio::test]
async fn test_stream_replays_then_follows() -> Result<()> {
    let ledger = TestLedger::new();
    let parties = multi_party_fixtures(2);
    let gold = ledger.issue_fixed(&parties[0], "GOLD", 10)?;

    // A late subscriber first sees what already happened.
    let mut stream = ledger.kernel.observations(&parties[0].address)?;
    let creation = stream.recv().await.expect("replayed creation");
    assert_eq!(creation.kind, ObservationKind::Store);

    let transfer = ledger.transfer(&parties[0].address, &parties[1].address, &gold, 2)?;
    let next = stream.recv().await.expect("live transfer");
    assert_eq!(next.atom_hash(), Some(transfer.hash()));

    stream.cancel();
    ledger.transfer(&parties[0].address, &parties[1].address, &gold, 2)?;
    assert!(stream.try_next().is_none());
    Ok(())
}

#[tokio::test]
async fn test_streams_are_per_address() -> Result<()> {
    let ledger = TestLedger::sqlite();
    let parties = multi_party_fixtures(3);
    let mut bystander = ledger.kernel.observations(&parties[2].address)?;

    let gold = ledger.issue_fixed(&parties[0], "GOLD", 5)?;
    ledger.transfer(&parties[0].address, &parties[1].address, &gold, 5)?;

    assert!(bystander.try_next().is_none());
    Ok(())
}

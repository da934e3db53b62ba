//! SQLite implementation of the LedgerStore trait.
//!
//! The persistent backend. Uses rusqlite with bundled SQLite. Atoms and
//! particles are stored as CBOR blobs next to a spin index keyed by
//! `(address, particle_id)`; blob comparison in SQLite is bytewise, which
//! matches `ParticleId` ordering.
//!
//! Subscriptions are in memory; the observation log is persisted and replayed.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::{params, Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use atomkit_core::{Address, Atom, AtomHash, Particle, ParticleId, ParticleKind, Spin, SpunParticle};

use crate::error::{Result, StoreError};
use crate::memory::down_ids;
use crate::migration;
use crate::observation::{AtomObservation, NotifyMode, ObservationKind, StoreOutcome, StoredAtom};
use crate::subscription::{ObservationHub, ObservationStream};
use crate::traits::LedgerStore;

/// SQLite-based store implementation.
///
/// Thread-safe via internal Mutex. Every `store` runs in one transaction.
pub struct SqliteStore {
    conn: Mutex<Connection>,
    hub: ObservationHub,
}

impl SqliteStore {
    /// Open a SQLite database at the given path.
    ///
    /// Creates the file and runs migrations if it doesn't exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut conn = Connection::open(path)?;
        migration::migrate(&mut conn)?;
        Ok(Self::from_connection(conn))
    }

    /// Open an in-memory SQLite database.
    ///
    /// Useful for testing.
    pub fn open_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        migration::migrate(&mut conn)?;
        Ok(Self::from_connection(conn))
    }

    fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
            hub: ObservationHub::new(),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StoreError::LockPoisoned)
    }
}

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    ciborium::into_writer(value, &mut buf).map_err(|e| StoreError::Serialization(e.to_string()))?;
    Ok(buf)
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    ciborium::from_reader(bytes).map_err(|e| StoreError::Serialization(e.to_string()))
}

fn atom_hash_from(bytes: &[u8]) -> Result<AtomHash> {
    AtomHash::try_from(bytes).map_err(|_| StoreError::InvalidData("atom hash must be 32 bytes".into()))
}

/// Operations on one address inside an open transaction.
struct AddressTx<'a> {
    conn: &'a Connection,
    address: &'a Address,
    key: Vec<u8>,
}

impl<'a> AddressTx<'a> {
    fn new(conn: &'a Connection, address: &'a Address) -> Self {
        Self {
            conn,
            address,
            key: address.to_bytes().to_vec(),
        }
    }

    fn recorded_soft_flag(&self, hash: &AtomHash) -> Result<Option<bool>> {
        Ok(self
            .conn
            .query_row(
                "SELECT soft FROM atoms WHERE address = ?1 AND atom_hash = ?2",
                params![self.key, hash.as_bytes().as_slice()],
                |row| row.get(0),
            )
            .optional()?)
    }

    fn insert_atom(&self, hash: &AtomHash, atom: &Atom, soft: bool) -> Result<()> {
        let next_seq: i64 = self.conn.query_row(
            "SELECT COALESCE(MAX(stored_seq), 0) + 1 FROM atoms WHERE address = ?1",
            params![self.key],
            |row| row.get(0),
        )?;
        self.conn.execute(
            "INSERT INTO atoms (address, atom_hash, atom, soft, stored_seq)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![self.key, hash.as_bytes().as_slice(), encode(atom)?, soft, next_seq],
        )?;

        for spun in atom.spun_particles() {
            if spun.spin == Spin::Neutral || !spun.particle.concerns(self.address) {
                continue;
            }
            let id = spun.id();
            self.conn.execute(
                "INSERT OR IGNORE INTO particles (address, particle_id, kind, particle)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    self.key,
                    id.as_bytes().as_slice(),
                    spun.kind().to_u8(),
                    encode(&spun.particle)?
                ],
            )?;
            self.conn.execute(
                "INSERT OR IGNORE INTO particle_spins (address, particle_id, atom_hash, spin)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    self.key,
                    id.as_bytes().as_slice(),
                    hash.as_bytes().as_slice(),
                    spun.spin.to_i8()
                ],
            )?;
        }
        Ok(())
    }

    fn remove_atom(&self, hash: &AtomHash) -> Result<Option<StoredAtom>> {
        let row: Option<(Vec<u8>, bool)> = self
            .conn
            .query_row(
                "SELECT atom, soft FROM atoms WHERE address = ?1 AND atom_hash = ?2",
                params![self.key, hash.as_bytes().as_slice()],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;
        let Some((blob, soft)) = row else {
            return Ok(None);
        };

        self.conn.execute(
            "DELETE FROM atoms WHERE address = ?1 AND atom_hash = ?2",
            params![self.key, hash.as_bytes().as_slice()],
        )?;
        self.conn.execute(
            "DELETE FROM particle_spins WHERE address = ?1 AND atom_hash = ?2",
            params![self.key, hash.as_bytes().as_slice()],
        )?;
        self.conn.execute(
            "DELETE FROM particles WHERE address = ?1 AND NOT EXISTS (
                SELECT 1 FROM particle_spins s
                WHERE s.address = particles.address AND s.particle_id = particles.particle_id
            )",
            params![self.key],
        )?;

        Ok(Some(StoredAtom {
            atom: decode(&blob)?,
            soft,
        }))
    }

    /// Soft atoms other than `hash` spinning down any of `downs`, in stored order.
    fn conflicting_soft_atoms(
        &self,
        hash: &AtomHash,
        downs: &BTreeSet<ParticleId>,
    ) -> Result<Vec<AtomHash>> {
        let mut stmt = self.conn.prepare(
            "SELECT a.stored_seq, s.atom_hash FROM particle_spins s
             JOIN atoms a ON a.address = s.address AND a.atom_hash = s.atom_hash
             WHERE s.address = ?1 AND s.particle_id = ?2 AND s.spin = -1 AND a.soft = 1",
        )?;
        let mut found: BTreeMap<i64, AtomHash> = BTreeMap::new();
        for id in downs {
            let rows = stmt
                .query_map(params![self.key, id.as_bytes().as_slice()], |row| {
                    Ok((row.get::<_, i64>(0)?, row.get::<_, Vec<u8>>(1)?))
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            for (seq, bytes) in rows {
                let other = atom_hash_from(&bytes)?;
                if &other != hash {
                    found.insert(seq, other);
                }
            }
        }
        Ok(found.into_values().collect())
    }

    /// Evict soft atoms conflicting with a hard store of `atom`.
    ///
    /// Evicted atoms are pushed to `evicted` so they can be removed from
    /// the other addresses they were stored under.
    fn evict_conflicts(
        &self,
        hash: &AtomHash,
        atom: &Atom,
        timestamp: i64,
        events: &mut Vec<AtomObservation>,
        evicted: &mut Vec<Atom>,
    ) -> Result<()> {
        for conflicting in self.conflicting_soft_atoms(hash, &down_ids(atom, self.address))? {
            if let Some(stored) = self.remove_atom(&conflicting)? {
                warn!(address = %self.address, atom = %conflicting, "evicting conflicting soft atom");
                events.push(AtomObservation::deleted(stored.atom.clone(), timestamp));
                evicted.push(stored.atom);
            }
        }
        Ok(())
    }

    /// Remove `hash` if it is recorded here as soft.
    fn remove_soft(&self, hash: &AtomHash) -> Result<Option<StoredAtom>> {
        match self.recorded_soft_flag(hash)? {
            Some(true) => self.remove_atom(hash),
            _ => Ok(None),
        }
    }

    fn is_synced(&self) -> Result<bool> {
        Ok(self
            .conn
            .query_row(
                "SELECT synced FROM sync_state WHERE address = ?1",
                params![self.key],
                |row| row.get(0),
            )
            .optional()?
            .unwrap_or(false))
    }

    fn apply(
        &self,
        observation: AtomObservation,
        mode: NotifyMode,
        events: &mut Vec<AtomObservation>,
        evicted: &mut Vec<Atom>,
    ) -> Result<StoreOutcome> {
        if observation.kind == ObservationKind::Head {
            if self.is_synced()? {
                return Ok(StoreOutcome::Unchanged);
            }
            self.conn.execute(
                "INSERT OR REPLACE INTO sync_state (address, synced) VALUES (?1, 1)",
                params![self.key],
            )?;
            if mode.notifies_sync() {
                events.push(observation);
            }
            return Ok(StoreOutcome::Updated);
        }

        let atom = observation.atom.as_ref().ok_or_else(|| {
            StoreError::InvalidData(format!("{} observation without atom", observation.kind))
        })?;
        let hash = atom.hash();

        match observation.kind {
            ObservationKind::Store => match self.recorded_soft_flag(&hash)? {
                Some(true) if !observation.soft => {
                    self.evict_conflicts(&hash, atom, observation.timestamp, events, evicted)?;
                    self.conn.execute(
                        "UPDATE atoms SET soft = 0 WHERE address = ?1 AND atom_hash = ?2",
                        params![self.key, hash.as_bytes().as_slice()],
                    )?;
                    events.push(observation);
                    Ok(StoreOutcome::Updated)
                }
                Some(_) => Ok(StoreOutcome::Unchanged),
                None => {
                    if !observation.soft {
                        self.evict_conflicts(&hash, atom, observation.timestamp, events, evicted)?;
                    }
                    self.insert_atom(&hash, atom, observation.soft)?;
                    events.push(observation);
                    Ok(StoreOutcome::Updated)
                }
            },
            ObservationKind::Delete => match self.remove_atom(&hash)? {
                Some(_) => {
                    events.push(observation);
                    Ok(StoreOutcome::Updated)
                }
                None => Ok(StoreOutcome::Unchanged),
            },
            ObservationKind::Head => Ok(StoreOutcome::Unchanged),
        }
    }

    fn append_log(&self, event: &AtomObservation) -> Result<()> {
        let atom = event.atom.as_ref().map(encode).transpose()?;
        self.conn.execute(
            "INSERT INTO observations (address, kind, atom, timestamp, soft)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![self.key, event.kind.to_u8(), atom, event.timestamp, event.soft],
        )?;
        Ok(())
    }

    fn log(&self) -> Result<Vec<AtomObservation>> {
        let mut stmt = self.conn.prepare(
            "SELECT kind, atom, timestamp, soft FROM observations
             WHERE address = ?1 ORDER BY seq",
        )?;
        let rows = stmt
            .query_map(params![self.key], |row| {
                Ok((
                    row.get::<_, u8>(0)?,
                    row.get::<_, Option<Vec<u8>>>(1)?,
                    row.get::<_, i64>(2)?,
                    row.get::<_, bool>(3)?,
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        rows.into_iter()
            .map(|(kind, atom, timestamp, soft)| {
                let kind = ObservationKind::from_u8(kind)
                    .ok_or_else(|| StoreError::InvalidData(format!("observation kind {}", kind)))?;
                Ok(AtomObservation {
                    kind,
                    atom: atom.as_deref().map(decode).transpose()?,
                    timestamp,
                    soft,
                })
            })
            .collect()
    }
}

impl LedgerStore for SqliteStore {
    fn store(
        &self,
        address: &Address,
        observation: AtomObservation,
        mode: NotifyMode,
    ) -> Result<StoreOutcome> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let kind = observation.kind;
        let timestamp = observation.timestamp;
        let mut events = Vec::new();
        let mut evicted = Vec::new();

        let outcome = AddressTx::new(&tx, address).apply(observation, mode, &mut events, &mut evicted)?;
        let mut published: Vec<(Address, AtomObservation)> =
            events.into_iter().map(|event| (*address, event)).collect();

        // An evicted atom leaves every address it was stored under.
        for atom in &evicted {
            let hash = atom.hash();
            for other in atom.addresses() {
                if &other == address {
                    continue;
                }
                if let Some(stored) = AddressTx::new(&tx, &other).remove_soft(&hash)? {
                    warn!(address = %other, atom = %hash, "evicting conflicting soft atom");
                    published.push((other, AtomObservation::deleted(stored.atom, timestamp)));
                }
            }
        }

        if mode.notifies() {
            for (at, event) in &published {
                AddressTx::new(&tx, at).append_log(event)?;
            }
        }
        tx.commit()?;

        match outcome {
            StoreOutcome::Updated => debug!(%address, %kind, events = published.len(), "store updated"),
            StoreOutcome::Unchanged => debug!(%address, %kind, "duplicate observation ignored"),
        }

        // Still holding the connection lock: publish order matches log order.
        if mode.notifies() {
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
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT p.particle FROM particles p
             WHERE p.address = ?1
               AND (?2 IS NULL OR p.kind = ?2)
               AND EXISTS (SELECT 1 FROM particle_spins s
                           WHERE s.address = p.address AND s.particle_id = p.particle_id AND s.spin = 1)
               AND NOT EXISTS (SELECT 1 FROM particle_spins s
                               WHERE s.address = p.address AND s.particle_id = p.particle_id AND s.spin = -1)
             ORDER BY p.particle_id",
        )?;
        let blobs = stmt
            .query_map(
                params![address.to_bytes().to_vec(), kind.map(ParticleKind::to_u8)],
                |row| row.get::<_, Vec<u8>>(0),
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        blobs
            .iter()
            .map(|blob| decode::<Particle>(blob).map(SpunParticle::up))
            .collect()
    }

    fn stored_atoms(&self, address: &Address) -> Result<Vec<StoredAtom>> {
        let conn = self.lock()?;
        let mut stmt =
            conn.prepare("SELECT atom, soft FROM atoms WHERE address = ?1 ORDER BY stored_seq")?;
        let rows = stmt
            .query_map(params![address.to_bytes().to_vec()], |row| {
                Ok((row.get::<_, Vec<u8>>(0)?, row.get::<_, bool>(1)?))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        rows.into_iter()
            .map(|(blob, soft)| {
                Ok(StoredAtom {
                    atom: decode(&blob)?,
                    soft,
                })
            })
            .collect()
    }

    fn contains_atom(&self, address: &Address, hash: &AtomHash) -> Result<bool> {
        let conn = self.lock()?;
        Ok(AddressTx::new(&conn, address).recorded_soft_flag(hash)?.is_some())
    }

    fn is_synced(&self, address: &Address) -> Result<bool> {
        let conn = self.lock()?;
        AddressTx::new(&conn, address).is_synced()
    }

    fn observations(&self, address: &Address) -> Result<ObservationStream> {
        let conn = self.lock()?;
        let backlog = AddressTx::new(&conn, address).log()?;
        self.hub.subscribe(*address, backlog)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::LedgerStoreExt;
    use atomkit_core::{
        Keypair, ParticleGroup, PositiveAmount, Rri, TokenPermissions, TransferrableTokens,
        Universe,
    };

    fn addr(seed: u8) -> Address {
        Address::from_keypair(Universe(1), &Keypair::from_seed(&[seed; 32]))
    }

    fn tokens(owner: Address, amount: u64, nonce: i64) -> TransferrableTokens {
        TransferrableTokens {
            address: owner,
            token: Rri::token(owner, "TEST").unwrap(),
            amount: PositiveAmount::from_u64(amount).unwrap(),
            granularity: PositiveAmount::one(),
            permissions: TokenPermissions::default(),
            nonce,
        }
    }

    fn atom_of(group: ParticleGroup) -> Atom {
        Atom::new(vec![group], Default::default()).unwrap()
    }

    fn genesis(owner: Address, nonce: i64) -> Atom {
        atom_of(ParticleGroup::builder().spin_up(tokens(owner, 10, nonce)).build().unwrap())
    }

    fn spend(owner: Address, nonce: i64, to: Address) -> Atom {
        atom_of(
            ParticleGroup::builder()
                .spin_down(tokens(owner, 10, nonce))
                .spin_up(tokens(to, 10, nonce + 100))
                .build()
                .unwrap(),
        )
    }

    #[test]
    fn test_sqlite_store_basic() {
        let store = SqliteStore::open_memory().unwrap();
        let me = addr(1);
        let outcome = store
            .store(&me, AtomObservation::stored(genesis(me, 1), 1), NotifyMode::NotifyOnUpdate)
            .unwrap();
        assert_eq!(outcome, StoreOutcome::Updated);

        let ups = store.up_particles(&me, Some(ParticleKind::TransferrableTokens)).unwrap();
        assert_eq!(ups.len(), 1);
        assert_eq!(ups[0].particle, Particle::from(tokens(me, 10, 1)));
        assert!(store.up_particles(&me, Some(ParticleKind::Unique)).unwrap().is_empty());
    }

    #[test]
    fn test_sqlite_store_idempotent() {
        let store = SqliteStore::open_memory().unwrap();
        let me = addr(1);
        let mut stream = store.observations(&me).unwrap();
        let first = store
            .store(&me, AtomObservation::stored(genesis(me, 1), 1), NotifyMode::NotifyOnUpdate)
            .unwrap();
        let second = store
            .store(&me, AtomObservation::stored(genesis(me, 1), 2), NotifyMode::NotifyOnUpdate)
            .unwrap();
        assert_eq!(first, StoreOutcome::Updated);
        assert_eq!(second, StoreOutcome::Unchanged);
        assert_eq!(stream.drain().len(), 1);
    }

    #[test]
    fn test_sqlite_up_particles_sorted_by_id() {
        let store = SqliteStore::open_memory().unwrap();
        let me = addr(1);
        for nonce in 0..8 {
            store
                .store(&me, AtomObservation::stored(genesis(me, nonce), nonce), NotifyMode::DontNotify)
                .unwrap();
        }
        let ids: Vec<ParticleId> = store
            .up_particles(&me, None)
            .unwrap()
            .iter()
            .map(SpunParticle::id)
            .collect();
        let mut sorted = ids.clone();
        sorted.sort();
        assert_eq!(ids.len(), 8);
        assert_eq!(ids, sorted);
    }

    #[test]
    fn test_sqlite_eviction_and_delete() {
        let store = SqliteStore::open_memory().unwrap();
        let me = addr(1);
        store
            .store(&me, AtomObservation::stored(genesis(me, 1), 1), NotifyMode::DontNotify)
            .unwrap();
        let local = spend(me, 1, addr(2));
        let confirmed = spend(me, 1, addr(3));
        store
            .store(&me, AtomObservation::stored_soft(local.clone(), 2), NotifyMode::DontNotify)
            .unwrap();
        let mut stream = store.observations(&me).unwrap();
        store
            .store(&me, AtomObservation::stored(confirmed.clone(), 3), NotifyMode::NotifyOnUpdate)
            .unwrap();

        let events = stream.drain();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].kind, ObservationKind::Delete);
        assert_eq!(events[0].atom_hash(), Some(local.hash()));
        assert_eq!(events[1].atom_hash(), Some(confirmed.hash()));

        let stored: Vec<AtomHash> = store
            .stored_atoms(&me)
            .unwrap()
            .iter()
            .map(|s| s.atom.hash())
            .collect();
        let genesis_hash = genesis(me, 1).hash();
        assert_eq!(stored, vec![genesis_hash, confirmed.hash()]);
    }

    #[test]
    fn test_sqlite_eviction_reaches_every_address() {
        let store = SqliteStore::open_memory().unwrap();
        let me = addr(1);
        let them = addr(2);
        store
            .store(&me, AtomObservation::stored(genesis(me, 1), 1), NotifyMode::DontNotify)
            .unwrap();
        let local = spend(me, 1, them);
        store
            .store_everywhere(AtomObservation::stored_soft(local.clone(), 2), NotifyMode::NotifyOnUpdate)
            .unwrap();
        let mut theirs = store.observations(&them).unwrap();
        assert_eq!(theirs.drain().len(), 1);

        store
            .store_everywhere(AtomObservation::stored(spend(me, 1, addr(3)), 3), NotifyMode::NotifyOnUpdate)
            .unwrap();

        assert!(!store.contains_atom(&them, &local.hash()).unwrap());
        assert!(store.up_particles(&them, None).unwrap().is_empty());
        let events = theirs.drain();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, ObservationKind::Delete);

        let replayed = store.observations(&them).unwrap().drain();
        assert_eq!(replayed.len(), 2);
        assert_eq!(replayed[1].kind, ObservationKind::Delete);
    }

    #[test]
    fn test_sqlite_sync_marker() {
        let store = SqliteStore::open_memory().unwrap();
        let me = addr(1);
        assert!(!store.is_synced(&me).unwrap());
        let mut stream = store.observations(&me).unwrap();
        store
            .store(&me, AtomObservation::head(1), NotifyMode::NotifyOnUpdateAndSync)
            .unwrap();
        let again = store
            .store(&me, AtomObservation::head(2), NotifyMode::NotifyOnUpdateAndSync)
            .unwrap();
        assert_eq!(again, StoreOutcome::Unchanged);
        assert!(store.is_synced(&me).unwrap());
        assert_eq!(stream.drain().len(), 1);
    }

    #[test]
    fn test_sqlite_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.db");
        let me = addr(1);
        let atom = genesis(me, 1);

        {
            let store = SqliteStore::open(&path).unwrap();
            store
                .store(&me, AtomObservation::stored_soft(atom.clone(), 1), NotifyMode::NotifyOnUpdate)
                .unwrap();
            store
                .store(&me, AtomObservation::head(2), NotifyMode::NotifyOnUpdateAndSync)
                .unwrap();
        }

        let store = SqliteStore::open(&path).unwrap();
        assert!(store.contains_atom(&me, &atom.hash()).unwrap());
        assert!(store.is_synced(&me).unwrap());
        assert_eq!(store.up_particles(&me, None).unwrap().len(), 1);
        assert!(store.stored_atoms(&me).unwrap()[0].soft);

        let mut stream = store.observations(&me).unwrap();
        let replayed = stream.drain();
        assert_eq!(replayed.len(), 2);
        assert_eq!(replayed[0].atom.as_ref(), Some(&atom));
        assert!(replayed[1].is_head());
    }
}

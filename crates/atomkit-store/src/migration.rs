//! Database schema migrations for SQLite.
//!
//! We use a simple versioned migration system. Each migration is a SQL string
//! that transforms the schema from version N to N+1.

use rusqlite::Connection;

use crate::error::{Result, StoreError};

/// Current schema version.
pub const CURRENT_VERSION: u32 = 1;

/// Initialize or migrate the database schema.
///
/// This function is idempotent - it can be called multiple times safely.
pub fn migrate(conn: &mut Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at INTEGER NOT NULL
        )",
        [],
    )?;

    let current: u32 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
        [],
        |row| row.get(0),
    )?;

    if current > CURRENT_VERSION {
        return Err(StoreError::Migration(format!(
            "database schema version {} is newer than supported version {}",
            current, CURRENT_VERSION
        )));
    }

    if current < CURRENT_VERSION {
        let tx = conn.transaction()?;

        for version in (current + 1)..=CURRENT_VERSION {
            apply_migration(&tx, version)?;

            tx.execute(
                "INSERT INTO schema_migrations (version, applied_at) VALUES (?1, ?2)",
                rusqlite::params![version, now_millis()],
            )?;
        }

        tx.commit()?;
    }

    Ok(())
}

/// Apply a specific migration version.
fn apply_migration(conn: &Connection, version: u32) -> Result<()> {
    match version {
        1 => apply_v1(conn),
        _ => Err(StoreError::Migration(format!(
            "unknown migration version: {}",
            version
        ))),
    }
}

/// Migration v1: Initial schema.
fn apply_v1(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        -- Atoms recorded per address
        CREATE TABLE atoms (
            address BLOB NOT NULL,            -- 37 bytes, encoded address
            atom_hash BLOB NOT NULL,          -- 32 bytes, Blake3 of canonical atom
            atom BLOB NOT NULL,               -- CBOR-encoded atom
            soft INTEGER NOT NULL,            -- 1 = local, unconfirmed
            stored_seq INTEGER NOT NULL,      -- first-stored order within address
            PRIMARY KEY (address, atom_hash)
        );

        -- Particles concerning an address, by content hash
        CREATE TABLE particles (
            address BLOB NOT NULL,
            particle_id BLOB NOT NULL,        -- 32 bytes, Blake3 of canonical particle
            kind INTEGER NOT NULL,            -- ParticleKind as u8
            particle BLOB NOT NULL,           -- CBOR-encoded particle
            PRIMARY KEY (address, particle_id)
        );

        -- Which stored atoms spin which particles up (1) or down (-1)
        CREATE TABLE particle_spins (
            address BLOB NOT NULL,
            particle_id BLOB NOT NULL,
            atom_hash BLOB NOT NULL,
            spin INTEGER NOT NULL,
            PRIMARY KEY (address, particle_id, atom_hash, spin)
        );

        -- Published observations, replayed to new subscribers
        CREATE TABLE observations (
            seq INTEGER PRIMARY KEY AUTOINCREMENT,
            address BLOB NOT NULL,
            kind INTEGER NOT NULL,            -- ObservationKind as u8
            atom BLOB,                        -- CBOR-encoded atom, NULL for head
            timestamp INTEGER NOT NULL,
            soft INTEGER NOT NULL
        );

        -- Synchronization marker per address
        CREATE TABLE sync_state (
            address BLOB PRIMARY KEY,
            synced INTEGER NOT NULL DEFAULT 0
        );

        CREATE INDEX idx_atoms_order ON atoms(address, stored_seq);
        CREATE INDEX idx_particles_kind ON particles(address, kind);
        CREATE INDEX idx_spins_atom ON particle_spins(address, atom_hash);
        CREATE INDEX idx_observations_address ON observations(address, seq);
        "#,
    )?;

    Ok(())
}

/// Get current time in milliseconds.
fn now_millis() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migration_creates_tables() {
        let mut conn = Connection::open_in_memory().unwrap();
        migrate(&mut conn).unwrap();

        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<std::result::Result<Vec<_>, _>>()
            .unwrap();

        for table in ["atoms", "particles", "particle_spins", "observations", "sync_state", "schema_migrations"] {
            assert!(tables.contains(&table.to_string()), "missing table {}", table);
        }
    }

    #[test]
    fn test_migration_idempotent() {
        let mut conn = Connection::open_in_memory().unwrap();
        migrate(&mut conn).unwrap();
        migrate(&mut conn).unwrap();
        migrate(&mut conn).unwrap();

        let version: u32 = conn
            .query_row("SELECT MAX(version) FROM schema_migrations", [], |row| row.get(0))
            .unwrap();
        assert_eq!(version, CURRENT_VERSION);
    }

    #[test]
    fn test_newer_schema_rejected() {
        let mut conn = Connection::open_in_memory().unwrap();
        migrate(&mut conn).unwrap();
        conn.execute(
            "INSERT INTO schema_migrations (version, applied_at) VALUES (?1, 0)",
            [CURRENT_VERSION + 1],
        )
        .unwrap();
        assert!(matches!(migrate(&mut conn), Err(StoreError::Migration(_))));
    }
}

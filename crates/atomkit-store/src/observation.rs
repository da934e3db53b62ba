//! Observations: what a store is told about an atom, and what it publishes.

use serde::{Deserialize, Serialize};
use std::fmt;

use atomkit_core::{Atom, AtomHash};

/// What an observation says about its atom.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObservationKind {
    /// The atom is part of the address's history.
    Store,
    /// The atom is no longer part of the address's history.
    Delete,
    /// The address is synchronized with the ledger head. Carries no atom.
    Head,
}

impl ObservationKind {
    pub fn to_u8(self) -> u8 {
        match self {
            ObservationKind::Store => 0,
            ObservationKind::Delete => 1,
            ObservationKind::Head => 2,
        }
    }

    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(ObservationKind::Store),
            1 => Some(ObservationKind::Delete),
            2 => Some(ObservationKind::Head),
            _ => None,
        }
    }
}

impl fmt::Display for ObservationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ObservationKind::Store => f.write_str("store"),
            ObservationKind::Delete => f.write_str("delete"),
            ObservationKind::Head => f.write_str("head"),
        }
    }
}

/// An observation of an atom at some address.
///
/// A `soft` observation is a local, unconfirmed application (for example an
/// atom this client just compiled); a hard one comes from the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AtomObservation {
    pub kind: ObservationKind,
    pub atom: Option<Atom>,
    /// Unix milliseconds when the observation was made.
    pub timestamp: i64,
    pub soft: bool,
}

impl AtomObservation {
    /// A confirmed store of `atom`.
    pub fn stored(atom: Atom, timestamp: i64) -> Self {
        Self {
            kind: ObservationKind::Store,
            atom: Some(atom),
            timestamp,
            soft: false,
        }
    }

    /// A local, unconfirmed store of `atom`.
    pub fn stored_soft(atom: Atom, timestamp: i64) -> Self {
        Self {
            soft: true,
            ..Self::stored(atom, timestamp)
        }
    }

    /// Removal of `atom`.
    pub fn deleted(atom: Atom, timestamp: i64) -> Self {
        Self {
            kind: ObservationKind::Delete,
            atom: Some(atom),
            timestamp,
            soft: false,
        }
    }

    /// The synchronized marker.
    pub fn head(timestamp: i64) -> Self {
        Self {
            kind: ObservationKind::Head,
            atom: None,
            timestamp,
            soft: false,
        }
    }

    pub fn is_head(&self) -> bool {
        self.kind == ObservationKind::Head
    }

    pub fn atom_hash(&self) -> Option<AtomHash> {
        self.atom.as_ref().map(Atom::hash)
    }
}

/// Whether a `store` call publishes an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum NotifyMode {
    /// Apply the change silently.
    DontNotify,
    /// Publish genuine changes.
    #[default]
    NotifyOnUpdate,
    /// Publish genuine changes and the transition to synchronized.
    NotifyOnUpdateAndSync,
}

impl NotifyMode {
    pub fn notifies(self) -> bool {
        !matches!(self, NotifyMode::DontNotify)
    }

    pub fn notifies_sync(self) -> bool {
        matches!(self, NotifyMode::NotifyOnUpdateAndSync)
    }
}

/// Effect of a single `store` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOutcome {
    /// The store's state changed.
    Updated,
    /// The observation was already reflected; nothing changed.
    Unchanged,
}

impl StoreOutcome {
    pub fn is_updated(self) -> bool {
        self == StoreOutcome::Updated
    }
}

/// An atom as recorded at one address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredAtom {
    pub atom: Atom,
    pub soft: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use atomkit_core::{Address, Keypair, ParticleGroup, Universe, UniqueParticle};
    use std::collections::BTreeMap;

    fn atom(name: &str) -> Atom {
        let owner = Address::from_keypair(Universe(1), &Keypair::from_seed(&[1; 32]));
        let group = ParticleGroup::builder()
            .spin_up(UniqueParticle {
                address: owner,
                name: name.into(),
                nonce: 0,
            })
            .build()
            .unwrap();
        Atom::new(vec![group], BTreeMap::new()).unwrap()
    }

    #[test]
    fn test_constructors() {
        let soft = AtomObservation::stored_soft(atom("a"), 1);
        assert_eq!(soft.kind, ObservationKind::Store);
        assert!(soft.soft);
        assert_eq!(soft.atom_hash(), Some(atom("a").hash()));

        let deleted = AtomObservation::deleted(atom("a"), 2);
        assert_eq!(deleted.kind, ObservationKind::Delete);
        assert!(!deleted.soft);

        let head = AtomObservation::head(3);
        assert!(head.is_head());
        assert_eq!(head.atom_hash(), None);
    }

    #[test]
    fn test_kind_codes() {
        for kind in [ObservationKind::Store, ObservationKind::Delete, ObservationKind::Head] {
            assert_eq!(ObservationKind::from_u8(kind.to_u8()), Some(kind));
        }
        assert_eq!(ObservationKind::from_u8(3), None);
    }

    #[test]
    fn test_notify_modes() {
        assert!(!NotifyMode::DontNotify.notifies());
        assert!(NotifyMode::NotifyOnUpdate.notifies());
        assert!(!NotifyMode::NotifyOnUpdate.notifies_sync());
        assert!(NotifyMode::NotifyOnUpdateAndSync.notifies_sync());
    }
}

//! Structural atom validation.
//!
//! These checks need no ledger state. Economic rules (balances, permissions,
//! granularity) belong to the action mappers that construct the atom.

use std::collections::HashSet;

use crate::address::common_universe;
use crate::atom::Atom;
use crate::error::{CoreError, ValidationError};
use crate::particle::Spin;

/// Validate an atom's structure.
///
/// This performs:
/// - Non-empty atom and groups
/// - Single universe across all addresses
/// - No particle spun down twice
/// - No particle spun up twice
pub fn validate_atom(atom: &Atom) -> Result<(), ValidationError> {
    // 1. Something to apply
    if atom.groups().is_empty() {
        return Err(ValidationError::EmptyAtom);
    }
    if let Some(index) = atom.groups().iter().position(|g| g.is_empty()) {
        return Err(ValidationError::EmptyGroup(index));
    }

    // 2. One universe
    if let Err(CoreError::UniverseMismatch { expected, found }) =
        common_universe(&atom.addresses())
    {
        return Err(ValidationError::UniverseMismatch { expected, found });
    }

    // 3. Each particle consumed and produced at most once
    let mut downs = HashSet::new();
    let mut ups = HashSet::new();
    for spun in atom.spun_particles() {
        let id = spun.id();
        match spun.spin {
            Spin::Down if !downs.insert(id) => return Err(ValidationError::DoubleSpend(id)),
            Spin::Up if !ups.insert(id) => return Err(ValidationError::DuplicateOutput(id)),
            _ => {}
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::{Address, Universe};
    use crate::crypto::Keypair;
    use crate::group::ParticleGroup;
    use crate::particle::{RriParticle, UniqueParticle};
    use crate::rri::Rri;
    use std::collections::BTreeMap;

    fn owner() -> Address {
        Address::from_keypair(Universe(1), &Keypair::from_seed(&[0x42; 32]))
    }

    fn claim_group(name: &str) -> ParticleGroup {
        let rri = Rri::new(owner(), name).unwrap();
        ParticleGroup::builder()
            .spin_down(RriParticle::new(rri))
            .spin_up(UniqueParticle {
                address: owner(),
                name: name.into(),
                nonce: 1,
            })
            .build()
            .unwrap()
    }

    #[test]
    fn test_valid_atom() {
        let atom = Atom::new(vec![claim_group("a"), claim_group("b")], BTreeMap::new()).unwrap();
        assert_eq!(validate_atom(&atom), Ok(()));
    }

    #[test]
    fn test_empty_atom() {
        let atom = Atom::new(vec![], BTreeMap::new()).unwrap();
        assert_eq!(validate_atom(&atom), Err(ValidationError::EmptyAtom));
    }

    #[test]
    fn test_same_rri_claimed_twice_is_double_spend() {
        let atom = Atom::new(vec![claim_group("a"), claim_group("a")], BTreeMap::new()).unwrap();
        assert!(matches!(
            validate_atom(&atom),
            Err(ValidationError::DoubleSpend(_))
        ));
    }

    #[test]
    fn test_duplicate_output() {
        let unique = UniqueParticle {
            address: owner(),
            name: "dup".into(),
            nonce: 9,
        };
        let group = ParticleGroup::builder()
            .spin_up(unique.clone())
            .spin_up(unique)
            .build()
            .unwrap();
        let atom = Atom::new(vec![group], BTreeMap::new()).unwrap();
        assert!(matches!(
            validate_atom(&atom),
            Err(ValidationError::DuplicateOutput(_))
        ));
    }

    #[test]
    fn test_deserialized_empty_group_rejected() {
        let atom = Atom::new(vec![claim_group("a")], BTreeMap::new()).unwrap();
        let mut json = serde_json::to_value(&atom).unwrap();
        json["groups"]
            .as_array_mut()
            .unwrap()
            .push(serde_json::json!({ "particles": [], "metadata": {} }));
        let tampered: Atom = serde_json::from_value(json).unwrap();
        assert_eq!(validate_atom(&tampered), Err(ValidationError::EmptyGroup(1)));
    }
}

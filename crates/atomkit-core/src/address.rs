//! Addresses and ledger universes.
//!
//! An address is an Ed25519 public key scoped to one universe (ledger network
//! instance). Its textual form is `hex(magic || key || checksum)` where the
//! checksum is the first four bytes of `blake3(magic || key)`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::crypto::{Ed25519PublicKey, Keypair};
use crate::error::CoreError;

/// Length of the textual checksum in bytes.
const CHECKSUM_LEN: usize = 4;

/// Encoded address length: magic + key + checksum.
const ENCODED_LEN: usize = 1 + 32 + CHECKSUM_LEN;

/// Identifier of a ledger universe (its magic byte).
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Universe(pub u8);

impl Universe {
    /// Get the magic byte.
    pub const fn magic(&self) -> u8 {
        self.0
    }
}

impl fmt::Debug for Universe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Universe({:#04x})", self.0)
    }
}

impl fmt::Display for Universe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#04x}", self.0)
    }
}

/// An account address within one universe.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Address {
    universe: Universe,
    key: Ed25519PublicKey,
}

impl Address {
    /// Create an address from a universe and public key.
    pub const fn new(universe: Universe, key: Ed25519PublicKey) -> Self {
        Self { universe, key }
    }

    /// Derive the address of a keypair in the given universe.
    pub fn from_keypair(universe: Universe, keypair: &Keypair) -> Self {
        Self::new(universe, keypair.public_key())
    }

    /// The universe this address belongs to.
    pub const fn universe(&self) -> Universe {
        self.universe
    }

    /// The public key behind this address.
    pub const fn public_key(&self) -> &Ed25519PublicKey {
        &self.key
    }

    /// Whether two addresses belong to the same universe.
    pub fn same_universe(&self, other: &Address) -> bool {
        self.universe == other.universe
    }

    /// Encode to `magic || key || checksum`.
    pub fn to_bytes(&self) -> [u8; ENCODED_LEN] {
        let mut out = [0u8; ENCODED_LEN];
        out[0] = self.universe.0;
        out[1..33].copy_from_slice(&self.key.0);
        out[33..].copy_from_slice(&checksum(self.universe, &self.key));
        out
    }

    /// Decode from `magic || key || checksum`, verifying the checksum.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CoreError> {
        if bytes.len() != ENCODED_LEN {
            return Err(CoreError::InvalidAddress(format!(
                "expected {} bytes, got {}",
                ENCODED_LEN,
                bytes.len()
            )));
        }
        let universe = Universe(bytes[0]);
        let mut key = [0u8; 32];
        key.copy_from_slice(&bytes[1..33]);
        let key = Ed25519PublicKey(key);
        if bytes[33..] != checksum(universe, &key) {
            return Err(CoreError::ChecksumMismatch);
        }
        Ok(Self { universe, key })
    }
}

/// The single universe shared by all `addresses`.
///
/// Returns `Ok(None)` for an empty input and `UniverseMismatch` naming the
/// first two distinct universes otherwise.
pub fn common_universe<'a, I>(addresses: I) -> Result<Option<Universe>, CoreError>
where
    I: IntoIterator<Item = &'a Address>,
{
    let mut found: Option<Universe> = None;
    for address in addresses {
        match found {
            None => found = Some(address.universe),
            Some(expected) if expected != address.universe => {
                return Err(CoreError::UniverseMismatch {
                    expected,
                    found: address.universe,
                });
            }
            Some(_) => {}
        }
    }
    Ok(found)
}

fn checksum(universe: Universe, key: &Ed25519PublicKey) -> [u8; CHECKSUM_LEN] {
    let mut hasher = blake3::Hasher::new();
    hasher.update(&[universe.0]);
    hasher.update(&key.0);
    let digest = hasher.finalize();
    let mut out = [0u8; CHECKSUM_LEN];
    out.copy_from_slice(&digest.as_bytes()[..CHECKSUM_LEN]);
    out
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({}:{})", self.universe, &self.key.to_hex()[..16])
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.to_bytes()))
    }
}

impl FromStr for Address {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s).map_err(|e| CoreError::InvalidAddress(e.to_string()))?;
        Self::from_bytes(&bytes)
    }
}

//! Particles: immutable fragments of ledger state.
//!
//! A particle is never mutated. Spending one means emitting the same content
//! again with [`Spin::Down`] inside a later group, so identity is the content
//! hash of the particle alone, independent of spin.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::address::Address;
use crate::amount::{PositiveAmount, PositiveSupply};
use crate::canonical::particle_bytes;
use crate::rri::Rri;
use crate::types::ParticleId;

/// Polarity of a particle instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Spin {
    /// Currently valid / unspent.
    Up,
    /// Spent or superseded.
    Down,
    Neutral,
}

impl Spin {
    pub fn to_i8(self) -> i8 {
        match self {
            Spin::Up => 1,
            Spin::Down => -1,
            Spin::Neutral => 0,
        }
    }

    pub fn from_i8(value: i8) -> Option<Self> {
        match value {
            1 => Some(Spin::Up),
            -1 => Some(Spin::Down),
            0 => Some(Spin::Neutral),
            _ => None,
        }
    }
}

/// Discriminator for the concrete particle variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum ParticleKind {
    Rri = 0,
    MutableSupplyTokenDefinition = 1,
    FixedSupplyTokenDefinition = 2,
    UnallocatedTokens = 3,
    TransferrableTokens = 4,
    Unique = 5,
    Message = 6,
}

impl ParticleKind {
    pub const ALL: [ParticleKind; 7] = [
        ParticleKind::Rri,
        ParticleKind::MutableSupplyTokenDefinition,
        ParticleKind::FixedSupplyTokenDefinition,
        ParticleKind::UnallocatedTokens,
        ParticleKind::TransferrableTokens,
        ParticleKind::Unique,
        ParticleKind::Message,
    ];

    pub fn to_u8(self) -> u8 {
        self as u8
    }

    pub fn from_u8(value: u8) -> Option<Self> {
        Self::ALL.get(value as usize).copied()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ParticleKind::Rri => "rri",
            ParticleKind::MutableSupplyTokenDefinition => "mutable_supply_token_definition",
            ParticleKind::FixedSupplyTokenDefinition => "fixed_supply_token_definition",
            ParticleKind::UnallocatedTokens => "unallocated_tokens",
            ParticleKind::TransferrableTokens => "transferrable_tokens",
            ParticleKind::Unique => "unique",
            ParticleKind::Message => "message",
        }
    }
}

impl fmt::Display for ParticleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ParticleKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| format!("unknown particle kind: {}", s))
    }
}

/// Who may perform a supply transition on a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TokenPermission {
    /// Only the address owning the token's RRI.
    TokenOwnerOnly,
    /// Anyone.
    All,
    /// No one.
    None,
    /// Only during token creation.
    TokenCreationOnly,
}

impl TokenPermission {
    pub fn to_u8(self) -> u8 {
        match self {
            TokenPermission::TokenOwnerOnly => 0,
            TokenPermission::All => 1,
            TokenPermission::None => 2,
            TokenPermission::TokenCreationOnly => 3,
        }
    }

    /// Whether `actor` may perform a transition guarded by this permission
    /// on the token named by `rri`, outside of token creation.
    pub fn allows(self, rri: &Rri, actor: &Address) -> bool {
        match self {
            TokenPermission::TokenOwnerOnly => rri.address() == actor,
            TokenPermission::All => true,
            TokenPermission::None | TokenPermission::TokenCreationOnly => false,
        }
    }
}

impl fmt::Display for TokenPermission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TokenPermission::TokenOwnerOnly => "token_owner_only",
            TokenPermission::All => "all",
            TokenPermission::None => "none",
            TokenPermission::TokenCreationOnly => "token_creation_only",
        };
        f.write_str(s)
    }
}

/// Supply transitions a permission can guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TokenTransition {
    Mint,
    Burn,
}

impl fmt::Display for TokenTransition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenTransition::Mint => f.write_str("mint"),
            TokenTransition::Burn => f.write_str("burn"),
        }
    }
}

/// Mint and burn permissions of a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TokenPermissions {
    pub mint: TokenPermission,
    pub burn: TokenPermission,
}

impl TokenPermissions {
    /// Permissions carried by fixed-supply tokens.
    pub const FIXED: TokenPermissions = TokenPermissions {
        mint: TokenPermission::None,
        burn: TokenPermission::None,
    };

    /// Mint and burn restricted to the token owner.
    pub const OWNER_ONLY: TokenPermissions = TokenPermissions {
        mint: TokenPermission::TokenOwnerOnly,
        burn: TokenPermission::TokenOwnerOnly,
    };

    pub fn get(&self, transition: TokenTransition) -> TokenPermission {
        match transition {
            TokenTransition::Mint => self.mint,
            TokenTransition::Burn => self.burn,
        }
    }
}

impl Default for TokenPermissions {
    fn default() -> Self {
        Self::OWNER_ONLY
    }
}

/// Claim on an RRI. Consumed when a token or unique id takes the name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RriParticle {
    pub rri: Rri,
    pub nonce: i64,
}

impl RriParticle {
    /// The claim particle for `rri`. Its nonce is always zero so every claim
    /// of the same RRI has the same identity.
    pub fn new(rri: Rri) -> Self {
        Self { rri, nonce: 0 }
    }
}

/// Definition of a token whose supply can change through mint and burn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MutableSupplyTokenDefinition {
    pub rri: Rri,
    pub name: String,
    pub description: String,
    pub granularity: PositiveAmount,
    pub icon_url: Option<String>,
    pub url: Option<String>,
    pub permissions: TokenPermissions,
}

/// Definition of a token whose entire supply is issued at creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixedSupplyTokenDefinition {
    pub rri: Rri,
    pub name: String,
    pub description: String,
    pub supply: PositiveSupply,
    pub granularity: PositiveAmount,
    pub icon_url: Option<String>,
    pub url: Option<String>,
}

/// Supply of a mutable token not yet issued to anyone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnallocatedTokens {
    pub token: Rri,
    pub amount: PositiveAmount,
    pub granularity: PositiveAmount,
    pub permissions: TokenPermissions,
    pub nonce: i64,
}

/// Tokens held by an address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferrableTokens {
    pub address: Address,
    pub token: Rri,
    pub amount: PositiveAmount,
    pub granularity: PositiveAmount,
    pub permissions: TokenPermissions,
    pub nonce: i64,
}

/// A unique-id claim owned by an address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UniqueParticle {
    pub address: Address,
    pub name: String,
    pub nonce: i64,
}

impl UniqueParticle {
    /// The RRI this claim occupies.
    pub fn rri(&self) -> Result<Rri, crate::error::CoreError> {
        Rri::new(self.address, self.name.clone())
    }
}

/// Arbitrary data sent from one address to another.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageParticle {
    pub from: Address,
    pub to: Address,
    pub bytes: Bytes,
    pub metadata: BTreeMap<String, String>,
    pub nonce: i64,
}

/// A state fragment of any kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Particle {
    Rri(RriParticle),
    MutableSupplyTokenDefinition(MutableSupplyTokenDefinition),
    FixedSupplyTokenDefinition(FixedSupplyTokenDefinition),
    UnallocatedTokens(UnallocatedTokens),
    TransferrableTokens(TransferrableTokens),
    Unique(UniqueParticle),
    Message(MessageParticle),
}

impl Particle {
    pub fn kind(&self) -> ParticleKind {
        match self {
            Particle::Rri(_) => ParticleKind::Rri,
            Particle::MutableSupplyTokenDefinition(_) => ParticleKind::MutableSupplyTokenDefinition,
            Particle::FixedSupplyTokenDefinition(_) => ParticleKind::FixedSupplyTokenDefinition,
            Particle::UnallocatedTokens(_) => ParticleKind::UnallocatedTokens,
            Particle::TransferrableTokens(_) => ParticleKind::TransferrableTokens,
            Particle::Unique(_) => ParticleKind::Unique,
            Particle::Message(_) => ParticleKind::Message,
        }
    }

    /// The addresses this particle is accountable to, without duplicates.
    pub fn addresses(&self) -> Vec<Address> {
        match self {
            Particle::Rri(p) => vec![*p.rri.address()],
            Particle::MutableSupplyTokenDefinition(p) => vec![*p.rri.address()],
            Particle::FixedSupplyTokenDefinition(p) => vec![*p.rri.address()],
            Particle::UnallocatedTokens(p) => vec![*p.token.address()],
            Particle::TransferrableTokens(p) => vec![p.address],
            Particle::Unique(p) => vec![p.address],
            Particle::Message(p) if p.from == p.to => vec![p.from],
            Particle::Message(p) => vec![p.from, p.to],
        }
    }

    /// Whether `address` is one of this particle's addresses.
    pub fn concerns(&self, address: &Address) -> bool {
        self.addresses().contains(address)
    }

    /// Content hash of the particle.
    pub fn id(&self) -> ParticleId {
        ParticleId::from_canonical(&particle_bytes(self))
    }

    /// The token RRI for token-related particles.
    pub fn token_rri(&self) -> Option<&Rri> {
        match self {
            Particle::MutableSupplyTokenDefinition(p) => Some(&p.rri),
            Particle::FixedSupplyTokenDefinition(p) => Some(&p.rri),
            Particle::UnallocatedTokens(p) => Some(&p.token),
            Particle::TransferrableTokens(p) => Some(&p.token),
            _ => None,
        }
    }

    pub fn as_transferrable(&self) -> Option<&TransferrableTokens> {
        match self {
            Particle::TransferrableTokens(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_unallocated(&self) -> Option<&UnallocatedTokens> {
        match self {
            Particle::UnallocatedTokens(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_mutable_definition(&self) -> Option<&MutableSupplyTokenDefinition> {
        match self {
            Particle::MutableSupplyTokenDefinition(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_fixed_definition(&self) -> Option<&FixedSupplyTokenDefinition> {
        match self {
            Particle::FixedSupplyTokenDefinition(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_unique(&self) -> Option<&UniqueParticle> {
        match self {
            Particle::Unique(p) => Some(p),
            _ => None,
        }
    }
}

macro_rules! particle_from {
    ($($variant:ident($ty:ty)),* $(,)?) => {$(
        impl From<$ty> for Particle {
            fn from(p: $ty) -> Self {
                Particle::$variant(p)
            }
        }
    )*};
}

particle_from!(
    Rri(RriParticle),
    MutableSupplyTokenDefinition(MutableSupplyTokenDefinition),
    FixedSupplyTokenDefinition(FixedSupplyTokenDefinition),
    UnallocatedTokens(UnallocatedTokens),
    TransferrableTokens(TransferrableTokens),
    Unique(UniqueParticle),
    Message(MessageParticle),
);

/// A particle together with its spin.
///
/// Two spun particles with the same content share an id whatever their spin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpunParticle {
    pub spin: Spin,
    pub particle: Particle,
}

impl SpunParticle {
    pub fn new(spin: Spin, particle: impl Into<Particle>) -> Self {
        Self {
            spin,
            particle: particle.into(),
        }
    }

    pub fn up(particle: impl Into<Particle>) -> Self {
        Self::new(Spin::Up, particle)
    }

    pub fn down(particle: impl Into<Particle>) -> Self {
        Self::new(Spin::Down, particle)
    }

    pub fn id(&self) -> ParticleId {
        self.particle.id()
    }

    pub fn kind(&self) -> ParticleKind {
        self.particle.kind()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::Universe;
    use crate::crypto::Keypair;

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

    #[test]
    fn test_id_ignores_spin() {
        let p = tokens(addr(1), 10, 7);
        assert_eq!(SpunParticle::up(p.clone()).id(), SpunParticle::down(p).id());
    }

    #[test]
    fn test_nonce_distinguishes_equal_amounts() {
        let a = Particle::from(tokens(addr(1), 10, 1));
        let b = Particle::from(tokens(addr(1), 10, 2));
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_message_addresses_deduplicated() {
        let me = addr(1);
        let other = addr(2);
        let msg = |to| {
            Particle::Message(MessageParticle {
                from: me,
                to,
                bytes: Bytes::from_static(b"hi"),
                metadata: BTreeMap::new(),
                nonce: 0,
            })
        };
        assert_eq!(msg(me).addresses(), vec![me]);
        assert_eq!(msg(other).addresses(), vec![me, other]);
    }

    #[test]
    fn test_permission_rules() {
        let owner = addr(1);
        let stranger = addr(2);
        let rri = Rri::token(owner, "TEST").unwrap();
        assert!(TokenPermission::TokenOwnerOnly.allows(&rri, &owner));
        assert!(!TokenPermission::TokenOwnerOnly.allows(&rri, &stranger));
        assert!(TokenPermission::All.allows(&rri, &stranger));
        assert!(!TokenPermission::None.allows(&rri, &owner));
        assert!(!TokenPermission::TokenCreationOnly.allows(&rri, &owner));
    }

    #[test]
    fn test_kind_text_roundtrip() {
        for kind in ParticleKind::ALL {
            assert_eq!(kind.as_str().parse::<ParticleKind>(), Ok(kind));
            assert_eq!(ParticleKind::from_u8(kind.to_u8()), Some(kind));
        }
    }

    #[test]
    fn test_spin_codes() {
        for spin in [Spin::Up, Spin::Down, Spin::Neutral] {
            assert_eq!(Spin::from_i8(spin.to_i8()), Some(spin));
        }
        assert_eq!(Spin::from_i8(5), None);
    }
}

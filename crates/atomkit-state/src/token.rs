//! Token definitions and supply.
//!
//! Token state is computed by replaying definition and unallocated-supply
//! particles. A token's definition and its supply arrive as separate
//! particles, possibly in different atoms, so each side is tracked as a
//! partial state until the other shows up.

use std::collections::BTreeMap;

use atomkit_core::{
    FixedSupplyTokenDefinition, MutableSupplyTokenDefinition, Particle, PositiveAmount, Rri,
    SignedAmount, Spin, SpunParticle, Supply, TokenPermissions,
};

use crate::error::Result;
use crate::reducer::ParticleReducer;

/// The definition half of a token's state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenDefinition {
    Mutable(MutableSupplyTokenDefinition),
    Fixed(FixedSupplyTokenDefinition),
}

impl TokenDefinition {
    pub fn rri(&self) -> &Rri {
        match self {
            TokenDefinition::Mutable(d) => &d.rri,
            TokenDefinition::Fixed(d) => &d.rri,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            TokenDefinition::Mutable(d) => &d.name,
            TokenDefinition::Fixed(d) => &d.name,
        }
    }

    pub fn description(&self) -> &str {
        match self {
            TokenDefinition::Mutable(d) => &d.description,
            TokenDefinition::Fixed(d) => &d.description,
        }
    }

    pub fn granularity(&self) -> PositiveAmount {
        match self {
            TokenDefinition::Mutable(d) => d.granularity,
            TokenDefinition::Fixed(d) => d.granularity,
        }
    }

    pub fn permissions(&self) -> TokenPermissions {
        match self {
            TokenDefinition::Mutable(d) => d.permissions,
            TokenDefinition::Fixed(_) => TokenPermissions::FIXED,
        }
    }

    pub fn is_mutable(&self) -> bool {
        matches!(self, TokenDefinition::Mutable(_))
    }
}

/// Reduced view of one token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenState {
    /// Only the definition has been seen.
    Definition(TokenDefinition),
    /// Only supply particles have been seen. Holds net unallocated tokens.
    Supply(SignedAmount),
    /// Both halves.
    Full {
        definition: TokenDefinition,
        unallocated: SignedAmount,
    },
}

impl TokenState {
    pub fn definition(&self) -> Option<&TokenDefinition> {
        match self {
            TokenState::Definition(d) | TokenState::Full { definition: d, .. } => Some(d),
            TokenState::Supply(_) => None,
        }
    }

    /// Net unallocated supply seen so far.
    pub fn unallocated(&self) -> SignedAmount {
        match self {
            TokenState::Supply(u) | TokenState::Full { unallocated: u, .. } => *u,
            TokenState::Definition(_) => SignedAmount::zero(),
        }
    }

    pub fn is_full(&self) -> bool {
        matches!(self, TokenState::Full { .. })
    }

    /// Total issued supply, when it can be known.
    ///
    /// Fixed-supply tokens report the definition's supply. Mutable tokens
    /// report `2^256-1` minus net unallocated, and `None` until supply
    /// particles have been seen.
    pub fn total_supply(&self) -> Option<Supply> {
        if let Some(TokenDefinition::Fixed(d)) = self.definition() {
            return Some(d.supply.into());
        }
        match self {
            TokenState::Definition(_) => None,
            TokenState::Supply(u) | TokenState::Full { unallocated: u, .. } => {
                let net = u.to_non_negative()?;
                Some(Supply::from_unallocated(&net))
            }
        }
    }

    /// Merge a later-observed state into this one.
    ///
    /// Supply halves accumulate; the later definition replaces the earlier.
    pub fn merge(self, later: TokenState) -> Result<TokenState> {
        use TokenState::*;
        Ok(match (self, later) {
            (Supply(a), Supply(b)) => Supply(a.checked_add(&b)?),
            (Definition(_), Definition(d)) => Definition(d),
            (Supply(u), Definition(d)) | (Definition(d), Supply(u)) => Full {
                definition: d,
                unallocated: u,
            },
            (Full { definition, unallocated }, Supply(u)) => Full {
                definition,
                unallocated: unallocated.checked_add(&u)?,
            },
            (Full { unallocated, .. }, Definition(d)) | (Definition(_), Full { definition: d, unallocated }) => {
                Full {
                    definition: d,
                    unallocated,
                }
            }
            (Supply(u), Full { definition, unallocated }) => Full {
                definition,
                unallocated: u.checked_add(&unallocated)?,
            },
            (Full { unallocated: a, .. }, Full { definition, unallocated: b }) => Full {
                definition,
                unallocated: a.checked_add(&b)?,
            },
        })
    }

    /// The partial state contributed by one spun particle, if any.
    fn from_spun(spun: &SpunParticle) -> Option<(Rri, TokenState)> {
        match (&spun.particle, spun.spin) {
            (Particle::MutableSupplyTokenDefinition(d), Spin::Up) => Some((
                d.rri.clone(),
                TokenState::Definition(TokenDefinition::Mutable(d.clone())),
            )),
            (Particle::FixedSupplyTokenDefinition(d), Spin::Up) => Some((
                d.rri.clone(),
                TokenState::Definition(TokenDefinition::Fixed(d.clone())),
            )),
            (Particle::UnallocatedTokens(u), Spin::Up) => Some((
                u.token.clone(),
                TokenState::Supply(SignedAmount::positive(u.amount.value())),
            )),
            (Particle::UnallocatedTokens(u), Spin::Down) => Some((
                u.token.clone(),
                TokenState::Supply(SignedAmount::negative(u.amount.value())),
            )),
            _ => None,
        }
    }
}

/// Token state for every RRI seen.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenDefinitionsState {
    tokens: BTreeMap<Rri, TokenState>,
}

impl TokenDefinitionsState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, rri: &Rri) -> Option<&TokenState> {
        self.tokens.get(rri)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Rri, &TokenState)> {
        self.tokens.iter()
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Total supply of `rri`, if known.
    pub fn total_supply(&self, rri: &Rri) -> Option<Supply> {
        self.tokens.get(rri)?.total_supply()
    }

    /// Merge `state` into the entry for `rri`.
    pub fn merge_token(mut self, rri: Rri, state: TokenState) -> Result<Self> {
        let merged = match self.tokens.remove(&rri) {
            Some(existing) => existing.merge(state)?,
            None => state,
        };
        self.tokens.insert(rri, merged);
        Ok(self)
    }
}

/// Reduces particles into [`TokenDefinitionsState`].
#[derive(Debug, Clone, Copy, Default)]
pub struct TokenDefinitionsReducer;

impl ParticleReducer for TokenDefinitionsReducer {
    type State = TokenDefinitionsState;

    fn initial_state(&self) -> TokenDefinitionsState {
        TokenDefinitionsState::new()
    }

    fn reduce(&self, state: TokenDefinitionsState, particle: &SpunParticle) -> Result<TokenDefinitionsState> {
        match TokenState::from_spun(particle) {
            Some((rri, partial)) => state.merge_token(rri, partial),
            None => Ok(state),
        }
    }

    fn combine(&self, a: TokenDefinitionsState, b: TokenDefinitionsState) -> Result<TokenDefinitionsState> {
        b.tokens
            .into_iter()
            .try_fold(a, |acc, (rri, state)| acc.merge_token(rri, state))
    }
}

/// Fold spun particles into token definitions and supply.
pub fn reduce<'a, I>(particles: I) -> Result<TokenDefinitionsState>
where
    I: IntoIterator<Item = &'a SpunParticle>,
{
    TokenDefinitionsReducer.reduce_all(particles)
}

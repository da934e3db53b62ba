//! Per-address token balances.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use atomkit_core::units::format_subunits;
use atomkit_core::{Address, NonNegativeAmount, ParticleId, Particle, Rri, SignedAmount, Spin, SpunParticle};

use crate::error::{Result, StateError};
use crate::reducer::ParticleReducer;

/// The balance of one token at one address.
///
/// `amount` is the signed sum of transferable particles seen so far: up
/// spins add, down spins subtract. It can be transiently negative when a
/// spend is reduced before the particle it consumes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenBalance {
    rri: Rri,
    address: Address,
    amount: SignedAmount,
    ups: BTreeSet<ParticleId>,
    downs: BTreeSet<ParticleId>,
}

impl TokenBalance {
    /// A zero balance.
    pub fn zero(rri: Rri, address: Address) -> Self {
        Self {
            rri,
            address,
            amount: SignedAmount::zero(),
            ups: BTreeSet::new(),
            downs: BTreeSet::new(),
        }
    }

    pub fn rri(&self) -> &Rri {
        &self.rri
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    pub fn amount(&self) -> SignedAmount {
        self.amount
    }

    /// The balance clamped at zero.
    pub fn available(&self) -> NonNegativeAmount {
        self.amount.to_non_negative().unwrap_or_else(NonNegativeAmount::zero)
    }

    /// Whether the balance covers `amount`.
    pub fn covers(&self, amount: &NonNegativeAmount) -> bool {
        self.available() >= *amount
    }

    /// Ids of contributing particles not yet seen spent.
    pub fn particles(&self) -> impl Iterator<Item = &ParticleId> {
        self.ups.difference(&self.downs)
    }

    fn apply(mut self, spun: &SpunParticle, amount: SignedAmount) -> Result<Self> {
        let id = spun.id();
        match spun.spin {
            Spin::Up => {
                self.ups.insert(id);
            }
            Spin::Down => {
                self.downs.insert(id);
            }
            Spin::Neutral => return Ok(self),
        }
        self.amount = self.amount.checked_add(&amount)?;
        Ok(self)
    }

    /// Merge a balance for the same token and address.
    ///
    /// Mismatched keys mean balances were partitioned wrongly upstream. That
    /// panics in debug builds and is reported as an error otherwise.
    pub fn merge(mut self, other: TokenBalance) -> Result<Self> {
        let matches = self.rri == other.rri && self.address == other.address;
        debug_assert!(
            matches,
            "merging balance for {} at {} into {} at {}",
            other.rri, other.address, self.rri, self.address
        );
        if !matches {
            return Err(StateError::BalanceKeyMismatch {
                rri: self.rri,
                address: self.address,
                other_rri: other.rri,
                other_address: other.address,
            });
        }
        self.amount = self.amount.checked_add(&other.amount)?;
        self.ups.extend(other.ups);
        self.downs.extend(other.downs);
        Ok(self)
    }
}

/// Whole tokens followed by the RRI, e.g. `1.5 /<address>/GOLD`.
impl fmt::Display for TokenBalance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.amount.is_negative() { "-" } else { "" };
        let magnitude = format_subunits(&NonNegativeAmount::new(self.amount.magnitude()));
        write!(f, "{}{} {}", sign, magnitude, self.rri)
    }
}

/// Balances of every token held at one address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenBalanceState {
    address: Address,
    balances: BTreeMap<Rri, TokenBalance>,
}

impl TokenBalanceState {
    pub fn new(address: Address) -> Self {
        Self {
            address,
            balances: BTreeMap::new(),
        }
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    /// The balance of `rri`. Tokens never seen have a zero balance.
    pub fn balance(&self, rri: &Rri) -> TokenBalance {
        self.balances
            .get(rri)
            .cloned()
            .unwrap_or_else(|| TokenBalance::zero(rri.clone(), self.address))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Rri, &TokenBalance)> {
        self.balances.iter()
    }

    pub fn len(&self) -> usize {
        self.balances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.balances.is_empty()
    }

    fn merge_balance(mut self, balance: TokenBalance) -> Result<Self> {
        let merged = match self.balances.remove(balance.rri()) {
            Some(existing) => existing.merge(balance)?,
            None => balance,
        };
        self.balances.insert(merged.rri.clone(), merged);
        Ok(self)
    }
}

/// Reduces transferable particles held at one address into balances.
#[derive(Debug, Clone, Copy)]
pub struct TokenBalanceReducer {
    address: Address,
}

impl TokenBalanceReducer {
    pub fn new(address: Address) -> Self {
        Self { address }
    }
}

impl ParticleReducer for TokenBalanceReducer {
    type State = TokenBalanceState;

    fn initial_state(&self) -> TokenBalanceState {
        TokenBalanceState::new(self.address)
    }

    fn reduce(&self, mut state: TokenBalanceState, spun: &SpunParticle) -> Result<TokenBalanceState> {
        let tokens = match &spun.particle {
            Particle::TransferrableTokens(t) if t.address == self.address => t,
            _ => return Ok(state),
        };
        let delta = match spun.spin {
            Spin::Down => SignedAmount::negative(tokens.amount.value()),
            _ => SignedAmount::positive(tokens.amount.value()),
        };
        let balance = state
            .balances
            .remove(&tokens.token)
            .unwrap_or_else(|| TokenBalance::zero(tokens.token.clone(), self.address))
            .apply(spun, delta)?;
        state.balances.insert(tokens.token.clone(), balance);
        Ok(state)
    }

    fn combine(&self, a: TokenBalanceState, b: TokenBalanceState) -> Result<TokenBalanceState> {
        b.balances.into_values().try_fold(a, TokenBalanceState::merge_balance)
    }
}

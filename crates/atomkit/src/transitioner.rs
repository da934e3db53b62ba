//! The fungible transitioner: greedy consume-with-change.
//!
//! Mint, burn and transfer all move a quantity from one set of fungible
//! particles to a new particle: unallocated supply becomes transferable
//! tokens, transferable tokens become unallocated supply, or tokens move
//! between owners. The transitioner selects inputs in iteration order until
//! the requested amount is covered, then emits the output and, when the
//! selection overshoots, a change particle for the exact remainder.

use atomkit_core::{
    NonNegativeAmount, Particle, PositiveAmount, SpunParticle, TransferrableTokens,
    UnallocatedTokens,
};

/// A particle holding a fungible quantity.
pub trait Fungible {
    fn amount(&self) -> PositiveAmount;
}

impl Fungible for TransferrableTokens {
    fn amount(&self) -> PositiveAmount {
        self.amount
    }
}

impl Fungible for UnallocatedTokens {
    fn amount(&self) -> PositiveAmount {
        self.amount
    }
}

/// The inputs could not cover the requested amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InsufficientFunds {
    /// Sum of every input offered, saturating at `2^256-1`.
    pub available: NonNegativeAmount,
    pub requested: PositiveAmount,
}

/// Result of a transition. Inputs are spent; output and change are new.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition<I, O> {
    pub consumed: Vec<I>,
    pub output: O,
    pub change: Option<I>,
}

impl<I, O> Transition<I, O>
where
    I: Into<Particle>,
    O: Into<Particle>,
{
    /// Consumed inputs spun down, then the output and any change spun up.
    pub fn into_spun(self) -> Vec<SpunParticle> {
        let mut spun: Vec<SpunParticle> = self.consumed.into_iter().map(SpunParticle::down).collect();
        spun.push(SpunParticle::up(self.output));
        if let Some(change) = self.change {
            spun.push(SpunParticle::up(change));
        }
        spun
    }
}

/// Move `amount` out of `inputs`.
///
/// Inputs are taken greedily in iteration order. `output` builds the particle
/// carrying exactly `amount`; `change` builds the particle returning the
/// remainder to the original holder and is called only when the selected
/// inputs strictly exceed `amount`.
pub fn transition<I, O, F, C>(
    inputs: impl IntoIterator<Item = I>,
    amount: PositiveAmount,
    output: F,
    change: C,
) -> Result<Transition<I, O>, InsufficientFunds>
where
    I: Fungible,
    F: FnOnce(PositiveAmount) -> O,
    C: FnOnce(PositiveAmount) -> I,
{
    let mut consumed = Vec::new();
    let mut remaining = NonNegativeAmount::from(amount);

    for input in inputs {
        let held = NonNegativeAmount::from(input.amount());
        consumed.push(input);
        if held >= remaining {
            let change = held
                .checked_sub(&remaining)
                .ok()
                .and_then(|overshoot| overshoot.to_positive().ok())
                .map(change);
            return Ok(Transition {
                consumed,
                output: output(amount),
                change,
            });
        }
        remaining = remaining.checked_sub(&held).unwrap_or_default();
    }

    // Every input was consumed without covering the amount.
    let available = consumed
        .iter()
        .fold(NonNegativeAmount::zero(), |acc, input| {
            acc.saturating_add(&input.amount().into())
        });
    Err(InsufficientFunds {
        available,
        requested: amount,
    })
}

//! Burn tokens back into unallocated supply.

use atomkit_core::{
    NonNegativeAmount, ParticleGroup, ParticleKind, TokenTransition, TransferrableTokens,
    UnallocatedTokens,
};

use super::mint::{check_permission, supply_definition};
use super::{
    check_granularity, definition_requirements, total, MapperContext, StateRequirement, StateView,
    StatefulMapper,
};
use crate::action::BurnTokensAction;
use crate::error::ActionError;
use crate::transitioner::transition;

/// Consumes the burner's tokens into unallocated supply.
#[derive(Debug, Default, Clone, Copy)]
pub struct BurnTokensMapper;

impl StatefulMapper for BurnTokensMapper {
    type Action = BurnTokensAction;

    fn required_state(&self, action: &BurnTokensAction) -> Vec<StateRequirement> {
        let mut required = definition_requirements(&action.rri).to_vec();
        required.push(StateRequirement::new(ParticleKind::TransferrableTokens, action.burner));
        required
    }

    fn particle_groups(
        &self,
        action: &BurnTokensAction,
        state: StateView<'_>,
        context: &MapperContext<'_>,
    ) -> Result<Vec<ParticleGroup>, ActionError> {
        let definition = supply_definition(&state, &action.rri, ActionError::CannotBurnFixedSupply)?;
        check_permission(definition, TokenTransition::Burn, &action.burner)?;
        check_granularity(action.amount, definition.granularity)?;

        let held: Vec<&TransferrableTokens> = state.transferrable(action.burner, &action.rri).collect();
        let available = total(held.iter().map(|t| &t.amount))?;
        if available < NonNegativeAmount::from(action.amount) {
            return Err(ActionError::InsufficientBurnFunds {
                rri: action.rri.clone(),
                available,
                requested: action.amount,
            });
        }

        let burned = transition(
            held.into_iter().cloned(),
            action.amount,
            |amount| UnallocatedTokens {
                token: action.rri.clone(),
                amount,
                granularity: definition.granularity,
                permissions: definition.permissions,
                nonce: context.nonce(),
            },
            |remainder| TransferrableTokens {
                address: action.burner,
                token: action.rri.clone(),
                amount: remainder,
                granularity: definition.granularity,
                permissions: definition.permissions,
                nonce: context.nonce(),
            },
        )
        .map_err(|e| ActionError::InsufficientBurnFunds {
            rri: action.rri.clone(),
            available: e.available,
            requested: e.requested,
        })?;

        Ok(vec![ParticleGroup::builder().add_all(burned.into_spun()).build()?])
    }
}

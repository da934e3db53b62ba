//! Mint new tokens out of unallocated supply.

use atomkit_core::{
    Address, MutableSupplyTokenDefinition, ParticleGroup, ParticleKind, Rri, Supply,
    TokenTransition, TransferrableTokens, UnallocatedTokens,
};

use super::{
    check_granularity, definition_requirements, total, MapperContext, StateRequirement, StateView,
    StatefulMapper,
};
use crate::action::MintTokensAction;
use crate::error::ActionError;
use crate::transitioner::transition;

/// Converts unallocated supply into tokens credited to the recipient.
#[derive(Debug, Default, Clone, Copy)]
pub struct MintTokensMapper;

/// The mutable definition of `rri`, or why the token cannot change supply.
pub(super) fn supply_definition<'a>(
    state: &StateView<'a>,
    rri: &Rri,
    fixed: impl FnOnce(Rri) -> ActionError,
) -> Result<&'a MutableSupplyTokenDefinition, ActionError> {
    if let Some(definition) = state.mutable_definition(rri) {
        return Ok(definition);
    }
    match state.fixed_definition(rri) {
        Some(_) => Err(fixed(rri.clone())),
        None => Err(ActionError::UnknownToken(rri.clone())),
    }
}

/// Reject actors the definition does not permit to perform `transition`.
pub(super) fn check_permission(
    definition: &MutableSupplyTokenDefinition,
    transition: TokenTransition,
    actor: &Address,
) -> Result<(), ActionError> {
    let permission = definition.permissions.get(transition);
    if permission.allows(&definition.rri, actor) {
        return Ok(());
    }
    Err(ActionError::LackingPermission {
        rri: definition.rri.clone(),
        permission,
        owner: *definition.rri.address(),
        actor: *actor,
    })
}

impl StatefulMapper for MintTokensMapper {
    type Action = MintTokensAction;

    fn required_state(&self, action: &MintTokensAction) -> Vec<StateRequirement> {
        let mut required = definition_requirements(&action.rri).to_vec();
        required.push(StateRequirement::new(
            ParticleKind::UnallocatedTokens,
            *action.rri.address(),
        ));
        required
    }

    fn particle_groups(
        &self,
        action: &MintTokensAction,
        state: StateView<'_>,
        context: &MapperContext<'_>,
    ) -> Result<Vec<ParticleGroup>, ActionError> {
        let definition = supply_definition(&state, &action.rri, ActionError::CannotMintFixedSupply)?;
        check_permission(definition, TokenTransition::Mint, &action.minter)?;
        check_granularity(action.amount, definition.granularity)?;

        let unallocated: Vec<&UnallocatedTokens> = state.unallocated(&action.rri).collect();
        let current = Supply::from_unallocated(&total(unallocated.iter().map(|u| &u.amount))?);
        current
            .add(&action.amount)
            .map_err(|_| over_mint(action, current))?;

        let minted = transition(
            unallocated.into_iter().cloned(),
            action.amount,
            |amount| TransferrableTokens {
                address: action.credit_to,
                token: action.rri.clone(),
                amount,
                granularity: definition.granularity,
                permissions: definition.permissions,
                nonce: context.nonce(),
            },
            |remainder| UnallocatedTokens {
                token: action.rri.clone(),
                amount: remainder,
                granularity: definition.granularity,
                permissions: definition.permissions,
                nonce: context.nonce(),
            },
        )
        .map_err(|e| over_mint(action, Supply::from_unallocated(&e.available)))?;

        Ok(vec![ParticleGroup::builder().add_all(minted.into_spun()).build()?])
    }
}

fn over_mint(action: &MintTokensAction, current_supply: Supply) -> ActionError {
    ActionError::OverMint {
        rri: action.rri.clone(),
        max_supply: Supply::max(),
        current_supply,
        requested: action.amount,
    }
}

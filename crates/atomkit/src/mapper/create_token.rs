//! Define a new token.

use atomkit_core::{
    FixedSupplyTokenDefinition, MutableSupplyTokenDefinition, ParticleGroup, PositiveAmount,
    RriParticle, TokenPermissions, TransferrableTokens, UnallocatedTokens,
};

use super::{check_granularity, MapperContext, StateRequirement, StateView, StatefulMapper};
use crate::action::{CreateTokenAction, TokenSupply};
use crate::error::ActionError;
use crate::transitioner::transition;

/// Claims the token's RRI and writes its definition and initial supply.
///
/// Needs no prior state: a second claim of the same RRI spends the same
/// claim particle and is rejected as a double spend.
#[derive(Debug, Default, Clone, Copy)]
pub struct CreateTokenMapper;

impl StatefulMapper for CreateTokenMapper {
    type Action = CreateTokenAction;

    fn required_state(&self, _action: &CreateTokenAction) -> Vec<StateRequirement> {
        Vec::new()
    }

    fn particle_groups(
        &self,
        action: &CreateTokenAction,
        _state: StateView<'_>,
        context: &MapperContext<'_>,
    ) -> Result<Vec<ParticleGroup>, ActionError> {
        match action.supply {
            TokenSupply::Fixed(supply) => {
                check_granularity(supply.as_amount(), action.granularity)?;
                let definition = FixedSupplyTokenDefinition {
                    rri: action.rri.clone(),
                    name: action.name.clone(),
                    description: action.description.clone(),
                    supply,
                    granularity: action.granularity,
                    icon_url: action.icon_url.clone(),
                    url: action.url.clone(),
                };
                let issued = TransferrableTokens {
                    address: *action.creator(),
                    token: action.rri.clone(),
                    amount: supply.as_amount(),
                    granularity: action.granularity,
                    permissions: TokenPermissions::FIXED,
                    nonce: context.nonce(),
                };
                let group = ParticleGroup::builder()
                    .spin_down(RriParticle::new(action.rri.clone()))
                    .spin_up(definition)
                    .spin_up(issued)
                    .build()?;
                Ok(vec![group])
            }
            TokenSupply::Mutable {
                initial,
                permissions,
            } => {
                check_granularity(initial, action.granularity)?;
                let definition = MutableSupplyTokenDefinition {
                    rri: action.rri.clone(),
                    name: action.name.clone(),
                    description: action.description.clone(),
                    granularity: action.granularity,
                    icon_url: action.icon_url.clone(),
                    url: action.url.clone(),
                    permissions,
                };
                let unallocated = UnallocatedTokens {
                    token: action.rri.clone(),
                    amount: PositiveAmount::max(),
                    granularity: action.granularity,
                    permissions,
                    nonce: context.nonce(),
                };
                let mut groups = vec![ParticleGroup::builder()
                    .spin_down(RriParticle::new(action.rri.clone()))
                    .spin_up(definition)
                    .spin_up(unallocated.clone())
                    .build()?];

                if let Ok(initial) = initial.to_positive() {
                    let minted = transition(
                        [unallocated],
                        initial,
                        |amount| TransferrableTokens {
                            address: *action.creator(),
                            token: action.rri.clone(),
                            amount,
                            granularity: action.granularity,
                            permissions,
                            nonce: context.nonce(),
                        },
                        |remainder| UnallocatedTokens {
                            token: action.rri.clone(),
                            amount: remainder,
                            granularity: action.granularity,
                            permissions,
                            nonce: context.nonce(),
                        },
                    )
                    .map_err(|e| ActionError::InvalidAction(format!(
                        "initial supply {} exceeds {}",
                        e.requested, e.available
                    )))?;
                    groups.push(ParticleGroup::builder().add_all(minted.into_spun()).build()?);
                }
                Ok(groups)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use crate::nonce::SequentialNonces;
    use atomkit_core::{NonNegativeAmount, ParticleKind, PositiveSupply, Spin, U256};

    fn run(action: &CreateTokenAction) -> Result<Vec<ParticleGroup>, ActionError> {
        let nonces = SequentialNonces::new();
        let context = MapperContext::new(*action.creator(), &nonces);
        CreateTokenMapper.particle_groups(action, StateView::new(&[]), &context)
    }

    fn kinds(group: &ParticleGroup) -> Vec<(Spin, ParticleKind)> {
        group.particles().iter().map(|s| (s.spin, s.kind())).collect()
    }

    #[test]
    fn test_mutable_without_initial_supply() {
        let action = CreateTokenAction::mutable(
            address(1),
            "GOLD",
            "Gold",
            NonNegativeAmount::zero(),
            PositiveAmount::one(),
        )
        .unwrap();
        let groups = run(&action).unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(
            kinds(&groups[0]),
            vec![
                (Spin::Down, ParticleKind::Rri),
                (Spin::Up, ParticleKind::MutableSupplyTokenDefinition),
                (Spin::Up, ParticleKind::UnallocatedTokens),
            ]
        );
    }

    #[test]
    fn test_mutable_with_initial_supply_mints_to_creator() {
        let creator = address(1);
        let action = CreateTokenAction::mutable(
            creator,
            "GOLD",
            "Gold",
            NonNegativeAmount::from(1_000u64),
            PositiveAmount::one(),
        )
        .unwrap();
        let groups = run(&action).unwrap();
        assert_eq!(groups.len(), 2);
        let issued: Vec<_> = groups[1]
            .particles_with_spin(Spin::Up)
            .filter_map(|p| p.as_transferrable())
            .collect();
        assert_eq!(issued.len(), 1);
        assert_eq!(issued[0].address, creator);
        assert_eq!(issued[0].amount, amount(1_000));
        let rest: Vec<_> = groups[1]
            .particles_with_spin(Spin::Up)
            .filter_map(|p| p.as_unallocated())
            .collect();
        assert_eq!(rest[0].amount.value(), U256::MAX - U256::from(1_000u64));
    }

    #[test]
    fn test_fixed_issues_whole_supply() {
        let creator = address(1);
        let supply = PositiveSupply::new(U256::from(500u64)).unwrap();
        let action = CreateTokenAction::fixed(creator, "FIX", "Fixed", supply, PositiveAmount::one()).unwrap();
        let groups = run(&action).unwrap();
        assert_eq!(groups.len(), 1);
        let issued: Vec<_> = groups[0]
            .particles_with_spin(Spin::Up)
            .filter_map(|p| p.as_transferrable())
            .collect();
        assert_eq!(issued[0].amount, amount(500));
        assert_eq!(issued[0].permissions, TokenPermissions::FIXED);
    }

    #[test]
    fn test_initial_supply_must_match_granularity() {
        let action = CreateTokenAction::mutable(
            address(1),
            "GOLD",
            "Gold",
            NonNegativeAmount::from(15u64),
            amount(10),
        )
        .unwrap();
        assert!(matches!(run(&action).unwrap_err(), ActionError::NotGranularityMultiple { .. }));
    }
}

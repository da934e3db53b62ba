//! Claim a unique identifier.

use atomkit_core::{ParticleGroup, ParticleKind, RriParticle, UniqueParticle};

use super::{MapperContext, StateRequirement, StateView, StatefulMapper};
use crate::action::PutUniqueIdAction;
use crate::error::ActionError;

/// Claims `(owner, name)` unless a unique id or token already holds it.
#[derive(Debug, Default, Clone, Copy)]
pub struct PutUniqueIdMapper;

impl StatefulMapper for PutUniqueIdMapper {
    type Action = PutUniqueIdAction;

    fn required_state(&self, action: &PutUniqueIdAction) -> Vec<StateRequirement> {
        vec![
            StateRequirement::new(ParticleKind::Unique, action.owner),
            StateRequirement::new(ParticleKind::MutableSupplyTokenDefinition, action.owner),
            StateRequirement::new(ParticleKind::FixedSupplyTokenDefinition, action.owner),
        ]
    }

    fn particle_groups(
        &self,
        action: &PutUniqueIdAction,
        state: StateView<'_>,
        context: &MapperContext<'_>,
    ) -> Result<Vec<ParticleGroup>, ActionError> {
        let rri = action.rri()?;
        if state.unique(&action.owner, &action.name).is_some() {
            return Err(ActionError::RriInUseByUniqueId(rri));
        }
        if state.mutable_definition(&rri).is_some() {
            return Err(ActionError::RriInUseByMutableToken(rri));
        }
        if state.fixed_definition(&rri).is_some() {
            return Err(ActionError::RriInUseByFixedToken(rri));
        }

        let group = ParticleGroup::builder()
            .spin_down(RriParticle::new(rri))
            .spin_up(UniqueParticle {
                address: action.owner,
                name: action.name.clone(),
                nonce: context.nonce(),
            })
            .build()?;
        Ok(vec![group])
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use crate::nonce::SequentialNonces;
    use atomkit_core::{CoreError, Rri, SpunParticle};

    fn run(action: &PutUniqueIdAction, state: &[SpunParticle]) -> Result<Vec<ParticleGroup>, ActionError> {
        let nonces = SequentialNonces::new();
        let context = MapperContext::new(action.owner, &nonces);
        PutUniqueIdMapper.particle_groups(action, StateView::new(state), &context)
    }

    #[test]
    fn test_fresh_name_is_claimed() {
        let action = PutUniqueIdAction::new(address(1), "my-id");
        let groups = run(&action, &[]).unwrap();
        assert_eq!(groups[0].len(), 2);
    }

    #[test]
    fn test_taken_by_unique() {
        let owner = address(1);
        let existing = UniqueParticle {
            address: owner,
            name: "my-id".into(),
            nonce: 7,
        };
        let action = PutUniqueIdAction::new(owner, "my-id");
        assert_eq!(
            run(&action, &[SpunParticle::up(existing)]).unwrap_err(),
            ActionError::RriInUseByUniqueId(Rri::new(owner, "my-id").unwrap())
        );
    }

    #[test]
    fn test_taken_by_mutable_token() {
        let owner = address(1);
        let rri = gold(owner);
        let action = PutUniqueIdAction::new(owner, "GOLD");
        assert_eq!(
            run(&action, &[SpunParticle::up(mutable_definition(&rri, 1))]).unwrap_err(),
            ActionError::RriInUseByMutableToken(rri)
        );
    }

    #[test]
    fn test_taken_by_fixed_token() {
        let owner = address(1);
        let rri = gold(owner);
        let action = PutUniqueIdAction::new(owner, "GOLD");
        assert_eq!(
            run(&action, &[SpunParticle::up(fixed_definition(&rri, 1))]).unwrap_err(),
            ActionError::RriInUseByFixedToken(rri)
        );
    }

    #[test]
    fn test_only_up_uniques_collide() {
        let owner = address(1);
        let existing = UniqueParticle {
            address: owner,
            name: "my-id".into(),
            nonce: 7,
        };
        let action = PutUniqueIdAction::new(owner, "my-id");
        assert!(run(&action, &[SpunParticle::down(existing)]).is_ok());
    }

    #[test]
    fn test_invalid_name() {
        let action = PutUniqueIdAction::new(address(1), "has space");
        assert!(matches!(
            run(&action, &[]).unwrap_err(),
            ActionError::Core(CoreError::InvalidRri(_))
        ));
    }
}

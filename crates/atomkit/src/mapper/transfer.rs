//! Transfer tokens between addresses.

use atomkit_core::{NonNegativeAmount, ParticleGroup, ParticleKind, TransferrableTokens};

use super::{
    check_granularity, definition_requirements, find_definition, total, MapperContext,
    StateRequirement, StateView, StatefulMapper, ATTACHMENT_KEY,
};
use crate::action::TransferTokensAction;
use crate::error::ActionError;
use crate::transitioner::transition;

/// Consumes the sender's tokens, credits the recipient and returns change.
#[derive(Debug, Default, Clone, Copy)]
pub struct TransferTokensMapper;

impl StatefulMapper for TransferTokensMapper {
    type Action = TransferTokensAction;

    fn required_state(&self, action: &TransferTokensAction) -> Vec<StateRequirement> {
        let mut required = vec![StateRequirement::new(ParticleKind::TransferrableTokens, action.from)];
        required.extend(definition_requirements(&action.rri));
        required
    }

    fn particle_groups(
        &self,
        action: &TransferTokensAction,
        state: StateView<'_>,
        context: &MapperContext<'_>,
    ) -> Result<Vec<ParticleGroup>, ActionError> {
        let held: Vec<&TransferrableTokens> = state.transferrable(action.from, &action.rri).collect();
        let available = total(held.iter().map(|t| &t.amount))?;
        if available < NonNegativeAmount::from(action.amount) {
            return Err(ActionError::InsufficientFunds {
                rri: action.rri.clone(),
                available,
                requested: action.amount,
            });
        }

        let definition = find_definition(&state, &action.rri)
            .ok_or_else(|| ActionError::UnknownToken(action.rri.clone()))?;
        let granularity = definition.granularity();
        check_granularity(action.amount, granularity)?;
        let permissions = definition.permissions();

        let moved = transition(
            held.into_iter().cloned(),
            action.amount,
            |amount| TransferrableTokens {
                address: action.to,
                token: action.rri.clone(),
                amount,
                granularity,
                permissions,
                nonce: context.nonce(),
            },
            |remainder| TransferrableTokens {
                address: action.from,
                token: action.rri.clone(),
                amount: remainder,
                granularity,
                permissions,
                nonce: context.nonce(),
            },
        )
        .map_err(|e| ActionError::InsufficientFunds {
            rri: action.rri.clone(),
            available: e.available,
            requested: e.requested,
        })?;

        let mut group = ParticleGroup::builder().add_all(moved.into_spun());
        if let Some(attachment) = &action.attachment {
            group = group.metadata(ATTACHMENT_KEY, hex::encode(attachment));
        }
        Ok(vec![group.build()?])
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use crate::nonce::SequentialNonces;
    use atomkit_core::{Spin, SpunParticle};

    fn run(
        action: &TransferTokensAction,
        state: &[SpunParticle],
    ) -> Result<Vec<ParticleGroup>, ActionError> {
        let nonces = SequentialNonces::starting_at(1_000);
        let context = MapperContext::new(action.from, &nonces);
        TransferTokensMapper.particle_groups(action, StateView::new(state), &context)
    }

    #[test]
    fn test_transfer_with_change() {
        let owner = address(1);
        let (alice, bob) = (address(2), address(3));
        let rri = gold(owner);
        let state = vec![
            SpunParticle::up(mutable_definition(&rri, 1)),
            SpunParticle::up(held(alice, &rri, 7, 0)),
            SpunParticle::up(held(alice, &rri, 5, 1)),
        ];
        let action = TransferTokensAction::new(alice, bob, rri.clone(), amount(10));
        let groups = run(&action, &state).unwrap();
        assert_eq!(groups.len(), 1);

        let ups: Vec<_> = groups[0].particles_with_spin(Spin::Up).filter_map(|p| p.as_transferrable()).collect();
        assert_eq!(ups.len(), 2);
        assert_eq!(ups[0].address, bob);
        assert_eq!(ups[0].amount, amount(10));
        assert_eq!(ups[1].address, alice);
        assert_eq!(ups[1].amount, amount(2));
        assert_eq!(groups[0].particles_with_spin(Spin::Down).count(), 2);
    }

    #[test]
    fn test_insufficient_funds_carries_balance() {
        let owner = address(1);
        let rri = gold(owner);
        let state = vec![
            SpunParticle::up(mutable_definition(&rri, 1)),
            SpunParticle::up(held(address(2), &rri, 4, 0)),
        ];
        let action = TransferTokensAction::new(address(2), address(3), rri.clone(), amount(5));
        assert_eq!(
            run(&action, &state).unwrap_err(),
            ActionError::InsufficientFunds {
                rri,
                available: NonNegativeAmount::from(4u64),
                requested: amount(5),
            }
        );
    }

    #[test]
    fn test_unknown_token() {
        let rri = gold(address(1));
        let state = vec![SpunParticle::up(held(address(2), &rri, 4, 0))];
        let action = TransferTokensAction::new(address(2), address(3), rri.clone(), amount(4));
        assert_eq!(run(&action, &state).unwrap_err(), ActionError::UnknownToken(rri));
    }

    #[test]
    fn test_granularity_checked() {
        let rri = gold(address(1));
        let state = vec![
            SpunParticle::up(mutable_definition(&rri, 5)),
            SpunParticle::up(held(address(2), &rri, 20, 0)),
        ];
        let action = TransferTokensAction::new(address(2), address(3), rri, amount(7));
        assert!(matches!(
            run(&action, &state).unwrap_err(),
            ActionError::NotGranularityMultiple { .. }
        ));
    }

    #[test]
    fn test_attachment_lands_in_metadata() {
        let rri = gold(address(1));
        let state = vec![
            SpunParticle::up(mutable_definition(&rri, 1)),
            SpunParticle::up(held(address(2), &rri, 3, 0)),
        ];
        let action = TransferTokensAction::new(address(2), address(3), rri, amount(3))
            .with_attachment(&b"\x01\xab"[..]);
        let groups = run(&action, &state).unwrap();
        assert_eq!(groups[0].metadata().get(ATTACHMENT_KEY).map(String::as_str), Some("01ab"));
    }

    #[test]
    fn test_fixed_supply_tokens_transfer() {
        let rri = gold(address(1));
        let state = vec![
            SpunParticle::up(fixed_definition(&rri, 100)),
            SpunParticle::up(held(address(2), &rri, 100, 0)),
        ];
        let action = TransferTokensAction::new(address(2), address(3), rri, amount(40));
        let groups = run(&action, &state).unwrap();
        assert_eq!(groups[0].particles_with_spin(Spin::Up).count(), 2);
    }
}

//! Send a message.

use std::collections::BTreeMap;

use atomkit_core::{MessageParticle, ParticleGroup};

use super::{MapperContext, StateRequirement, StateView, StatefulMapper, APPLICATION_KEY};
use crate::action::SendMessageAction;
use crate::error::ActionError;

const DEFAULT_APPLICATION: &str = "message";

/// Emits a single message particle. Stateless.
#[derive(Debug, Default, Clone, Copy)]
pub struct SendMessageMapper;

impl StatefulMapper for SendMessageMapper {
    type Action = SendMessageAction;

    fn required_state(&self, _action: &SendMessageAction) -> Vec<StateRequirement> {
        Vec::new()
    }

    fn particle_groups(
        &self,
        action: &SendMessageAction,
        _state: StateView<'_>,
        context: &MapperContext<'_>,
    ) -> Result<Vec<ParticleGroup>, ActionError> {
        let application = action
            .application
            .clone()
            .unwrap_or_else(|| DEFAULT_APPLICATION.to_string());
        let mut metadata = BTreeMap::new();
        metadata.insert(APPLICATION_KEY.to_string(), application);

        let group = ParticleGroup::builder()
            .spin_up(MessageParticle {
                from: action.from,
                to: action.to,
                bytes: action.data.clone(),
                metadata,
                nonce: context.nonce(),
            })
            .build()?;
        Ok(vec![group])
    }
}

//! Action mappers: one validator and constructor per action kind.
//!
//! A mapper declares which partitions of store state it needs, then turns an
//! action plus that state into particle groups. Mappers are pure; fresh
//! nonces come in through the [`MapperContext`].

mod burn;
mod create_token;
mod message;
mod mint;
mod transfer;
mod unique_id;

use atomkit_core::{
    Address, FixedSupplyTokenDefinition, MutableSupplyTokenDefinition, NonNegativeAmount,
    Particle, ParticleGroup, ParticleKind, PositiveAmount, Rri, Spin, SpunParticle,
    TokenPermissions, TransferrableTokens, UnallocatedTokens, UniqueParticle,
};

use crate::action::{
    ActionKind, BurnTokensAction, CreateTokenAction, MintTokensAction, PutUniqueIdAction,
    SendMessageAction, TransferTokensAction, UserAction,
};
use crate::error::ActionError;
use crate::nonce::NonceSource;

pub use burn::BurnTokensMapper;
pub use create_token::CreateTokenMapper;
pub use message::SendMessageMapper;
pub use mint::MintTokensMapper;
pub use transfer::TransferTokensMapper;
pub use unique_id::PutUniqueIdMapper;

/// Metadata key holding a transfer attachment, hex encoded.
pub const ATTACHMENT_KEY: &str = "attachment";

/// Metadata key naming the application a message belongs to.
pub const APPLICATION_KEY: &str = "application";

/// One partition of store state: particles of `kind` at `address`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StateRequirement {
    pub kind: ParticleKind,
    pub address: Address,
}

impl StateRequirement {
    pub fn new(kind: ParticleKind, address: Address) -> Self {
        Self { kind, address }
    }

    /// Whether `particle` belongs to this partition.
    pub fn matches(&self, particle: &Particle) -> bool {
        particle.kind() == self.kind && particle.concerns(&self.address)
    }
}

/// What a mapper may draw on besides the state it asked for.
pub struct MapperContext<'a> {
    /// The address initiating the transaction.
    pub active_address: Address,
    pub nonces: &'a dyn NonceSource,
}

impl<'a> MapperContext<'a> {
    pub fn new(active_address: Address, nonces: &'a dyn NonceSource) -> Self {
        Self {
            active_address,
            nonces,
        }
    }

    pub fn nonce(&self) -> i64 {
        self.nonces.next_nonce()
    }
}

/// Read-only queries over the up-particles handed to a mapper.
#[derive(Debug, Clone, Copy)]
pub struct StateView<'a> {
    particles: &'a [SpunParticle],
}

impl<'a> StateView<'a> {
    pub fn new(particles: &'a [SpunParticle]) -> Self {
        Self { particles }
    }

    /// Every up particle, in the order given.
    pub fn up(&self) -> impl Iterator<Item = &'a Particle> + 'a {
        let particles = self.particles;
        particles
            .iter()
            .filter(|s| s.spin == Spin::Up)
            .map(|s| &s.particle)
    }

    pub fn mutable_definition(&self, rri: &Rri) -> Option<&'a MutableSupplyTokenDefinition> {
        self.up()
            .filter_map(Particle::as_mutable_definition)
            .find(|d| &d.rri == rri)
    }

    pub fn fixed_definition(&self, rri: &Rri) -> Option<&'a FixedSupplyTokenDefinition> {
        self.up()
            .filter_map(Particle::as_fixed_definition)
            .find(|d| &d.rri == rri)
    }

    /// Transferable tokens of `rri` held by `owner`.
    pub fn transferrable<'b>(
        &self,
        owner: Address,
        rri: &'b Rri,
    ) -> impl Iterator<Item = &'a TransferrableTokens> + 'b
    where
        'a: 'b,
    {
        self.up()
            .filter_map(Particle::as_transferrable)
            .filter(move |t| t.address == owner && &t.token == rri)
    }

    /// Unallocated supply of `rri`.
    pub fn unallocated<'b>(&self, rri: &'b Rri) -> impl Iterator<Item = &'a UnallocatedTokens> + 'b
    where
        'a: 'b,
    {
        self.up()
            .filter_map(Particle::as_unallocated)
            .filter(move |u| &u.token == rri)
    }

    pub fn unique(&self, owner: &Address, name: &str) -> Option<&'a UniqueParticle> {
        self.up()
            .filter_map(Particle::as_unique)
            .find(|u| &u.address == owner && u.name == name)
    }
}

/// A mapper for one kind of action.
pub trait StatefulMapper: Send + Sync {
    type Action: ActionVariant;

    /// The state partitions needed to validate and construct `action`.
    fn required_state(&self, action: &Self::Action) -> Vec<StateRequirement>;

    /// Validate `action` against `state` and build its particle groups.
    fn particle_groups(
        &self,
        action: &Self::Action,
        state: StateView<'_>,
        context: &MapperContext<'_>,
    ) -> Result<Vec<ParticleGroup>, ActionError>;
}

/// Ties an action struct to its [`UserAction`] variant.
pub trait ActionVariant: Sized {
    const KIND: ActionKind;

    fn extract(action: &UserAction) -> Option<&Self>;
}

macro_rules! impl_action_variant {
    ($($variant:ident => $ty:ty),* $(,)?) => {$(
        impl ActionVariant for $ty {
            const KIND: ActionKind = ActionKind::$variant;

            fn extract(action: &UserAction) -> Option<&Self> {
                match action {
                    UserAction::$variant(inner) => Some(inner),
                    _ => None,
                }
            }
        }
    )*};
}

impl_action_variant! {
    Transfer => TransferTokensAction,
    Mint => MintTokensAction,
    Burn => BurnTokensAction,
    CreateToken => CreateTokenAction,
    PutUniqueId => PutUniqueIdAction,
    SendMessage => SendMessageAction,
}

/// Sum of fungible amounts, or an overflow error.
pub(crate) fn total<'a, I>(amounts: I) -> Result<NonNegativeAmount, ActionError>
where
    I: IntoIterator<Item = &'a PositiveAmount>,
{
    amounts
        .into_iter()
        .try_fold(NonNegativeAmount::zero(), |acc, a| Ok(acc.checked_add(&(*a).into())?))
}

/// Reject amounts that are not a multiple of the token's granularity.
pub(crate) fn check_granularity(
    amount: impl Into<NonNegativeAmount>,
    granularity: PositiveAmount,
) -> Result<(), ActionError> {
    let amount = amount.into();
    if amount.is_multiple_of(&granularity) {
        Ok(())
    } else {
        Err(ActionError::NotGranularityMultiple {
            amount,
            granularity,
        })
    }
}

/// Definition of a token, whichever supply kind it has.
pub(crate) enum Definition<'a> {
    Mutable(&'a MutableSupplyTokenDefinition),
    Fixed(&'a FixedSupplyTokenDefinition),
}

impl Definition<'_> {
    pub(crate) fn granularity(&self) -> PositiveAmount {
        match self {
            Definition::Mutable(d) => d.granularity,
            Definition::Fixed(d) => d.granularity,
        }
    }

    pub(crate) fn permissions(&self) -> TokenPermissions {
        match self {
            Definition::Mutable(d) => d.permissions,
            Definition::Fixed(_) => TokenPermissions::FIXED,
        }
    }
}

pub(crate) fn find_definition<'a>(state: &StateView<'a>, rri: &Rri) -> Option<Definition<'a>> {
    state
        .mutable_definition(rri)
        .map(Definition::Mutable)
        .or_else(|| state.fixed_definition(rri).map(Definition::Fixed))
}

/// Requirements for looking up a token's definition.
pub(crate) fn definition_requirements(rri: &Rri) -> [StateRequirement; 2] {
    [
        StateRequirement::new(ParticleKind::MutableSupplyTokenDefinition, *rri.address()),
        StateRequirement::new(ParticleKind::FixedSupplyTokenDefinition, *rri.address()),
    ]
}

//! User actions: the high-level intents a transaction is compiled from.

use std::fmt;

use atomkit_core::{
    Address, CoreError, NonNegativeAmount, PositiveAmount, PositiveSupply, Rri, TokenPermissions,
};
use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Tag naming each kind of [`UserAction`]. Mappers are registered by kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ActionKind {
    Transfer,
    Mint,
    Burn,
    CreateToken,
    PutUniqueId,
    SendMessage,
}

impl ActionKind {
    pub const ALL: [ActionKind; 6] = [
        ActionKind::Transfer,
        ActionKind::Mint,
        ActionKind::Burn,
        ActionKind::CreateToken,
        ActionKind::PutUniqueId,
        ActionKind::SendMessage,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ActionKind::Transfer => "transfer",
            ActionKind::Mint => "mint",
            ActionKind::Burn => "burn",
            ActionKind::CreateToken => "create_token",
            ActionKind::PutUniqueId => "put_unique_id",
            ActionKind::SendMessage => "send_message",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Move tokens from one address to another.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferTokensAction {
    pub from: Address,
    pub to: Address,
    pub rri: Rri,
    pub amount: PositiveAmount,
    pub attachment: Option<Bytes>,
}

impl TransferTokensAction {
    pub fn new(from: Address, to: Address, rri: Rri, amount: PositiveAmount) -> Self {
        Self {
            from,
            to,
            rri,
            amount,
            attachment: None,
        }
    }

    pub fn with_attachment(mut self, attachment: impl Into<Bytes>) -> Self {
        self.attachment = Some(attachment.into());
        self
    }
}

/// Issue new tokens of a mutable-supply token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MintTokensAction {
    pub rri: Rri,
    pub amount: PositiveAmount,
    pub minter: Address,
    pub credit_to: Address,
}

impl MintTokensAction {
    /// Mint to the minter itself.
    pub fn new(rri: Rri, amount: PositiveAmount, minter: Address) -> Self {
        Self {
            rri,
            amount,
            minter,
            credit_to: minter,
        }
    }

    pub fn credit_to(mut self, address: Address) -> Self {
        self.credit_to = address;
        self
    }
}

/// Return tokens of a mutable-supply token to its unallocated supply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BurnTokensAction {
    pub rri: Rri,
    pub amount: PositiveAmount,
    pub burner: Address,
}

impl BurnTokensAction {
    pub fn new(rri: Rri, amount: PositiveAmount, burner: Address) -> Self {
        Self { rri, amount, burner }
    }
}

/// How a new token's supply is managed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenSupply {
    /// The whole supply is issued to the creator and can never change.
    Fixed(PositiveSupply),
    /// Supply changes through mint and burn. `initial` is minted to the
    /// creator at creation and may be zero.
    Mutable {
        initial: NonNegativeAmount,
        permissions: TokenPermissions,
    },
}

/// Define a new token under the creator's address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateTokenAction {
    pub rri: Rri,
    pub name: String,
    pub description: String,
    pub granularity: PositiveAmount,
    pub icon_url: Option<String>,
    pub url: Option<String>,
    pub supply: TokenSupply,
}

impl CreateTokenAction {
    /// A mutable-supply token with owner-only mint and burn.
    pub fn mutable(
        creator: Address,
        symbol: &str,
        name: impl Into<String>,
        initial: NonNegativeAmount,
        granularity: PositiveAmount,
    ) -> Result<Self, CoreError> {
        Ok(Self {
            rri: Rri::token(creator, symbol)?,
            name: name.into(),
            description: String::new(),
            granularity,
            icon_url: None,
            url: None,
            supply: TokenSupply::Mutable {
                initial,
                permissions: TokenPermissions::OWNER_ONLY,
            },
        })
    }

    /// A fixed-supply token.
    pub fn fixed(
        creator: Address,
        symbol: &str,
        name: impl Into<String>,
        supply: PositiveSupply,
        granularity: PositiveAmount,
    ) -> Result<Self, CoreError> {
        Ok(Self {
            rri: Rri::token(creator, symbol)?,
            name: name.into(),
            description: String::new(),
            granularity,
            icon_url: None,
            url: None,
            supply: TokenSupply::Fixed(supply),
        })
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn icon_url(mut self, url: impl Into<String>) -> Self {
        self.icon_url = Some(url.into());
        self
    }

    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn creator(&self) -> &Address {
        self.rri.address()
    }
}

/// Claim a unique name under the owner's address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PutUniqueIdAction {
    pub owner: Address,
    pub name: String,
}

impl PutUniqueIdAction {
    pub fn new(owner: Address, name: impl Into<String>) -> Self {
        Self {
            owner,
            name: name.into(),
        }
    }

    /// The identifier this claim would occupy.
    pub fn rri(&self) -> Result<Rri, CoreError> {
        Rri::new(self.owner, self.name.clone())
    }
}

/// Send arbitrary data to an address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendMessageAction {
    pub from: Address,
    pub to: Address,
    pub data: Bytes,
    pub application: Option<String>,
}

impl SendMessageAction {
    pub fn new(from: Address, to: Address, data: impl Into<Bytes>) -> Self {
        Self {
            from,
            to,
            data: data.into(),
            application: None,
        }
    }

    pub fn application(mut self, application: impl Into<String>) -> Self {
        self.application = Some(application.into());
        self
    }
}

/// A high-level user intent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum UserAction {
    Transfer(TransferTokensAction),
    Mint(MintTokensAction),
    Burn(BurnTokensAction),
    CreateToken(CreateTokenAction),
    PutUniqueId(PutUniqueIdAction),
    SendMessage(SendMessageAction),
}

impl UserAction {
    pub fn kind(&self) -> ActionKind {
        match self {
            UserAction::Transfer(_) => ActionKind::Transfer,
            UserAction::Mint(_) => ActionKind::Mint,
            UserAction::Burn(_) => ActionKind::Burn,
            UserAction::CreateToken(_) => ActionKind::CreateToken,
            UserAction::PutUniqueId(_) => ActionKind::PutUniqueId,
            UserAction::SendMessage(_) => ActionKind::SendMessage,
        }
    }

    /// Every address this action concerns, including token owners.
    pub fn addresses(&self) -> Vec<Address> {
        let mut addresses = match self {
            UserAction::Transfer(a) => vec![a.from, a.to, *a.rri.address()],
            UserAction::Mint(a) => vec![a.minter, a.credit_to, *a.rri.address()],
            UserAction::Burn(a) => vec![a.burner, *a.rri.address()],
            UserAction::CreateToken(a) => vec![*a.rri.address()],
            UserAction::PutUniqueId(a) => vec![a.owner],
            UserAction::SendMessage(a) => vec![a.from, a.to],
        };
        addresses.sort();
        addresses.dedup();
        addresses
    }
}

macro_rules! impl_from_action {
    ($($variant:ident => $ty:ty),* $(,)?) => {$(
        impl From<$ty> for UserAction {
            fn from(action: $ty) -> Self {
                UserAction::$variant(action)
            }
        }
    )*};
}

impl_from_action! {
    Transfer => TransferTokensAction,
    Mint => MintTokensAction,
    Burn => BurnTokensAction,
    CreateToken => CreateTokenAction,
    PutUniqueId => PutUniqueIdAction,
    SendMessage => SendMessageAction,
}

#[cfg(test)]
mod tests {
    use super::*;
    use atomkit_core::{Keypair, Universe};

    fn address(seed: u8) -> Address {
        Address::from_keypair(Universe(1), &Keypair::from_seed(&[seed; 32]))
    }

    #[test]
    fn test_transfer_addresses_include_token_owner() {
        let owner = address(1);
        let rri = Rri::token(owner, "GOLD").unwrap();
        let action: UserAction =
            TransferTokensAction::new(address(2), address(3), rri, PositiveAmount::one()).into();
        let addresses = action.addresses();
        assert_eq!(addresses.len(), 3);
        assert!(addresses.contains(&owner));
    }

    #[test]
    fn test_mint_defaults_credit_to_minter() {
        let minter = address(1);
        let rri = Rri::token(minter, "GOLD").unwrap();
        let action = MintTokensAction::new(rri, PositiveAmount::one(), minter);
        assert_eq!(action.credit_to, minter);
        assert_eq!(UserAction::from(action).addresses(), vec![minter]);
    }

    #[test]
    fn test_kind_names_are_distinct() {
        let mut names: Vec<_> = ActionKind::ALL.iter().map(|k| k.as_str()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), ActionKind::ALL.len());
    }

    #[test]
    fn test_create_token_rejects_bad_symbol() {
        let result = CreateTokenAction::mutable(
            address(1),
            "not a symbol!",
            "Bad",
            NonNegativeAmount::zero(),
            PositiveAmount::one(),
        );
        assert!(result.is_err());
    }
}

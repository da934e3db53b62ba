//! Resource identifiers.
//!
//! An RRI names a token definition or a unique claim: `/<address>/<name>`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::address::Address;
use crate::error::CoreError;

/// Maximum length of an RRI name.
pub const MAX_NAME_LEN: usize = 64;

/// Maximum length of a token symbol.
pub const MAX_SYMBOL_LEN: usize = 14;

/// A namespaced resource identifier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "RriFields")]
pub struct Rri {
    address: Address,
    name: String,
}

/// Wire shape of an [`Rri`], validated on the way in.
#[derive(Deserialize)]
struct RriFields {
    address: Address,
    name: String,
}

impl TryFrom<RriFields> for Rri {
    type Error = CoreError;

    fn try_from(fields: RriFields) -> Result<Self, Self::Error> {
        Rri::new(fields.address, fields.name)
    }
}

impl Rri {
    /// Create an RRI, validating the name.
    pub fn new(address: Address, name: impl Into<String>) -> Result<Self, CoreError> {
        let name = name.into();
        validate_name(&name)?;
        Ok(Self { address, name })
    }

    /// Create an RRI for a token symbol (1-14 ASCII alphanumerics).
    pub fn token(address: Address, symbol: impl Into<String>) -> Result<Self, CoreError> {
        let symbol = symbol.into();
        if symbol.is_empty()
            || symbol.len() > MAX_SYMBOL_LEN
            || !symbol.chars().all(|c| c.is_ascii_alphanumeric())
        {
            return Err(CoreError::InvalidRri(format!("invalid token symbol: {:?}", symbol)));
        }
        Ok(Self { address, name: symbol })
    }

    /// The owning address.
    pub fn address(&self) -> &Address {
        &self.address
    }

    /// The name (symbol or unique string).
    pub fn name(&self) -> &str {
        &self.name
    }
}

fn validate_name(name: &str) -> Result<(), CoreError> {
    if name.is_empty() || name.len() > MAX_NAME_LEN {
        return Err(CoreError::InvalidRri(format!(
            "name must be 1-{} characters",
            MAX_NAME_LEN
        )));
    }
    if let Some(c) = name
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-')))
    {
        return Err(CoreError::InvalidRri(format!("illegal character {:?}", c)));
    }
    Ok(())
}

impl fmt::Display for Rri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}/{}", self.address, self.name)
    }
}

impl FromStr for Rri {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let rest = s
            .strip_prefix('/')
            .ok_or_else(|| CoreError::InvalidRri("must start with '/'".into()))?;
        let (address, name) = rest
            .split_once('/')
            .ok_or_else(|| CoreError::InvalidRri("missing name segment".into()))?;
        Rri::new(address.parse()?, name)
    }
}

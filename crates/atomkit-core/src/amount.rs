//! Bounded 256-bit amounts.
//!
//! Every kind wraps a magnitude in `[0, 2^256-1]`. Positive kinds can only be
//! built through a fallible constructor that rejects zero, and arithmetic is
//! checked: exceeding either bound is an [`AmountError`], never a wrap.
//!
//! Amounts serialize as decimal strings.

use primitive_types::U256;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;

use crate::error::AmountError;

fn parse_u256(s: &str) -> Result<U256, AmountError> {
    U256::from_dec_str(s).map_err(|e| AmountError::Parse(format!("{:?}", e)))
}

/// A magnitude in `[0, 2^256-1]`.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct NonNegativeAmount(U256);

impl NonNegativeAmount {
    /// Zero.
    pub fn zero() -> Self {
        Self(U256::zero())
    }

    /// The largest representable amount, `2^256-1`.
    pub fn max() -> Self {
        Self(U256::MAX)
    }

    /// Wrap a raw magnitude. Every `U256` is in range.
    pub fn new(value: U256) -> Self {
        Self(value)
    }

    /// Parse from a decimal string.
    pub fn from_dec_str(s: &str) -> Result<Self, AmountError> {
        parse_u256(s).map(Self)
    }

    /// The raw magnitude.
    pub fn value(&self) -> U256 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Checked addition.
    pub fn checked_add(&self, other: &NonNegativeAmount) -> Result<Self, AmountError> {
        self.0.checked_add(other.0).map(Self).ok_or(AmountError::Overflow)
    }

    /// Checked subtraction.
    pub fn checked_sub(&self, other: &NonNegativeAmount) -> Result<Self, AmountError> {
        self.0.checked_sub(other.0).map(Self).ok_or(AmountError::Underflow)
    }

    /// Addition clamped at `2^256-1`.
    pub fn saturating_add(&self, other: &NonNegativeAmount) -> Self {
        Self(self.0.saturating_add(other.0))
    }

    /// Whether this amount is an exact multiple of `granularity`.
    pub fn is_multiple_of(&self, granularity: &PositiveAmount) -> bool {
        (self.0 % granularity.0).is_zero()
    }

    /// Convert to a positive amount, failing on zero.
    pub fn to_positive(&self) -> Result<PositiveAmount, AmountError> {
        PositiveAmount::new(self.0)
    }
}

impl From<u64> for NonNegativeAmount {
    fn from(value: u64) -> Self {
        Self(U256::from(value))
    }
}

impl From<PositiveAmount> for NonNegativeAmount {
    fn from(value: PositiveAmount) -> Self {
        Self(value.0)
    }
}

/// A magnitude in `[1, 2^256-1]`.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PositiveAmount(U256);

impl PositiveAmount {
    /// Build from a raw magnitude, rejecting zero.
    pub fn new(value: U256) -> Result<Self, AmountError> {
        if value.is_zero() {
            return Err(AmountError::Zero);
        }
        Ok(Self(value))
    }

    /// Build from a `u64`, rejecting zero.
    pub fn from_u64(value: u64) -> Result<Self, AmountError> {
        Self::new(U256::from(value))
    }

    /// Parse from a decimal string, rejecting zero.
    pub fn from_dec_str(s: &str) -> Result<Self, AmountError> {
        Self::new(parse_u256(s)?)
    }

    /// One.
    pub fn one() -> Self {
        Self(U256::one())
    }

    /// The largest representable amount, `2^256-1`.
    pub fn max() -> Self {
        Self(U256::MAX)
    }

    /// The raw magnitude.
    pub fn value(&self) -> U256 {
        self.0
    }

    /// Checked addition.
    pub fn checked_add(&self, other: &PositiveAmount) -> Result<Self, AmountError> {
        self.0.checked_add(other.0).map(Self).ok_or(AmountError::Overflow)
    }

    /// Checked subtraction; the difference may be zero.
    pub fn checked_sub(&self, other: &PositiveAmount) -> Result<NonNegativeAmount, AmountError> {
        self.0
            .checked_sub(other.0)
            .map(NonNegativeAmount)
            .ok_or(AmountError::Underflow)
    }

    /// Whether this amount is an exact multiple of `granularity`.
    pub fn is_multiple_of(&self, granularity: &PositiveAmount) -> bool {
        (self.0 % granularity.0).is_zero()
    }
}

/// Total issued supply of a token, in `[0, 2^256-1]`.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Supply(U256);

impl Supply {
    pub fn zero() -> Self {
        Self(U256::zero())
    }

    /// The supply bound, `2^256-1`.
    pub fn max() -> Self {
        Self(U256::MAX)
    }

    pub fn new(value: U256) -> Self {
        Self(value)
    }

    pub fn value(&self) -> U256 {
        self.0
    }

    /// Issue `amount` more; fails if the total would pass the bound.
    pub fn add(&self, amount: &PositiveAmount) -> Result<Self, AmountError> {
        self.0.checked_add(amount.0).map(Self).ok_or(AmountError::Overflow)
    }

    /// The supply issued when `unallocated` is all that is left to mint.
    pub fn from_unallocated(unallocated: &NonNegativeAmount) -> Self {
        Self(U256::MAX - unallocated.0)
    }
}

impl From<PositiveSupply> for Supply {
    fn from(value: PositiveSupply) -> Self {
        Self(value.0)
    }
}

/// A supply in `[1, 2^256-1]`, as fixed at token creation.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PositiveSupply(U256);

impl PositiveSupply {
    pub fn new(value: U256) -> Result<Self, AmountError> {
        if value.is_zero() {
            return Err(AmountError::Zero);
        }
        Ok(Self(value))
    }

    pub fn value(&self) -> U256 {
        self.0
    }

    /// The same magnitude as a positive amount.
    pub fn as_amount(&self) -> PositiveAmount {
        PositiveAmount(self.0)
    }
}

impl From<PositiveAmount> for PositiveSupply {
    fn from(value: PositiveAmount) -> Self {
        Self(value.0)
    }
}

/// A sign-magnitude accumulator used when folding spun particles.
///
/// Down-spins subtract before the matching up-spin may have been seen, so the
/// running sum can be transiently negative.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SignedAmount {
    negative: bool,
    magnitude: U256,
}

impl SignedAmount {
    pub fn zero() -> Self {
        Self::default()
    }

    pub fn positive(magnitude: U256) -> Self {
        Self {
            negative: false,
            magnitude,
        }
    }

    pub fn negative(magnitude: U256) -> Self {
        Self::normalized(true, magnitude)
    }

    fn normalized(negative: bool, magnitude: U256) -> Self {
        Self {
            negative: negative && !magnitude.is_zero(),
            magnitude,
        }
    }

    pub fn is_negative(&self) -> bool {
        self.negative
    }

    pub fn is_zero(&self) -> bool {
        self.magnitude.is_zero()
    }

    pub fn magnitude(&self) -> U256 {
        self.magnitude
    }

    pub fn negate(&self) -> Self {
        Self::normalized(!self.negative, self.magnitude)
    }

    /// Checked signed addition; fails only when a magnitude passes `2^256-1`.
    pub fn checked_add(&self, other: &SignedAmount) -> Result<Self, AmountError> {
        if self.negative == other.negative {
            let magnitude = self
                .magnitude
                .checked_add(other.magnitude)
                .ok_or(AmountError::Overflow)?;
            return Ok(Self::normalized(self.negative, magnitude));
        }
        match self.magnitude.cmp(&other.magnitude) {
            Ordering::Less => Ok(Self::normalized(
                other.negative,
                other.magnitude - self.magnitude,
            )),
            _ => Ok(Self::normalized(
                self.negative,
                self.magnitude - other.magnitude,
            )),
        }
    }

    pub fn checked_sub(&self, other: &SignedAmount) -> Result<Self, AmountError> {
        self.checked_add(&other.negate())
    }

    /// The value as a non-negative amount, if it is not negative.
    pub fn to_non_negative(&self) -> Option<NonNegativeAmount> {
        (!self.negative).then_some(NonNegativeAmount(self.magnitude))
    }
}

impl From<PositiveAmount> for SignedAmount {
    fn from(value: PositiveAmount) -> Self {
        Self::positive(value.0)
    }
}

macro_rules! decimal_display {
    ($($ty:ty),*) => {$(
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl fmt::Debug for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($ty), self.0)
            }
        }

        impl Serialize for $ty {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(&self.0.to_string())
            }
        }
    )*};
}

decimal_display!(NonNegativeAmount, PositiveAmount, Supply, PositiveSupply);

impl<'de> Deserialize<'de> for NonNegativeAmount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_dec_str(&s).map_err(de::Error::custom)
    }
}

impl<'de> Deserialize<'de> for PositiveAmount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_dec_str(&s).map_err(de::Error::custom)
    }
}

impl<'de> Deserialize<'de> for Supply {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        parse_u256(&s).map(Self).map_err(de::Error::custom)
    }
}

impl<'de> Deserialize<'de> for PositiveSupply {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        parse_u256(&s)
            .and_then(Self::new)
            .map_err(de::Error::custom)
    }
}

impl fmt::Display for SignedAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.negative {
            write!(f, "-{}", self.magnitude)
        } else {
            write!(f, "{}", self.magnitude)
        }
    }
}

impl fmt::Debug for SignedAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SignedAmount({})", self)
    }
}

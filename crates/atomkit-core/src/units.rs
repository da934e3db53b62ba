//! Conversion between whole tokens and subunits.
//!
//! Amounts on the ledger are integers of subunits; one whole token is
//! `10^18` subunits.

use primitive_types::U256;

use crate::amount::NonNegativeAmount;
use crate::error::AmountError;

/// Decimal places between a token and its subunit.
pub const SUBUNIT_DECIMALS: usize = 18;

/// Subunits in one whole token.
pub fn subunits_per_token() -> U256 {
    U256::exp10(SUBUNIT_DECIMALS)
}

/// Parse a decimal token amount such as `"1.5"` into subunits.
pub fn to_subunits(tokens: &str) -> Result<NonNegativeAmount, AmountError> {
    let (whole, fraction) = tokens.split_once('.').unwrap_or((tokens, ""));
    if whole.is_empty() && fraction.is_empty() {
        return Err(AmountError::Parse(tokens.to_string()));
    }
    if fraction.len() > SUBUNIT_DECIMALS {
        return Err(AmountError::Parse(format!(
            "more than {} decimal places: {}",
            SUBUNIT_DECIMALS, tokens
        )));
    }
    if !whole.chars().chain(fraction.chars()).all(|c| c.is_ascii_digit()) {
        return Err(AmountError::Parse(tokens.to_string()));
    }

    let whole = if whole.is_empty() {
        U256::zero()
    } else {
        U256::from_dec_str(whole).map_err(|e| AmountError::Parse(format!("{:?}", e)))?
    };
    let fraction = if fraction.is_empty() {
        U256::zero()
    } else {
        let padded = format!("{:0<width$}", fraction, width = SUBUNIT_DECIMALS);
        U256::from_dec_str(&padded).map_err(|e| AmountError::Parse(format!("{:?}", e)))?
    };

    let scaled = whole
        .checked_mul(subunits_per_token())
        .ok_or(AmountError::Overflow)?;
    scaled
        .checked_add(fraction)
        .map(NonNegativeAmount::new)
        .ok_or(AmountError::Overflow)
}

/// Format subunits as a decimal token amount, trimming trailing zeros.
pub fn format_subunits(amount: &NonNegativeAmount) -> String {
    let per_token = subunits_per_token();
    let whole = amount.value() / per_token;
    let fraction = amount.value() % per_token;
    if fraction.is_zero() {
        return whole.to_string();
    }
    let fraction = format!("{:0>width$}", fraction.to_string(), width = SUBUNIT_DECIMALS);
    format!("{}.{}", whole, fraction.trim_end_matches('0'))
}

//! Conversions between base units (wei and token smallest units) and
//! human-readable decimal amounts.

use std::str::FromStr;

use alloy_primitives::U256;
use bigdecimal::num_bigint::{BigInt, Sign};
use bigdecimal::BigDecimal;

use crate::error::EthError;

/// Decimal places of the native coin (1 ETH = 10^18 wei).
pub const NATIVE_DECIMALS: u8 = 18;

/// Decimal digits in `U256::MAX`.
const MAX_U256_DIGITS: i128 = 78;

/// Converts an amount in base units to its display value:
/// `base_units / 10^decimals`, exactly.
pub fn to_display(base_units: U256, decimals: u8) -> BigDecimal {
    let digits = BigInt::from_bytes_be(Sign::Plus, &base_units.to_be_bytes::<32>());
    BigDecimal::new(digits, i64::from(decimals))
}

/// Converts a display amount to base units: `floor(display * 10^decimals)`.
///
/// Digits below the smallest unit are dropped, not rounded, matching the
/// integer semantics of token contracts.
pub fn to_base_units(display: &BigDecimal, decimals: u8) -> Result<U256, EthError> {
    if display.sign() == Sign::Minus {
        return Err(EthError::InvalidInput(format!(
            "amount must not be negative: {display}"
        )));
    }

    let overflow = || EthError::InvalidInput(format!("amount {display} overflows 256 bits"));

    let (digits, scale) = display.as_bigint_and_exponent();
    if digits.sign() == Sign::NoSign {
        return Ok(U256::ZERO);
    }

    // Shifting the scale multiplies by 10^decimals without rounding.
    let scale = scale.checked_sub(i64::from(decimals)).ok_or_else(overflow)?;

    // Bound the integer part before materializing it: an exponent like 1e100000000
    // would otherwise build a huge BigInt only to fail the range check.
    let integer_digits = i128::from(display.digits()) - i128::from(scale);
    if integer_digits > MAX_U256_DIGITS {
        return Err(overflow());
    }
    if integer_digits <= 0 {
        return Ok(U256::ZERO);
    }

    let shifted = BigDecimal::new(digits, scale).with_scale(0);

    let (integer, _) = shifted.into_bigint_and_exponent();
    let (_, bytes) = integer.to_bytes_be();

    U256::try_from_be_slice(&bytes).ok_or_else(overflow)
}

/// Parses a user-supplied decimal amount such as `"2.5"`.
pub fn parse_amount(input: &str) -> Result<BigDecimal, EthError> {
    BigDecimal::from_str(input.trim())
        .map_err(|e| EthError::InvalidInput(format!("invalid amount {input:?}: {e}")))
}

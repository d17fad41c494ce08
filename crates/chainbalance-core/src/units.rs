//! Base-unit ↔ decimal-string conversion and exact decimal summation.
//!
//! Formatting follows the usual EVM tooling convention: the fractional part
//! is trimmed of trailing zeros but always keeps at least one digit, so one
//! USDC (raw `1000000`, 6 decimals) formats as `"1.0"`.

use alloy_primitives::U256;
use thiserror::Error;

/// Native coin precision on every EVM network.
pub const NATIVE_DECIMALS: u8 = 18;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum UnitsError {
    #[error("invalid hex quantity: {0}")]
    InvalidHex(String),
    #[error("invalid decimal string: {0}")]
    InvalidDecimal(String),
    #[error("{0} has more than {1} fractional digits")]
    TooPrecise(String, u8),
    #[error("value overflows 256 bits")]
    Overflow,
}

/// Parse a `0x`-prefixed hex quantity as returned by JSON-RPC.
pub fn parse_hex_quantity(hex: &str) -> Result<U256, UnitsError> {
    let digits = hex
        .strip_prefix("0x")
        .or_else(|| hex.strip_prefix("0X"))
        .unwrap_or(hex);
    if digits.is_empty() {
        return Ok(U256::ZERO);
    }
    U256::from_str_radix(digits, 16).map_err(|_| UnitsError::InvalidHex(hex.to_string()))
}

fn ten_pow(decimals: u8) -> U256 {
    U256::from(10u64).pow(U256::from(decimals))
}

/// Format `value` base units with `decimals` fractional digits.
pub fn format_units(value: U256, decimals: u8) -> String {
    if decimals == 0 {
        return format!("{value}.0");
    }
    let unit = ten_pow(decimals);
    let int = value / unit;
    let frac = value % unit;
    let frac = format!("{:0>width$}", frac.to_string(), width = decimals as usize);
    let trimmed = frac.trim_end_matches('0');
    if trimmed.is_empty() {
        format!("{int}.0")
    } else {
        format!("{int}.{trimmed}")
    }
}

/// Parse a decimal string into base units with `decimals` fractional digits.
pub fn parse_units(value: &str, decimals: u8) -> Result<U256, UnitsError> {
    let invalid = || UnitsError::InvalidDecimal(value.to_string());
    let (int, frac) = match value.split_once('.') {
        Some((i, f)) => (i, f),
        None => (value, ""),
    };
    if int.is_empty() && frac.is_empty() {
        return Err(invalid());
    }
    let all_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
    if !all_digits(int) || !all_digits(frac) {
        return Err(invalid());
    }
    let frac = frac.trim_end_matches('0');
    if frac.len() > decimals as usize {
        return Err(UnitsError::TooPrecise(value.to_string(), decimals));
    }
    let int = if int.is_empty() { "0" } else { int };
    let int = U256::from_str_radix(int, 10).map_err(|_| invalid())?;
    let padded = format!("{frac:0<width$}", width = decimals as usize);
    let frac = if padded.is_empty() {
        U256::ZERO
    } else {
        U256::from_str_radix(&padded, 10).map_err(|_| invalid())?
    };
    int.checked_mul(ten_pow(decimals))
        .and_then(|v| v.checked_add(frac))
        .ok_or(UnitsError::Overflow)
}

fn fractional_digits(value: &str) -> usize {
    value
        .split_once('.')
        .map(|(_, f)| f.trim_end_matches('0').len())
        .unwrap_or(0)
}

/// Exact sum of decimal strings. The result is independent of input order.
/// An empty input sums to `"0"`.
pub fn sum_decimals<'a, I>(values: I) -> Result<String, UnitsError>
where
    I: IntoIterator<Item = &'a str>,
{
    let values: Vec<&str> = values.into_iter().collect();
    if values.is_empty() {
        return Ok("0".to_string());
    }
    let scale = values.iter().map(|v| fractional_digits(v)).max().unwrap_or(0);
    let scale = u8::try_from(scale).map_err(|_| UnitsError::Overflow)?;
    let mut total = U256::ZERO;
    for v in values {
        total = total
            .checked_add(parse_units(v, scale)?)
            .ok_or(UnitsError::Overflow)?;
    }
    Ok(format_units(total, scale))
}

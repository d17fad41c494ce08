//! Minimal ERC-20 calldata builders and return-data decoders.

use alloy_primitives::U256;
use thiserror::Error;

const FUNC_BALANCE_OF: &str = "70a08231";
const FUNC_DECIMALS: &str = "313ce567";
const FUNC_SYMBOL: &str = "95d89b41";
const FUNC_NAME: &str = "06fdde03";

const WORD: usize = 32;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AbiError {
    #[error("empty return data (no contract at address?)")]
    Empty,
    #[error("return data is not valid hex: {0}")]
    Hex(String),
    #[error("return data too short: {0} bytes")]
    Truncated(usize),
    #[error("value out of range for {0}")]
    OutOfRange(&'static str),
    #[error("string is not valid UTF-8")]
    Utf8,
}

/// ERC-20 read calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallData(String);

impl CallData {
    pub fn balance_of(owner: &str) -> Self {
        Self(format!(
            "{FUNC_BALANCE_OF}{:0>64}",
            owner.trim_start_matches("0x").to_lowercase()
        ))
    }

    pub fn decimals() -> Self {
        Self(FUNC_DECIMALS.to_string())
    }

    pub fn symbol() -> Self {
        Self(FUNC_SYMBOL.to_string())
    }

    pub fn name() -> Self {
        Self(FUNC_NAME.to_string())
    }

    /// Hex calldata without `0x`.
    pub fn raw(&self) -> &str {
        &self.0
    }
}

fn bytes(data: &str) -> Result<Vec<u8>, AbiError> {
    let digits = data.trim_start_matches("0x");
    if digits.is_empty() {
        return Err(AbiError::Empty);
    }
    hex::decode(digits).map_err(|e| AbiError::Hex(e.to_string()))
}

fn word_to_usize(word: &[u8]) -> Result<usize, AbiError> {
    let (high, low) = word.split_at(WORD - 8);
    if high.iter().any(|b| *b != 0) {
        return Err(AbiError::OutOfRange("usize"));
    }
    let mut buf = [0u8; 8];
    buf.copy_from_slice(low);
    usize::try_from(u64::from_be_bytes(buf)).map_err(|_| AbiError::OutOfRange("usize"))
}

/// Decode a single `uint256` return value.
pub fn decode_uint(data: &str) -> Result<U256, AbiError> {
    let b = bytes(data)?;
    if b.len() < WORD {
        return Err(AbiError::Truncated(b.len()));
    }
    Ok(U256::from_be_slice(&b[..WORD]))
}

/// Decode a `uint8` return value (ERC-20 `decimals`).
pub fn decode_u8(data: &str) -> Result<u8, AbiError> {
    let b = bytes(data)?;
    if b.len() < WORD {
        return Err(AbiError::Truncated(b.len()));
    }
    if b[..WORD - 1].iter().any(|x| *x != 0) {
        return Err(AbiError::OutOfRange("uint8"));
    }
    Ok(b[WORD - 1])
}

/// Decode a `string` return value. Legacy tokens that return `bytes32`
/// (a single zero-padded word) are accepted too.
pub fn decode_string(data: &str) -> Result<String, AbiError> {
    let b = bytes(data)?;
    if b.len() == WORD {
        let end = b.iter().position(|x| *x == 0).unwrap_or(WORD);
        return String::from_utf8(b[..end].to_vec()).map_err(|_| AbiError::Utf8);
    }
    if b.len() < 2 * WORD {
        return Err(AbiError::Truncated(b.len()));
    }
    let offset = word_to_usize(&b[..WORD])?;
    let len_end = offset.checked_add(WORD).ok_or(AbiError::OutOfRange("offset"))?;
    if b.len() < len_end {
        return Err(AbiError::Truncated(b.len()));
    }
    let len = word_to_usize(&b[offset..len_end])?;
    let end = len_end.checked_add(len).ok_or(AbiError::OutOfRange("length"))?;
    if b.len() < end {
        return Err(AbiError::Truncated(b.len()));
    }
    String::from_utf8(b[len_end..end].to_vec()).map_err(|_| AbiError::Utf8)
}

#[cfg(test)]
mod tests {
    use super::*;

    const OWNER: &str = "0xE43878Ce78934fe8007748FF481f03B8Ee3b97DE";

    /// ABI encoding of the string "USDC".
    const USDC_STRING: &str = concat!(
        "0x",
        "0000000000000000000000000000000000000000000000000000000000000020",
        "0000000000000000000000000000000000000000000000000000000000000004",
        "5553444300000000000000000000000000000000000000000000000000000000",
    );

    #[test]
    fn balance_of_calldata() {
        assert_eq!(
            CallData::balance_of(OWNER).raw(),
            "70a08231000000000000000000000000e43878ce78934fe8007748ff481f03b8ee3b97de"
        );
        assert_eq!(CallData::decimals().raw(), "313ce567");
    }

    #[test]
    fn decodes_uint_and_decimals() {
        let six = format!("0x{:0>64}", "6");
        assert_eq!(decode_u8(&six).unwrap(), 6);
        assert_eq!(decode_uint(&six).unwrap(), U256::from(6u64));

        let big = format!("0x{:0>64}", "5f5e100"); // 100_000_000
        assert_eq!(decode_uint(&big).unwrap(), U256::from(100_000_000u64));
    }

    #[test]
    fn decodes_dynamic_string() {
        assert_eq!(decode_string(USDC_STRING).unwrap(), "USDC");
    }

    #[test]
    fn decodes_bytes32_string() {
        let mkr = format!("0x{:0<64}", "4d4b52");
        assert_eq!(decode_string(&mkr).unwrap(), "MKR");
    }

    #[test]
    fn empty_return_data_is_an_error() {
        assert_eq!(decode_uint("0x"), Err(AbiError::Empty));
        assert_eq!(decode_u8("0x1234"), Err(AbiError::Truncated(2)));
        let too_big = format!("0x{:0>64}", "100");
        assert_eq!(decode_u8(&too_big), Err(AbiError::OutOfRange("uint8")));
    }
}

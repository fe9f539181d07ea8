use alloy_primitives::U256;

use crate::abi::{decode_string, decode_uint256, encode_function_call, AbiParam, WORD};
use crate::address::Address;
use crate::error::EthError;

/// Function selector for `transfer(address,uint256)`: `0xa9059cbb`.
pub const TRANSFER_SELECTOR: [u8; 4] = [0xa9, 0x05, 0x9c, 0xbb];

/// Function selector for `balanceOf(address)`: `0x70a08231`.
pub const BALANCE_OF_SELECTOR: [u8; 4] = [0x70, 0xa0, 0x82, 0x31];

/// Function selector for `symbol()`: `0x95d89b41`.
pub const SYMBOL_SELECTOR: [u8; 4] = [0x95, 0xd8, 0x9b, 0x41];

/// Function selector for `decimals()`: `0x313ce567`.
pub const DECIMALS_SELECTOR: [u8; 4] = [0x31, 0x3c, 0xe5, 0x67];

/// Encodes an ERC-20 `transfer(address,uint256)` call.
///
/// Returns the complete calldata (4-byte selector + 64 bytes of params).
pub fn encode_transfer(to: &Address, amount: U256) -> Vec<u8> {
    let params = [AbiParam::Address(*to), AbiParam::Uint256(amount)];
    encode_function_call(TRANSFER_SELECTOR, &params)
}

/// Encodes an ERC-20 `balanceOf(address)` call.
pub fn encode_balance_of(owner: &Address) -> Vec<u8> {
    encode_function_call(BALANCE_OF_SELECTOR, &[AbiParam::Address(*owner)])
}

pub fn encode_symbol() -> Vec<u8> {
    SYMBOL_SELECTOR.to_vec()
}

pub fn encode_decimals() -> Vec<u8> {
    DECIMALS_SELECTOR.to_vec()
}

/// Decodes the return value of `balanceOf`.
pub fn decode_balance(data: &[u8]) -> Result<U256, EthError> {
    decode_uint256(data)
}

/// Decodes the return value of `decimals()`, which must fit in a `uint8`.
pub fn decode_decimals(data: &[u8]) -> Result<u8, EthError> {
    let value = decode_uint256(data)?;
    u8::try_from(value)
        .map_err(|_| EthError::InvalidInput(format!("decimals() returned {value}, above uint8")))
}

/// Decodes the return value of `symbol()`.
///
/// Some early tokens (MKR, SAI) declare `symbol()` as `bytes32` instead of
/// `string`; a lone 32-byte word is read as a NUL-padded string.
pub fn decode_symbol(data: &[u8]) -> Result<String, EthError> {
    if data.len() == WORD {
        let end = data.iter().position(|&b| b == 0).unwrap_or(WORD);
        return String::from_utf8(data[..end].to_vec())
            .map_err(|e| EthError::EncodingError(format!("bytes32 symbol is not UTF-8: {e}")));
    }

    decode_string(data)
}

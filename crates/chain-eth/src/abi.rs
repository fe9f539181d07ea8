//! Minimal ABI encoding for EVM function calls.
//!
//! Just enough encoding and decoding to build ERC-20 calldata and read back
//! the return values of its view functions, without a full ABI parser.

use alloy_primitives::U256;
use sha3::{Digest, Keccak256};

use crate::address::Address;
use crate::error::EthError;

/// Size of one ABI word.
pub const WORD: usize = 32;

/// A single static ABI parameter.
#[derive(Debug, Clone)]
pub enum AbiParam {
    /// A 20-byte address, left-padded to 32 bytes.
    Address(Address),
    /// A 256-bit unsigned integer, big-endian.
    Uint256(U256),
}

/// Computes the 4-byte selector of a canonical function signature such as
/// `"transfer(address,uint256)"`.
pub fn selector(signature: &str) -> [u8; 4] {
    let hash = Keccak256::digest(signature.as_bytes());
    let mut out = [0u8; 4];
    out.copy_from_slice(&hash[..4]);
    out
}

/// Encodes a function call as `selector || word(params[0]) || ...`.
pub fn encode_function_call(selector: [u8; 4], params: &[AbiParam]) -> Vec<u8> {
    let mut data = Vec::with_capacity(4 + params.len() * WORD);
    data.extend_from_slice(&selector);

    for param in params {
        data.extend_from_slice(&encode_param(param));
    }

    data
}

fn encode_param(param: &AbiParam) -> [u8; WORD] {
    match param {
        AbiParam::Address(addr) => {
            let mut word = [0u8; WORD];
            word[12..].copy_from_slice(addr.as_bytes());
            word
        }
        AbiParam::Uint256(value) => value.to_be_bytes::<WORD>(),
    }
}

/// Decodes a single `uint256` return value. Trailing words are ignored.
pub fn decode_uint256(data: &[u8]) -> Result<U256, EthError> {
    let word = word_at(data, 0)?;
    Ok(U256::from_be_slice(word))
}

/// Decodes a single dynamic `string` return value.
pub fn decode_string(data: &[u8]) -> Result<String, EthError> {
    let offset = word_as_usize(word_at(data, 0)?)?;
    let start = offset
        .checked_add(WORD)
        .filter(|&end| end <= data.len())
        .ok_or_else(|| EthError::EncodingError(format!("string offset {offset} out of bounds")))?;
    let len = word_as_usize(&data[offset..start])?;

    let bytes = start
        .checked_add(len)
        .and_then(|end| data.get(start..end))
        .ok_or_else(|| EthError::EncodingError(format!("string length {len} out of bounds")))?;

    String::from_utf8(bytes.to_vec())
        .map_err(|e| EthError::EncodingError(format!("string is not UTF-8: {e}")))
}

fn word_at(data: &[u8], index: usize) -> Result<&[u8], EthError> {
    let start = index * WORD;
    data.get(start..start + WORD).ok_or_else(|| {
        EthError::EncodingError(format!(
            "expected at least {} bytes, got {}",
            start + WORD,
            data.len()
        ))
    })
}

fn word_as_usize(word: &[u8]) -> Result<usize, EthError> {
    let value = U256::from_be_slice(word);
    usize::try_from(value)
        .map_err(|_| EthError::EncodingError(format!("word {value} does not fit in usize")))
}

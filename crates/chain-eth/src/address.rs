use std::fmt;
use std::str::FromStr;

use k256::ecdsa::SigningKey;
use sha3::{Digest, Keccak256};

use crate::error::EthError;

/// A 20-byte Ethereum account or contract address.
///
/// Addresses compare by their bytes, which is the same as comparing their
/// EIP-55 checksummed forms. `Display` always renders the checksummed form.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Address([u8; 20]);

impl Address {
    /// The all-zero address. Used as the native-coin sentinel.
    pub const ZERO: Address = Address([0u8; 20]);

    pub const fn from_bytes(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 20]
    }

    /// Derives the address controlled by a secp256k1 private key.
    pub fn from_private_key(private_key: &[u8; 32]) -> Result<Self, EthError> {
        let signing_key = SigningKey::from_bytes(private_key.into())
            .map_err(|e| EthError::InvalidPrivateKey(e.to_string()))?;

        let point = signing_key.verifying_key().to_encoded_point(false);
        let mut uncompressed = [0u8; 65];
        uncompressed.copy_from_slice(point.as_bytes());

        Self::from_uncompressed_pubkey(&uncompressed)
    }

    /// Derives an address from an uncompressed secp256k1 public key (65 bytes,
    /// starting with 0x04).
    ///
    /// The address is the last 20 bytes of the Keccak-256 hash of the 64-byte
    /// key without its 0x04 prefix.
    pub fn from_uncompressed_pubkey(uncompressed_pubkey: &[u8; 65]) -> Result<Self, EthError> {
        if uncompressed_pubkey[0] != 0x04 {
            return Err(EthError::InvalidPublicKey(
                "uncompressed key must start with 0x04".into(),
            ));
        }

        let hash = Keccak256::digest(&uncompressed_pubkey[1..]);

        let mut addr_bytes = [0u8; 20];
        addr_bytes.copy_from_slice(&hash[12..]);
        Ok(Self(addr_bytes))
    }

    /// Lowercase hex without the `0x` prefix, as stored in keystore files.
    pub fn to_hex_lower(&self) -> String {
        hex::encode(self.0)
    }

    /// EIP-55 checksummed form with `0x` prefix.
    pub fn to_checksum(&self) -> String {
        checksum_hex(&self.to_hex_lower())
    }
}

impl FromStr for Address {
    type Err = EthError;

    /// Parses a hex address with or without `0x`.
    ///
    /// All-lowercase and all-uppercase inputs are accepted as-is. Mixed-case
    /// inputs must carry a valid EIP-55 checksum.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex_part = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .unwrap_or(s);

        if hex_part.len() != 40 {
            return Err(EthError::InvalidAddress(format!(
                "expected 40 hex characters, got {}",
                hex_part.len()
            )));
        }

        if !hex_part.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(EthError::InvalidAddress(
                "address contains non-hex characters".into(),
            ));
        }

        let mut bytes = [0u8; 20];
        hex::decode_to_slice(hex_part, &mut bytes)
            .map_err(|e| EthError::InvalidAddress(format!("invalid hex: {e}")))?;
        let address = Self(bytes);

        let is_all_lower = hex_part.chars().all(|c| !c.is_ascii_uppercase());
        let is_all_upper = hex_part.chars().all(|c| !c.is_ascii_lowercase());

        if !is_all_lower && !is_all_upper && address.to_checksum()[2..] != *hex_part {
            return Err(EthError::InvalidAddress(format!("bad EIP-55 checksum: {s}")));
        }

        Ok(address)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_checksum())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.to_checksum())
    }
}

/// Applies EIP-55 mixed-case checksum encoding to 40 lowercase hex characters.
fn checksum_hex(hex_lower: &str) -> String {
    let hash = Keccak256::digest(hex_lower.as_bytes());

    let mut checksummed = String::with_capacity(42);
    checksummed.push_str("0x");

    for (i, c) in hex_lower.chars().enumerate() {
        // High nibble for even positions, low nibble for odd ones.
        let byte = hash[i / 2];
        let nibble = if i % 2 == 0 { byte >> 4 } else { byte & 0x0f };

        if c.is_ascii_alphabetic() && nibble >= 8 {
            checksummed.push(c.to_ascii_uppercase());
        } else {
            checksummed.push(c);
        }
    }

    checksummed
}

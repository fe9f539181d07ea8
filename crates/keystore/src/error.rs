use std::path::PathBuf;

use chain_eth::EthError;
use crypto_utils::CryptoError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum KeystoreError {
    #[error("Keystore not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Keystore already exists: {}", .0.display())]
    AlreadyExists(PathBuf),

    #[error("Malformed keystore: {0}")]
    Parse(String),

    #[error("Invalid password")]
    InvalidPassword,

    #[error("Decryption failed: {0}")]
    Decryption(String),

    #[error("Invalid private key: {0}")]
    InvalidPrivateKey(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Crypto error: {0}")]
    Crypto(#[from] CryptoError),

    #[error(transparent)]
    Eth(#[from] EthError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_not_found_includes_path() {
        let err = KeystoreError::NotFound(PathBuf::from("/tmp/missing.json"));
        assert_eq!(err.to_string(), "Keystore not found: /tmp/missing.json");
    }

    #[test]
    fn display_invalid_password() {
        assert_eq!(KeystoreError::InvalidPassword.to_string(), "Invalid password");
    }

    #[test]
    fn eth_errors_are_transparent() {
        let err: KeystoreError = EthError::Network("connection refused".into()).into();
        assert_eq!(err.to_string(), "network error: connection refused");
    }
}

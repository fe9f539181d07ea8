//! # crypto-utils
//!
//! Password-based key derivation, authenticated encryption, secure random
//! generation and zeroizing buffers used by the keystore.

pub mod encryption;
pub mod error;
pub mod kdf;
pub mod random;
pub mod zeroizing;

pub use error::CryptoError;

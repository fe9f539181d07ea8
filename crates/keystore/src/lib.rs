//! Password-protected single-account keystore for tartarus.
//!
//! A keystore is one JSON file holding a secp256k1 private key encrypted
//! with AES-256-GCM under an Argon2id-derived key, plus the account address
//! in the clear. See [`format`] for the layout.

pub mod error;
pub mod format;
mod store;

pub use error::KeystoreError;
pub use format::EncryptedKeystore;
pub use store::KeyStore;

/// Re-exported so callers can configure KDF costs and pass passwords without
/// depending on the underlying crates directly.
pub use crypto_utils::kdf::KdfParams;
pub use secrecy::SecretString;

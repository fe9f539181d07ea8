//! The on-disk keystore document.
//!
//! ```json
//! {
//!   "version": 1,
//!   "id": "3198bc9c-6672-4b6b-b1d2-5b4f8b3a1c0e",
//!   "address": "7e5f4552091a69125d5dfcb7b8c2659029395bdf",
//!   "crypto": {
//!     "cipher": "aes-256-gcm",
//!     "cipherparams": { "nonce": "..." },
//!     "ciphertext": "...",
//!     "kdf": "argon2id",
//!     "kdfparams": { "m_cost": 65536, "t_cost": 3, "p_cost": 4, "dklen": 32, "salt": "..." }
//!   }
//! }
//! ```

use chain_eth::Address;
use crypto_utils::encryption::{self, NONCE_SIZE};
use crypto_utils::kdf::{self, KdfParams};
use crypto_utils::CryptoError;
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, Zeroizing};

use crate::error::KeystoreError;

pub const KEYSTORE_VERSION: u32 = 1;
pub const CIPHER: &str = "aes-256-gcm";
pub const KDF: &str = "argon2id";

/// Length of the derived encryption key and of the stored secret.
const KEY_LEN: usize = 32;

/// A password-encrypted private key plus the parameters needed to decrypt
/// it. The `address` field is readable without the password.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedKeystore {
    pub version: u32,
    pub id: String,
    /// Lowercase hex, no `0x` prefix.
    pub address: String,
    pub crypto: CryptoSection,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CryptoSection {
    pub cipher: String,
    pub cipherparams: CipherParams,
    /// Hex ciphertext followed by the 16-byte GCM tag.
    pub ciphertext: String,
    pub kdf: String,
    pub kdfparams: KdfSection,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CipherParams {
    pub nonce: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KdfSection {
    pub m_cost: u32,
    pub t_cost: u32,
    pub p_cost: u32,
    pub dklen: u32,
    pub salt: String,
}

impl EncryptedKeystore {
    /// Encrypts `private_key` under `password`.
    pub fn encrypt(
        private_key: &[u8; 32],
        address: &Address,
        password: &[u8],
        params: &KdfParams,
    ) -> Result<Self, KeystoreError> {
        let salt = kdf::generate_salt();
        let mut key = kdf::derive_key(password, &salt, params)?;
        let sealed = encryption::seal(private_key, &key);
        key.zeroize();
        let sealed = sealed?;

        Ok(Self {
            version: KEYSTORE_VERSION,
            id: uuid::Uuid::new_v4().to_string(),
            address: address.to_hex_lower(),
            crypto: CryptoSection {
                cipher: CIPHER.to_string(),
                cipherparams: CipherParams {
                    nonce: hex::encode(sealed.nonce),
                },
                ciphertext: hex::encode(&sealed.ciphertext),
                kdf: KDF.to_string(),
                kdfparams: KdfSection {
                    m_cost: params.m_cost,
                    t_cost: params.t_cost,
                    p_cost: params.p_cost,
                    dklen: KEY_LEN as u32,
                    salt: hex::encode(salt),
                },
            },
        })
    }

    /// Recovers the private key.
    ///
    /// A failed authentication tag is reported as [`KeystoreError::InvalidPassword`];
    /// AES-GCM cannot tell a wrong password from a tampered ciphertext.
    pub fn decrypt(&self, password: &[u8]) -> Result<Zeroizing<[u8; 32]>, KeystoreError> {
        let nonce = self.nonce()?;
        let salt = decode_field("kdfparams.salt", &self.crypto.kdfparams.salt)?;
        let ciphertext = decode_field("ciphertext", &self.crypto.ciphertext)?;

        let mut key = kdf::derive_key(password, &salt, &self.kdf_params())?;
        let opened = encryption::open(&nonce, &ciphertext, &key);
        key.zeroize();

        let plaintext = match opened {
            Ok(plaintext) => plaintext,
            Err(CryptoError::DecryptionFailed(_)) => return Err(KeystoreError::InvalidPassword),
            Err(CryptoError::InvalidInput(msg)) => return Err(KeystoreError::Decryption(msg)),
            Err(other) => return Err(other.into()),
        };

        if plaintext.len() != KEY_LEN {
            return Err(KeystoreError::Decryption(format!(
                "expected a {KEY_LEN}-byte key, got {} bytes",
                plaintext.len()
            )));
        }

        let mut secret = Zeroizing::new([0u8; 32]);
        secret.copy_from_slice(&plaintext);
        Ok(secret)
    }

    /// The account address stored in the metadata, in checksummed form.
    pub fn address(&self) -> Result<Address, KeystoreError> {
        self.address
            .parse()
            .map_err(|e| KeystoreError::Parse(format!("address field: {e}")))
    }

    pub fn kdf_params(&self) -> KdfParams {
        KdfParams {
            m_cost: self.crypto.kdfparams.m_cost,
            t_cost: self.crypto.kdfparams.t_cost,
            p_cost: self.crypto.kdfparams.p_cost,
        }
    }

    /// Parses and validates a keystore document.
    pub fn from_json(json: &str) -> Result<Self, KeystoreError> {
        let keystore: Self = serde_json::from_str(json)
            .map_err(|e| KeystoreError::Parse(format!("invalid keystore json: {e}")))?;
        keystore.validate()?;
        Ok(keystore)
    }

    pub fn to_json(&self) -> Result<String, KeystoreError> {
        serde_json::to_string_pretty(self)
            .map_err(|e| KeystoreError::Parse(format!("serialization failed: {e}")))
    }

    fn validate(&self) -> Result<(), KeystoreError> {
        if self.version != KEYSTORE_VERSION {
            return Err(KeystoreError::Parse(format!(
                "unsupported version {}",
                self.version
            )));
        }
        if self.crypto.cipher != CIPHER {
            return Err(KeystoreError::Parse(format!(
                "unsupported cipher {:?}",
                self.crypto.cipher
            )));
        }
        if self.crypto.kdf != KDF {
            return Err(KeystoreError::Parse(format!(
                "unsupported kdf {:?}",
                self.crypto.kdf
            )));
        }
        if self.crypto.kdfparams.dklen != KEY_LEN as u32 {
            return Err(KeystoreError::Parse(format!(
                "unsupported dklen {}",
                self.crypto.kdfparams.dklen
            )));
        }

        if self.address.starts_with("0x") || self.address.len() != 40 {
            return Err(KeystoreError::Parse(
                "address field must be 40 hex characters without 0x".into(),
            ));
        }
        self.address()?;

        kdf::validate_params(&self.kdf_params())
            .map_err(|e| KeystoreError::Parse(format!("kdfparams: {e}")))?;

        self.nonce()?;
        let salt = decode_field("kdfparams.salt", &self.crypto.kdfparams.salt)?;
        if salt.len() < kdf::MIN_SALT_SIZE {
            return Err(KeystoreError::Parse(format!(
                "kdfparams.salt must be at least {} bytes, got {}",
                kdf::MIN_SALT_SIZE,
                salt.len()
            )));
        }
        decode_field("ciphertext", &self.crypto.ciphertext)?;
        Ok(())
    }

    fn nonce(&self) -> Result<[u8; NONCE_SIZE], KeystoreError> {
        let bytes = decode_field("cipherparams.nonce", &self.crypto.cipherparams.nonce)?;
        bytes.as_slice().try_into().map_err(|_| {
            KeystoreError::Parse(format!(
                "cipherparams.nonce must be {NONCE_SIZE} bytes, got {}",
                bytes.len()
            ))
        })
    }
}

fn decode_field(name: &str, value: &str) -> Result<Vec<u8>, KeystoreError> {
    hex::decode(value).map_err(|e| KeystoreError::Parse(format!("{name}: {e}")))
}

use aes_gcm::aead::{Aead, OsRng};
use aes_gcm::{AeadCore, Aes256Gcm, Key, KeyInit, Nonce};

use crate::error::CryptoError;
use crate::zeroizing::ZeroizingBytes;

/// AES-256-GCM nonce size in bytes.
pub const NONCE_SIZE: usize = 12;

/// AES-256-GCM authentication tag size in bytes.
pub const TAG_SIZE: usize = 16;

/// Output of [`seal`]: the random nonce and the ciphertext with its trailing
/// authentication tag.
///
/// The two parts are kept apart so that file formats can store the nonce in
/// a parameter section next to the cipher name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sealed {
    pub nonce: [u8; NONCE_SIZE],
    pub ciphertext: Vec<u8>,
}

/// Encrypts `plaintext` using AES-256-GCM with the given 32-byte `key` and a
/// freshly generated random nonce.
pub fn seal(plaintext: &[u8], key: &[u8; 32]) -> Result<Sealed, CryptoError> {
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key));
    let nonce = Aes256Gcm::generate_nonce(&mut OsRng);

    let ciphertext = cipher
        .encrypt(&nonce, plaintext)
        .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))?;

    let mut nonce_bytes = [0u8; NONCE_SIZE];
    nonce_bytes.copy_from_slice(&nonce);

    Ok(Sealed {
        nonce: nonce_bytes,
        ciphertext,
    })
}

/// Decrypts and authenticates data produced by [`seal`].
///
/// A wrong key and a tampered ciphertext are indistinguishable here: both
/// fail tag verification and return [`CryptoError::DecryptionFailed`].
pub fn open(
    nonce: &[u8; NONCE_SIZE],
    ciphertext: &[u8],
    key: &[u8; 32],
) -> Result<ZeroizingBytes, CryptoError> {
    if ciphertext.len() < TAG_SIZE {
        return Err(CryptoError::InvalidInput(format!(
            "ciphertext too short: expected at least {} bytes, got {}",
            TAG_SIZE,
            ciphertext.len()
        )));
    }

    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key));

    cipher
        .decrypt(Nonce::from_slice(nonce), ciphertext)
        .map(ZeroizingBytes::new)
        .map_err(|e| CryptoError::DecryptionFailed(e.to_string()))
}

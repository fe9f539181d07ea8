use argon2::{Algorithm, Argon2, Params, Version};

use crate::error::CryptoError;
use crate::random::random_bytes_fixed;

/// Salt length used for newly generated salts.
pub const SALT_SIZE: usize = 16;

/// Shortest salt Argon2 accepts.
pub const MIN_SALT_SIZE: usize = 8;

/// Argon2id cost parameters.
///
/// These travel with the encrypted data so a file written with one set of
/// costs can still be opened after the defaults change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KdfParams {
    /// Memory cost in KiB.
    pub m_cost: u32,
    /// Number of iterations.
    pub t_cost: u32,
    /// Degree of parallelism.
    pub p_cost: u32,
}

impl Default for KdfParams {
    /// 64 MiB, 3 iterations, 4 lanes.
    fn default() -> Self {
        Self {
            m_cost: 65536,
            t_cost: 3,
            p_cost: 4,
        }
    }
}

/// Upper bound on the memory cost accepted from stored parameters (4 GiB).
pub const MAX_M_COST: u32 = 4 * 1024 * 1024;

/// Checks that `params` are usable: accepted by Argon2 and no more
/// memory-hungry than [`MAX_M_COST`].
pub fn validate_params(params: &KdfParams) -> Result<(), CryptoError> {
    argon2_params(params).map(|_| ())
}

fn argon2_params(params: &KdfParams) -> Result<Params, CryptoError> {
    if params.m_cost > MAX_M_COST {
        return Err(CryptoError::KdfFailed(format!(
            "memory cost {} KiB exceeds the {} KiB limit",
            params.m_cost, MAX_M_COST
        )));
    }
    Params::new(params.m_cost, params.t_cost, params.p_cost, Some(32))
        .map_err(|e| CryptoError::KdfFailed(format!("invalid argon2 params: {e}")))
}

/// Derives a 32-byte key from `password` and `salt` using Argon2id (v0x13).
pub fn derive_key(
    password: &[u8],
    salt: &[u8],
    params: &KdfParams,
) -> Result<[u8; 32], CryptoError> {
    let argon_params = argon2_params(params)?;

    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, argon_params);

    let mut output = [0u8; 32];
    argon2
        .hash_password_into(password, salt, &mut output)
        .map_err(|e| CryptoError::KdfFailed(format!("argon2 hash failed: {e}")))?;

    Ok(output)
}

/// Generates a cryptographically secure random salt.
pub fn generate_salt() -> [u8; SALT_SIZE] {
    random_bytes_fixed::<SALT_SIZE>()
}

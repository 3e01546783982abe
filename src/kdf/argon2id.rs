use argon2::password_hash::{PasswordHasher, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};

use super::{Derived, Kdf, KdfKind, KdfParams, params_mismatch};
use crate::error::SimError;

/// Argon2 rejects salts below 8 bytes; PHC encoding caps them at 48.
const MIN_SALT_LEN: usize = 8;
const MAX_SALT_LEN: usize = 48;

/// Argon2id (v0x13), producing the PHC string and the raw hash.
#[derive(Debug, Default, Clone, Copy)]
pub struct Argon2idKdf;

impl Kdf for Argon2idKdf {
    fn kind(&self) -> KdfKind {
        KdfKind::Argon2id
    }

    fn derive(&self, password: &str, salt: &[u8], params: &KdfParams) -> Result<Derived, SimError> {
        let KdfParams::Argon2id(p) = params else {
            return Err(params_mismatch(self.kind(), params));
        };
        if !(MIN_SALT_LEN..=MAX_SALT_LEN).contains(&salt.len()) {
            return Err(SimError::InvalidParameters(format!(
                "argon2id salt must be {MIN_SALT_LEN}..={MAX_SALT_LEN} bytes (got {})",
                salt.len()
            )));
        }
        let argon_params = Params::new(p.memory_kib, p.time_cost, p.parallelism, Some(p.hash_len))
            .map_err(|e| SimError::InvalidParameters(format!("argon2id: {e}")))?;
        let salt = SaltString::encode_b64(salt)
            .map_err(|e| SimError::InvalidParameters(format!("argon2id salt: {e}")))?;

        let hasher = Argon2::new(Algorithm::Argon2id, Version::V0x13, argon_params);
        let hash = hasher
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| SimError::compute_failed(KdfKind::Argon2id, e))?;
        let bytes = hash
            .hash
            .as_ref()
            .map(|out| out.as_bytes().to_vec())
            .ok_or_else(|| SimError::compute_failed(KdfKind::Argon2id, "no hash output"))?;
        Ok(Derived {
            bytes,
            encoded: Some(hash.to_string()),
        })
    }
}

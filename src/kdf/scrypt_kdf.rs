use super::{Derived, Kdf, KdfKind, KdfParams, params_mismatch};
use crate::error::SimError;

/// scrypt with caller-supplied salt; raw derived key, no PHC string.
#[derive(Debug, Default, Clone, Copy)]
pub struct ScryptKdf;

impl Kdf for ScryptKdf {
    fn kind(&self) -> KdfKind {
        KdfKind::Scrypt
    }

    fn derive(&self, password: &str, salt: &[u8], params: &KdfParams) -> Result<Derived, SimError> {
        let KdfParams::Scrypt(p) = params else {
            return Err(params_mismatch(self.kind(), params));
        };
        if !p.n.is_power_of_two() || p.n < 2 {
            return Err(SimError::InvalidParameters(format!(
                "scrypt N must be a power of two (got {})",
                p.n
            )));
        }
        let log_n = p.n.trailing_zeros() as u8;
        let sp = ::scrypt::Params::new(log_n, p.r, p.p, p.dk_len)
            .map_err(|e| SimError::InvalidParameters(format!("scrypt: {e}")))?;
        let mut out = vec![0u8; p.dk_len];
        ::scrypt::scrypt(password.as_bytes(), salt, &sp, &mut out)
            .map_err(|e| SimError::compute_failed(KdfKind::Scrypt, e))?;
        Ok(Derived {
            bytes: out,
            encoded: None,
        })
    }
}

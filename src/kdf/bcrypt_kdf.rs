use super::{Derived, Kdf, KdfKind, KdfParams, params_mismatch};
use crate::error::SimError;

/// bcrypt (`$2b$`). The library draws its own 16-byte salt for every call, so
/// the caller's salt is ignored and two runs never produce the same string.
#[derive(Debug, Default, Clone, Copy)]
pub struct BcryptKdf;

impl Kdf for BcryptKdf {
    fn kind(&self) -> KdfKind {
        KdfKind::Bcrypt
    }

    fn derive(&self, password: &str, _salt: &[u8], params: &KdfParams) -> Result<Derived, SimError> {
        let KdfParams::Bcrypt(p) = params else {
            return Err(params_mismatch(self.kind(), params));
        };
        let encoded = ::bcrypt::hash(password, p.rounds)
            .map_err(|e| SimError::compute_failed(KdfKind::Bcrypt, e))?;
        Ok(Derived {
            bytes: encoded.clone().into_bytes(),
            encoded: Some(encoded),
        })
    }
}

/// bcrypt with an explicit internal salt; identical inputs give identical
/// output.
pub fn bcrypt_with_salt(password: &str, rounds: u32, salt: [u8; 16]) -> Result<String, SimError> {
    ::bcrypt::hash_with_salt(password, rounds, salt)
        .map(|parts| parts.format_for_version(::bcrypt::Version::TwoB))
        .map_err(|e| SimError::compute_failed(KdfKind::Bcrypt, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kdf::BcryptParams;

    #[test]
    fn two_runs_differ_but_both_verify() {
        let params = KdfParams::Bcrypt(BcryptParams { rounds: 4 });
        let a = BcryptKdf.derive("hunter2", &[], &params).unwrap();
        let b = BcryptKdf.derive("hunter2", &[], &params).unwrap();
        assert_ne!(a.bytes, b.bytes);
        let (ea, eb) = (a.encoded.unwrap(), b.encoded.unwrap());
        assert!(ea.starts_with("$2b$04$"));
        assert!(::bcrypt::verify("hunter2", &ea).unwrap());
        assert!(::bcrypt::verify("hunter2", &eb).unwrap());
        assert!(!::bcrypt::verify("hunter3", &ea).unwrap());
    }

    #[test]
    fn fixed_internal_salt_is_deterministic() {
        let salt = [42u8; 16];
        let a = bcrypt_with_salt("hunter2", 4, salt).unwrap();
        let b = bcrypt_with_salt("hunter2", 4, salt).unwrap();
        assert_eq!(a, b);
        assert!(::bcrypt::verify("hunter2", &a).unwrap());
    }
}

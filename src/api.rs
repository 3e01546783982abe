//! Server-assisted hashing records.
//!
//! This boundary takes plaintext passwords and hands back their unsalted
//! digest, a salted digest and an Argon2id PHC string. Shipping plaintext to
//! a hashing service is insecure: it exists only so the demo can show the
//! three storage formats side by side. Never model a real system on it.
use argon2::Argon2;
use argon2::password_hash::{PasswordHasher, SaltString};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::digest::{DigestOracle, RandomSource};
use crate::error::SimError;
use crate::kdf::KdfKind;
use crate::salting::SaltingEngine;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaltedRecord {
    pub salt_hex: String,
    pub salted_sha256: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HashRecord {
    pub password: String,
    pub unsalted_sha256: String,
    pub salted: SaltedRecord,
    pub argon2_hash: String,
}

/// One record. The Argon2 hash uses library-default parameters and its own
/// salt, independent of the SHA-256 salt.
pub fn hash_one<D: DigestOracle, R: RandomSource>(
    engine: &SaltingEngine<D, R>,
    password: &str,
) -> Result<HashRecord, SimError> {
    let unsalted = engine.unsalted_digest(password)?;
    let user = engine.salt_and_digest(password)?;
    let argon_salt = engine.generate_salt_of(16)?;
    let argon_salt = SaltString::encode_b64(argon_salt.as_bytes())
        .map_err(|e| SimError::compute_failed(KdfKind::Argon2id, e))?;
    let argon2_hash = Argon2::default()
        .hash_password(password.as_bytes(), &argon_salt)
        .map_err(|e| SimError::compute_failed(KdfKind::Argon2id, e))?
        .to_string();
    Ok(HashRecord {
        password: password.to_string(),
        unsalted_sha256: unsalted.to_hex(),
        salted: SaltedRecord {
            salt_hex: user.salt.to_hex(),
            salted_sha256: user.salted_digest.to_hex(),
        },
        argon2_hash,
    })
}

pub fn hash_batch<D, R, S>(
    engine: &SaltingEngine<D, R>,
    passwords: &[S],
) -> Result<Vec<HashRecord>, SimError>
where
    D: DigestOracle,
    R: RandomSource,
    S: AsRef<str>,
{
    passwords
        .iter()
        .map(|p| hash_one(engine, p.as_ref()))
        .collect()
}

/// Parse `{"passwords": [...]}`. A missing or null list is empty;
/// non-string entries are stringified.
pub fn parse_request(body: &str) -> Result<Vec<String>, SimError> {
    let value: Value = serde_json::from_str(body)
        .map_err(|e| SimError::InvalidParameters(format!("request body: {e}")))?;
    let list = match value.get("passwords") {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Array(items)) => items,
        Some(other) => {
            return Err(SimError::InvalidParameters(format!(
                "passwords must be a list (got {other})"
            )));
        }
    };
    Ok(list
        .iter()
        .map(|v| match v {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::digest::sha256_hex;
    use argon2::{PasswordHash, PasswordVerifier};

    fn engine() -> SaltingEngine {
        SaltingEngine::new()
    }

    #[test]
    fn record_fields_are_consistent() {
        let r = hash_one(&engine(), "hunter2").unwrap();
        assert_eq!(r.password, "hunter2");
        assert_eq!(r.unsalted_sha256, sha256_hex(b"hunter2"));
        assert_eq!(r.salted.salt_hex.len(), 32);
        let mut input = hex::decode(&r.salted.salt_hex).unwrap();
        input.extend_from_slice(b"hunter2");
        assert_eq!(r.salted.salted_sha256, sha256_hex(&input));
        assert!(r.argon2_hash.starts_with("$argon2id$"));
        let parsed = PasswordHash::new(&r.argon2_hash).unwrap();
        assert!(Argon2::default().verify_password(b"hunter2", &parsed).is_ok());
    }

    #[test]
    fn empty_unicode_and_long_passwords() {
        let long = "p".repeat(10_000);
        let recs = hash_batch(&engine(), &["", "pässwörd🔒", long.as_str()]).unwrap();
        assert_eq!(recs[0].unsalted_sha256, sha256_hex(b""));
        assert_eq!(recs[1].unsalted_sha256, sha256_hex("pässwörd🔒".as_bytes()));
        assert_eq!(recs[2].unsalted_sha256, sha256_hex(long.as_bytes()));
    }

    #[test]
    fn salts_differ_between_calls() {
        let a = hash_one(&engine(), "same").unwrap();
        let b = hash_one(&engine(), "same").unwrap();
        assert_eq!(a.unsalted_sha256, b.unsalted_sha256);
        assert_ne!(a.salted.salt_hex, b.salted.salt_hex);
        assert_ne!(a.argon2_hash, b.argon2_hash);
    }

    #[test]
    fn request_parsing() {
        assert_eq!(parse_request(r#"{"passwords": [12345, "x"]}"#).unwrap(), vec!["12345", "x"]);
        assert!(parse_request("{}").unwrap().is_empty());
        assert!(parse_request(r#"{"passwords": null}"#).unwrap().is_empty());
        assert!(parse_request(r#"{"passwords": "x"}"#).is_err());
        assert!(parse_request("not json").is_err());
    }
}

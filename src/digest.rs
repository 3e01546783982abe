//! Digest oracle and random source: the two primitives every other component
//! is built on.
//!
//! Both are traits so a simulation can be run against a failing source to
//! exercise the `CryptoUnavailable` path; production code uses
//! [`Sha256Oracle`] and [`OsRandom`].
use std::fmt;

use rand::RngCore;
use rand::rngs::OsRng;
use serde::{Serialize, Serializer};
use sha2::{Digest as _, Sha256};

use crate::error::SimError;

/// Default salt length in bytes (128 bits).
pub const DEFAULT_SALT_LEN: usize = 16;

/// A fixed 256-bit digest.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Digest([u8; 32]);

impl Digest {
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Digest(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Digest({})", self.to_hex())
    }
}

impl Serialize for Digest {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

/// A per-identity salt.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Salt(Vec<u8>);

impl Salt {
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Salt(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }
}

impl fmt::Debug for Salt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Salt({})", self.to_hex())
    }
}

impl Serialize for Salt {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

/// Deterministic `bytes -> 256-bit digest` oracle.
pub trait DigestOracle: Send + Sync {
    fn digest(&self, data: &[u8]) -> Result<Digest, SimError>;
}

/// SHA-256 backed oracle.
#[derive(Debug, Default, Clone, Copy)]
pub struct Sha256Oracle;

impl DigestOracle for Sha256Oracle {
    fn digest(&self, data: &[u8]) -> Result<Digest, SimError> {
        Ok(Digest(Sha256::digest(data).into()))
    }
}

/// Cryptographically secure byte source.
pub trait RandomSource: Send + Sync {
    fn fill(&self, buf: &mut [u8]) -> Result<(), SimError>;
}

/// Operating-system CSPRNG.
#[derive(Debug, Default, Clone, Copy)]
pub struct OsRandom;

impl RandomSource for OsRandom {
    fn fill(&self, buf: &mut [u8]) -> Result<(), SimError> {
        OsRng
            .try_fill_bytes(buf)
            .map_err(|e| SimError::CryptoUnavailable(format!("os random source: {e}")))
    }
}

/// Convenience: SHA-256 hex of arbitrary bytes.
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sha256_of_password_matches_known_vector() {
        let d = Sha256Oracle.digest(b"password").unwrap();
        assert_eq!(
            d.to_hex(),
            "5e884898da28047151d0e56f8dc6292773603d0d6aabbdd62a11ef721d1542d8"
        );
        assert_eq!(d.to_hex(), sha256_hex(b"password"));
    }

    #[test]
    fn digest_is_deterministic() {
        for p in ["", "a", "correct horse", "pässwörd🔒"] {
            let a = Sha256Oracle.digest(p.as_bytes()).unwrap();
            let b = Sha256Oracle.digest(p.as_bytes()).unwrap();
            assert_eq!(a, b);
        }
    }

    #[test]
    fn os_random_fills_buffer() {
        let mut a = [0u8; 16];
        let mut b = [0u8; 16];
        OsRandom.fill(&mut a).unwrap();
        OsRandom.fill(&mut b).unwrap();
        assert_ne!(a, b);
    }
}

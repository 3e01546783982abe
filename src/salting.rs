//! Salting engine: salt generation and salted/unsalted digests for a simulated
//! population that shares one password.
//!
//! The salted digest input is `salt || utf8(password)`, salt first. Changing
//! that order breaks every previously computed salted digest.
use std::collections::HashSet;

use serde::Serialize;

use crate::digest::{
    DEFAULT_SALT_LEN, Digest, DigestOracle, OsRandom, RandomSource, Salt, Sha256Oracle,
};
use crate::error::SimError;

/// One simulated identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SimulatedUser {
    pub salt: Salt,
    pub salted_digest: Digest,
}

/// `n` identities sharing a password, plus the unsalted digest they all share.
#[derive(Debug, Clone, Serialize)]
pub struct Population {
    pub unsalted_digest: Digest,
    pub users: Vec<SimulatedUser>,
}

impl Population {
    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    /// Distinct unsalted digests as stored by an unsalted scheme: one per
    /// user, all identical.
    pub fn unique_unsalted(&self) -> usize {
        if self.users.is_empty() { 0 } else { 1 }
    }

    pub fn unique_salted(&self) -> usize {
        self.users
            .iter()
            .map(|u| u.salted_digest)
            .collect::<HashSet<_>>()
            .len()
    }

    pub fn unique_salts(&self) -> usize {
        self.users
            .iter()
            .map(|u| u.salt.as_bytes())
            .collect::<HashSet<_>>()
            .len()
    }
}

#[derive(Debug, Clone)]
pub struct SaltingEngine<D = Sha256Oracle, R = OsRandom> {
    oracle: D,
    random: R,
    salt_len: usize,
}

impl Default for SaltingEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl SaltingEngine {
    /// SHA-256 oracle, OS random source, 16-byte salts.
    pub fn new() -> Self {
        Self::with_sources(Sha256Oracle, OsRandom)
    }
}

impl<D: DigestOracle, R: RandomSource> SaltingEngine<D, R> {
    pub fn with_sources(oracle: D, random: R) -> Self {
        Self {
            oracle,
            random,
            salt_len: DEFAULT_SALT_LEN,
        }
    }

    pub fn with_salt_len(mut self, salt_len: usize) -> Self {
        self.salt_len = salt_len;
        self
    }

    pub fn salt_len(&self) -> usize {
        self.salt_len
    }

    pub fn oracle(&self) -> &D {
        &self.oracle
    }

    /// Fresh salt of the configured length.
    pub fn generate_salt(&self) -> Result<Salt, SimError> {
        self.generate_salt_of(self.salt_len)
    }

    pub fn generate_salt_of(&self, len: usize) -> Result<Salt, SimError> {
        let mut buf = vec![0u8; len];
        self.random.fill(&mut buf)?;
        Ok(Salt::from_bytes(buf))
    }

    pub fn unsalted_digest(&self, password: &str) -> Result<Digest, SimError> {
        self.oracle.digest(password.as_bytes())
    }

    pub fn salted_digest(&self, password: &str, salt: &Salt) -> Result<Digest, SimError> {
        let mut input = Vec::with_capacity(salt.len() + password.len());
        input.extend_from_slice(salt.as_bytes());
        input.extend_from_slice(password.as_bytes());
        self.oracle.digest(&input)
    }

    /// Fresh salt plus its salted digest.
    pub fn salt_and_digest(&self, password: &str) -> Result<SimulatedUser, SimError> {
        let salt = self.generate_salt()?;
        let salted_digest = self.salted_digest(password, &salt)?;
        Ok(SimulatedUser {
            salt,
            salted_digest,
        })
    }

    /// `n` users sharing `password`. Either every user is produced or the
    /// call fails; a partial population is never returned.
    pub fn simulate_population(&self, password: &str, n: usize) -> Result<Population, SimError> {
        let unsalted_digest = self.unsalted_digest(password)?;
        let users = (0..n)
            .map(|_| self.salt_and_digest(password))
            .collect::<Result<Vec<_>, _>>()?;
        log::debug!("simulated population of {} users", users.len());
        Ok(Population {
            unsalted_digest,
            users,
        })
    }
}

//! TOML configuration. Every field is optional; missing fields take the
//! defaults below and command-line flags override both.
//!
//! ```toml
//! attacker_guesses_per_second = 1e10
//! demo_users = 8
//!
//! [bcrypt]
//! rounds = 12
//! ```
use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

use crate::crack::DEFAULT_GUESSES_PER_SECOND;
use crate::digest::DEFAULT_SALT_LEN;
use crate::kdf::{Argon2Params, BcryptParams, KdfKind, KdfParams, ScryptParams};

/// Argon2 refuses salts shorter than this.
pub const MIN_SALT_LEN: usize = 8;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub attacker_guesses_per_second: f64,
    pub salt_len: usize,
    pub demo_users: usize,
    pub rainbow_users: usize,
    pub memory_confirm_threshold_kib: u64,
    pub argon2id: Argon2Params,
    pub bcrypt: BcryptParams,
    pub scrypt: ScryptParams,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            attacker_guesses_per_second: DEFAULT_GUESSES_PER_SECOND,
            salt_len: DEFAULT_SALT_LEN,
            demo_users: 5,
            rainbow_users: 100,
            memory_confirm_threshold_kib: crate::kdf::DEFAULT_MEMORY_CONFIRM_KIB,
            argon2id: Argon2Params::default(),
            bcrypt: BcryptParams::default(),
            scrypt: ScryptParams::default(),
        }
    }
}

impl SimConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        let config = Self::from_toml(&content)
            .with_context(|| format!("invalid config file: {}", path.display()))?;
        log::info!("loaded config from {}", path.display());
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: SimConfig = toml::from_str(content).context("failed to parse TOML config")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let rate = self.attacker_guesses_per_second;
        if !rate.is_finite() || rate <= 0.0 {
            bail!("attacker_guesses_per_second must be positive (got {rate})");
        }
        if self.salt_len < MIN_SALT_LEN {
            bail!(
                "salt_len must be at least {MIN_SALT_LEN} bytes (got {})",
                self.salt_len
            );
        }
        if self.demo_users == 0 {
            bail!("demo_users must be greater than 0");
        }
        Ok(())
    }

    /// Configured parameters for `kind`, before clamping.
    pub fn params_for(&self, kind: KdfKind) -> KdfParams {
        match kind {
            KdfKind::Argon2id => KdfParams::Argon2id(self.argon2id),
            KdfKind::Bcrypt => KdfParams::Bcrypt(self.bcrypt),
            KdfKind::Scrypt => KdfParams::Scrypt(self.scrypt),
        }
    }
}

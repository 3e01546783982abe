//! KDF cost models: Argon2id, bcrypt and scrypt behind one [`Kdf`] trait.
//!
//! Parameters are always passed through [`KdfParams::clamped`] before they
//! reach a collaborator, so a typo on the command line cannot ask for a
//! 2^40 scrypt table.
//!
//! ```no_run
//! use saltsim::kdf::{AbortToken, KdfHarness, KdfParams, KdfKind, Preapproved};
//! # async fn run() -> Result<(), saltsim::error::SimError> {
//! let harness = KdfHarness::builtin();
//! let params = KdfParams::defaults_for(KdfKind::Bcrypt);
//! let res = harness
//!     .measure("hunter2", b"0123456789abcdef", params, &Preapproved(true), &AbortToken::never())
//!     .await?;
//! println!("{} took {:?}", res.kind, res.elapsed);
//! # Ok(())
//! # }
//! ```
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::SimError;

mod abort;
mod argon2id;
mod bcrypt_kdf;
mod harness;
mod registry;
mod scrypt_kdf;

pub use abort::{AbortHandle, AbortToken, abort_pair};
pub use argon2id::Argon2idKdf;
pub use bcrypt_kdf::{BcryptKdf, bcrypt_with_salt};
pub use harness::{
    Confirm, DEFAULT_MEMORY_CONFIRM_KIB, KdfHarness, KdfOutcome, Preapproved, SweepPoint, Timing,
    sweep_plan,
};
pub use registry::{BuiltinLoader, KdfLoader, KdfRegistry, LoadFuture, builtin};
pub use scrypt_kdf::ScryptKdf;

pub const BCRYPT_MIN_ROUNDS: u32 = 4;
pub const BCRYPT_MAX_ROUNDS: u32 = 15;
pub const SCRYPT_MIN_N: u64 = 1024;
pub const SCRYPT_MAX_N: u64 = 1 << 20;
pub const ARGON2_MAX_MEMORY_KIB: u32 = 4 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KdfKind {
    Argon2id,
    Bcrypt,
    Scrypt,
}

impl KdfKind {
    pub const ALL: [KdfKind; 3] = [KdfKind::Argon2id, KdfKind::Bcrypt, KdfKind::Scrypt];

    pub fn name(&self) -> &'static str {
        match self {
            KdfKind::Argon2id => "argon2id",
            KdfKind::Bcrypt => "bcrypt",
            KdfKind::Scrypt => "scrypt",
        }
    }
}

impl fmt::Display for KdfKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for KdfKind {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "argon2id" | "argon2" | "argon" => Ok(KdfKind::Argon2id),
            "bcrypt" => Ok(KdfKind::Bcrypt),
            "scrypt" => Ok(KdfKind::Scrypt),
            other => Err(SimError::InvalidParameters(format!("unknown KDF: {other}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Argon2Params {
    pub time_cost: u32,
    pub memory_kib: u32,
    pub parallelism: u32,
    pub hash_len: usize,
}

impl Default for Argon2Params {
    fn default() -> Self {
        Self {
            time_cost: 2,
            memory_kib: 65536,
            parallelism: 1,
            hash_len: 32,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BcryptParams {
    pub rounds: u32,
}

impl Default for BcryptParams {
    fn default() -> Self {
        Self { rounds: 10 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScryptParams {
    pub n: u64,
    pub r: u32,
    pub p: u32,
    pub dk_len: usize,
}

impl Default for ScryptParams {
    fn default() -> Self {
        Self {
            n: 16384,
            r: 8,
            p: 1,
            dk_len: 32,
        }
    }
}

/// Per-KDF configuration record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kdf", rename_all = "lowercase")]
pub enum KdfParams {
    Argon2id(Argon2Params),
    Bcrypt(BcryptParams),
    Scrypt(ScryptParams),
}

fn clamp_logged<T: PartialOrd + Copy + fmt::Display>(what: &str, v: T, lo: T, hi: T) -> T {
    let c = if v < lo {
        lo
    } else if v > hi {
        hi
    } else {
        v
    };
    if c != v {
        log::info!("{what} {v} clamped to {c}");
    }
    c
}

impl KdfParams {
    pub fn defaults_for(kind: KdfKind) -> Self {
        match kind {
            KdfKind::Argon2id => KdfParams::Argon2id(Argon2Params::default()),
            KdfKind::Bcrypt => KdfParams::Bcrypt(BcryptParams::default()),
            KdfKind::Scrypt => KdfParams::Scrypt(ScryptParams::default()),
        }
    }

    pub fn kind(&self) -> KdfKind {
        match self {
            KdfParams::Argon2id(_) => KdfKind::Argon2id,
            KdfParams::Bcrypt(_) => KdfKind::Bcrypt,
            KdfParams::Scrypt(_) => KdfKind::Scrypt,
        }
    }

    /// Pull every field into its safe range. Scrypt `n` is also rounded up
    /// to a power of two.
    pub fn clamped(&self) -> Self {
        match *self {
            KdfParams::Argon2id(p) => {
                let parallelism = clamp_logged("argon2id parallelism", p.parallelism, 1, 16);
                KdfParams::Argon2id(Argon2Params {
                    time_cost: clamp_logged("argon2id time cost", p.time_cost, 1, 64),
                    memory_kib: clamp_logged(
                        "argon2id memory (KiB)",
                        p.memory_kib,
                        8 * parallelism,
                        ARGON2_MAX_MEMORY_KIB,
                    ),
                    parallelism,
                    hash_len: clamp_logged("argon2id hash length", p.hash_len, 4, 64),
                })
            }
            KdfParams::Bcrypt(p) => KdfParams::Bcrypt(BcryptParams {
                rounds: clamp_logged(
                    "bcrypt rounds",
                    p.rounds,
                    BCRYPT_MIN_ROUNDS,
                    BCRYPT_MAX_ROUNDS,
                ),
            }),
            KdfParams::Scrypt(p) => {
                let r = clamp_logged("scrypt r", p.r, 1, 32);
                // scrypt requires log2(N) < 16 * r
                let max_n = SCRYPT_MAX_N.min(1 << (16 * r - 1).min(63));
                let n = clamp_logged("scrypt N", p.n, SCRYPT_MIN_N, SCRYPT_MAX_N);
                KdfParams::Scrypt(ScryptParams {
                    n: clamp_logged("scrypt N", n.next_power_of_two(), SCRYPT_MIN_N, max_n),
                    r,
                    p: clamp_logged("scrypt p", p.p, 1, 16),
                    dk_len: clamp_logged("scrypt key length", p.dk_len, 16, 64),
                })
            }
        }
    }

    /// Working memory the computation needs, in KiB.
    pub fn memory_kib(&self) -> u64 {
        match self {
            KdfParams::Argon2id(p) => u64::from(p.memory_kib),
            KdfParams::Bcrypt(_) => 4,
            KdfParams::Scrypt(p) => 128 * u64::from(p.r) * p.n / 1024,
        }
    }

    pub fn describe(&self) -> String {
        match self {
            KdfParams::Argon2id(p) => format!(
                "t={}, m={} KiB, p={}",
                p.time_cost, p.memory_kib, p.parallelism
            ),
            KdfParams::Bcrypt(p) => format!("rounds={}", p.rounds),
            KdfParams::Scrypt(p) => format!("N={}, r={}, p={}", p.n, p.r, p.p),
        }
    }
}

/// Raw output of one KDF call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Derived {
    pub bytes: Vec<u8>,
    pub encoded: Option<String>,
}

/// A cost model the harness can time.
pub trait Kdf: Send + Sync {
    fn kind(&self) -> KdfKind;

    /// One derivation. `salt` is ignored by KDFs that generate their own.
    fn derive(&self, password: &str, salt: &[u8], params: &KdfParams) -> Result<Derived, SimError>;
}

pub(crate) fn params_mismatch(kind: KdfKind, params: &KdfParams) -> SimError {
    SimError::InvalidParameters(format!("{kind} cannot run with {} parameters", params.kind()))
}

/// Derived bytes and the wall-clock time of the single call that produced
/// them.
#[derive(Debug, Clone, Serialize)]
pub struct KdfResult {
    pub kind: KdfKind,
    #[serde(serialize_with = "hex::serde::serialize")]
    pub derived: Vec<u8>,
    pub encoded: Option<String>,
    pub elapsed: Duration,
    pub params: KdfParams,
}

impl KdfResult {
    pub fn per_guess_seconds(&self) -> f64 {
        self.elapsed.as_secs_f64()
    }

    pub fn derived_hex(&self) -> String {
        hex::encode(&self.derived)
    }
}

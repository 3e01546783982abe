//! KDF cost harness: clamp, confirm, acquire, time one call.
//!
//! Failures are scoped to a single KDF. `measure_all` collects one outcome
//! per requested KDF and never lets an error in one branch skip the others.
use std::time::Instant;

use log::{info, warn};
use serde::Serialize;

use super::{
    AbortToken, Argon2Params, BcryptParams, KdfKind, KdfParams, KdfRegistry, KdfResult,
    ScryptParams,
};
use crate::crack::{CrackEstimate, CrackTimeProjector, humanize_bytes};
use crate::error::SimError;

/// 256 MiB.
pub const DEFAULT_MEMORY_CONFIRM_KIB: u64 = 256 * 1024;

/// Asks the user whether a resource-heavy computation may proceed.
pub trait Confirm: Send + Sync {
    fn confirm(&self, prompt: &str) -> bool;
}

/// A fixed answer, for `--yes` and tests.
#[derive(Debug, Clone, Copy)]
pub struct Preapproved(pub bool);

impl Confirm for Preapproved {
    fn confirm(&self, prompt: &str) -> bool {
        log::debug!("auto-answering {:?} with {}", prompt, self.0);
        self.0
    }
}

#[derive(Debug)]
pub struct KdfOutcome {
    pub kind: KdfKind,
    pub result: Result<KdfResult, SimError>,
}

/// Min/avg/max seconds over repeated measurements.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Timing {
    pub min: f64,
    pub avg: f64,
    pub max: f64,
    pub repeats: usize,
}

impl Timing {
    fn from_samples(samples: &[f64]) -> Option<Self> {
        if samples.is_empty() {
            return None;
        }
        let min = samples.iter().copied().fold(f64::INFINITY, f64::min);
        let max = samples.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let avg = samples.iter().sum::<f64>() / samples.len() as f64;
        Some(Timing {
            min,
            avg,
            max,
            repeats: samples.len(),
        })
    }
}

/// One point of a crack-time sweep.
#[derive(Debug, Clone)]
pub struct SweepPoint {
    pub params: KdfParams,
    pub value: u64,
    pub result: Result<CrackEstimate, SimError>,
}

/// The parameter grid swept for `kind`: bcrypt rounds, Argon2 time cost,
/// or scrypt N.
pub fn sweep_plan(kind: KdfKind) -> Vec<KdfParams> {
    match kind {
        KdfKind::Bcrypt => (6..=12)
            .map(|rounds| KdfParams::Bcrypt(BcryptParams { rounds }))
            .collect(),
        KdfKind::Argon2id => (1..=4)
            .map(|time_cost| {
                KdfParams::Argon2id(Argon2Params {
                    time_cost,
                    memory_kib: 16384,
                    parallelism: 1,
                    hash_len: 32,
                })
            })
            .collect(),
        KdfKind::Scrypt => [1024, 4096, 16384]
            .into_iter()
            .map(|n| {
                KdfParams::Scrypt(ScryptParams {
                    n,
                    r: 1,
                    p: 1,
                    dk_len: 32,
                })
            })
            .collect(),
    }
}

fn swept_value(params: &KdfParams) -> u64 {
    match params {
        KdfParams::Argon2id(p) => u64::from(p.time_cost),
        KdfParams::Bcrypt(p) => u64::from(p.rounds),
        KdfParams::Scrypt(p) => p.n,
    }
}

pub struct KdfHarness {
    registry: KdfRegistry,
    memory_confirm_kib: u64,
}

impl Default for KdfHarness {
    fn default() -> Self {
        Self::builtin()
    }
}

impl KdfHarness {
    pub fn new(registry: KdfRegistry, memory_confirm_kib: u64) -> Self {
        Self {
            registry,
            memory_confirm_kib,
        }
    }

    /// Builtin collaborators, 256 MiB confirmation threshold.
    pub fn builtin() -> Self {
        Self::new(KdfRegistry::default(), DEFAULT_MEMORY_CONFIRM_KIB)
    }

    pub fn registry(&self) -> &KdfRegistry {
        &self.registry
    }

    pub fn memory_confirm_kib(&self) -> u64 {
        self.memory_confirm_kib
    }

    pub fn needs_confirmation(&self, params: &KdfParams) -> bool {
        params.clamped().memory_kib() > self.memory_confirm_kib
    }

    /// Time a single derivation. On decline, abort or failure nothing is
    /// returned but the error; derived bytes and elapsed time always travel
    /// together.
    pub async fn measure(
        &self,
        password: &str,
        salt: &[u8],
        params: KdfParams,
        confirm: &dyn Confirm,
        abort: &AbortToken,
    ) -> Result<KdfResult, SimError> {
        let params = params.clamped();
        let kind = params.kind();

        if params.memory_kib() > self.memory_confirm_kib {
            let prompt = format!(
                "{kind} memory set to {} which is high and may make this machine unresponsive. Proceed?",
                humanize_bytes(params.memory_kib() * 1024)
            );
            if !confirm.confirm(&prompt) {
                warn!("{kind} cancelled by user ({})", params.describe());
                return Err(SimError::UserCancelled { kdf: kind });
            }
        }
        if abort.is_aborted() {
            return Err(SimError::Aborted { kdf: kind });
        }

        let kdf = self.registry.acquire(kind).await?;
        let password = password.to_owned();
        let salt = salt.to_vec();
        let task = tokio::task::spawn_blocking(move || {
            let start = Instant::now();
            let derived = kdf.derive(&password, &salt, &params);
            (derived, start.elapsed())
        });

        let mut abort = abort.clone();
        // an aborted blocking task still runs to completion; its output is dropped
        let (derived, elapsed) = tokio::select! {
            joined = task => joined.map_err(|e| SimError::compute_failed(kind, e))?,
            _ = abort.aborted() => {
                warn!("{kind} measurement aborted");
                return Err(SimError::Aborted { kdf: kind });
            }
        };
        let derived = derived?;
        info!(
            "{kind} computed in {:.3}s ({})",
            elapsed.as_secs_f64(),
            params.describe()
        );
        Ok(KdfResult {
            kind,
            derived: derived.bytes,
            encoded: derived.encoded,
            elapsed,
            params,
        })
    }

    /// Measure each request in fixed kind order; one outcome per request.
    pub async fn measure_all(
        &self,
        password: &str,
        salt: &[u8],
        requests: &[KdfParams],
        confirm: &dyn Confirm,
        abort: &AbortToken,
    ) -> Vec<KdfOutcome> {
        let mut ordered = requests.to_vec();
        ordered.sort_by_key(|p| p.kind());
        let mut outcomes = Vec::with_capacity(ordered.len());
        for params in ordered {
            let kind = params.kind();
            let result = self.measure(password, salt, params, confirm, abort).await;
            if let Err(e) = &result {
                warn!("{kind}: {e}");
            }
            outcomes.push(KdfOutcome { kind, result });
        }
        outcomes
    }

    /// Repeat a measurement `repeats` times (at least once).
    pub async fn benchmark(
        &self,
        password: &str,
        salt: &[u8],
        params: KdfParams,
        repeats: usize,
        confirm: &dyn Confirm,
        abort: &AbortToken,
    ) -> Result<Timing, SimError> {
        let mut samples = Vec::with_capacity(repeats.max(1));
        for _ in 0..repeats.max(1) {
            let res = self.measure(password, salt, params, confirm, abort).await?;
            samples.push(res.per_guess_seconds());
        }
        Timing::from_samples(&samples)
            .ok_or_else(|| SimError::InvalidParameters("benchmark needs at least one run".into()))
    }

    /// Measure every point of [`sweep_plan`] and project the crack time at
    /// `entropy_bits`.
    #[allow(clippy::too_many_arguments)]
    pub async fn sweep(
        &self,
        kind: KdfKind,
        password: &str,
        salt: &[u8],
        entropy_bits: u32,
        projector: &CrackTimeProjector,
        confirm: &dyn Confirm,
        abort: &AbortToken,
    ) -> Vec<SweepPoint> {
        let mut points = Vec::new();
        for params in sweep_plan(kind) {
            let result = match self.measure(password, salt, params, confirm, abort).await {
                Ok(res) => projector.with_cost(entropy_bits, res.per_guess_seconds()),
                Err(e) => Err(e),
            };
            points.push(SweepPoint {
                params,
                value: swept_value(&params),
                result,
            });
        }
        points
    }
}

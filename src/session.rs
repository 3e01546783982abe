//! One simulation session: configuration, collaborators and the loaded
//! corpus with its lookup table.
//!
//! The table is built off the scheduler and swapped in whole. Readers hold an
//! `Arc` to the snapshot they started with, so a concurrent reload never
//! shows them a half-built table.
use std::sync::Arc;

use log::{debug, info};
use tokio::sync::RwLock;

use crate::api::{self, HashRecord};
use crate::config::SimConfig;
use crate::corpus::{Corpus, CorpusLoader, CorpusSource, load_or_sample};
use crate::crack::{CrackEstimate, CrackTimeProjector};
use crate::digest::{Digest, DigestOracle};
use crate::entropy::{self, Strength};
use crate::error::SimError;
use crate::kdf::{AbortToken, Confirm, KdfHarness, KdfKind, KdfParams, KdfRegistry, KdfResult};
use crate::rainbow::{AttackOutcome, RainbowTable, simulate_attack_with_table};
use crate::salting::{Population, SaltingEngine, SimulatedUser};

#[derive(Debug)]
pub struct LoadedCorpus {
    pub corpus: Corpus,
    pub table: RainbowTable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RainbowRun {
    pub outcome: AttackOutcome,
    pub source: CorpusSource,
}

#[derive(Debug, Clone)]
pub struct DemoRequest {
    pub users: usize,
    /// KDFs to measure locally, with their unclamped parameters.
    pub kdfs: Vec<KdfParams>,
    /// `false` asks the server-assisted path for records instead.
    pub local_only: bool,
}

impl DemoRequest {
    pub fn from_config(config: &SimConfig) -> Self {
        Self {
            users: config.demo_users,
            kdfs: KdfKind::ALL.iter().map(|k| config.params_for(*k)).collect(),
            local_only: true,
        }
    }
}

#[derive(Debug)]
pub struct KdfBranch {
    pub kind: KdfKind,
    pub outcome: Result<(KdfResult, CrackEstimate), SimError>,
}

#[derive(Debug)]
pub struct DemoOutcome {
    pub entropy_bits: u32,
    pub strength: Strength,
    pub unsalted: Digest,
    pub sample_user: SimulatedUser,
    pub population: Population,
    pub rainbow_hit: bool,
    pub plain: CrackEstimate,
    pub kdfs: Vec<KdfBranch>,
    pub server: Option<Result<HashRecord, SimError>>,
}

pub struct Session {
    config: SimConfig,
    salting: SaltingEngine,
    projector: CrackTimeProjector,
    harness: KdfHarness,
    corpus_loader: Arc<dyn CorpusLoader>,
    loaded: RwLock<Option<Arc<LoadedCorpus>>>,
}

impl Session {
    pub fn new(config: SimConfig, corpus_loader: Arc<dyn CorpusLoader>) -> Result<Self, SimError> {
        let projector = CrackTimeProjector::new(config.attacker_guesses_per_second)?;
        let harness = KdfHarness::new(KdfRegistry::default(), config.memory_confirm_threshold_kib);
        Ok(Self {
            salting: SaltingEngine::new().with_salt_len(config.salt_len),
            projector,
            harness,
            corpus_loader,
            loaded: RwLock::new(None),
            config,
        })
    }

    pub fn with_harness(mut self, harness: KdfHarness) -> Self {
        self.harness = harness;
        self
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn salting(&self) -> &SaltingEngine {
        &self.salting
    }

    pub fn projector(&self) -> &CrackTimeProjector {
        &self.projector
    }

    pub fn harness(&self) -> &KdfHarness {
        &self.harness
    }

    async fn build(&self) -> Result<Arc<LoadedCorpus>, SimError> {
        let loader = Arc::clone(&self.corpus_loader);
        let oracle = *self.salting.oracle();
        let loaded = tokio::task::spawn_blocking(move || {
            let corpus = load_or_sample(loader.as_ref());
            let table = RainbowTable::build(&oracle, &corpus.passwords)?;
            Ok::<_, SimError>(LoadedCorpus { corpus, table })
        })
        .await
        .map_err(|e| SimError::load_failed("corpus", e))??;
        info!(
            "corpus ready: {} passwords ({:?}), {} table entries",
            loaded.corpus.len(),
            loaded.corpus.source,
            loaded.table.len()
        );
        Ok(Arc::new(loaded))
    }

    /// Current corpus and table, loading them on first use.
    pub async fn loaded(&self) -> Result<Arc<LoadedCorpus>, SimError> {
        if let Some(l) = self.loaded.read().await.as_ref() {
            return Ok(Arc::clone(l));
        }
        let mut slot = self.loaded.write().await;
        if let Some(l) = slot.as_ref() {
            return Ok(Arc::clone(l));
        }
        let l = self.build().await?;
        *slot = Some(Arc::clone(&l));
        Ok(l)
    }

    /// Rebuild from the loader. The old table stays readable until the new
    /// one is complete.
    pub async fn reload(&self) -> Result<Arc<LoadedCorpus>, SimError> {
        let l = self.build().await?;
        *self.loaded.write().await = Some(Arc::clone(&l));
        Ok(l)
    }

    /// Drop the table and every cached KDF collaborator.
    pub async fn reset(&self) {
        *self.loaded.write().await = None;
        self.harness.registry().reset().await;
        debug!("session reset");
    }

    pub async fn is_loaded(&self) -> bool {
        self.loaded.read().await.is_some()
    }

    pub async fn run_rainbow(
        &self,
        users_per_password: usize,
        use_precomputed: bool,
    ) -> Result<RainbowRun, SimError> {
        let loaded = self.loaded().await?;
        let table = use_precomputed.then_some(&loaded.table);
        let mut outcome = simulate_attack_with_table(
            self.salting.oracle(),
            &loaded.corpus.passwords,
            users_per_password.max(1),
            table,
        )?;
        outcome.used_precomputed = use_precomputed;
        Ok(RainbowRun {
            outcome,
            source: loaded.corpus.source,
        })
    }

    /// Full demo for one password. Salting and lookup failures abort the
    /// run; KDF failures are recorded per branch.
    pub async fn run_demo(
        &self,
        password: &str,
        request: &DemoRequest,
        confirm: &dyn Confirm,
        abort: &AbortToken,
    ) -> Result<DemoOutcome, SimError> {
        if password.is_empty() {
            return Err(SimError::EmptyPassword);
        }
        let entropy_bits = entropy::estimate(password);
        let unsalted = self.salting.unsalted_digest(password)?;
        let sample_user = self.salting.salt_and_digest(password)?;
        let population = self
            .salting
            .simulate_population(password, request.users.max(1))?;
        let rainbow_hit = self.loaded().await?.table.is_cracked(&unsalted);
        let plain = self.projector.plain(entropy_bits);

        let mut kdfs = Vec::new();
        let mut server = None;
        if request.local_only {
            let outcomes = self
                .harness
                .measure_all(password, sample_user.salt.as_bytes(), &request.kdfs, confirm, abort)
                .await;
            for o in outcomes {
                let outcome = o.result.and_then(|r| {
                    let est = self.projector.with_cost(entropy_bits, r.per_guess_seconds())?;
                    Ok((r, est))
                });
                kdfs.push(KdfBranch {
                    kind: o.kind,
                    outcome,
                });
            }
        } else {
            server = Some(api::hash_one(&self.salting, password));
        }

        Ok(DemoOutcome {
            entropy_bits,
            strength: Strength::from_bits(entropy_bits),
            unsalted,
            sample_user,
            population,
            rainbow_hit,
            plain,
            kdfs,
            server,
        })
    }

    pub fn digest(&self, password: &str) -> Result<Digest, SimError> {
        self.salting.oracle().digest(password.as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::StaticCorpus;
    use crate::kdf::{Argon2Params, BcryptParams, Preapproved, ScryptParams, abort_pair};
    use std::sync::Mutex;

    fn static_session(list: &[&str]) -> Session {
        let loader = StaticCorpus(list.iter().map(|s| s.to_string()).collect());
        Session::new(SimConfig::default(), Arc::new(loader)).unwrap()
    }

    fn light_request(users: usize) -> DemoRequest {
        DemoRequest {
            users,
            kdfs: vec![
                KdfParams::Argon2id(Argon2Params {
                    time_cost: 1,
                    memory_kib: 64,
                    parallelism: 1,
                    hash_len: 32,
                }),
                KdfParams::Bcrypt(BcryptParams { rounds: 4 }),
                KdfParams::Scrypt(ScryptParams {
                    n: 1024,
                    r: 1,
                    p: 1,
                    dk_len: 32,
                }),
            ],
            local_only: true,
        }
    }

    struct Swappable(Mutex<Vec<String>>);

    impl CorpusLoader for Swappable {
        fn name(&self) -> String {
            "swappable".into()
        }
        fn load(&self) -> Result<Vec<String>, SimError> {
            Ok(self.0.lock().unwrap().clone())
        }
    }

    #[tokio::test]
    async fn rainbow_run_uses_session_table() {
        let s = static_session(&["password"]);
        assert!(!s.is_loaded().await);
        let run = s.run_rainbow(100, true).await.unwrap();
        assert_eq!(run.outcome.total_users, 100);
        assert_eq!(run.outcome.cracked_unsalted, 100);
        assert_eq!(run.outcome.cracked_salted, 0);
        assert_eq!(run.source, CorpusSource::Loaded);

        let run = s.run_rainbow(100, false).await.unwrap();
        assert_eq!(run.outcome.total_users, 100);
        assert_eq!(run.outcome.cracked_unsalted, 0);
    }

    #[tokio::test]
    async fn zero_users_is_raised_to_one() {
        let s = static_session(&["password", "qwerty"]);
        let run = s.run_rainbow(0, true).await.unwrap();
        assert_eq!(run.outcome.total_users, 2);
    }

    #[tokio::test]
    async fn reload_swaps_and_reset_clears() {
        let loader = Arc::new(Swappable(Mutex::new(vec!["alpha".into()])));
        let s = Session::new(SimConfig::default(), loader.clone()).unwrap();
        let first = s.loaded().await.unwrap();
        assert_eq!(first.corpus.passwords, vec!["alpha"]);

        *loader.0.lock().unwrap() = vec!["beta".into(), "gamma".into()];
        // cached until reloaded
        assert_eq!(s.loaded().await.unwrap().corpus.len(), 1);
        let second = s.reload().await.unwrap();
        assert_eq!(second.table.len(), 2);
        // the earlier snapshot is untouched
        assert_eq!(first.table.len(), 1);

        s.reset().await;
        assert!(!s.is_loaded().await);
        *loader.0.lock().unwrap() = vec![];
        let third = s.loaded().await.unwrap();
        assert_eq!(third.corpus.source, CorpusSource::Sample);
    }

    #[tokio::test]
    async fn demo_runs_every_stage() {
        let s = static_session(&["password"]);
        let out = s
            .run_demo("password", &light_request(5), &Preapproved(true), &AbortToken::never())
            .await
            .unwrap();
        assert_eq!(out.entropy_bits, 38);
        assert_eq!(out.strength, Strength::Weak);
        assert!(out.rainbow_hit);
        assert_eq!(out.population.len(), 5);
        assert_eq!(out.population.unique_unsalted(), 1);
        assert_eq!(out.population.unique_salted(), 5);
        assert_eq!(out.unsalted, s.digest("password").unwrap());
        assert_eq!(out.sample_user.salt.len(), 16);
        let kinds: Vec<_> = out.kdfs.iter().map(|b| b.kind).collect();
        assert_eq!(kinds, KdfKind::ALL.to_vec());
        assert!(out.kdfs.iter().all(|b| b.outcome.is_ok()));
        assert!(out.server.is_none());
    }

    #[tokio::test]
    async fn declined_heavy_kdf_only_cancels_that_branch() {
        let s = static_session(&["password"])
            .with_harness(KdfHarness::new(KdfRegistry::default(), 256));
        let mut req = light_request(2);
        req.kdfs[0] = KdfParams::Argon2id(Argon2Params {
            time_cost: 1,
            memory_kib: 512,
            parallelism: 1,
            hash_len: 32,
        });
        let out = s
            .run_demo("hunter2", &req, &Preapproved(false), &AbortToken::never())
            .await
            .unwrap();
        assert!(!out.rainbow_hit);
        assert_eq!(
            out.kdfs[0].outcome.as_ref().err(),
            Some(&SimError::UserCancelled { kdf: KdfKind::Argon2id })
        );
        assert!(out.kdfs[1].outcome.is_ok());
        assert!(out.kdfs[2].outcome.is_ok());
    }

    #[tokio::test]
    async fn server_mode_returns_a_record() {
        let s = static_session(&[]);
        let mut req = light_request(1);
        req.local_only = false;
        let out = s
            .run_demo("hunter2", &req, &Preapproved(true), &AbortToken::never())
            .await
            .unwrap();
        assert!(out.kdfs.is_empty());
        let rec = out.server.unwrap().unwrap();
        assert_eq!(rec.unsalted_sha256, out.unsalted.to_hex());
    }

    #[tokio::test]
    async fn empty_password_is_rejected_before_work() {
        let s = static_session(&["password"]);
        let err = s
            .run_demo("", &light_request(1), &Preapproved(true), &AbortToken::never())
            .await
            .unwrap_err();
        assert_eq!(err, SimError::EmptyPassword);
        assert!(!s.is_loaded().await);
    }

    #[tokio::test]
    async fn aborted_demo_reports_every_kdf_aborted() {
        let s = static_session(&["password"]);
        let (handle, token) = abort_pair();
        handle.abort();
        let out = s
            .run_demo("hunter2", &light_request(1), &Preapproved(true), &token)
            .await
            .unwrap();
        assert!(out
            .kdfs
            .iter()
            .all(|b| matches!(b.outcome, Err(SimError::Aborted { .. }))));
    }
}

//! Batch simulation report over a whole password list.
//!
//! Every listed password is treated as "known" to the attacker: the rainbow
//! table is built from the list itself, so `rainbow_hit_unsalted` is true for
//! every row. The interesting numbers are the salted unique counts and the
//! crack times.
use std::collections::{BTreeMap, HashSet};

use log::info;
use rayon::prelude::*;
use serde::Serialize;

use crate::crack::{CrackTime, project};
use crate::digest::{Digest, DigestOracle, RandomSource};
use crate::entropy;
use crate::error::SimError;
use crate::rainbow::RainbowTable;
use crate::salting::SaltingEngine;

pub const DEFAULT_ATTACKER_SPEEDS: [f64; 2] = [1e7, 1e9];

#[derive(Debug, Clone)]
pub struct BatchOptions {
    pub users_per_password: usize,
    pub attacker_speeds: Vec<f64>,
    pub parallel: bool,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            users_per_password: 100,
            attacker_speeds: DEFAULT_ATTACKER_SPEEDS.to_vec(),
            parallel: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PasswordRow {
    pub unsalted_sha256: Digest,
    pub salted_unique_count: usize,
    pub rainbow_hit_unsalted: bool,
    pub entropy_bits: u32,
    /// Keyed by the attacker speed in plain decimal, e.g. `"1000000000"` or
    /// `"0.5"`.
    pub crack_times_sec: BTreeMap<String, CrackTime>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchSummary {
    pub total_passwords: usize,
    pub total_rainbow_hits_unsalted: usize,
    pub avg_entropy_bits: f64,
    pub users_simulated_per_password: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchReport {
    pub total_passwords: usize,
    pub per_password: BTreeMap<String, PasswordRow>,
    pub summary: BatchSummary,
}

/// Distinct speeds always give distinct keys.
pub fn speed_key(speed: f64) -> String {
    format!("{speed}")
}

fn row<D: DigestOracle, R: RandomSource>(
    engine: &SaltingEngine<D, R>,
    table: &RainbowTable,
    password: &str,
    opts: &BatchOptions,
) -> Result<PasswordRow, SimError> {
    let unsalted = engine.unsalted_digest(password)?;
    let mut salted = HashSet::with_capacity(opts.users_per_password);
    for _ in 0..opts.users_per_password {
        let user = engine.salt_and_digest(password)?;
        salted.insert(user.salted_digest);
    }
    let bits = entropy::estimate(password);
    let mut crack_times_sec = BTreeMap::new();
    for &speed in &opts.attacker_speeds {
        crack_times_sec.insert(speed_key(speed), project(bits, 1.0 / speed)?);
    }
    Ok(PasswordRow {
        unsalted_sha256: unsalted,
        salted_unique_count: salted.len(),
        rainbow_hit_unsalted: table.is_cracked(&unsalted),
        entropy_bits: bits,
        crack_times_sec,
    })
}

pub fn simulate<D, R>(
    engine: &SaltingEngine<D, R>,
    passwords: &[String],
    opts: &BatchOptions,
) -> Result<BatchReport, SimError>
where
    D: DigestOracle,
    R: RandomSource,
{
    if let Some(bad) = opts
        .attacker_speeds
        .iter()
        .find(|s| !s.is_finite() || **s <= 0.0)
    {
        return Err(SimError::InvalidParameters(format!(
            "attacker speed must be positive (got {bad})"
        )));
    }
    let table = RainbowTable::build(engine.oracle(), passwords)?;
    let rows: Vec<(String, PasswordRow)> = if opts.parallel {
        passwords
            .par_iter()
            .map(|pw| row(engine, &table, pw, opts).map(|r| (pw.clone(), r)))
            .collect::<Result<_, _>>()?
    } else {
        passwords
            .iter()
            .map(|pw| row(engine, &table, pw, opts).map(|r| (pw.clone(), r)))
            .collect::<Result<_, _>>()?
    };
    let per_password: BTreeMap<_, _> = rows.into_iter().collect();

    let hits = per_password
        .values()
        .filter(|r| r.rainbow_hit_unsalted)
        .count();
    let avg_entropy_bits = if per_password.is_empty() {
        0.0
    } else {
        per_password
            .values()
            .map(|r| f64::from(r.entropy_bits))
            .sum::<f64>()
            / per_password.len() as f64
    };
    info!(
        "batch report: {} passwords ({} distinct), {} users each",
        passwords.len(),
        per_password.len(),
        opts.users_per_password
    );
    Ok(BatchReport {
        total_passwords: passwords.len(),
        summary: BatchSummary {
            total_passwords: passwords.len(),
            total_rainbow_hits_unsalted: hits,
            avg_entropy_bits,
            users_simulated_per_password: opts.users_per_password,
        },
        per_password,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::digest::sha256_hex;

    fn list(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn rows_for_every_password() {
        let opts = BatchOptions {
            users_per_password: 10,
            ..Default::default()
        };
        let r = simulate(&SaltingEngine::new(), &list(&["password", "123456", "Tr0ub4dor&3x"]), &opts)
            .unwrap();
        assert_eq!(r.total_passwords, 3);
        assert_eq!(r.summary.total_rainbow_hits_unsalted, 3);
        assert_eq!(r.summary.users_simulated_per_password, 10);
        let row = &r.per_password["password"];
        assert_eq!(row.unsalted_sha256.to_hex(), sha256_hex(b"password"));
        assert_eq!(row.salted_unique_count, 10);
        assert_eq!(row.entropy_bits, 38);
        assert_eq!(
            row.crack_times_sec.keys().cloned().collect::<Vec<_>>(),
            vec!["10000000".to_string(), "1000000000".to_string()]
        );
        let avg = (38.0 + 20.0 + 79.0) / 3.0;
        assert!((r.summary.avg_entropy_bits - avg).abs() < 1e-9);
    }

    #[test]
    fn empty_list_has_zero_average() {
        let r = simulate(&SaltingEngine::new(), &[], &BatchOptions::default()).unwrap();
        assert_eq!(r.total_passwords, 0);
        assert_eq!(r.summary.avg_entropy_bits, 0.0);
        assert!(r.per_password.is_empty());
    }

    #[test]
    fn duplicates_collapse_but_count() {
        let opts = BatchOptions {
            users_per_password: 2,
            parallel: true,
            ..Default::default()
        };
        let r = simulate(&SaltingEngine::new(), &list(&["a", "a", "b"]), &opts).unwrap();
        assert_eq!(r.total_passwords, 3);
        assert_eq!(r.per_password.len(), 2);
    }

    #[test]
    fn empty_password_costs_one_guess() {
        let opts = BatchOptions {
            users_per_password: 1,
            attacker_speeds: vec![1e7],
            parallel: false,
        };
        let r = simulate(&SaltingEngine::new(), &list(&[""]), &opts).unwrap();
        assert_eq!(
            r.per_password[""].crack_times_sec["10000000"],
            CrackTime::Seconds(1e-7)
        );
    }

    #[test]
    fn rejects_zero_speed() {
        let opts = BatchOptions {
            attacker_speeds: vec![0.0],
            ..Default::default()
        };
        assert!(matches!(
            simulate(&SaltingEngine::new(), &list(&["x"]), &opts),
            Err(SimError::InvalidParameters(_))
        ));
    }

    #[test]
    fn fractional_and_huge_speeds_keep_their_own_columns() {
        assert_eq!(speed_key(1e9), "1000000000");
        assert_eq!(speed_key(0.5), "0.5");
        let opts = BatchOptions {
            users_per_password: 1,
            attacker_speeds: vec![0.5, 0.7, 1e7, 1e25, 1e26],
            parallel: false,
        };
        let report = simulate(&SaltingEngine::new(), &list(&["abc"]), &opts).unwrap();
        let times = &report.per_password["abc"].crack_times_sec;
        assert_eq!(times.len(), 5);
        assert!(times["0.5"] > times["0.7"]);
    }
}

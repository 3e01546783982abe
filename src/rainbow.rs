//! Precomputed-table attack against unsalted vs salted storage.
//!
//! The table maps unsalted digests back to their passwords. Against unsalted
//! storage every identity sharing a listed password falls at once; against
//! salted storage the same table never matches.
use std::collections::HashMap;

use log::debug;
use serde::Serialize;

use crate::digest::{Digest, DigestOracle};
use crate::error::SimError;

/// Built-in corpus used when no other source is available.
pub const SAMPLE_CORPUS: [&str; 6] = [
    "password",
    "123456",
    "qwerty",
    "letmein",
    "12345678",
    "password1",
];

pub fn sample_corpus() -> Vec<String> {
    SAMPLE_CORPUS.iter().map(|s| s.to_string()).collect()
}

/// Unsalted digest -> password.
#[derive(Debug, Clone, Default)]
pub struct RainbowTable {
    entries: HashMap<Digest, String>,
}

impl RainbowTable {
    /// Hash every corpus entry; duplicates collapse to one entry.
    pub fn build<D, S>(oracle: &D, corpus: &[S]) -> Result<Self, SimError>
    where
        D: DigestOracle + ?Sized,
        S: AsRef<str>,
    {
        let mut entries = HashMap::with_capacity(corpus.len());
        for pw in corpus {
            let pw = pw.as_ref();
            entries.insert(oracle.digest(pw.as_bytes())?, pw.to_string());
        }
        debug!(
            "rainbow table built: {} entries from {} passwords",
            entries.len(),
            corpus.len()
        );
        Ok(Self { entries })
    }

    pub fn is_cracked(&self, digest: &Digest) -> bool {
        self.entries.contains_key(digest)
    }

    pub fn lookup(&self, digest: &Digest) -> Option<&str> {
        self.entries.get(digest).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

pub fn build_table<D, S>(oracle: &D, corpus: &[S]) -> Result<RainbowTable, SimError>
where
    D: DigestOracle + ?Sized,
    S: AsRef<str>,
{
    RainbowTable::build(oracle, corpus)
}

pub fn is_cracked(digest: &Digest, table: &RainbowTable) -> bool {
    table.is_cracked(digest)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AttackOutcome {
    pub total_users: usize,
    pub cracked_unsalted: usize,
    /// Always 0: an unsalted table cannot match salted digests.
    pub cracked_salted: usize,
    pub corpus_size: usize,
    pub used_precomputed: bool,
}

/// Attack with an already built table; `None` means no precomputed table.
pub fn simulate_attack_with_table<D, S>(
    oracle: &D,
    corpus: &[S],
    users_per_password: usize,
    table: Option<&RainbowTable>,
) -> Result<AttackOutcome, SimError>
where
    D: DigestOracle + ?Sized,
    S: AsRef<str>,
{
    let empty = RainbowTable::default();
    let table = table.unwrap_or(&empty);
    let mut outcome = AttackOutcome {
        total_users: 0,
        cracked_unsalted: 0,
        cracked_salted: 0,
        corpus_size: corpus.len(),
        used_precomputed: !table.is_empty(),
    };
    for pw in corpus {
        outcome.total_users += users_per_password;
        let d = oracle.digest(pw.as_ref().as_bytes())?;
        if table.is_cracked(&d) {
            outcome.cracked_unsalted += users_per_password;
        }
    }
    Ok(outcome)
}

/// Build a table from `corpus` (the sample if empty) and attack it.
pub fn simulate_attack<D, S>(
    oracle: &D,
    corpus: &[S],
    users_per_password: usize,
    use_precomputed: bool,
) -> Result<AttackOutcome, SimError>
where
    D: DigestOracle + ?Sized,
    S: AsRef<str>,
{
    if corpus.is_empty() {
        let sample = sample_corpus();
        return simulate_attack(oracle, &sample, users_per_password, use_precomputed);
    }
    let table = if use_precomputed {
        Some(RainbowTable::build(oracle, corpus)?)
    } else {
        None
    };
    let mut outcome =
        simulate_attack_with_table(oracle, corpus, users_per_password, table.as_ref())?;
    outcome.used_precomputed = use_precomputed;
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::digest::Sha256Oracle;

    #[test]
    fn listed_password_is_cracked() {
        let t = build_table(&Sha256Oracle, &["password", "123456"]).unwrap();
        assert_eq!(t.len(), 2);
        let hit = Sha256Oracle.digest(b"password").unwrap();
        let miss = Sha256Oracle.digest(b"neverused123").unwrap();
        assert!(is_cracked(&hit, &t));
        assert!(!is_cracked(&miss, &t));
        assert_eq!(t.lookup(&hit), Some("password"));
    }

    #[test]
    fn duplicates_collapse() {
        let t = build_table(&Sha256Oracle, &["a", "a", "b"]).unwrap();
        assert_eq!(t.len(), 2);
    }

    #[test]
    fn hundred_users_all_fall_unsalted() {
        let o = simulate_attack(&Sha256Oracle, &["password"], 100, true).unwrap();
        assert_eq!(o.total_users, 100);
        assert_eq!(o.cracked_unsalted, 100);
        assert_eq!(o.cracked_salted, 0);
    }

    #[test]
    fn no_table_means_no_instant_cracks() {
        let o = simulate_attack(&Sha256Oracle, &["password"], 100, false).unwrap();
        assert_eq!(o.total_users, 100);
        assert_eq!(o.cracked_unsalted, 0);
        assert_eq!(o.cracked_salted, 0);
        assert!(!o.used_precomputed);
    }

    #[test]
    fn empty_corpus_uses_sample() {
        let empty: [&str; 0] = [];
        let o = simulate_attack(&Sha256Oracle, &empty, 10, true).unwrap();
        assert_eq!(o.corpus_size, SAMPLE_CORPUS.len());
        assert_eq!(o.total_users, 60);
        assert_eq!(o.cracked_unsalted, 60);
    }

    #[test]
    fn external_table_only_hits_its_entries() {
        let t = build_table(&Sha256Oracle, &["qwerty"]).unwrap();
        let o = simulate_attack_with_table(&Sha256Oracle, &["qwerty", "hunter2"], 3, Some(&t))
            .unwrap();
        assert_eq!(o.total_users, 6);
        assert_eq!(o.cracked_unsalted, 3);
    }
}

//! Common-password corpora for the rainbow-table simulation.
use std::path::{Path, PathBuf};

use anyhow::Context;
use log::warn;
use serde::Serialize;

use crate::error::SimError;
use crate::io::{self, DEFAULT_MMAP_THRESHOLD_BYTES};
use crate::rainbow::sample_corpus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CorpusSource {
    Loaded,
    Sample,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Corpus {
    pub passwords: Vec<String>,
    pub source: CorpusSource,
}

impl Corpus {
    pub fn sample() -> Self {
        Self {
            passwords: sample_corpus(),
            source: CorpusSource::Sample,
        }
    }

    pub fn len(&self) -> usize {
        self.passwords.len()
    }

    pub fn is_empty(&self) -> bool {
        self.passwords.is_empty()
    }
}

pub trait CorpusLoader: Send + Sync {
    fn name(&self) -> String;
    fn load(&self) -> Result<Vec<String>, SimError>;

    /// How a non-empty result is labelled in reports.
    fn source(&self) -> CorpusSource {
        CorpusSource::Loaded
    }
}

/// One password per line, trimmed; blank lines skipped.
pub fn parse_corpus(contents: &str) -> Vec<String> {
    contents
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect()
}

/// Newline-delimited password files.
#[derive(Debug, Clone)]
pub struct FileCorpus {
    paths: Vec<PathBuf>,
    mmap_threshold: u64,
}

impl FileCorpus {
    pub fn new(paths: Vec<PathBuf>) -> Self {
        Self {
            paths,
            mmap_threshold: DEFAULT_MMAP_THRESHOLD_BYTES,
        }
    }

    pub fn with_mmap_threshold(mut self, bytes: u64) -> Self {
        self.mmap_threshold = bytes;
        self
    }
}

impl CorpusLoader for FileCorpus {
    fn name(&self) -> String {
        let names: Vec<_> = self.paths.iter().map(|p| p.display().to_string()).collect();
        format!("corpus [{}]", names.join(", "))
    }

    /// Every readable file in order. Missing or unreadable files are
    /// skipped; the load only fails when none of them could be read.
    fn load(&self) -> Result<Vec<String>, SimError> {
        let mut out = Vec::new();
        let mut last_err = None;
        let mut read_any = false;
        for path in &self.paths {
            match self.read_file(path) {
                Ok(list) => {
                    read_any = true;
                    out.extend(list);
                }
                Err(e) => {
                    warn!("skipping corpus file: {e:#}");
                    last_err = Some(e);
                }
            }
        }
        match last_err {
            Some(e) if !read_any => Err(SimError::load_failed(self.name(), format!("{e:#}"))),
            _ => Ok(out),
        }
    }
}

impl FileCorpus {
    fn read_file(&self, path: &Path) -> anyhow::Result<Vec<String>> {
        let mut out = Vec::new();
        for line in io::lines(path, self.mmap_threshold)? {
            let line = line.with_context(|| format!("read {}", path.display()))?;
            let line = line.trim();
            if !line.is_empty() {
                out.push(line.to_string());
            }
        }
        Ok(out)
    }
}

/// An in-memory list.
#[derive(Debug, Clone, Default)]
pub struct StaticCorpus(pub Vec<String>);

impl CorpusLoader for StaticCorpus {
    fn name(&self) -> String {
        "static corpus".to_string()
    }

    fn load(&self) -> Result<Vec<String>, SimError> {
        Ok(self.0.clone())
    }
}

/// The built-in sample, labelled as such.
#[derive(Debug, Clone, Copy, Default)]
pub struct SampleCorpus;

impl CorpusLoader for SampleCorpus {
    fn name(&self) -> String {
        "sample corpus".to_string()
    }

    fn load(&self) -> Result<Vec<String>, SimError> {
        Ok(sample_corpus())
    }

    fn source(&self) -> CorpusSource {
        CorpusSource::Sample
    }
}

/// Load through `loader`, falling back to the sample on failure or an empty
/// result.
pub fn load_or_sample(loader: &dyn CorpusLoader) -> Corpus {
    match loader.load() {
        Ok(list) => {
            if list.is_empty() {
                warn!("{} is empty; using the sample corpus", loader.name());
                return Corpus::sample();
            }
            Corpus {
                passwords: list,
                source: loader.source(),
            }
        }
        Err(e) => {
            warn!("{e}; using the sample corpus");
            Corpus::sample()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rainbow::SAMPLE_CORPUS;
    use std::io::Write;

    struct Unreachable;

    impl CorpusLoader for Unreachable {
        fn name(&self) -> String {
            "remote corpus".into()
        }
        fn load(&self) -> Result<Vec<String>, SimError> {
            Err(SimError::load_failed(self.name(), "network down"))
        }
    }

    #[test]
    fn trims_and_ignores_blank() {
        assert_eq!(parse_corpus("\npassword\n \n qwerty \n"), vec!["password", "qwerty"]);
    }

    #[test]
    fn failure_falls_back_to_sample() {
        let c = load_or_sample(&Unreachable);
        assert_eq!(c.source, CorpusSource::Sample);
        assert_eq!(c.len(), SAMPLE_CORPUS.len());
    }

    #[test]
    fn empty_list_falls_back_to_sample() {
        let c = load_or_sample(&StaticCorpus::default());
        assert_eq!(c.source, CorpusSource::Sample);
    }

    #[test]
    fn sample_loader_is_labelled_sample() {
        let c = load_or_sample(&SampleCorpus);
        assert_eq!(c, Corpus::sample());
        let c = load_or_sample(&StaticCorpus(sample_corpus()));
        assert_eq!(c.source, CorpusSource::Loaded);
    }

    #[test]
    fn reads_files_in_order() {
        let mut a = tempfile::NamedTempFile::new().unwrap();
        let mut b = tempfile::NamedTempFile::new().unwrap();
        a.write_all(b"alpha\n\n beta\n").unwrap();
        b.write_all(b"gamma").unwrap();
        let loader = FileCorpus::new(vec![a.path().into(), b.path().into()]).with_mmap_threshold(1);
        let c = load_or_sample(&loader);
        assert_eq!(c.source, CorpusSource::Loaded);
        assert_eq!(c.passwords, vec!["alpha", "beta", "gamma"]);
    }

    #[test]
    fn missing_files_are_skipped_when_others_load() {
        let mut good = tempfile::NamedTempFile::new().unwrap();
        good.write_all(b"alpha\nbeta\n").unwrap();
        let loader = FileCorpus::new(vec![
            "/no/such/corpus.txt".into(),
            good.path().into(),
            "/no/such/other.txt".into(),
        ]);
        let c = load_or_sample(&loader);
        assert_eq!(c.source, CorpusSource::Loaded);
        assert_eq!(c.passwords, vec!["alpha", "beta"]);
    }

    #[test]
    fn missing_file_is_a_named_load_failure() {
        let loader = FileCorpus::new(vec!["/no/such/corpus.txt".into()]);
        let err = loader.load().unwrap_err();
        match err {
            SimError::CollaboratorLoadFailed { collaborator, message } => {
                assert!(collaborator.contains("corpus"));
                assert!(message.contains("/no/such/corpus.txt"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}

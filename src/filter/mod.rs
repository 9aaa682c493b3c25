//! Result filter: keep only the tests whose generated code changed
//!
//! Verdicts name object files (`.../CMakeFiles/t.dir/t.c.o.s`), while the
//! test-suite report names logical tests (`test-suite :: SingleSource/.../t.test`).
//! An [`ArtifactLocator`] bridges the two; a test is kept when any of its
//! artifacts has a diff.

mod locator;

pub use locator::{ArtifactLocator, CMakeLayout};

use crate::differ::DiffVerdict;
use crate::report::{TestRecord, TestSuiteReport};
use thiserror::Error;
use tracing::{debug, info};

/// Compiler output suffixes stripped from verdict paths
pub const ARTIFACT_SUFFIXES: [&str; 5] = [".c.o.s", ".cpp.o.s", ".bc.o.s", ".cc.o.s", ".cxx.o.s"];

const TEST_PREFIX: &str = "test-suite :: ";
const TEST_SUFFIX: &str = ".test";

/// Errors raised while filtering; all of them mean the naming convention did
/// not cover the inputs
#[derive(Error, Debug)]
pub enum FilterError {
    #[error("verdict path has no known compiler suffix: {0}")]
    UnknownArtifactSuffix(String),

    #[error("unexpected test name: {0:?}")]
    UnexpectedTestName(String),

    #[error("no artifacts found for {test} (expected {expected}*)")]
    MissingArtifacts { test: String, expected: String },

    #[error("expected exactly one artifact for {test}, found {found}")]
    AmbiguousArtifacts { test: String, found: usize },
}

/// A verdict re-keyed by its path without the compiler suffix
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexedArtifact {
    pub key: String,
    pub has_diff: bool,
}

/// Verdicts sorted by key for exact and prefix lookups
#[derive(Debug, Clone, Default)]
pub struct ArtifactIndex {
    entries: Vec<IndexedArtifact>,
}

/// Remove the compiler output suffix from a verdict path
pub fn strip_artifact_suffix(path: &str) -> Result<&str, FilterError> {
    ARTIFACT_SUFFIXES
        .iter()
        .find_map(|suffix| path.strip_suffix(suffix))
        .ok_or_else(|| FilterError::UnknownArtifactSuffix(path.to_string()))
}

impl ArtifactIndex {
    pub fn from_verdicts(verdicts: &[DiffVerdict]) -> Result<Self, FilterError> {
        let mut entries = verdicts
            .iter()
            .map(|v| {
                Ok(IndexedArtifact {
                    key: strip_artifact_suffix(&v.path)?.to_string(),
                    has_diff: v.has_diff,
                })
            })
            .collect::<Result<Vec<_>, FilterError>>()?;
        entries.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(Self { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All entries whose key starts with `prefix`
    pub fn with_prefix(&self, prefix: &str) -> Vec<&IndexedArtifact> {
        let start = self.entries.partition_point(|e| e.key.as_str() < prefix);
        self.entries[start..]
            .iter()
            .take_while(|e| e.key.starts_with(prefix))
            .collect()
    }

    /// All entries whose key equals `key` (duplicates are kept)
    pub fn exact(&self, key: &str) -> Vec<&IndexedArtifact> {
        self.with_prefix(key)
            .into_iter()
            .filter(|e| e.key == key)
            .collect()
    }
}

/// Recover the logical test name from a report entry name
///
/// `test-suite :: MultiSource/App/app.test` becomes `MultiSource/App/app`.
/// MicroBenchmarks entries may lack the `.test` suffix.
pub fn logical_test_name(raw: &str) -> Result<&str, FilterError> {
    let unexpected = || FilterError::UnexpectedTestName(raw.to_string());

    let name = raw.strip_prefix(TEST_PREFIX).ok_or_else(unexpected)?;
    match name.strip_suffix(TEST_SUFFIX) {
        Some(stripped) => Ok(stripped),
        None if name.starts_with("MicroBenchmarks") => Ok(name),
        None => Err(unexpected()),
    }
}

/// Does any artifact of this test differ between the two builds?
pub fn test_has_diff(
    record: &TestRecord,
    index: &ArtifactIndex,
    locator: &dyn ArtifactLocator,
) -> Result<bool, FilterError> {
    let name = logical_test_name(record.name())?;
    let artifacts = locator.locate(name, index)?;
    debug!(test = name, artifacts = artifacts.len(), "located");
    Ok(artifacts.iter().any(|a| a.has_diff))
}

/// Reduce `report` to the tests that have at least one differing artifact
///
/// Kept records and every other report key are carried over verbatim.
pub fn filter_by_diff(
    report: &TestSuiteReport,
    verdicts: &[DiffVerdict],
    locator: &dyn ArtifactLocator,
) -> Result<TestSuiteReport, FilterError> {
    let index = ArtifactIndex::from_verdicts(verdicts)?;

    let mut kept = Vec::new();
    for record in &report.tests {
        if test_has_diff(record, &index, locator)? {
            info!(test = record.name(), "has diff");
            kept.push(record.clone());
        }
    }

    info!(
        kept = kept.len(),
        total = report.tests.len(),
        artifacts = index.len(),
        "filtered report"
    );

    Ok(report.with_tests(kept))
}

//! Instruction statistics over a tree of LLVM bitcode files
//!
//! An external counter binary is run once per `.bc` file and prints a JSON
//! object with three maps (`instrs`, `constexprs`, `intrinsics`) of name to
//! occurrence count. The per-file maps are summed key by key, and each
//! category finally gets a `total` entry.

use crate::differ::{collect_artifacts, ArtifactKind};
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, info};

/// Key added to every category once accumulation is done
pub const TOTAL_KEY: &str = "total";

/// Occurrence counts per category
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstCount {
    pub instrs: BTreeMap<String, u64>,
    pub constexprs: BTreeMap<String, u64>,
    pub intrinsics: BTreeMap<String, u64>,
}

/// Accumulated counts for one directory, as written to the output file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstCountSummary {
    #[serde(flatten)]
    pub counts: InstCount,
    pub path: String,
}

fn add_into(total: &mut BTreeMap<String, u64>, sample: &BTreeMap<String, u64>) {
    for (name, n) in sample {
        *total.entry(name.clone()).or_insert(0) += n;
    }
}

fn with_total(mut counts: BTreeMap<String, u64>) -> BTreeMap<String, u64> {
    let sum = counts.values().sum();
    counts.insert(TOTAL_KEY.to_string(), sum);
    counts
}

impl InstCount {
    pub fn from_json_str(text: &str) -> Result<Self> {
        serde_json::from_str(text).context("Counter output is not valid instruction-count JSON")
    }

    /// Add every count of `sample` into `self`
    pub fn accumulate(&mut self, sample: &InstCount) {
        add_into(&mut self.instrs, &sample.instrs);
        add_into(&mut self.constexprs, &sample.constexprs);
        add_into(&mut self.intrinsics, &sample.intrinsics);
    }

    /// Append the per-category `total` and tag the result with `path`
    pub fn finalize(self, path: impl Into<String>) -> InstCountSummary {
        InstCountSummary {
            counts: InstCount {
                instrs: with_total(self.instrs),
                constexprs: with_total(self.constexprs),
                intrinsics: with_total(self.intrinsics),
            },
            path: path.into(),
        }
    }
}

/// Run `counter <file>` and parse what it prints
pub fn count_file(counter: &Path, file: &Path) -> Result<InstCount> {
    let output = Command::new(counter)
        .arg(file)
        .output()
        .with_context(|| format!("Failed to run {}", counter.display()))?;

    if !output.status.success() {
        bail!(
            "{} failed on {}: {}",
            counter.display(),
            file.display(),
            output.status
        );
    }

    InstCount::from_json_str(&String::from_utf8_lossy(&output.stdout))
        .with_context(|| format!("While counting {}", file.display()))
}

/// Count every `.bc` file under `dir` and sum the results
pub fn count_tree(dir: &Path, counter: &Path) -> Result<InstCountSummary> {
    if !dir.is_dir() {
        bail!("Cannot find {}", dir.display());
    }

    let files = collect_artifacts(dir, ArtifactKind::Bitcode)?;
    info!(files = files.len(), dir = %dir.display(), "counting instructions");

    let mut total = InstCount::default();
    for relative in &files {
        let path: PathBuf = dir.join(relative);
        debug!(file = %path.display(), "count");
        total.accumulate(&count_file(counter, &path)?);
    }

    Ok(total.finalize(dir.display().to_string()))
}

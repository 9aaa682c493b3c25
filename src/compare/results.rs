//! Collect per-test measurements from a directory of result files
//!
//! Two layouts are understood:
//! - lit reports (`tests[].metrics.<metric>`), written by CMake test-suite runs
//! - LNT reports (`Tests[]` with `Name` ending in `.exec` and one `Data` value)

use super::CompareError;
use anyhow::{Context, Result};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Test name → one measurement per result file
pub type Measurements = BTreeMap<String, Vec<f64>>;

const LNT_EXEC_SUFFIX: &str = ".exec";

fn collect_lit(doc: &Value, metric: &str, out: &mut Measurements) -> Result<(), CompareError> {
    let tests = doc["tests"]
        .as_array()
        .ok_or_else(|| CompareError::MalformedResult("`tests` is not a list".to_string()))?;

    for test in tests {
        let Some(value) = test["metrics"].get(metric) else {
            continue;
        };
        let name = test["name"]
            .as_str()
            .ok_or_else(|| CompareError::MalformedResult("test without a name".to_string()))?;
        let value = value.as_f64().ok_or_else(|| {
            CompareError::MalformedResult(format!("{}: {} is not numeric", name, metric))
        })?;
        out.entry(name.to_string()).or_default().push(value);
    }
    Ok(())
}

fn collect_lnt(doc: &Value, metric: &str, out: &mut Measurements) -> Result<(), CompareError> {
    if metric == "size" {
        return Err(CompareError::UnsupportedMetric {
            metric: metric.to_string(),
            format: "LNT",
        });
    }

    let tests = doc["Tests"]
        .as_array()
        .ok_or_else(|| CompareError::MalformedResult("`Tests` is not a list".to_string()))?;

    for test in tests {
        let name = test["Name"]
            .as_str()
            .ok_or_else(|| CompareError::MalformedResult("LNT test without Name".to_string()))?;
        let Some(name) = name.strip_suffix(LNT_EXEC_SUFFIX) else {
            continue;
        };

        let value = match test["Data"].as_array().map(Vec::as_slice) {
            Some([single]) => single.as_f64(),
            _ => None,
        }
        .ok_or_else(|| {
            CompareError::MalformedResult(format!("{}: expected exactly one numeric Data value", name))
        })?;
        out.entry(name.to_string()).or_default().push(value);
    }
    Ok(())
}

/// Gather `metric` for every test from all `*.json` files in `dir`
///
/// Files are read in name order.
pub fn read_results(dir: &Path, metric: &str) -> Result<Measurements> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("Failed to read {}", dir.display()))? {
        let path = entry?.path();
        if path.extension().is_some_and(|ext| ext == "json") {
            files.push(path);
        }
    }
    files.sort();

    let mut out = Measurements::new();
    for path in files {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let doc: Value = serde_json::from_str(&content)
            .with_context(|| format!("Invalid JSON in {}", path.display()))?;

        let collected = if doc.get("tests").is_some() {
            collect_lit(&doc, metric, &mut out)
        } else {
            collect_lnt(&doc, metric, &mut out)
        };
        collected.with_context(|| format!("While reading {}", path.display()))?;
    }

    Ok(out)
}

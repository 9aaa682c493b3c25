// Merge repeated test-suite runs of the same build into one report
//
// All runs must describe the same test-suite: same version tag, same tests in
// the same order, same result codes and outputs, same metric keys. Timing
// values (`elapsed`, `exec_time`, `compile_time`, `link_time`) are replaced by
// their median across runs; every other metric must agree exactly.

mod statistics;

pub use statistics::median;

use crate::report::{TestRecord, TestSuiteReport, ELAPSED_KEY, TIMING_METRICS, VERSION_KEY};
use serde_json::{Map, Number, Value};
use thiserror::Error;
use tracing::{debug, info};

/// Test name used for mismatches at report level
const REPORT_SCOPE: &str = "<report>";

/// The exact key set of a mergeable test entry
pub const RECORD_KEYS: [&str; 5] = ["code", "elapsed", "metrics", "name", "output"];

/// Inconsistencies between the runs being merged
#[derive(Error, Debug)]
pub enum MergeError {
    #[error("no runs to merge")]
    NoRuns,

    #[error("cannot take the median of an empty sample")]
    EmptySample,

    #[error("timing value is not a finite number")]
    NotANumber,

    #[error("__version__ differs between runs: {expected} vs {found}")]
    VersionMismatch { expected: Value, found: Value },

    #[error("run {run} has {found} tests, expected {expected}")]
    TestCountMismatch {
        run: usize,
        expected: usize,
        found: usize,
    },

    #[error("{test}: field {field} differs between runs: {first} vs {other}")]
    FieldMismatch {
        test: String,
        field: String,
        first: Value,
        other: Value,
    },

    #[error("{test}: unexpected keys {keys:?}")]
    UnexpectedKeys { test: String, keys: Vec<String> },

    #[error("{test}: missing keys {keys:?}")]
    MissingKeys { test: String, keys: Vec<String> },

    #[error("{test}: metrics is not an object")]
    MalformedMetrics { test: String },

    #[error("{test}: metric keys differ between runs")]
    MetricKeysMismatch { test: String },

    #[error("{test}: metric {metric} is not numeric")]
    NonNumericTiming { test: String, metric: String },

    #[error("{test}: merged entry is invalid: {reason}")]
    InvalidRecord { test: String, reason: String },
}

fn is_timing_metric(key: &str) -> bool {
    TIMING_METRICS.contains(&key)
}

fn to_number(value: f64) -> Result<Value, MergeError> {
    Number::from_f64(value)
        .map(Value::Number)
        .ok_or(MergeError::NotANumber)
}

fn expect_equal(test: &str, field: &str, values: &[&Value]) -> Result<(), MergeError> {
    let first = values[0];
    match values.iter().find(|v| **v != first) {
        Some(other) => Err(MergeError::FieldMismatch {
            test: test.to_string(),
            field: field.to_string(),
            first: first.clone(),
            other: (*other).clone(),
        }),
        None => Ok(()),
    }
}

/// Median of JSON numbers
///
/// With an odd count the middle sample itself is returned, so integer
/// timings stay integers; an even count yields the mean of the two central
/// samples as a float.
fn median_value(test: &str, field: &str, values: &[&Value]) -> Result<Value, MergeError> {
    let samples = values
        .iter()
        .map(|v| {
            v.as_f64().ok_or_else(|| MergeError::NonNumericTiming {
                test: test.to_string(),
                metric: field.to_string(),
            })
        })
        .collect::<Result<Vec<f64>, _>>()?;

    let med = median(&samples)?;
    if samples.len() % 2 == 1 {
        let mut middle: Vec<&Value> = values
            .iter()
            .zip(&samples)
            .filter(|(_, s)| **s == med)
            .map(|(v, _)| *v)
            .collect();
        // `2` and `2.0` tie; the integer form wins regardless of run order
        middle.sort_by_key(|v| !(v.is_i64() || v.is_u64()));
        if let Some(value) = middle.first() {
            return Ok((*value).clone());
        }
    }
    to_number(med)
}

/// Median of an elapsed time; `null` must be `null` in every run
fn merge_elapsed(test: &str, values: &[&Value]) -> Result<Value, MergeError> {
    if values.iter().any(|v| v.is_null()) {
        expect_equal(test, ELAPSED_KEY, values)?;
        return Ok(Value::Null);
    }
    median_value(test, ELAPSED_KEY, values)
}

fn merge_metrics(test: &str, values: &[&Value]) -> Result<Map<String, Value>, MergeError> {
    let metrics = values
        .iter()
        .map(|v| {
            v.as_object().ok_or_else(|| MergeError::MalformedMetrics {
                test: test.to_string(),
            })
        })
        .collect::<Result<Vec<&Map<String, Value>>, _>>()?;

    let mut keys: Vec<&String> = metrics[0].keys().collect();
    for m in &metrics[1..] {
        if m.len() != keys.len() || !keys.iter().all(|k| m.contains_key(*k)) {
            return Err(MergeError::MetricKeysMismatch {
                test: test.to_string(),
            });
        }
    }
    keys.sort();

    let mut merged = Map::new();
    for key in keys {
        let values: Vec<&Value> = metrics.iter().map(|m| &m[key]).collect();

        if is_timing_metric(key) {
            merged.insert(key.clone(), median_value(test, key, &values)?);
        } else {
            expect_equal(test, &format!("metrics.{}", key), &values)?;
            merged.insert(key.clone(), values[0].clone());
        }
    }

    Ok(merged)
}

fn check_record_keys(record: &TestRecord) -> Result<(), MergeError> {
    let fields = record.fields();

    let missing: Vec<String> = RECORD_KEYS
        .iter()
        .filter(|k| !fields.contains_key(**k))
        .map(|k| k.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(MergeError::MissingKeys {
            test: record.name().to_string(),
            keys: missing,
        });
    }

    let unexpected: Vec<String> = fields
        .keys()
        .filter(|k| !RECORD_KEYS.contains(&k.as_str()))
        .cloned()
        .collect();
    if !unexpected.is_empty() {
        return Err(MergeError::UnexpectedKeys {
            test: record.name().to_string(),
            keys: unexpected,
        });
    }

    Ok(())
}

/// Merge the same test from every run
///
/// Keys come out in the order of the first run's entry.
pub fn merge_test(records: &[&TestRecord]) -> Result<TestRecord, MergeError> {
    let first = *records.first().ok_or(MergeError::NoRuns)?;
    let test = first.name();

    for record in records {
        check_record_keys(record)?;
    }

    let mut merged = Map::new();
    for key in first.fields().keys() {
        let values: Vec<&Value> = records
            .iter()
            .map(|r| r.get(key).unwrap_or(&Value::Null))
            .collect();

        let value = match key.as_str() {
            ELAPSED_KEY => merge_elapsed(test, &values)?,
            "metrics" => Value::Object(merge_metrics(test, &values)?),
            _ => {
                expect_equal(test, key, &values)?;
                values[0].clone()
            }
        };
        merged.insert(key.clone(), value);
    }

    TestRecord::try_from(merged).map_err(|reason| MergeError::InvalidRecord {
        test: test.to_string(),
        reason,
    })
}

/// Top-level keys that must agree across runs
fn shared_fields(run: &TestSuiteReport) -> Map<String, Value> {
    run.top_level()
        .filter(|(k, _)| k.as_str() != VERSION_KEY && k.as_str() != ELAPSED_KEY)
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

/// Merge repeated runs of one test-suite into a single report
///
/// Merging is independent of the order of `runs`.
pub fn merge_runs(runs: &[TestSuiteReport]) -> Result<TestSuiteReport, MergeError> {
    let first = runs.first().ok_or(MergeError::NoRuns)?;

    for run in &runs[1..] {
        if run.version() != first.version() {
            return Err(MergeError::VersionMismatch {
                expected: first.version().clone(),
                found: run.version().clone(),
            });
        }
    }

    let first_shared = Value::Object(shared_fields(first));
    for (idx, run) in runs.iter().enumerate() {
        if run.tests.len() != first.tests.len() {
            return Err(MergeError::TestCountMismatch {
                run: idx,
                expected: first.tests.len(),
                found: run.tests.len(),
            });
        }
        let shared = Value::Object(shared_fields(run));
        if shared != first_shared {
            return Err(MergeError::FieldMismatch {
                test: REPORT_SCOPE.to_string(),
                field: "extra".to_string(),
                first: first_shared,
                other: shared,
            });
        }
    }

    let mut tests = Vec::with_capacity(first.tests.len());
    for idx in 0..first.tests.len() {
        let records: Vec<&TestRecord> = runs.iter().map(|r| &r.tests[idx]).collect();
        let merged = merge_test(&records)?;
        debug!(test = merged.name(), "merged");
        tests.push(merged);
    }

    let mut merged = first.with_tests(tests);

    let elapsed: Vec<Option<&Value>> = runs.iter().map(|r| r.get(ELAPSED_KEY)).collect();
    if elapsed.iter().any(Option::is_some) {
        let values: Vec<&Value> = elapsed
            .iter()
            .map(|v| v.unwrap_or(&Value::Null))
            .collect();
        if elapsed.iter().any(Option::is_none) {
            return Err(MergeError::MissingKeys {
                test: REPORT_SCOPE.to_string(),
                keys: vec![ELAPSED_KEY.to_string()],
            });
        }
        merged.set(ELAPSED_KEY, merge_elapsed(REPORT_SCOPE, &values)?);
    }

    info!(runs = runs.len(), tests = merged.tests.len(), "merged runs");
    Ok(merged)
}

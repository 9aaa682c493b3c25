//! LLVM test-suite (lit) JSON report model
//!
//! Reports are kept as raw JSON objects. Only `__version__`, `tests` and each
//! test's `name` are checked on load; every other key, value and key order is
//! written back exactly as it was read.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::path::Path;

/// Metric keys that vary between repeated runs of the same build
pub const TIMING_METRICS: [&str; 3] = ["exec_time", "compile_time", "link_time"];

pub const VERSION_KEY: &str = "__version__";
pub const TESTS_KEY: &str = "tests";
pub const ELAPSED_KEY: &str = "elapsed";

/// One result document as written by `lit -o results.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Map<String, Value>", into = "Map<String, Value>")]
pub struct TestSuiteReport {
    /// Top-level keys in file order; the `tests` slot holds a placeholder
    fields: Map<String, Value>,
    pub tests: Vec<TestRecord>,
}

/// A single test entry, e.g. `{"code": "PASS", "elapsed": 0.4, "metrics": {...},
/// "name": "test-suite :: SingleSource/Foo/bar.test", "output": ""}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Map<String, Value>", into = "Map<String, Value>")]
pub struct TestRecord {
    fields: Map<String, Value>,
}

impl TryFrom<Map<String, Value>> for TestRecord {
    type Error = String;

    fn try_from(fields: Map<String, Value>) -> Result<Self, Self::Error> {
        match fields.get("name") {
            Some(Value::String(_)) => Ok(Self { fields }),
            Some(other) => Err(format!("test name is not a string: {}", other)),
            None => Err("test entry without a name".to_string()),
        }
    }
}

impl From<TestRecord> for Map<String, Value> {
    fn from(record: TestRecord) -> Self {
        record.fields
    }
}

impl TestRecord {
    /// Fully qualified name, e.g. `test-suite :: SingleSource/Foo/bar.test`
    pub fn name(&self) -> &str {
        self.fields.get("name").and_then(Value::as_str).unwrap_or("")
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// All keys of the entry in file order
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }
}

impl TryFrom<Map<String, Value>> for TestSuiteReport {
    type Error = String;

    fn try_from(mut fields: Map<String, Value>) -> Result<Self, Self::Error> {
        if !fields.contains_key(VERSION_KEY) {
            return Err(format!("missing `{}`", VERSION_KEY));
        }

        let tests = match fields.get_mut(TESTS_KEY).map(Value::take) {
            Some(Value::Array(tests)) => tests,
            Some(_) => return Err(format!("`{}` is not a list", TESTS_KEY)),
            None => return Err(format!("missing `{}`", TESTS_KEY)),
        };

        let tests = tests
            .into_iter()
            .map(|test| match test {
                Value::Object(map) => TestRecord::try_from(map),
                other => Err(format!("test entry is not an object: {}", other)),
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { fields, tests })
    }
}

impl From<TestSuiteReport> for Map<String, Value> {
    fn from(report: TestSuiteReport) -> Self {
        let mut fields = report.fields;
        let tests = report
            .tests
            .into_iter()
            .map(|t| Value::Object(t.into()))
            .collect();
        // Replacing an existing key keeps its position
        fields.insert(TESTS_KEY.to_string(), Value::Array(tests));
        fields
    }
}

impl TestSuiteReport {
    /// Parse a report from JSON text
    pub fn from_json_str(content: &str) -> Result<Self> {
        serde_json::from_str(content).context("Invalid test-suite report JSON")
    }

    /// Load a report from a file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::from_json_str(&content).with_context(|| format!("While parsing {}", path.display()))
    }

    pub fn version(&self) -> &Value {
        self.fields.get(VERSION_KEY).unwrap_or(&Value::Null)
    }

    /// A top-level key other than `tests`
    pub fn get(&self, key: &str) -> Option<&Value> {
        match key {
            TESTS_KEY => None,
            _ => self.fields.get(key),
        }
    }

    /// Set a top-level key other than `tests`; existing keys keep their position
    pub fn set(&mut self, key: &str, value: Value) {
        if key != TESTS_KEY {
            self.fields.insert(key.to_string(), value);
        }
    }

    /// Top-level keys other than `tests`, in file order
    pub fn top_level(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.fields.iter().filter(|(k, _)| *k != TESTS_KEY)
    }

    /// The same report with a different test list
    pub fn with_tests(&self, tests: Vec<TestRecord>) -> Self {
        Self {
            fields: self.fields.clone(),
            tests,
        }
    }

    /// Serialize with the given indentation width
    pub fn to_json_string(&self, indent: usize) -> Result<String> {
        let indent = vec![b' '; indent];
        let formatter = serde_json::ser::PrettyFormatter::with_indent(&indent);
        let mut buf = Vec::new();
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
        self.serialize(&mut ser)
            .context("Failed to serialize test-suite report")?;
        String::from_utf8(buf).context("Serialized report is not UTF-8")
    }

    /// Write the report to `path`
    pub fn write_to_file<P: AsRef<Path>>(&self, path: P, indent: usize) -> Result<()> {
        let path = path.as_ref();
        let json = self.to_json_string(indent)?;
        fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))
    }
}

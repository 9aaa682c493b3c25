// Shared fixtures for the CLI integration tests
//
// Each test binary uses a different subset of these helpers.
#![allow(dead_code)]

use serde_json::{json, Value};
use std::fs;
use std::path::Path;

/// Assembly text with the usual clang version stamp
pub fn asm_with_ident(body: &str, ident_origin: &str) -> String {
    format!(
        "\t.text\n{}\n\t.ident\t\"clang version 15.0.0 ({}/llvm/llvm-project.git abc123)\"\n",
        body, ident_origin
    )
}

/// Write `content` to `root/relative`, creating parent directories
pub fn write_file(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}

/// A lit test record
pub fn test_record(name: &str, exec_time: f64) -> Value {
    json!({
        "code": "PASS",
        "elapsed": exec_time,
        "metrics": {
            "exec_time": exec_time,
            "compile_time": 0.25,
            "link_time": 0.05,
            "size": 4096
        },
        "name": format!("test-suite :: {}.test", name),
        "output": "\n"
    })
}

/// A lit report with one record per `(name, exec_time)`
pub fn lit_report(tests: &[(&str, f64)], elapsed: f64) -> String {
    let tests: Vec<Value> = tests.iter().map(|(n, t)| test_record(n, *t)).collect();
    serde_json::to_string_pretty(&json!({
        "__version__": [0, 1, 0],
        "elapsed": elapsed,
        "tests": tests
    }))
    .unwrap()
}

pub fn read_json(path: &Path) -> Value {
    serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
}

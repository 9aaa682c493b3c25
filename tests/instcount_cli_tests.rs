//! `suitediff instcount`: summed instruction statistics of a bitcode tree
#![cfg(unix)]
#![allow(deprecated)] // suppress assert_cmd::Command::cargo_bin deprecation in tests

mod utils;

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use utils::{read_json, write_file};

/// A counter that reports two `add`s per file, plus a `load` for files under `mem/`
fn fake_counter(dir: &Path) -> PathBuf {
    let script = r#"#!/bin/sh
case "$1" in
  */mem/*) echo '{"instrs": {"add": 2, "load": 1}, "constexprs": {}, "intrinsics": {"llvm.memcpy": 1}}' ;;
  *) echo '{"instrs": {"add": 2}, "constexprs": {"gep": 1}, "intrinsics": {}}' ;;
esac
"#;
    write_file(dir, "instcounter", script);
    let path = dir.join("instcounter");
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

#[test]
fn test_counts_are_summed_with_totals() {
    let bcs = TempDir::new().unwrap();
    let work = TempDir::new().unwrap();
    let counter = fake_counter(work.path());
    let out = work.path().join("count.json");

    write_file(bcs.path(), "a.bc", "");
    write_file(bcs.path(), "mem/b.bc", "");
    write_file(bcs.path(), "mem/notes.txt", "");

    let mut cmd = Command::cargo_bin("suitediff").unwrap();
    cmd.arg("instcount")
        .arg("--dir")
        .arg(bcs.path())
        .arg("--counter")
        .arg(&counter)
        .arg("--out")
        .arg(&out)
        .assert()
        .success();

    let summary = read_json(&out);
    assert_eq!(summary["instrs"]["add"], 4);
    assert_eq!(summary["instrs"]["load"], 1);
    assert_eq!(summary["instrs"]["total"], 5);
    assert_eq!(summary["constexprs"]["total"], 1);
    assert_eq!(summary["intrinsics"]["llvm.memcpy"], 1);
    assert_eq!(summary["intrinsics"]["total"], 1);
    assert_eq!(summary["path"], bcs.path().display().to_string());
}

#[test]
fn test_failing_counter_is_fatal() {
    let bcs = TempDir::new().unwrap();
    let work = TempDir::new().unwrap();
    write_file(bcs.path(), "a.bc", "");
    write_file(work.path(), "broken", "#!/bin/sh\nexit 3\n");
    let counter = work.path().join("broken");
    fs::set_permissions(&counter, fs::Permissions::from_mode(0o755)).unwrap();

    let mut cmd = Command::cargo_bin("suitediff").unwrap();
    cmd.arg("instcount")
        .arg("--dir")
        .arg(bcs.path())
        .arg("--counter")
        .arg(&counter)
        .arg("--out")
        .arg(work.path().join("count.json"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed on"));
}

//! Discovery and pairing of generated artifacts across two build trees

use super::DiffError;
use clap::ValueEnum;
use std::collections::BTreeSet;
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};

/// Kind of compiler output being compared
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ArtifactKind {
    /// Assembly text (`.s`)
    #[value(name = "asm")]
    Assembly,
    /// LLVM bitcode (`.bc`), disassembled before comparison
    #[value(name = "bc")]
    Bitcode,
}

impl ArtifactKind {
    pub fn extension(self) -> &'static str {
        match self {
            ArtifactKind::Assembly => "s",
            ArtifactKind::Bitcode => "bc",
        }
    }

    fn matches(self, path: &Path) -> bool {
        path.extension() == Some(OsStr::new(self.extension()))
    }
}

/// One generated file present in both trees
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPair {
    pub relative: PathBuf,
    pub a: PathBuf,
    pub b: PathBuf,
}

/// Recursively list artifacts of `kind` under `root`, relative to `root`
///
/// Directory symlinks are not followed.
pub fn collect_artifacts(root: &Path, kind: ArtifactKind) -> Result<BTreeSet<PathBuf>, DiffError> {
    let mut found = BTreeSet::new();
    let mut pending = vec![root.to_path_buf()];

    while let Some(dir) = pending.pop() {
        let entries = fs::read_dir(&dir).map_err(|e| DiffError::io(&dir, e))?;
        for entry in entries {
            let entry = entry.map_err(|e| DiffError::io(&dir, e))?;
            let path = entry.path();
            let file_type = entry.file_type().map_err(|e| DiffError::io(&path, e))?;

            if file_type.is_dir() {
                pending.push(path);
            } else if kind.matches(&path) {
                if let Ok(relative) = path.strip_prefix(root) {
                    found.insert(relative.to_path_buf());
                }
            }
        }
    }

    Ok(found)
}

/// Pair up the artifacts of two build trees by relative path
///
/// Both trees must contain exactly the same set of artifacts.
pub fn pair_artifacts(
    dir_a: &Path,
    dir_b: &Path,
    kind: ArtifactKind,
) -> Result<Vec<ArtifactPair>, DiffError> {
    let set_a = collect_artifacts(dir_a, kind)?;
    let set_b = collect_artifacts(dir_b, kind)?;

    if set_a != set_b {
        return Err(DiffError::ArtifactSetMismatch {
            only_in_a: set_a.difference(&set_b).cloned().collect(),
            only_in_b: set_b.difference(&set_a).cloned().collect(),
        });
    }

    Ok(set_a
        .into_iter()
        .map(|relative| ArtifactPair {
            a: dir_a.join(&relative),
            b: dir_b.join(&relative),
            relative,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "").unwrap();
    }

    #[test]
    fn test_collect_filters_by_extension() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "SingleSource/A/CMakeFiles/t.dir/t.c.o.s");
        touch(dir.path(), "SingleSource/A/CMakeFiles/t.dir/t.c.o");
        touch(dir.path(), "MultiSource/B/CMakeFiles/u.dir/x.cpp.o.bc");
        touch(dir.path(), "top.s");

        let asm = collect_artifacts(dir.path(), ArtifactKind::Assembly).unwrap();
        let asm: Vec<_> = asm.iter().map(|p| p.to_string_lossy().into_owned()).collect();
        assert_eq!(asm, vec!["SingleSource/A/CMakeFiles/t.dir/t.c.o.s", "top.s"]);

        let bc = collect_artifacts(dir.path(), ArtifactKind::Bitcode).unwrap();
        assert_eq!(bc.len(), 1);
    }

    #[test]
    fn test_pair_matching_trees() {
        let a = TempDir::new().unwrap();
        let b = TempDir::new().unwrap();
        for root in [a.path(), b.path()] {
            touch(root, "x/one.c.o.s");
            touch(root, "y/two.c.o.s");
        }

        let pairs = pair_artifacts(a.path(), b.path(), ArtifactKind::Assembly).unwrap();
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[0].relative, PathBuf::from("x/one.c.o.s"));
        assert_eq!(pairs[0].a, a.path().join("x/one.c.o.s"));
        assert_eq!(pairs[0].b, b.path().join("x/one.c.o.s"));
    }

    #[test]
    fn test_pair_mismatched_trees_fails() {
        let a = TempDir::new().unwrap();
        let b = TempDir::new().unwrap();
        touch(a.path(), "x/one.c.o.s");
        touch(b.path(), "x/other.c.o.s");

        match pair_artifacts(a.path(), b.path(), ArtifactKind::Assembly) {
            Err(DiffError::ArtifactSetMismatch {
                only_in_a,
                only_in_b,
            }) => {
                assert_eq!(only_in_a, vec![PathBuf::from("x/one.c.o.s")]);
                assert_eq!(only_in_b, vec![PathBuf::from("x/other.c.o.s")]);
            }
            other => panic!("expected ArtifactSetMismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_root_is_io_error() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope");
        assert!(matches!(
            collect_artifacts(&missing, ArtifactKind::Assembly),
            Err(DiffError::Io { .. })
        ));
    }
}

// Artifact differ: compares the compiler output of two test-suite builds
//
// Both build trees must contain the same set of `.s` (or `.bc`) files. Each
// pair is compared line by line with only the compiler version stamp
// tolerated, and one verdict per pair is streamed to the output sink in
// relative-path order.
//
// Any precondition failure (mismatched trees, unreadable file, failing
// disassembler) aborts the whole run; a partial verdict list is never
// reported as complete.

mod artifact;
mod disasm;
mod lines;
mod verdict;

pub use artifact::{collect_artifacts, pair_artifacts, ArtifactKind, ArtifactPair};
pub use disasm::{Disassembler, LlvmDis, Side};
pub use lines::{asm_has_diff, ir_has_diff, is_asm_version_stamp, is_ir_version_stamp};
pub use verdict::{parse_verdicts, DiffVerdict};

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

/// Progress is logged every this many pairs
const PROGRESS_INTERVAL: usize = 100;

/// Errors that abort a diff run
#[derive(Error, Debug)]
pub enum DiffError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(
        "artifact sets differ between build trees ({} only in A, {} only in B): {:?} / {:?}",
        .only_in_a.len(),
        .only_in_b.len(),
        .only_in_a,
        .only_in_b
    )]
    ArtifactSetMismatch {
        only_in_a: Vec<PathBuf>,
        only_in_b: Vec<PathBuf>,
    },

    #[error("disassembler failed on {input}: {status}")]
    Disassembler { input: PathBuf, status: String },

    #[error("bitcode comparison requires a disassembler")]
    NoDisassembler,

    #[error("malformed verdict line: {0:?}")]
    MalformedVerdict(String),

    #[error("{path} is not valid UTF-8")]
    NotUtf8 { path: PathBuf },
}

impl DiffError {
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        DiffError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

fn read_text(path: &Path) -> Result<String, DiffError> {
    let bytes = fs::read(path).map_err(|e| DiffError::io(path, e))?;
    String::from_utf8(bytes).map_err(|_| DiffError::NotUtf8 {
        path: path.to_path_buf(),
    })
}

/// Compare a single artifact pair
///
/// Bitcode is disassembled into temporary `.ll` files that are removed as
/// soon as the comparison finishes.
pub fn diff_pair(
    pair: &ArtifactPair,
    kind: ArtifactKind,
    disassembler: Option<&dyn Disassembler>,
) -> Result<bool, DiffError> {
    match kind {
        ArtifactKind::Assembly => {
            let a = read_text(&pair.a)?;
            let b = read_text(&pair.b)?;
            Ok(asm_has_diff(&a, &b))
        }
        ArtifactKind::Bitcode => {
            let disassembler = disassembler.ok_or(DiffError::NoDisassembler)?;
            let scratch_a = scratch_file(".l.ll")?;
            let scratch_b = scratch_file(".r.ll")?;

            disassembler.disassemble(Side::A, &pair.a, scratch_a.path())?;
            disassembler.disassemble(Side::B, &pair.b, scratch_b.path())?;

            let a = read_text(scratch_a.path())?;
            let b = read_text(scratch_b.path())?;
            Ok(ir_has_diff(&a, &b))
        }
    }
}

fn scratch_file(suffix: &str) -> Result<tempfile::NamedTempFile, DiffError> {
    tempfile::Builder::new()
        .prefix("suitediff-")
        .suffix(suffix)
        .tempfile()
        .map_err(|e| DiffError::io(&std::env::temp_dir(), e))
}

/// Compare every artifact pair of two build trees
///
/// Each verdict is written to `sink` as soon as it is known; the full list
/// is also returned.
pub fn diff_trees<W: Write + ?Sized>(
    dir_a: &Path,
    dir_b: &Path,
    kind: ArtifactKind,
    disassembler: Option<&dyn Disassembler>,
    sink: &mut W,
) -> Result<Vec<DiffVerdict>, DiffError> {
    if kind == ArtifactKind::Bitcode && disassembler.is_none() {
        return Err(DiffError::NoDisassembler);
    }

    let pairs = pair_artifacts(dir_a, dir_b, kind)?;
    info!(
        pairs = pairs.len(),
        extension = kind.extension(),
        "artifact pairs found"
    );

    let mut verdicts = Vec::with_capacity(pairs.len());
    for (idx, pair) in pairs.iter().enumerate() {
        let has_diff = diff_pair(pair, kind, disassembler)?;
        let verdict = DiffVerdict::new(pair.relative.to_string_lossy(), has_diff);
        debug!(path = %verdict.path, has_diff, "compared");

        verdict
            .write_to(sink)
            .map_err(|e| DiffError::io(Path::new("<verdict sink>"), e))?;
        verdicts.push(verdict);

        if (idx + 1) % PROGRESS_INTERVAL == 0 {
            info!(done = idx + 1, total = pairs.len(), "diff progress");
        }
    }

    Ok(verdicts)
}

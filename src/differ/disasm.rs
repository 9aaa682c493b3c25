//! Bitcode disassembly for the `.bc` comparison path

use super::DiffError;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::debug;

/// Which build tree a file belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    A,
    B,
}

/// Turns a bitcode file into textual IR
///
/// Each side gets its own toolchain, since bitcode written by one LLVM is not
/// guaranteed to be readable by another.
pub trait Disassembler {
    fn disassemble(&self, side: Side, input: &Path, output: &Path) -> Result<(), DiffError>;
}

/// `llvm-dis` from two LLVM installations
#[derive(Debug, Clone)]
pub struct LlvmDis {
    pub llvm_dir_a: PathBuf,
    pub llvm_dir_b: PathBuf,
}

impl LlvmDis {
    pub fn new(llvm_dir_a: impl Into<PathBuf>, llvm_dir_b: impl Into<PathBuf>) -> Self {
        Self {
            llvm_dir_a: llvm_dir_a.into(),
            llvm_dir_b: llvm_dir_b.into(),
        }
    }

    fn tool(&self, side: Side) -> PathBuf {
        let root = match side {
            Side::A => &self.llvm_dir_a,
            Side::B => &self.llvm_dir_b,
        };
        root.join("bin").join("llvm-dis")
    }
}

impl Disassembler for LlvmDis {
    fn disassemble(&self, side: Side, input: &Path, output: &Path) -> Result<(), DiffError> {
        let tool = self.tool(side);
        debug!(tool = %tool.display(), input = %input.display(), "disassembling");

        let status = Command::new(&tool)
            .arg(input)
            .arg("-o")
            .arg(output)
            .status()
            .map_err(|e| DiffError::io(&tool, e))?;

        if !status.success() {
            return Err(DiffError::Disassembler {
                input: input.to_path_buf(),
                status: status.to_string(),
            });
        }
        Ok(())
    }
}

//! CLI argument parsing for suitediff

use crate::differ::ArtifactKind;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "suitediff")]
#[command(version)]
#[command(about = "Compare compiler output and test-suite results of two LLVM builds", long_about = None)]
pub struct Cli {
    /// Enable debug tracing output to stderr
    #[arg(long = "debug", global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Compare the generated code of two build trees, one verdict per file
    Diff {
        /// First build tree
        dir_a: PathBuf,

        /// Second build tree
        dir_b: PathBuf,

        /// Verdict output file (`<path> YESDIFF|NODIFF` per line)
        #[arg(short, long, value_name = "FILE")]
        out: PathBuf,

        /// Artifact type to compare
        #[arg(long, value_enum, default_value = "asm")]
        kind: ArtifactKind,

        /// LLVM install used to disassemble bitcode of the first tree
        #[arg(long = "llvm-dir-a", value_name = "DIR", required_if_eq("kind", "bc"))]
        llvm_dir_a: Option<PathBuf>,

        /// LLVM install used to disassemble bitcode of the second tree
        #[arg(long = "llvm-dir-b", value_name = "DIR", required_if_eq("kind", "bc"))]
        llvm_dir_b: Option<PathBuf>,
    },

    /// Keep only the tests of a result report whose code changed
    Filter {
        /// Test-suite result report (JSON)
        #[arg(long, value_name = "FILE")]
        json: PathBuf,

        /// Verdict file written by `suitediff diff`
        #[arg(long, value_name = "FILE")]
        diff: PathBuf,

        /// Filtered report output
        #[arg(short, long, value_name = "FILE")]
        out: PathBuf,
    },

    /// Merge repeated result reports, taking the median of timings
    Merge {
        /// Merged report output
        #[arg(short, long, value_name = "FILE")]
        out: PathBuf,

        /// Result reports of repeated runs
        #[arg(required = true, num_args = 1..)]
        inputs: Vec<PathBuf>,
    },

    /// Compare execution time or object size between two result directories
    Compare {
        /// Results of the first build
        #[arg(long, value_name = "DIR")]
        dir1: PathBuf,

        /// Results of the second build
        #[arg(long, value_name = "DIR")]
        dir2: PathBuf,

        /// Comparison config (JSON, or TOML with a .toml extension)
        #[arg(long, value_name = "FILE")]
        config: PathBuf,

        /// CSV output
        #[arg(short, long, value_name = "FILE")]
        out: PathBuf,
    },

    /// Sum instruction statistics over all bitcode files of a directory
    Instcount {
        /// Directory containing `.bc` files
        #[arg(long, value_name = "DIR")]
        dir: PathBuf,

        /// Counter executable printing per-file JSON statistics
        #[arg(long, value_name = "EXE")]
        counter: PathBuf,

        /// JSON output
        #[arg(short, long, value_name = "FILE")]
        out: PathBuf,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_diff_defaults_to_assembly() {
        let cli = Cli::parse_from(["suitediff", "diff", "a", "b", "--out", "v.txt"]);
        match cli.command {
            Command::Diff {
                dir_a,
                dir_b,
                out,
                kind,
                llvm_dir_a,
                ..
            } => {
                assert_eq!(dir_a, PathBuf::from("a"));
                assert_eq!(dir_b, PathBuf::from("b"));
                assert_eq!(out, PathBuf::from("v.txt"));
                assert_eq!(kind, ArtifactKind::Assembly);
                assert!(llvm_dir_a.is_none());
            }
            other => panic!("expected diff, got {:?}", other),
        }
        assert!(!cli.debug);
    }

    #[test]
    fn test_cli_diff_bitcode() {
        let cli = Cli::parse_from([
            "suitediff",
            "diff",
            "a",
            "b",
            "-o",
            "v.txt",
            "--kind",
            "bc",
            "--llvm-dir-a",
            "/opt/llvm-a",
            "--llvm-dir-b",
            "/opt/llvm-b",
        ]);
        match cli.command {
            Command::Diff {
                kind, llvm_dir_b, ..
            } => {
                assert_eq!(kind, ArtifactKind::Bitcode);
                assert_eq!(llvm_dir_b, Some(PathBuf::from("/opt/llvm-b")));
            }
            other => panic!("expected diff, got {:?}", other),
        }
    }

    #[test]
    fn test_cli_diff_bitcode_requires_llvm_dirs() {
        let result = Cli::try_parse_from(["suitediff", "diff", "a", "b", "-o", "v", "--kind", "bc"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_filter() {
        let cli = Cli::parse_from([
            "suitediff", "filter", "--json", "r.json", "--diff", "v.txt", "--out", "f.json",
        ]);
        assert!(matches!(cli.command, Command::Filter { .. }));
    }

    #[test]
    fn test_cli_merge_inputs() {
        let cli = Cli::parse_from(["suitediff", "merge", "--out", "m.json", "r1.json", "r2.json"]);
        match cli.command {
            Command::Merge { inputs, .. } => assert_eq!(inputs.len(), 2),
            other => panic!("expected merge, got {:?}", other),
        }
    }

    #[test]
    fn test_cli_merge_requires_input() {
        assert!(Cli::try_parse_from(["suitediff", "merge", "--out", "m.json"]).is_err());
    }

    #[test]
    fn test_cli_debug_is_global() {
        let cli = Cli::parse_from([
            "suitediff", "compare", "--dir1", "x", "--dir2", "y", "--config", "c.json", "--out",
            "o.csv", "--debug",
        ]);
        assert!(cli.debug);
    }

    #[test]
    fn test_cli_instcount() {
        let cli = Cli::parse_from([
            "suitediff",
            "instcount",
            "--dir",
            "bcs",
            "--counter",
            "/tmp/instcounter",
            "--out",
            "c.json",
        ]);
        match cli.command {
            Command::Instcount { counter, .. } => {
                assert_eq!(counter, PathBuf::from("/tmp/instcounter"))
            }
            other => panic!("expected instcount, got {:?}", other),
        }
    }

    #[test]
    fn test_cli_requires_subcommand() {
        assert!(Cli::try_parse_from(["suitediff"]).is_err());
    }
}

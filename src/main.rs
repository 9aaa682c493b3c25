use anyhow::{Context, Result};
use clap::Parser;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use suitediff::cli::{Cli, Command};
use suitediff::compare::{self, CompareConfig};
use suitediff::differ::{self, ArtifactKind, Disassembler, LlvmDis};
use suitediff::filter::{self, CMakeLayout};
use suitediff::report::TestSuiteReport;
use suitediff::{instcount, merge};
use tracing_subscriber::EnvFilter;

/// Indentation of filtered reports
const FILTER_INDENT: usize = 2;
/// Indentation of merged reports
const MERGE_INDENT: usize = 4;

/// Initialize tracing subscriber for debug output
///
/// `RUST_LOG` is honoured even without `--debug`.
fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::from_default_env().add_directive(tracing::Level::TRACE.into())
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run_diff(
    dir_a: &Path,
    dir_b: &Path,
    out: &Path,
    kind: ArtifactKind,
    llvm_dirs: Option<(PathBuf, PathBuf)>,
) -> Result<()> {
    let llvm_dis = llvm_dirs.map(|(a, b)| LlvmDis::new(a, b));
    let disassembler = llvm_dis.as_ref().map(|d| d as &dyn Disassembler);

    let file = File::create(out).with_context(|| format!("Failed to create {}", out.display()))?;
    let mut sink = BufWriter::new(file);

    let verdicts = match differ::diff_trees(dir_a, dir_b, kind, disassembler, &mut sink) {
        Ok(verdicts) => verdicts,
        Err(e) => {
            drop(sink);
            let _ = fs::remove_file(out);
            return Err(e.into());
        }
    };
    sink.flush()
        .with_context(|| format!("Failed to write {}", out.display()))?;

    let changed = verdicts.iter().filter(|v| v.has_diff).count();
    println!("{} files compared, {} differ", verdicts.len(), changed);
    Ok(())
}

fn run_filter(json: &Path, diff: &Path, out: &Path) -> Result<()> {
    let report = TestSuiteReport::from_file(json)?;
    let verdict_text =
        fs::read_to_string(diff).with_context(|| format!("Failed to read {}", diff.display()))?;
    let verdicts = differ::parse_verdicts(&verdict_text)?;

    let filtered = filter::filter_by_diff(&report, &verdicts, &CMakeLayout)?;
    filtered.write_to_file(out, FILTER_INDENT)?;

    println!(
        "{} of {} tests have different code",
        filtered.tests.len(),
        report.tests.len()
    );
    Ok(())
}

fn run_merge(inputs: &[PathBuf], out: &Path) -> Result<()> {
    let runs = inputs
        .iter()
        .map(TestSuiteReport::from_file)
        .collect::<Result<Vec<_>>>()?;

    let merged = merge::merge_runs(&runs)?;
    merged.write_to_file(out, MERGE_INDENT)?;

    println!("merged {} runs of {} tests", runs.len(), merged.tests.len());
    Ok(())
}

fn run_compare(dir1: &Path, dir2: &Path, config: &Path, out: &Path) -> Result<()> {
    let config = CompareConfig::from_file(config)?;
    let table = compare::compare_dirs(dir1, dir2, &config)?;

    fs::write(out, table.to_csv()).with_context(|| format!("Failed to write {}", out.display()))?;
    println!("{} tests compared", table.len());
    Ok(())
}

fn run_instcount(dir: &Path, counter: &Path, out: &Path) -> Result<()> {
    let summary = instcount::count_tree(dir, counter)?;
    let json = serde_json::to_string_pretty(&summary)?;

    fs::write(out, json).with_context(|| format!("Failed to write {}", out.display()))?;
    Ok(())
}

fn main() -> Result<()> {
    let args = Cli::parse();

    init_tracing(args.debug);

    match args.command {
        Command::Diff {
            dir_a,
            dir_b,
            out,
            kind,
            llvm_dir_a,
            llvm_dir_b,
        } => {
            let llvm_dirs = llvm_dir_a.zip(llvm_dir_b);
            run_diff(&dir_a, &dir_b, &out, kind, llvm_dirs)?;
        }
        Command::Filter { json, diff, out } => run_filter(&json, &diff, &out)?,
        Command::Merge { out, inputs } => run_merge(&inputs, &out)?,
        Command::Compare {
            dir1,
            dir2,
            config,
            out,
        } => run_compare(&dir1, &dir2, &config, &out)?,
        Command::Instcount { dir, counter, out } => run_instcount(&dir, &counter, &out)?,
    }

    Ok(())
}

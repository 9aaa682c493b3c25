// Performance comparison of two builds from repeated test-suite runs
//
// Each side is a directory of result files (one per run). Execution times are
// reduced to their median after dropping tests that are too short or whose
// runs are too spread out to trust; object sizes must be identical across a
// side's runs. Rows come out sorted by the relative change.

mod config;
mod csv_output;
mod results;

pub use config::{Collect, CompareConfig};
pub use csv_output::CsvTable;
pub use results::{read_results, Measurements};

use crate::merge::median;
use std::collections::BTreeSet;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info};

/// Errors that make two result sets incomparable
#[derive(Error, Debug)]
pub enum CompareError {
    #[error("malformed result file: {0}")]
    MalformedResult(String),

    #[error("metric {metric} is not available in {format} results")]
    UnsupportedMetric {
        metric: String,
        format: &'static str,
    },

    #[error("the list of tests does not match ({} only in first, {} only in second)", .only_in_first.len(), .only_in_second.len())]
    TestSetMismatch {
        only_in_first: Vec<String>,
        only_in_second: Vec<String>,
    },

    #[error("{test}: {first} runs vs {second} runs")]
    RunCountMismatch {
        test: String,
        first: usize,
        second: usize,
    },

    #[error("{test}: object size differs between runs")]
    InconsistentSize { test: String },

    #[error(transparent)]
    Statistics(#[from] crate::merge::MergeError),
}

/// One compared test, ready for CSV output
#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonRow {
    pub name: String,
    /// Sorted runs of the first side (exec time) or its single size
    pub first: Vec<f64>,
    pub first_summary: f64,
    pub second: Vec<f64>,
    pub second_summary: f64,
    /// Speedup or size increase in percent
    pub change_percent: f64,
}

fn check_same_tests(first: &Measurements, second: &Measurements) -> Result<(), CompareError> {
    let a: BTreeSet<&String> = first.keys().collect();
    let b: BTreeSet<&String> = second.keys().collect();
    if a != b {
        return Err(CompareError::TestSetMismatch {
            only_in_first: a.difference(&b).map(|s| s.to_string()).collect(),
            only_in_second: b.difference(&a).map(|s| s.to_string()).collect(),
        });
    }
    Ok(())
}

/// Are these sorted runs stable enough to compare?
fn is_reliable(sorted_runs: &[f64], med: f64, config: &CompareConfig) -> bool {
    if med == 0.0 {
        return true;
    }
    let (Some(&fastest), Some(&slowest)) = (sorted_runs.first(), sorted_runs.last()) else {
        return false;
    };
    let spread = (med - fastest).max(slowest - med) / med;
    fastest >= config.minimum_runtime_sec && spread < config.tolerance
}

fn sorted(runs: &[f64]) -> Vec<f64> {
    let mut runs = runs.to_vec();
    runs.sort_by(f64::total_cmp);
    runs
}

fn sort_by_change(rows: &mut [ComparisonRow]) {
    rows.sort_by(|a, b| a.change_percent.total_cmp(&b.change_percent));
}

/// Compare median execution times; positive speedup means the first side is slower
pub fn compare_exec_times(
    first: &Measurements,
    second: &Measurements,
    config: &CompareConfig,
) -> Result<Vec<ComparisonRow>, CompareError> {
    check_same_tests(first, second)?;

    let mut rows = Vec::new();
    for (name, runs1) in first {
        let runs2 = &second[name];
        if runs1.len() != runs2.len() {
            return Err(CompareError::RunCountMismatch {
                test: name.clone(),
                first: runs1.len(),
                second: runs2.len(),
            });
        }

        let runs1 = sorted(runs1);
        let runs2 = sorted(runs2);
        let med1 = median(&runs1)?;
        let med2 = median(&runs2)?;

        if !is_reliable(&runs1, med1, config) || !is_reliable(&runs2, med2, config) {
            debug!(test = %name, "dropped unreliable test");
            continue;
        }

        let speedup = if med2 == 0.0 {
            0.0
        } else {
            (med1 - med2) / med2 * 100.0
        };

        rows.push(ComparisonRow {
            name: name.clone(),
            first: runs1,
            first_summary: med1,
            second: runs2,
            second_summary: med2,
            change_percent: speedup,
        });
    }

    info!(compared = rows.len(), total = first.len(), "compared exec times");
    sort_by_change(&mut rows);
    Ok(rows)
}

fn single_size(test: &str, runs: &[f64]) -> Result<f64, CompareError> {
    let first = *runs.first().ok_or_else(|| CompareError::InconsistentSize {
        test: test.to_string(),
    })?;
    if runs.iter().any(|r| *r != first) {
        return Err(CompareError::InconsistentSize {
            test: test.to_string(),
        });
    }
    Ok(first)
}

/// Compare object sizes; the change is the relative increase of the first side
pub fn compare_object_sizes(
    first: &Measurements,
    second: &Measurements,
) -> Result<Vec<ComparisonRow>, CompareError> {
    check_same_tests(first, second)?;

    let mut rows = Vec::new();
    for (name, runs1) in first {
        let size1 = single_size(name, runs1)?;
        let size2 = single_size(name, &second[name])?;

        rows.push(ComparisonRow {
            name: name.clone(),
            first: vec![size1],
            first_summary: size1,
            second: vec![size2],
            second_summary: size2,
            change_percent: (size1 / size2 - 1.0) * 100.0,
        });
    }

    sort_by_change(&mut rows);
    Ok(rows)
}

/// Render exec-time rows: name, runs, median, runs, median, speedup
pub fn exec_time_table(rows: &[ComparisonRow]) -> CsvTable {
    let trials = rows.first().map_or(0, |r| r.first.len());
    let iterations: Vec<String> = (1..=trials).map(|i| format!("Itr{}", i)).collect();

    let mut header = vec!["Name".to_string()];
    header.extend(iterations.iter().cloned());
    header.push("Median (sec.)".to_string());
    header.extend(iterations.iter().cloned());
    header.push("Median (sec.)".to_string());
    header.push("Speedup(%)".to_string());

    let mut table = CsvTable::new(header);
    for row in rows {
        let mut fields = vec![row.name.clone()];
        fields.extend(row.first.iter().map(f64::to_string));
        fields.push(row.first_summary.to_string());
        fields.extend(row.second.iter().map(f64::to_string));
        fields.push(row.second_summary.to_string());
        fields.push(row.change_percent.to_string());
        table.add_row(fields);
    }
    table
}

/// Render object-size rows: name, size, size, increase
pub fn object_size_table(rows: &[ComparisonRow]) -> CsvTable {
    let mut table = CsvTable::new(["Name", "size", "size", "increase(%)"]);
    for row in rows {
        table.add_row(vec![
            row.name.clone(),
            row.first_summary.to_string(),
            row.second_summary.to_string(),
            row.change_percent.to_string(),
        ]);
    }
    table
}

/// Read both result directories and build the comparison table `config` asks for
pub fn compare_dirs(dir1: &Path, dir2: &Path, config: &CompareConfig) -> anyhow::Result<CsvTable> {
    let metric = config.collect.metric();
    let first = read_results(dir1, metric)?;
    let second = read_results(dir2, metric)?;

    let table = match config.collect {
        Collect::Exectime => exec_time_table(&compare_exec_times(&first, &second, config)?),
        Collect::Objsize => object_size_table(&compare_object_sizes(&first, &second)?),
    };
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn measurements(entries: &[(&str, &[f64])]) -> Measurements {
        entries
            .iter()
            .map(|(name, runs)| (name.to_string(), runs.to_vec()))
            .collect()
    }

    #[test]
    fn test_exec_time_speedup() {
        let first = measurements(&[("a", &[1.2, 1.0, 1.1]), ("b", &[2.0, 2.0, 2.0])]);
        let second = measurements(&[("a", &[1.0, 1.0, 1.0]), ("b", &[4.0, 4.0, 4.0])]);

        let rows = compare_exec_times(&first, &second, &CompareConfig::default()).unwrap();
        assert_eq!(rows.len(), 2);
        // Sorted by speedup: b (-50%) before a (+10%)
        assert_eq!(rows[0].name, "b");
        assert_eq!(rows[0].change_percent, -50.0);
        assert_eq!(rows[1].name, "a");
        assert_eq!(rows[1].first, vec![1.0, 1.1, 1.2]);
        assert_eq!(rows[1].first_summary, 1.1);
        assert!((rows[1].change_percent - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_short_tests_are_dropped() {
        let first = measurements(&[("fast", &[0.001, 0.001]), ("slow", &[1.0, 1.0])]);
        let second = first.clone();
        let config = CompareConfig {
            minimum_runtime_sec: 0.1,
            ..CompareConfig::default()
        };

        let rows = compare_exec_times(&first, &second, &config).unwrap();
        let names: Vec<_> = rows.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["slow"]);
    }

    #[test]
    fn test_noisy_tests_are_dropped() {
        let first = measurements(&[("noisy", &[1.0, 1.0, 3.0]), ("steady", &[1.0, 1.01, 1.02])]);
        let second = measurements(&[("noisy", &[1.0, 1.0, 1.0]), ("steady", &[1.0, 1.0, 1.0])]);
        let config = CompareConfig {
            tolerance: 0.5,
            ..CompareConfig::default()
        };

        let rows = compare_exec_times(&first, &second, &config).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].name, "steady");
    }

    #[test]
    fn test_zero_median_is_kept_with_zero_speedup() {
        let first = measurements(&[("z", &[0.0, 0.0, 0.0])]);
        let rows = compare_exec_times(&first, &first.clone(), &CompareConfig::default()).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].change_percent, 0.0);
    }

    #[test]
    fn test_test_set_mismatch() {
        let first = measurements(&[("a", &[1.0])]);
        let second = measurements(&[("b", &[1.0])]);
        assert!(matches!(
            compare_exec_times(&first, &second, &CompareConfig::default()),
            Err(CompareError::TestSetMismatch { .. })
        ));
    }

    #[test]
    fn test_run_count_mismatch() {
        let first = measurements(&[("a", &[1.0, 1.0])]);
        let second = measurements(&[("a", &[1.0])]);
        assert!(matches!(
            compare_exec_times(&first, &second, &CompareConfig::default()),
            Err(CompareError::RunCountMismatch { .. })
        ));
    }

    #[test]
    fn test_object_sizes() {
        let first = measurements(&[("a", &[1100.0, 1100.0]), ("b", &[500.0])]);
        let second = measurements(&[("a", &[1000.0]), ("b", &[1000.0])]);

        let rows = compare_object_sizes(&first, &second).unwrap();
        assert_eq!(rows[0].name, "b");
        assert_eq!(rows[0].change_percent, -50.0);
        assert!((rows[1].change_percent - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_inconsistent_object_size() {
        let first = measurements(&[("a", &[1100.0, 1200.0])]);
        let second = measurements(&[("a", &[1000.0, 1000.0])]);
        assert!(matches!(
            compare_object_sizes(&first, &second),
            Err(CompareError::InconsistentSize { .. })
        ));
    }

    #[test]
    fn test_exec_time_table_layout() {
        let first = measurements(&[("a", &[2.0, 1.0])]);
        let second = measurements(&[("a", &[1.0, 1.0])]);
        let rows = compare_exec_times(&first, &second, &CompareConfig::default()).unwrap();

        let csv = exec_time_table(&rows).to_csv();
        assert_eq!(
            csv,
            "Name,Itr1,Itr2,Median (sec.),Itr1,Itr2,Median (sec.),Speedup(%)\n\
             a,1,2,1.5,1,1,1,50\n"
        );
    }

    #[test]
    fn test_object_size_table_layout() {
        let first = measurements(&[("a", &[200.0])]);
        let second = measurements(&[("a", &[100.0])]);
        let rows = compare_object_sizes(&first, &second).unwrap();
        assert_eq!(
            object_size_table(&rows).to_csv(),
            "Name,size,size,increase(%)\na,200,100,100\n"
        );
    }

    #[test]
    fn test_compare_dirs_object_size() {
        let dir1 = tempfile::TempDir::new().unwrap();
        let dir2 = tempfile::TempDir::new().unwrap();
        let report = |size: u64| {
            format!(
                r#"{{"__version__": [0, 1, 0], "elapsed": 1.0, "tests": [
                    {{"code": "PASS", "elapsed": 0.1, "metrics": {{"size": {}}}, "name": "t", "output": ""}}
                ]}}"#,
                size
            )
        };
        std::fs::write(dir1.path().join("r1.json"), report(300)).unwrap();
        std::fs::write(dir1.path().join("r2.json"), report(300)).unwrap();
        std::fs::write(dir2.path().join("r1.json"), report(200)).unwrap();

        let config = CompareConfig {
            collect: Collect::Objsize,
            ..CompareConfig::default()
        };
        let table = compare_dirs(dir1.path(), dir2.path(), &config).unwrap();
        assert_eq!(table.to_csv(), "Name,size,size,increase(%)\nt,300,200,50\n");
    }
}

#![no_main]

use libfuzzer_sys::fuzz_target;
use suitediff::differ::parse_verdicts;
use suitediff::filter::{filter_by_diff, CMakeLayout};
use suitediff::report::TestSuiteReport;

fuzz_target!(|data: &[u8]| {
    let text = String::from_utf8_lossy(data);

    // Every parsed verdict must survive a write/parse cycle
    if let Ok(verdicts) = parse_verdicts(&text) {
        let written: String = verdicts.iter().map(|v| format!("{}\n", v)).collect();
        let reparsed = parse_verdicts(&written).expect("written verdicts parse");
        assert_eq!(reparsed, verdicts);

        let report = TestSuiteReport::from_json_str(r#"{"__version__": [0, 1, 0], "tests": []}"#)
            .expect("empty report parses");
        let _ = filter_by_diff(&report, &verdicts, &CMakeLayout);
    }
});

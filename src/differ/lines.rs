// Line-oriented comparison of generated assembly and textual IR
//
// Two builds of the same sources emit identical code but different compiler
// identification stamps (`.ident` in assembly, `!llvm.ident` metadata in IR).
// Those stamps are the only mismatch tolerated; any other differing line marks
// the pair as changed and scanning stops there.

use regex::Regex;
use std::sync::OnceLock;

/// `.ident "clang version 10.0.0 (git@github.com:org/repo abc123)"`
const ASM_IDENT_PATTERN: &str = r#"^\.ident\s*"clang version [0-9]+\.[0-9]+\.[0-9]+ \(((git@github\.com)|(https://github\.com))[a-zA-Z0-9)( :/._-]*"#;

/// `!1 = !{!"clang version 11.0.0 (git@github.com:org/repo.git 13db7490)"}`
const IR_IDENT_PATTERN: &str = r#"^![0-9]+\s*=\s*!\{!"clang version [0-9]+\.[0-9]+\.[0-9]+ \(((git@github\.com)|(https://github\.com))[a-zA-Z0-9)( :/._-]*"\}"#;

fn asm_ident() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(ASM_IDENT_PATTERN).expect("asm ident pattern is valid"))
}

fn ir_ident() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(IR_IDENT_PATTERN).expect("IR ident pattern is valid"))
}

/// Drop an assembler comment and surrounding whitespace
///
/// A comment starts at the first `#` outside a double-quoted string; `\"`
/// inside a string does not close it.
fn strip_asm_comment(line: &str) -> &str {
    let mut in_string = false;
    let mut escaped = false;

    for (idx, ch) in line.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match ch {
            '\\' if in_string => escaped = true,
            '"' => in_string = !in_string,
            '#' if !in_string => return line[..idx].trim(),
            _ => {}
        }
    }

    line.trim()
}

/// Is this line a compiler version stamp in assembly output?
pub fn is_asm_version_stamp(line: &str) -> bool {
    asm_ident().is_match(line)
}

/// Is this line a compiler version stamp in disassembled IR?
pub fn is_ir_version_stamp(line: &str) -> bool {
    ir_ident().is_match(line)
}

/// Compare two `.s` files line by line
///
/// Returns `true` when the files differ in a way that is not explained by
/// the compiler identification directive.
///
/// # Example
/// ```
/// use suitediff::differ::asm_has_diff;
///
/// let a = "main:\n\tretq\n\t.ident \"clang version 10.0.0 (git@github.com:org/repo abc123)\"\n";
/// let b = "main:\n\tretq\n\t.ident \"clang version 10.0.1 (git@github.com:org/repo def456)\"\n";
/// assert!(!asm_has_diff(a, b));
/// ```
pub fn asm_has_diff(a: &str, b: &str) -> bool {
    let lines_a: Vec<&str> = a.lines().collect();
    let lines_b: Vec<&str> = b.lines().collect();

    if lines_a.len() != lines_b.len() {
        return true;
    }

    for (la, lb) in lines_a.iter().zip(&lines_b) {
        let la = strip_asm_comment(la);
        let lb = strip_asm_comment(lb);

        if la == lb {
            continue;
        }
        if is_asm_version_stamp(la) && is_asm_version_stamp(lb) {
            continue;
        }
        return true;
    }

    false
}

/// Compare two `.ll` files line by line
///
/// The first line (`; ModuleID = ...`) names the input file and is skipped.
pub fn ir_has_diff(a: &str, b: &str) -> bool {
    let lines_a: Vec<&str> = a.lines().collect();
    let lines_b: Vec<&str> = b.lines().collect();

    if lines_a.len() != lines_b.len() {
        return true;
    }

    for (la, lb) in lines_a.iter().zip(&lines_b).skip(1) {
        let la = la.trim();
        let lb = lb.trim();

        if la == lb {
            continue;
        }
        if is_ir_version_stamp(la) && is_ir_version_stamp(lb) {
            continue;
        }
        return true;
    }

    false
}

//! Verdict file format: one `<relative-path> <YESDIFF|NODIFF>` record per line

use super::DiffError;
use std::fmt;
use std::io::Write;

const YES: &str = "YESDIFF";
const NO: &str = "NODIFF";

/// Outcome of comparing one artifact pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffVerdict {
    /// Path relative to both build trees
    pub path: String,
    pub has_diff: bool,
}

impl DiffVerdict {
    pub fn new(path: impl Into<String>, has_diff: bool) -> Self {
        Self {
            path: path.into(),
            has_diff,
        }
    }

    /// Parse a single verdict record
    ///
    /// The status is the last whitespace-separated token, so paths containing
    /// spaces survive a round trip.
    pub fn parse_line(line: &str) -> Result<Self, DiffError> {
        let malformed = || DiffError::MalformedVerdict(line.to_string());

        let (path, status) = line
            .trim()
            .rsplit_once(char::is_whitespace)
            .ok_or_else(malformed)?;
        let path = path.trim_end();
        if path.is_empty() {
            return Err(malformed());
        }

        let has_diff = match status {
            YES => true,
            NO => false,
            _ => return Err(malformed()),
        };

        Ok(Self::new(path, has_diff))
    }

    /// Append this verdict as one line to `sink`
    pub fn write_to<W: Write + ?Sized>(&self, sink: &mut W) -> std::io::Result<()> {
        writeln!(sink, "{}", self)
    }
}

impl fmt::Display for DiffVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = if self.has_diff { YES } else { NO };
        write!(f, "{} {}", self.path, status)
    }
}

/// Parse a whole verdict file; blank lines are skipped
pub fn parse_verdicts(text: &str) -> Result<Vec<DiffVerdict>, DiffError> {
    text.lines()
        .filter(|line| !line.trim().is_empty())
        .map(DiffVerdict::parse_line)
        .collect()
}

//! Issue log ingestion: bytes to validated records plus a content hash.
//!
//! The log is a sequence of UTF-8 lines, each a JSON object describing one
//! issue. Parsing is tolerant: malformed or invalid lines are counted and
//! skipped, never aborting the load. A file with zero valid lines is a
//! valid, empty result.

use std::fs;
use std::path::Path;

use rustc_hash::FxHashMap;
use tracing::debug;
use xxhash_rust::xxh64::xxh64;

use crate::error::{Result, ViewerError};
use crate::model::Issue;

/// Per-load accounting of the line-level outcome.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseStats {
    /// Non-blank lines seen.
    pub total_lines: usize,
    /// Lines that decoded and validated.
    pub parsed: usize,
    /// Lines skipped as malformed or invalid.
    pub skipped: usize,
}

/// The result of parsing one issue log.
#[derive(Debug, Clone, Default)]
pub struct ParsedLog {
    pub issues: Vec<Issue>,
    pub stats: ParseStats,
}

/// Reads the raw log bytes. Failures are `load`-phase errors.
pub fn read_log(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).map_err(|source| ViewerError::LogRead {
        path: path.to_path_buf(),
        source,
    })
}

/// Stable content hash of the source bytes, used for snapshot dedup.
pub fn content_hash(bytes: &[u8]) -> u64 {
    xxh64(bytes, 0)
}

/// Renders a content hash the way robot payloads carry it.
pub fn format_hash(hash: u64) -> String {
    format!("{hash:016x}")
}

/// Parses the log bytes into validated issues.
///
/// Duplicate IDs follow last-writer-wins at record granularity: the later
/// record replaces the earlier one in place, keeping the original position.
pub fn parse_log(bytes: &[u8]) -> ParsedLog {
    let text = String::from_utf8_lossy(bytes);
    let mut issues: Vec<Issue> = Vec::new();
    let mut by_id: FxHashMap<String, usize> = FxHashMap::default();
    let mut stats = ParseStats::default();

    for (lineno, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        stats.total_lines += 1;

        let mut issue: Issue = match serde_json::from_str(line) {
            Ok(issue) => issue,
            Err(err) => {
                stats.skipped += 1;
                debug!(line = lineno + 1, error = %err, "log.parse.skip_malformed");
                continue;
            }
        };
        if let Err(err) = issue.validate() {
            stats.skipped += 1;
            debug!(line = lineno + 1, error = %err, "log.parse.skip_invalid");
            continue;
        }

        // Dependencies inside a record may omit the owning id.
        for dep in &mut issue.dependencies {
            if dep.issue_id.is_empty() {
                dep.issue_id = issue.id.clone();
            }
        }

        stats.parsed += 1;
        match by_id.get(&issue.id) {
            Some(&at) => issues[at] = issue,
            None => {
                by_id.insert(issue.id.clone(), issues.len());
                issues.push(issue);
            }
        }
    }

    ParsedLog { issues, stats }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GOOD: &str = r#"{"id":"a-1","title":"T","status":"open","issue_type":"task","priority":2,"created_at":"2026-01-01T00:00:00Z","updated_at":"2026-01-01T00:00:00Z"}"#;

    #[test]
    fn parses_valid_subset_and_counts_the_rest() {
        let log = format!("{GOOD}\nnot json at all\n{{\"id\":\"\"}}\n\n");
        let parsed = parse_log(log.as_bytes());
        assert_eq!(parsed.issues.len(), 1);
        assert_eq!(parsed.stats.total_lines, 3);
        assert_eq!(parsed.stats.parsed, 1);
        assert_eq!(parsed.stats.skipped, 2);
    }

    #[test]
    fn zero_valid_lines_is_empty_not_error() {
        let parsed = parse_log(b"garbage\nmore garbage\n");
        assert!(parsed.issues.is_empty());
        assert_eq!(parsed.stats.skipped, 2);
    }

    #[test]
    fn duplicate_ids_take_the_later_record() {
        let newer = GOOD.replace("\"title\":\"T\"", "\"title\":\"T2\"");
        let log = format!("{GOOD}\n{newer}\n");
        let parsed = parse_log(log.as_bytes());
        assert_eq!(parsed.issues.len(), 1);
        assert_eq!(parsed.issues[0].title, "T2");
        assert_eq!(parsed.stats.parsed, 2);
    }

    #[test]
    fn hash_is_stable_over_bytes() {
        assert_eq!(content_hash(b"abc"), content_hash(b"abc"));
        assert_ne!(content_hash(b"abc"), content_hash(b"abd"));
        assert_eq!(format_hash(0xabcu64).len(), 16);
    }

    #[test]
    fn owning_id_is_filled_into_deps() {
        let log = r#"{"id":"a-2","title":"U","status":"open","issue_type":"task","dependencies":[{"depends_on_id":"a-1","type":"blocks"}]}"#;
        let parsed = parse_log(log.as_bytes());
        assert_eq!(parsed.issues[0].dependencies[0].issue_id, "a-2");
    }
}

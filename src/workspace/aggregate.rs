//! Aggregation of per-repo snapshots into one namespaced issue space.

use std::sync::Arc;

use xxhash_rust::xxh64::Xxh64;

use crate::loader::ParseStats;
use crate::model::Issue;
use crate::snapshot::Snapshot;

use super::resolver::IdResolver;

/// Merges per-repo snapshots into one snapshot with namespaced IDs.
///
/// Local IDs are rewritten to `<prefix><local>`; dependency targets that
/// already carry a known prefix pass through untouched, which is how
/// cross-repo dependencies are expressed. The aggregate hash mixes the
/// per-repo hashes in repo order.
pub fn aggregate_snapshots(parts: &[(String, Arc<Snapshot>)]) -> Snapshot {
    let prefixes: Vec<String> = parts.iter().map(|(prefix, _)| prefix.clone()).collect();
    let mut issues: Vec<Issue> = Vec::new();
    let mut hasher = Xxh64::new(0);
    let mut stats = ParseStats::default();

    for (prefix, snapshot) in parts {
        let resolver = IdResolver::new(prefixes.clone(), prefix.clone());
        hasher.update(&snapshot.hash().to_le_bytes());
        let part_stats = snapshot.parse_stats();
        stats.total_lines += part_stats.total_lines;
        stats.parsed += part_stats.parsed;
        stats.skipped += part_stats.skipped;

        for issue in snapshot.issues() {
            let mut issue = issue.clone();
            issue.id = resolver.qualify(&issue.id);
            for dep in &mut issue.dependencies {
                dep.issue_id = issue.id.clone();
                dep.depends_on_id = resolver.qualify(&dep.depends_on_id);
            }
            issues.push(issue);
        }
    }

    Snapshot::build(issues, hasher.digest(), stats)
}

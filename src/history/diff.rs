//! Structural diff between two snapshots.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::analysis::Baseline;
use crate::graph::BlocksGraph;
use crate::model::Issue;
use crate::snapshot::Snapshot;

/// The difference between an earlier and a later snapshot.
#[derive(Debug, Clone, Serialize, Default)]
pub struct GraphDiff {
    /// Present later but not earlier.
    pub new_issues: Vec<String>,
    /// Transitioned to closed.
    pub closed_issues: Vec<String>,
    /// Present earlier, absent (or tombstoned) later.
    pub removed_issues: Vec<String>,
    /// Present in both with any field other than `updated_at` changed.
    pub modified_issues: Vec<String>,
    pub new_cycles: Vec<Vec<String>>,
    pub resolved_cycles: Vec<Vec<String>>,
    /// Per-metric differences, later minus earlier.
    pub metric_delta: BTreeMap<String, f64>,
}

/// Computes the structural diff between two snapshots.
pub fn graph_diff(earlier: &Snapshot, later: &Snapshot) -> GraphDiff {
    let mut diff = GraphDiff::default();

    for issue in later.issues() {
        let before = earlier.get(&issue.id);
        match before {
            None => {
                if !issue.status.is_tombstone() {
                    diff.new_issues.push(issue.id.clone());
                }
            }
            Some(before) => {
                if issue.status.is_tombstone() {
                    if !before.status.is_tombstone() {
                        diff.removed_issues.push(issue.id.clone());
                    }
                } else if issue.is_closed() && !before.is_closed() {
                    diff.closed_issues.push(issue.id.clone());
                } else if changed_besides_updated_at(before, issue) {
                    diff.modified_issues.push(issue.id.clone());
                }
            }
        }
    }
    for issue in earlier.issues() {
        if issue.status.is_tombstone() {
            continue;
        }
        if later.get(&issue.id).is_none() {
            diff.removed_issues.push(issue.id.clone());
        }
    }

    let before_cycles = BlocksGraph::open_blocks(earlier).cycles();
    let after_cycles = BlocksGraph::open_blocks(later).cycles();
    diff.new_cycles = after_cycles
        .iter()
        .filter(|cycle| !before_cycles.contains(cycle))
        .cloned()
        .collect();
    diff.resolved_cycles = before_cycles
        .into_iter()
        .filter(|cycle| !after_cycles.contains(cycle))
        .collect();

    let before_metrics = Baseline::capture(earlier, "").metrics;
    let after_metrics = Baseline::capture(later, "").metrics;
    for (key, now) in &after_metrics {
        let was = before_metrics.get(key).copied().unwrap_or(0.0);
        diff.metric_delta.insert(key.clone(), now - was);
    }

    diff
}

fn changed_besides_updated_at(before: &Issue, after: &Issue) -> bool {
    let mut before = before.clone();
    let mut after = after.clone();
    before.updated_at = None;
    after.updated_at = None;
    before != after
}

//! Triage: partition open issues and summarise project health.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::model::DepType;
use crate::snapshot::Snapshot;

use super::plan::{execution_plan, Track};
use super::scoring::ImpactIndex;

const DEFAULT_TOP: usize = 5;
/// Priority band treated as a quick win when unentangled.
const QUICK_WIN_FLOOR: i64 = 3;

/// Options for a triage run.
#[derive(Debug, Clone, Copy)]
pub struct TriageOptions {
    /// How many recommendations to emit.
    pub top: usize,
    /// Group actionable work into execution-plan tracks.
    pub by_track: bool,
    /// Partition open issues by label.
    pub by_label: bool,
}

impl Default for TriageOptions {
    fn default() -> Self {
        TriageOptions {
            top: DEFAULT_TOP,
            by_track: false,
            by_label: false,
        }
    }
}

/// An open issue with its open blockers.
#[derive(Debug, Clone, Serialize)]
pub struct BlockedEntry {
    pub id: String,
    pub title: String,
    pub open_blockers: Vec<String>,
}

/// A blocker worth clearing, ranked by how much it unblocks.
#[derive(Debug, Clone, Serialize)]
pub struct BlockerToClear {
    pub id: String,
    pub title: String,
    pub unblocks_count: usize,
}

/// One triage pick.
#[derive(Debug, Clone, Serialize)]
pub struct Recommendation {
    pub id: String,
    pub title: String,
    pub impact_score: f64,
    pub reason: String,
}

/// Distributions over the open and closed population.
#[derive(Debug, Clone, Serialize, Default)]
pub struct ProjectHealth {
    pub status_distribution: BTreeMap<String, usize>,
    pub type_distribution: BTreeMap<String, usize>,
    pub priority_distribution: BTreeMap<String, usize>,
}

/// The full triage partition.
#[derive(Debug, Clone, Serialize)]
pub struct TriageReport {
    pub actionable: Vec<String>,
    pub blocked: Vec<BlockedEntry>,
    pub quick_wins: Vec<String>,
    pub blockers_to_clear: Vec<BlockerToClear>,
    pub recommendations: Vec<Recommendation>,
    pub project_health: ProjectHealth,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tracks: Option<Vec<Track>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub by_label: Option<BTreeMap<String, Vec<String>>>,
}

/// Partitions open issues into actionable, blocked, and quick wins, and
/// selects the top recommendations by impact.
pub fn triage(snapshot: &Snapshot, index: &ImpactIndex, options: TriageOptions) -> TriageReport {
    let mut actionable = Vec::new();
    let mut blocked = Vec::new();
    let mut quick_wins = Vec::new();

    for issue in snapshot.open_issues() {
        if snapshot.is_actionable(&issue.id) {
            actionable.push(issue.id.clone());
            let entangled = !snapshot.reverse_blocks(&issue.id).is_empty();
            if issue.priority() >= QUICK_WIN_FLOOR && !entangled {
                quick_wins.push(issue.id.clone());
            }
        } else {
            let open_blockers: Vec<String> = issue
                .deps_of(DepType::Blocks)
                .filter(|dep| {
                    snapshot
                        .get(&dep.depends_on_id)
                        .map(|target| !target.is_closed() && !target.status.is_tombstone())
                        .unwrap_or(false)
                })
                .map(|dep| dep.depends_on_id.clone())
                .collect();
            blocked.push(BlockedEntry {
                id: issue.id.clone(),
                title: issue.title.clone(),
                open_blockers,
            });
        }
    }

    let mut blockers_to_clear: Vec<BlockerToClear> = snapshot
        .open_issues()
        .filter_map(|issue| {
            let count = index.get(&issue.id)?.open_dependents;
            if count == 0 {
                return None;
            }
            Some(BlockerToClear {
                id: issue.id.clone(),
                title: issue.title.clone(),
                unblocks_count: count,
            })
        })
        .collect();
    blockers_to_clear.sort_by(|a, b| {
        b.unblocks_count
            .cmp(&a.unblocks_count)
            .then_with(|| a.id.cmp(&b.id))
    });
    blockers_to_clear.truncate(options.top);

    let mut recommendations: Vec<Recommendation> = actionable
        .iter()
        .map(|id| Recommendation {
            id: id.clone(),
            title: snapshot
                .get(id)
                .map(|issue| issue.title.clone())
                .unwrap_or_default(),
            impact_score: index.impact(id),
            reason: index
                .reasons(id)
                .into_iter()
                .next()
                .unwrap_or_else(|| "Ready to start".to_string()),
        })
        .collect();
    recommendations.sort_by(|a, b| {
        b.impact_score
            .partial_cmp(&a.impact_score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.id.cmp(&b.id))
    });
    recommendations.truncate(options.top);

    let tracks = options
        .by_track
        .then(|| execution_plan(snapshot, index).tracks);
    let by_label = options.by_label.then(|| {
        let mut map: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for issue in snapshot.open_issues() {
            for label in &issue.labels {
                map.entry(label.clone()).or_default().push(issue.id.clone());
            }
        }
        map
    });

    TriageReport {
        actionable,
        blocked,
        quick_wins,
        blockers_to_clear,
        recommendations,
        project_health: project_health(snapshot),
        tracks,
        by_label,
    }
}

/// Status, type, and priority distributions over analyzable issues.
pub fn project_health(snapshot: &Snapshot) -> ProjectHealth {
    let mut health = ProjectHealth::default();
    for issue in snapshot.analyzable() {
        *health
            .status_distribution
            .entry(issue.status.as_str().to_string())
            .or_default() += 1;
        *health
            .type_distribution
            .entry(issue.issue_type.as_str().to_string())
            .or_default() += 1;
        *health
            .priority_distribution
            .entry(issue.priority().to_string())
            .or_default() += 1;
    }
    health
}

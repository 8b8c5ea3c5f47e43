//! Impact scoring and priority recommendations.
//!
//! Every non-closed issue gets an `impact_score` in [0, 1]:
//!
//! ```text
//! score = 0.30*pageRank + 0.30*betweenness + 0.20*blockerCount
//!       + 0.10*freshnessPenalty + 0.10*priorityBoost
//! ```
//!
//! where the graph terms are normalised by max over the open-`blocks`
//! subgraph.

use chrono::{DateTime, Utc};
use rustc_hash::FxHashMap;

use crate::graph::{betweenness, normalize_max, pagerank, BlocksGraph};
use crate::snapshot::Snapshot;

const W_PAGERANK: f64 = 0.30;
const W_BETWEENNESS: f64 = 0.30;
const W_BLOCKERS: f64 = 0.20;
const W_FRESHNESS: f64 = 0.10;
const W_PRIORITY: f64 = 0.10;

/// Days of staleness at which the freshness penalty saturates.
const FRESHNESS_HORIZON_DAYS: f64 = 30.0;
/// Staleness worth calling out in reasons.
const STALE_REASON_DAYS: i64 = 14;
const CENTRALITY_REASON_FLOOR: f64 = 0.5;

/// Per-issue score components.
#[derive(Debug, Clone)]
pub struct IssueScore {
    pub impact: f64,
    pub pagerank: f64,
    pub betweenness: f64,
    /// Open issues this one blocks, directly.
    pub open_dependents: usize,
    pub days_stale: i64,
}

/// Impact scores for every open issue of a snapshot.
#[derive(Debug, Default)]
pub struct ImpactIndex {
    scores: FxHashMap<String, IssueScore>,
}

impl ImpactIndex {
    /// Computes scores over the open-`blocks` subgraph. `now` anchors the
    /// freshness penalty so results are reproducible.
    pub fn compute(snapshot: &Snapshot, now: DateTime<Utc>) -> ImpactIndex {
        let graph = BlocksGraph::open_blocks(snapshot);
        let pr = normalize_max(&pagerank(&graph));
        let btw = normalize_max(&betweenness(&graph));

        let dependents: Vec<usize> = (0..graph.len())
            .map(|v| graph.dependents_of(v as u32).len())
            .collect();
        let max_dependents = dependents.iter().copied().max().unwrap_or(0).max(1) as f64;

        let mut scores = FxHashMap::default();
        for (v, id) in graph.ids().iter().enumerate() {
            let issue = match snapshot.get(id) {
                Some(issue) => issue,
                None => continue,
            };
            let days_stale = issue
                .updated_at
                .map(|updated| (now - updated).num_days().max(0))
                .unwrap_or(0);
            let freshness = (days_stale as f64 / FRESHNESS_HORIZON_DAYS).min(1.0);
            let priority_boost = (4 - issue.priority()) as f64 / 4.0;
            let blocker_norm = dependents[v] as f64 / max_dependents;

            let impact = W_PAGERANK * pr[v]
                + W_BETWEENNESS * btw[v]
                + W_BLOCKERS * blocker_norm
                + W_FRESHNESS * freshness
                + W_PRIORITY * priority_boost;

            scores.insert(
                id.clone(),
                IssueScore {
                    impact,
                    pagerank: pr[v],
                    betweenness: btw[v],
                    open_dependents: dependents[v],
                    days_stale,
                },
            );
        }
        ImpactIndex { scores }
    }

    pub fn get(&self, id: &str) -> Option<&IssueScore> {
        self.scores.get(id)
    }

    /// Impact score, 0 for unknown or closed issues.
    pub fn impact(&self, id: &str) -> f64 {
        self.scores.get(id).map(|s| s.impact).unwrap_or(0.0)
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    /// Reason strings for an issue, most significant first.
    pub fn reasons(&self, id: &str) -> Vec<String> {
        let Some(score) = self.scores.get(id) else {
            return Vec::new();
        };
        let mut reasons = Vec::new();
        if score.open_dependents > 0 {
            reasons.push(format!("Blocks {} open items", score.open_dependents));
        }
        if score.betweenness >= CENTRALITY_REASON_FLOOR {
            reasons.push("Critical-path bottleneck".to_string());
        }
        if score.pagerank >= CENTRALITY_REASON_FLOOR {
            reasons.push("High centrality".to_string());
        }
        if score.days_stale >= STALE_REASON_DAYS {
            reasons.push(format!("Stale for {} days", score.days_stale));
        }
        reasons
    }
}

/// A suggested priority change for one issue.
#[derive(Debug, Clone, serde::Serialize)]
pub struct PriorityRecommendation {
    pub id: String,
    pub title: String,
    pub current_priority: i64,
    pub suggested_priority: i64,
    /// Monotone in the margin between current and suggested priorities.
    pub confidence: f64,
    pub reasons: Vec<String>,
    pub impact_score: f64,
}

fn suggested_priority(impact: f64) -> i64 {
    if impact >= 0.75 {
        0
    } else if impact >= 0.55 {
        1
    } else if impact >= 0.35 {
        2
    } else if impact >= 0.15 {
        3
    } else {
        4
    }
}

fn confidence(current: i64, suggested: i64) -> f64 {
    let margin = (current - suggested).unsigned_abs() as f64;
    (0.5 + 0.1 * margin).min(0.95)
}

/// Issues whose computed impact disagrees with their recorded priority,
/// highest impact first.
pub fn priority_recommendations(
    snapshot: &Snapshot,
    index: &ImpactIndex,
) -> Vec<PriorityRecommendation> {
    let mut recs: Vec<PriorityRecommendation> = snapshot
        .open_issues()
        .filter_map(|issue| {
            let score = index.get(&issue.id)?;
            let suggested = suggested_priority(score.impact);
            if suggested == issue.priority() {
                return None;
            }
            Some(PriorityRecommendation {
                id: issue.id.clone(),
                title: issue.title.clone(),
                current_priority: issue.priority(),
                suggested_priority: suggested,
                confidence: confidence(issue.priority(), suggested),
                reasons: index.reasons(&issue.id),
                impact_score: score.impact,
            })
        })
        .collect();
    recs.sort_by(|a, b| {
        b.impact_score
            .partial_cmp(&a.impact_score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.id.cmp(&b.id))
    });
    recs
}

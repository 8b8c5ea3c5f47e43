//! Robot payload construction.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::analysis::{
    detect_drift, execution_plan, priority_recommendations, triage, Baseline, DriftAlert,
    DriftSeverity, ImpactIndex, PriorityRecommendation, TriageOptions, TriageReport, Track,
};
use crate::graph::{betweenness, normalize_max, pagerank, BlocksGraph};
use crate::snapshot::Snapshot;

/// The common robot envelope wrapped around every payload.
#[derive(Debug, Clone, Serialize)]
pub struct Report<T: Serialize> {
    pub generated_at: DateTime<Utc>,
    pub data_hash: String,
    #[serde(flatten)]
    pub data: T,
}

fn envelope<T: Serialize>(snapshot: &Snapshot, data: T) -> Report<T> {
    Report {
        generated_at: Utc::now(),
        data_hash: snapshot.hash_string(),
        data,
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PlanSummary {
    pub highest_impact: Option<String>,
    pub impact_reason: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlanPayload {
    pub tracks: Vec<Track>,
    pub total_actionable: usize,
    pub total_blocked: usize,
    pub summary: PlanSummary,
}

/// `bv plan`: the execution plan.
pub fn plan_report(snapshot: &Snapshot, now: DateTime<Utc>) -> Report<PlanPayload> {
    let index = ImpactIndex::compute(snapshot, now);
    let plan = execution_plan(snapshot, &index);
    let summary = PlanSummary {
        highest_impact: plan.highest_impact.as_ref().map(|top| top.id.clone()),
        impact_reason: plan.highest_impact.as_ref().map(|top| top.reason.clone()),
    };
    envelope(
        snapshot,
        PlanPayload {
            tracks: plan.tracks,
            total_actionable: plan.total_actionable,
            total_blocked: plan.total_blocked,
            summary,
        },
    )
}

#[derive(Debug, Clone, Serialize)]
pub struct QuickRef {
    pub total: usize,
    pub actionable: usize,
    pub blocked: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct TriagePayload {
    pub quick_ref: QuickRef,
    #[serde(flatten)]
    pub triage: TriageReport,
}

/// `bv triage`: partitions, recommendations, and project health.
pub fn triage_report(
    snapshot: &Snapshot,
    now: DateTime<Utc>,
    options: TriageOptions,
) -> Report<TriagePayload> {
    let index = ImpactIndex::compute(snapshot, now);
    let triage = triage(snapshot, &index, options);
    let quick_ref = QuickRef {
        total: snapshot.analyzable().count(),
        actionable: triage.actionable.len(),
        blocked: triage.blocked.len(),
    };
    envelope(snapshot, TriagePayload { quick_ref, triage })
}

#[derive(Debug, Clone, Serialize)]
pub struct NextPick {
    pub id: String,
    pub title: String,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct NextPayload {
    pub recommendation: Option<NextPick>,
    pub commands: BTreeMap<String, String>,
}

/// `bv next`: the single best thing to start, with ready-to-run commands.
pub fn next_report(snapshot: &Snapshot, now: DateTime<Utc>) -> Report<NextPayload> {
    let index = ImpactIndex::compute(snapshot, now);
    let pick = snapshot
        .actionable()
        .iter()
        .max_by(|a, b| {
            index
                .impact(a)
                .partial_cmp(&index.impact(b))
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| b.cmp(a))
        })
        .and_then(|id| snapshot.get(id))
        .map(|issue| NextPick {
            id: issue.id.clone(),
            title: issue.title.clone(),
            reason: index
                .reasons(&issue.id)
                .into_iter()
                .next()
                .unwrap_or_else(|| "Ready to start".to_string()),
        });

    let commands = pick
        .as_ref()
        .map(|pick| {
            BTreeMap::from([
                (
                    "claim".to_string(),
                    format!("bd update {} --status in_progress", pick.id),
                ),
                ("show".to_string(), format!("bd show {}", pick.id)),
                ("close".to_string(), format!("bd close {}", pick.id)),
            ])
        })
        .unwrap_or_default();

    envelope(
        snapshot,
        NextPayload {
            recommendation: pick,
            commands,
        },
    )
}

#[derive(Debug, Clone, Serialize)]
pub struct CentralityEntry {
    pub id: String,
    pub title: String,
    pub score: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct StaleEntry {
    pub id: String,
    pub title: String,
    pub days_stale: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct InsightsPayload {
    /// Per-metric state: `ok`, `info`, `warning`, or `critical`.
    pub status: BTreeMap<String, String>,
    pub cycles: Vec<Vec<String>>,
    pub bottlenecks: Vec<CentralityEntry>,
    pub high_centrality: Vec<CentralityEntry>,
    pub stale_issues: Vec<StaleEntry>,
}

const INSIGHT_TOP: usize = 10;
const INSIGHT_STALE_DAYS: i64 = 14;

/// `bv insights`: per-metric state plus supporting detail arrays.
pub fn insights_report(snapshot: &Snapshot, now: DateTime<Utc>) -> Report<InsightsPayload> {
    let graph = BlocksGraph::open_blocks(snapshot);
    let cycles = graph.cycles();
    let pr = normalize_max(&pagerank(&graph));
    let btw = normalize_max(&betweenness(&graph));

    let top_by = |scores: &[f64]| -> Vec<CentralityEntry> {
        let mut entries: Vec<CentralityEntry> = graph
            .ids()
            .iter()
            .enumerate()
            .filter(|&(v, _)| scores[v] > 0.0)
            .map(|(v, id)| CentralityEntry {
                id: id.clone(),
                title: snapshot
                    .get(id)
                    .map(|issue| issue.title.clone())
                    .unwrap_or_default(),
                score: scores[v],
            })
            .collect();
        entries.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.id.cmp(&b.id))
        });
        entries.truncate(INSIGHT_TOP);
        entries
    };
    let bottlenecks = top_by(&btw);
    let high_centrality = top_by(&pr);

    let index = ImpactIndex::compute(snapshot, now);
    let mut stale_issues: Vec<StaleEntry> = snapshot
        .open_issues()
        .filter_map(|issue| {
            let days = index.get(&issue.id)?.days_stale;
            (days >= INSIGHT_STALE_DAYS).then(|| StaleEntry {
                id: issue.id.clone(),
                title: issue.title.clone(),
                days_stale: days,
            })
        })
        .collect();
    stale_issues.sort_by(|a, b| b.days_stale.cmp(&a.days_stale).then_with(|| a.id.cmp(&b.id)));
    stale_issues.truncate(INSIGHT_TOP);

    let mut status = BTreeMap::new();
    status.insert(
        "cycles".to_string(),
        if cycles.is_empty() { "ok" } else { "critical" }.to_string(),
    );
    status.insert(
        "bottlenecks".to_string(),
        if bottlenecks.is_empty() { "ok" } else { "info" }.to_string(),
    );
    status.insert(
        "stale_issues".to_string(),
        if stale_issues.is_empty() { "ok" } else { "info" }.to_string(),
    );

    envelope(
        snapshot,
        InsightsPayload {
            status,
            cycles,
            bottlenecks,
            high_centrality,
            stale_issues,
        },
    )
}

#[derive(Debug, Clone, Serialize)]
pub struct PrioritySummary {
    pub total_issues: usize,
    pub recommendations: usize,
    pub high_confidence: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct PriorityPayload {
    pub recommendations: Vec<PriorityRecommendation>,
    pub summary: PrioritySummary,
}

const HIGH_CONFIDENCE: f64 = 0.8;

/// `bv priority`: suggested priority changes.
pub fn priority_report(snapshot: &Snapshot, now: DateTime<Utc>) -> Report<PriorityPayload> {
    let index = ImpactIndex::compute(snapshot, now);
    let recommendations = priority_recommendations(snapshot, &index);
    let summary = PrioritySummary {
        total_issues: snapshot.analyzable().count(),
        recommendations: recommendations.len(),
        high_confidence: recommendations
            .iter()
            .filter(|rec| rec.confidence >= HIGH_CONFIDENCE)
            .count(),
    };
    envelope(
        snapshot,
        PriorityPayload {
            recommendations,
            summary,
        },
    )
}

#[derive(Debug, Clone, Serialize)]
pub struct DriftPayload {
    pub severity: DriftSeverity,
    pub alerts: Vec<DriftAlert>,
    pub deltas: BTreeMap<String, f64>,
}

/// `bv drift`: comparison against a stored baseline. The severity also
/// drives the process exit code.
pub fn drift_report(snapshot: &Snapshot, baseline: &Baseline) -> Report<DriftPayload> {
    let report = detect_drift(baseline, snapshot);
    envelope(
        snapshot,
        DriftPayload {
            severity: report.severity,
            alerts: report.alerts,
            deltas: report.deltas,
        },
    )
}

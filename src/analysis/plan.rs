//! Execution-plan construction.
//!
//! The plan is an ordered list of tracks, each a chain of items that can be
//! worked sequentially. Seeds are the actionable issues; a forward walk
//! along `blocks` edges collects what each seed unlocks; weakly connected
//! components of the collected sub-DAG become tracks, ordered by descending
//! aggregate impact.

use serde::Serialize;

use crate::graph::{BlocksGraph, NodeIx};
use crate::snapshot::Snapshot;

use super::scoring::ImpactIndex;

/// One workable step in a track.
#[derive(Debug, Clone, Serialize)]
pub struct PlanItem {
    pub id: String,
    pub title: String,
    pub priority: i64,
    pub impact_score: f64,
    /// Still-open issues this item unblocks when it closes.
    pub unblocks: Vec<String>,
}

/// A sequential chain within the plan.
#[derive(Debug, Clone, Serialize)]
pub struct Track {
    pub name: String,
    pub items: Vec<PlanItem>,
    pub aggregate_impact: f64,
}

/// The plan's headline pick.
#[derive(Debug, Clone, Serialize)]
pub struct HighestImpact {
    pub id: String,
    pub reason: String,
}

/// An ordered set of tracks plus summary counts.
#[derive(Debug, Clone, Serialize, Default)]
pub struct ExecutionPlan {
    pub tracks: Vec<Track>,
    pub total_actionable: usize,
    pub total_blocked: usize,
    pub highest_impact: Option<HighestImpact>,
}

/// Builds the execution plan for a snapshot.
pub fn execution_plan(snapshot: &Snapshot, index: &ImpactIndex) -> ExecutionPlan {
    let graph = BlocksGraph::open_blocks(snapshot);
    let n = graph.len();

    // Forward walk from every actionable seed along blocker -> dependent
    // edges. An edge back onto the current stack is skipped, so cycles
    // cannot trap the walk.
    let mut collected = vec![false; n];
    for id in snapshot.actionable() {
        let Some(seed) = graph.index_of(id) else {
            continue;
        };
        if collected[seed as usize] {
            continue;
        }
        let mut on_stack = vec![false; n];
        let mut stack: Vec<(NodeIx, usize)> = vec![(seed, 0)];
        on_stack[seed as usize] = true;
        collected[seed as usize] = true;
        while let Some(top) = stack.len().checked_sub(1) {
            let (v, next) = stack[top];
            let dependents = graph.dependents_of(v);
            if next < dependents.len() {
                stack[top].1 += 1;
                let w = dependents[next];
                if on_stack[w as usize] {
                    continue;
                }
                collected[w as usize] = true;
                on_stack[w as usize] = true;
                stack.push((w, 0));
            } else {
                on_stack[v as usize] = false;
                stack.pop();
            }
        }
    }

    // Dependency depth within the collected set: blockers before dependents.
    let order = graph.topo_order();
    let mut depth = vec![0_usize; n];
    for &v in &order {
        if !collected[v as usize] {
            continue;
        }
        for &w in graph.dependents_of(v) {
            if collected[w as usize] {
                depth[w as usize] = depth[w as usize].max(depth[v as usize] + 1);
            }
        }
    }

    // Group the collected sub-DAG into weakly connected components.
    let mut tracks: Vec<Track> = graph
        .weak_components()
        .into_iter()
        .filter_map(|members| {
            let mut items: Vec<NodeIx> = members
                .into_iter()
                .filter(|&v| collected[v as usize])
                .collect();
            if items.is_empty() {
                return None;
            }
            items.sort_by(|&a, &b| {
                let (ia, ib) = (graph.id(a), graph.id(b));
                depth[a as usize]
                    .cmp(&depth[b as usize])
                    .then_with(|| priority_of(snapshot, ia).cmp(&priority_of(snapshot, ib)))
                    .then_with(|| {
                        index
                            .impact(ib)
                            .partial_cmp(&index.impact(ia))
                            .unwrap_or(std::cmp::Ordering::Equal)
                    })
                    .then_with(|| ia.cmp(ib))
            });

            let items: Vec<PlanItem> = items
                .into_iter()
                .map(|v| plan_item(snapshot, index, graph.id(v)))
                .collect();
            let aggregate_impact = items.iter().map(|item| item.impact_score).sum();
            Some(Track {
                name: String::new(),
                items,
                aggregate_impact,
            })
        })
        .collect();

    tracks.sort_by(|a, b| {
        b.aggregate_impact
            .partial_cmp(&a.aggregate_impact)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.items[0].id.cmp(&b.items[0].id))
    });
    for (at, track) in tracks.iter_mut().enumerate() {
        track.name = format!("Track {}", at + 1);
    }

    let highest_impact = tracks
        .iter()
        .flat_map(|track| &track.items)
        .max_by(|a, b| {
            a.impact_score
                .partial_cmp(&b.impact_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        })
        .map(|item| HighestImpact {
            id: item.id.clone(),
            reason: index
                .reasons(&item.id)
                .into_iter()
                .next()
                .unwrap_or_else(|| "Highest combined impact".to_string()),
        });

    ExecutionPlan {
        tracks,
        total_actionable: snapshot.actionable().len(),
        total_blocked: snapshot.blocked_count(),
        highest_impact,
    }
}

fn priority_of(snapshot: &Snapshot, id: &str) -> i64 {
    snapshot.get(id).map(|issue| issue.priority()).unwrap_or(4)
}

fn plan_item(snapshot: &Snapshot, index: &ImpactIndex, id: &str) -> PlanItem {
    let unblocks: Vec<String> = snapshot
        .reverse_blocks(id)
        .iter()
        .filter(|dep| {
            snapshot
                .get(dep)
                .map(|issue| !issue.is_closed() && !issue.status.is_tombstone())
                .unwrap_or(false)
        })
        .cloned()
        .collect();
    PlanItem {
        id: id.to_string(),
        title: snapshot
            .get(id)
            .map(|issue| issue.title.clone())
            .unwrap_or_default(),
        priority: priority_of(snapshot, id),
        impact_score: index.impact(id),
        unblocks,
    }
}

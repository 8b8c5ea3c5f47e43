//! Centrality metrics over the open-`blocks` subgraph.
//!
//! Both metrics run on the arena handles and tolerate cycles; callers
//! normalise with [`normalize_max`] before mixing them into scores.

use std::collections::VecDeque;

use super::{BlocksGraph, NodeIx};

const DAMPING: f64 = 0.85;
const MAX_ITERATIONS: usize = 50;
const EPSILON: f64 = 1e-6;

/// PageRank by power iteration. Rank flows from dependents to their
/// blockers, so issues many things transitively wait on score high.
/// Dangling mass is redistributed uniformly.
pub fn pagerank(graph: &BlocksGraph) -> Vec<f64> {
    let n = graph.len();
    if n == 0 {
        return Vec::new();
    }
    let uniform = 1.0 / n as f64;
    let mut rank = vec![uniform; n];
    let mut next = vec![0.0; n];

    for _ in 0..MAX_ITERATIONS {
        let mut dangling = 0.0;
        for v in 0..n {
            if graph.blockers_of(v as NodeIx).is_empty() {
                dangling += rank[v];
            }
        }
        let base = (1.0 - DAMPING) * uniform + DAMPING * dangling * uniform;
        next.iter_mut().for_each(|r| *r = base);
        for v in 0..n {
            let targets = graph.blockers_of(v as NodeIx);
            if targets.is_empty() {
                continue;
            }
            let share = DAMPING * rank[v] / targets.len() as f64;
            for &w in targets {
                next[w as usize] += share;
            }
        }
        let delta: f64 = rank
            .iter()
            .zip(&next)
            .map(|(a, b)| (a - b).abs())
            .sum();
        std::mem::swap(&mut rank, &mut next);
        if delta < EPSILON {
            break;
        }
    }
    rank
}

/// Brandes betweenness centrality for the unweighted directed graph.
pub fn betweenness(graph: &BlocksGraph) -> Vec<f64> {
    let n = graph.len();
    let mut centrality = vec![0.0; n];

    for source in 0..n as NodeIx {
        // Single-source shortest paths with path counting.
        let mut order: Vec<NodeIx> = Vec::with_capacity(n);
        let mut preds: Vec<Vec<NodeIx>> = vec![Vec::new(); n];
        let mut sigma = vec![0.0_f64; n];
        let mut dist = vec![-1_i64; n];
        sigma[source as usize] = 1.0;
        dist[source as usize] = 0;

        let mut queue = VecDeque::from([source]);
        while let Some(v) = queue.pop_front() {
            order.push(v);
            for &w in graph.blockers_of(v) {
                if dist[w as usize] < 0 {
                    dist[w as usize] = dist[v as usize] + 1;
                    queue.push_back(w);
                }
                if dist[w as usize] == dist[v as usize] + 1 {
                    sigma[w as usize] += sigma[v as usize];
                    preds[w as usize].push(v);
                }
            }
        }

        // Dependency accumulation in reverse BFS order.
        let mut delta = vec![0.0_f64; n];
        for &w in order.iter().rev() {
            for &v in &preds[w as usize] {
                delta[v as usize] +=
                    sigma[v as usize] / sigma[w as usize] * (1.0 + delta[w as usize]);
            }
            if w != source {
                centrality[w as usize] += delta[w as usize];
            }
        }
    }
    centrality
}

/// Scales values into [0, 1] by the maximum; all-zero stays all-zero.
pub fn normalize_max(values: &[f64]) -> Vec<f64> {
    let max = values.iter().cloned().fold(0.0_f64, f64::max);
    if max <= 0.0 {
        return vec![0.0; values.len()];
    }
    values.iter().map(|v| v / max).collect()
}

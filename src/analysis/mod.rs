//! Graph-theoretic analyses that drive recommendations.
//!
//! Phase-1 analysis (indices and the actionable set) runs inside the
//! pipeline build. Everything here is phase-2: computed on demand from an
//! immutable snapshot, never mutating it.

mod drift;
mod plan;
mod scoring;
mod triage;

pub use drift::{
    detect_drift, Baseline, DriftAlert, DriftReport, DriftSeverity, BASELINE_VERSION,
};
pub use plan::{execution_plan, ExecutionPlan, HighestImpact, PlanItem, Track};
pub use scoring::{priority_recommendations, ImpactIndex, IssueScore, PriorityRecommendation};
pub use triage::{
    triage, BlockedEntry, BlockerToClear, ProjectHealth, Recommendation, TriageOptions,
    TriageReport,
};

use std::panic::{self, AssertUnwindSafe};

use crate::error::{Phase, Result, ViewerError};

/// Runs an on-demand analysis inside the phase-2 recovery boundary: a panic
/// becomes a tagged error instead of taking down the caller.
pub fn guarded_phase2<T>(f: impl FnOnce() -> T) -> Result<T> {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(value) => Ok(value),
        Err(payload) => {
            let message = if let Some(msg) = payload.downcast_ref::<&str>() {
                (*msg).to_string()
            } else if let Some(msg) = payload.downcast_ref::<String>() {
                msg.clone()
            } else {
                "panic in analysis".to_string()
            };
            Err(ViewerError::Build {
                phase: Phase::AnalyzePhase2,
                message,
            })
        }
    }
}

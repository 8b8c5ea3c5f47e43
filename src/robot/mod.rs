//! Robot mode: structured JSON for automation.
//!
//! Every robot payload carries `generated_at` and `data_hash` so callers
//! can detect staleness. Field names are snake_case throughout.

mod graph_export;
mod hooks;
mod report;

pub use graph_export::{export_graph, GraphFormat};
pub use hooks::{run_export_hook, ExportHook, HookEnv};
pub use report::{
    drift_report, insights_report, next_report, plan_report, priority_report, triage_report,
    Report,
};

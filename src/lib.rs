//! # Beadview - Core Engine for the `bv` Issue Viewer
//!
//! Beadview ingests a project's append-only issue log (line-delimited JSON
//! under `.beads/`) and serves it to interactive views and robot commands
//! through immutable snapshots, graph analysis, multi-repo workspaces, and
//! version-control time travel.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use beadview::pipeline::{Pipeline, PipelineConfig};
//!
//! let (pipeline, events) =
//!     Pipeline::spawn(PipelineConfig::new(".beads/issues.jsonl"))?;
//! pipeline.trigger();
//! let _ = events.recv();
//! if let Some(snapshot) = pipeline.current() {
//!     for id in snapshot.actionable() {
//!         println!("ready: {id}");
//!     }
//! }
//! # Ok::<(), beadview::ViewerError>(())
//! ```
//!
//! ## Architecture
//!
//! - **Loader**: tolerant JSONL parsing plus a content hash for dedup
//! - **Snapshot**: immutable published view with precomputed indices
//! - **Pipeline**: background worker with debounced watching and panic
//!   isolation
//! - **Graph/Analysis**: arena graph, centrality metrics, execution plan,
//!   triage, drift
//! - **Workspace**: multi-repo aggregation under namespaced IDs
//! - **History**: revision-pinned snapshots and structural diffs
//! - **Robot**: structured JSON reports for automation

pub mod analysis;
pub mod error;
pub mod filter;
pub mod graph;
pub mod history;
pub mod loader;
pub mod logging;
pub mod model;
pub mod pipeline;
pub mod robot;
pub mod snapshot;
pub mod treestate;
pub mod workspace;

// Re-export the main public API
pub use crate::error::{Phase, Result, ViewerError};
pub use crate::model::{Comment, DepType, Dependency, Issue, IssueType, Status};
pub use crate::pipeline::{LastError, Pipeline, PipelineConfig, PipelineEvent};
pub use crate::snapshot::{Snapshot, SnapshotStore};

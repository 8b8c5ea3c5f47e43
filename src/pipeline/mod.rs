//! The snapshot pipeline: a background worker that watches the issue log,
//! debounces filesystem events, dedups unchanged content by hash, and
//! publishes immutable snapshots off the consumer thread with panic
//! isolation and error accounting.

mod watcher;
mod worker;

pub use watcher::LogWatcher;
pub use worker::{LastError, Pipeline, PipelineConfig, PipelineEvent, WorkerPhase};

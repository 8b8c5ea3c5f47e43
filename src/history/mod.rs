//! Time travel: snapshots at past revisions and diffs between snapshots.

mod diff;
mod git;

pub use diff::{graph_diff, GraphDiff};
pub use git::{log_bytes_at, log_relpath, resolve_revision, snapshot_at};

//! Immutable snapshots of the issue log and their derived indices.
//!
//! A [`Snapshot`] is the unit of publication: one reference swap makes a
//! fully built view visible to every reader. Snapshots are never mutated
//! after construction and are always handed out as `Arc<Snapshot>`; readers
//! may hold a reference indefinitely.

mod indices;
mod store;
mod tree;

pub use store::SnapshotStore;
pub use tree::{TreeRow, TreeView};

use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::error::Result;
use crate::loader::{self, ParseStats};
use crate::model::Issue;

/// An immutable, published view of the issue set with derived indices.
#[derive(Debug)]
pub struct Snapshot {
    issues: Vec<Issue>,
    by_id: FxHashMap<String, usize>,
    reverse_blocks: FxHashMap<String, Vec<String>>,
    children: FxHashMap<String, Vec<String>>,
    actionable: FxHashSet<String>,
    roots: Vec<String>,
    hash: u64,
    built_at: DateTime<Utc>,
    stats: ParseStats,
}

impl Snapshot {
    /// Builds a snapshot from parsed issues. Indices are constructed from
    /// scratch; nothing is shared with any prior snapshot.
    pub fn build(issues: Vec<Issue>, hash: u64, stats: ParseStats) -> Snapshot {
        let built = indices::build(&issues);
        Snapshot {
            issues,
            by_id: built.by_id,
            reverse_blocks: built.reverse_blocks,
            children: built.children,
            actionable: built.actionable,
            roots: built.roots,
            hash,
            built_at: Utc::now(),
            stats,
        }
    }

    /// One-shot load: read, hash, parse, index. Used by robot commands and
    /// history loading; the live pipeline drives the same primitives.
    pub fn load(path: &Path) -> Result<Arc<Snapshot>> {
        let bytes = loader::read_log(path)?;
        let hash = loader::content_hash(&bytes);
        let parsed = loader::parse_log(&bytes);
        Ok(Arc::new(Snapshot::build(parsed.issues, hash, parsed.stats)))
    }

    /// Builds a snapshot directly from in-memory bytes.
    pub fn from_bytes(bytes: &[u8]) -> Snapshot {
        let hash = loader::content_hash(bytes);
        let parsed = loader::parse_log(bytes);
        Snapshot::build(parsed.issues, hash, parsed.stats)
    }

    pub fn issues(&self) -> &[Issue] {
        &self.issues
    }

    pub fn len(&self) -> usize {
        self.issues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Issue> {
        self.by_id.get(id).map(|&at| &self.issues[at])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.by_id.contains_key(id)
    }

    /// Issues that participate in analysis: tombstones are deletion markers
    /// and are excluded.
    pub fn analyzable(&self) -> impl Iterator<Item = &Issue> {
        self.issues
            .iter()
            .filter(|issue| !issue.status.is_tombstone())
    }

    /// Non-closed, non-tombstone issues.
    pub fn open_issues(&self) -> impl Iterator<Item = &Issue> {
        self.analyzable().filter(|issue| !issue.is_closed())
    }

    /// IDs of issues that declare a `blocks` dependency on `id`, in issue
    /// order ("completing `id` unblocks these").
    pub fn reverse_blocks(&self, id: &str) -> &[String] {
        self.reverse_blocks
            .get(id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Child IDs of a `parent-child` target, sorted by the child ordering
    /// contract.
    pub fn children(&self, id: &str) -> &[String] {
        self.children.get(id).map(Vec::as_slice).unwrap_or_default()
    }

    /// The actionable set: open and not blocked by any present, open
    /// `blocks` target. Dangling blockers do not block.
    pub fn actionable(&self) -> &FxHashSet<String> {
        &self.actionable
    }

    pub fn is_actionable(&self, id: &str) -> bool {
        self.actionable.contains(id)
    }

    /// Tree roots: analyzable issues with no present parent. A pure parent
    /// cycle yields zero roots.
    pub fn roots(&self) -> &[String] {
        &self.roots
    }

    /// Content hash of the source bytes this snapshot was built from.
    pub fn hash(&self) -> u64 {
        self.hash
    }

    /// The hash in the 16-hex-digit form robot payloads carry.
    pub fn hash_string(&self) -> String {
        loader::format_hash(self.hash)
    }

    pub fn built_at(&self) -> DateTime<Utc> {
        self.built_at
    }

    pub fn parse_stats(&self) -> ParseStats {
        self.stats
    }

    /// Open issues blocked by at least one present, open blocker.
    pub fn blocked_count(&self) -> usize {
        self.open_issues()
            .filter(|issue| !self.actionable.contains(&issue.id))
            .count()
    }
}

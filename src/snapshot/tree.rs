//! Hierarchy view data: depth-annotated rows from the parent/child index.
//!
//! The tree is derived data for renderers; building it never mutates the
//! snapshot. Flattening honours expand/collapse overrides and is cycle-safe:
//! a child already on the current path is not descended into again.

use serde::Serialize;

use rustc_hash::FxHashSet;

use crate::treestate::TreeState;

use super::Snapshot;

/// One visible row of the flattened tree.
#[derive(Debug, Clone, Serialize)]
pub struct TreeRow {
    pub id: String,
    pub depth: usize,
    pub has_children: bool,
    pub expanded: bool,
}

/// The flattened hierarchy of a snapshot.
#[derive(Debug, Clone, Serialize, Default)]
pub struct TreeView {
    pub roots: Vec<String>,
    pub rows: Vec<TreeRow>,
}

impl TreeView {
    /// Flattens the snapshot's hierarchy into rows, descending only into
    /// expanded nodes. `default_expanded` is the view default; `state`
    /// carries the persisted overrides.
    pub fn build(snapshot: &Snapshot, state: &TreeState, default_expanded: bool) -> TreeView {
        let mut rows = Vec::with_capacity(snapshot.len());
        let mut on_path = FxHashSet::default();
        for root in snapshot.roots() {
            push_subtree(snapshot, state, default_expanded, root, 0, &mut on_path, &mut rows);
        }
        TreeView {
            roots: snapshot.roots().to_vec(),
            rows,
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

fn push_subtree(
    snapshot: &Snapshot,
    state: &TreeState,
    default_expanded: bool,
    id: &str,
    depth: usize,
    on_path: &mut FxHashSet<String>,
    rows: &mut Vec<TreeRow>,
) {
    let children = snapshot.children(id);
    let expanded = state.is_expanded(id, default_expanded);
    rows.push(TreeRow {
        id: id.to_string(),
        depth,
        has_children: !children.is_empty(),
        expanded,
    });
    if !expanded || children.is_empty() {
        return;
    }
    if !on_path.insert(id.to_string()) {
        return;
    }
    for child in children {
        // A cycle brings a child back onto the current path; stop there.
        if on_path.contains(child) {
            continue;
        }
        push_subtree(snapshot, state, default_expanded, child, depth + 1, on_path, rows);
    }
    on_path.remove(id);
}

//! Index construction. Rebuilt from scratch per snapshot, never mutated
//! incrementally.

use rustc_hash::{FxHashMap, FxHashSet};

use crate::model::{DepType, Issue};

pub(super) struct BuiltIndices {
    pub by_id: FxHashMap<String, usize>,
    pub reverse_blocks: FxHashMap<String, Vec<String>>,
    pub children: FxHashMap<String, Vec<String>>,
    pub actionable: FxHashSet<String>,
    pub roots: Vec<String>,
}

pub(super) fn build(issues: &[Issue]) -> BuiltIndices {
    let mut by_id = FxHashMap::default();
    by_id.reserve(issues.len());
    for (at, issue) in issues.iter().enumerate() {
        by_id.insert(issue.id.clone(), at);
    }

    let mut reverse_blocks: FxHashMap<String, Vec<String>> = FxHashMap::default();
    let mut children: FxHashMap<String, Vec<String>> = FxHashMap::default();

    for issue in issues {
        if issue.status.is_tombstone() {
            continue;
        }
        for dep in &issue.dependencies {
            match dep.dep_type {
                DepType::Blocks => {
                    reverse_blocks
                        .entry(dep.depends_on_id.clone())
                        .or_default()
                        .push(issue.id.clone());
                }
                DepType::ParentChild => {
                    children
                        .entry(dep.depends_on_id.clone())
                        .or_default()
                        .push(issue.id.clone());
                }
                DepType::Related | DepType::DiscoveredFrom => {}
            }
        }
    }

    for kids in children.values_mut() {
        kids.sort_by(|a, b| {
            let ia = by_id.get(a).map(|&at| &issues[at]);
            let ib = by_id.get(b).map(|&at| &issues[at]);
            match (ia, ib) {
                (Some(ia), Some(ib)) => ia.cmp_children(ib).then_with(|| ia.id.cmp(&ib.id)),
                _ => a.cmp(b),
            }
        });
    }

    let blocker_is_open = |id: &str| -> bool {
        by_id
            .get(id)
            .map(|&at| {
                let target = &issues[at];
                !target.is_closed() && !target.status.is_tombstone()
            })
            .unwrap_or(false)
    };

    let mut actionable = FxHashSet::default();
    let mut roots = Vec::new();
    for issue in issues {
        if issue.status.is_tombstone() {
            continue;
        }
        if !issue.is_closed() {
            let blocked = issue
                .deps_of(DepType::Blocks)
                .any(|dep| blocker_is_open(&dep.depends_on_id));
            if !blocked {
                actionable.insert(issue.id.clone());
            }
        }
        let has_present_parent = issue
            .deps_of(DepType::ParentChild)
            .any(|dep| by_id.contains_key(&dep.depends_on_id));
        if !has_present_parent {
            roots.push(issue.id.clone());
        }
    }

    BuiltIndices {
        by_id,
        reverse_blocks,
        children,
        actionable,
        roots,
    }
}

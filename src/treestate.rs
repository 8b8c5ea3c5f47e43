//! Persistence of tree expand/collapse overrides.
//!
//! Only non-default overrides are stored. Unknown IDs are ignored on load
//! so that state files survive issue-log churn.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, ViewerError};
use crate::snapshot::Snapshot;

/// Tree state file schema version.
pub const TREE_STATE_VERSION: u32 = 1;

/// Expand/collapse overrides keyed by issue ID.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeState {
    pub version: u32,
    #[serde(default)]
    pub expanded: BTreeMap<String, bool>,
}

impl Default for TreeState {
    fn default() -> Self {
        TreeState {
            version: TREE_STATE_VERSION,
            expanded: BTreeMap::new(),
        }
    }
}

impl TreeState {
    /// Loads the state file; a missing file is an empty state.
    pub fn load(path: &Path) -> Result<TreeState> {
        let bytes = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Ok(TreeState::default())
            }
            Err(err) => return Err(err.into()),
        };
        let state: TreeState = serde_json::from_slice(&bytes)?;
        Ok(state)
    }

    /// Drops overrides for IDs not present in the snapshot.
    pub fn retain_known(&mut self, snapshot: &Snapshot) {
        self.expanded.retain(|id, _| snapshot.contains(id));
    }

    /// The effective expansion of an issue given the view default.
    pub fn is_expanded(&self, id: &str, default_expanded: bool) -> bool {
        self.expanded.get(id).copied().unwrap_or(default_expanded)
    }

    /// Records an override; matching the default removes it.
    pub fn set(&mut self, id: impl Into<String>, expanded: bool, default_expanded: bool) {
        let id = id.into();
        if expanded == default_expanded {
            self.expanded.remove(&id);
        } else {
            self.expanded.insert(id, expanded);
        }
    }

    /// Atomic write via tempfile + rename.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        serde_json::to_writer(&mut tmp, self)?;
        tmp.write_all(b"\n")?;
        tmp.persist(path).map_err(|err| ViewerError::Io(err.error))?;
        Ok(())
    }
}

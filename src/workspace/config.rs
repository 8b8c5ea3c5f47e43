//! Workspace configuration, consumed from YAML.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, ViewerError};

/// Depth limit applied when the config does not set one.
pub const DEFAULT_CONFIG_DEPTH: usize = 2;

fn default_true() -> bool {
    true
}

fn default_max_depth() -> usize {
    DEFAULT_CONFIG_DEPTH
}

fn default_exclude() -> Vec<String> {
    [".git", "node_modules", "target", "dist"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

/// One configured repository.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepoEntry {
    pub name: String,
    pub path: PathBuf,
    #[serde(default)]
    pub prefix: Option<String>,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub beads_path: Option<PathBuf>,
}

/// Automatic repository discovery settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub patterns: Vec<String>,
    #[serde(default = "default_exclude")]
    pub exclude: Vec<String>,
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        DiscoveryConfig {
            enabled: false,
            patterns: Vec::new(),
            exclude: default_exclude(),
            max_depth: default_max_depth(),
        }
    }
}

/// Workspace-wide defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkspaceDefaults {
    #[serde(default)]
    pub beads_path: Option<PathBuf>,
}

/// The full workspace config object.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkspaceConfig {
    #[serde(default)]
    pub repos: Vec<RepoEntry>,
    #[serde(default)]
    pub discovery: DiscoveryConfig,
    #[serde(default)]
    pub defaults: WorkspaceDefaults,
}

impl WorkspaceConfig {
    /// Loads and syntactically validates a YAML config file. Fatal at
    /// startup on malformed content.
    pub fn load(path: &Path) -> Result<WorkspaceConfig> {
        let bytes = std::fs::read(path).map_err(|err| {
            ViewerError::Config(format!("cannot read {}: {err}", path.display()))
        })?;
        let config: WorkspaceConfig = serde_yaml::from_slice(&bytes)?;
        config.validate()?;
        Ok(config)
    }

    /// Structural validation: paths present, prefixes unique.
    pub fn validate(&self) -> Result<()> {
        let mut seen = std::collections::BTreeSet::new();
        for repo in &self.repos {
            if repo.name.is_empty() {
                return Err(ViewerError::Config("repo with empty name".into()));
            }
            if repo.path.as_os_str().is_empty() {
                return Err(ViewerError::Config(format!(
                    "repo {} has no path",
                    repo.name
                )));
            }
            let prefix = repo.effective_prefix();
            if !seen.insert(prefix.clone()) {
                return Err(ViewerError::Config(format!(
                    "duplicate prefix {prefix:?}"
                )));
            }
        }
        Ok(())
    }
}

impl RepoEntry {
    /// The namespace prefix: explicit, or the lowercased name followed by
    /// a dash.
    pub fn effective_prefix(&self) -> String {
        match &self.prefix {
            Some(prefix) => prefix.clone(),
            None => format!("{}-", self.name.to_lowercase()),
        }
    }
}

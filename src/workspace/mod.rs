//! Multi-repository workspaces.
//!
//! A workspace exposes several repositories, each with its own `.beads/`
//! log, as one logical issue space under namespaced IDs. One pipeline per
//! repo runs in parallel; the aggregate is recomputed on the consumer's
//! request rather than per-event.

mod aggregate;
mod config;
mod discovery;
mod resolver;

pub use aggregate::aggregate_snapshots;
pub use config::{
    DiscoveryConfig, RepoEntry, WorkspaceConfig, WorkspaceDefaults, DEFAULT_CONFIG_DEPTH,
};
pub use discovery::{discover_repos, find_log, DEFAULT_SCAN_DEPTH};
pub use resolver::IdResolver;

use std::path::{Path, PathBuf};
use std::sync::mpsc::Receiver;
use std::sync::Arc;

use tracing::info;

use crate::error::{Result, ViewerError};
use crate::pipeline::{Pipeline, PipelineConfig, PipelineEvent};
use crate::snapshot::Snapshot;

/// A resolved repository: config entry plus its located log.
#[derive(Debug, Clone)]
pub struct RepoHandle {
    pub name: String,
    pub path: PathBuf,
    pub prefix: String,
    pub log_path: PathBuf,
}

/// Resolves config entries (plus discovery) into repo handles. Disabled
/// repos are dropped; a missing log is a config error for explicit entries.
pub fn resolve_repos(config: &WorkspaceConfig, base: &Path) -> Result<Vec<RepoHandle>> {
    config.validate()?;
    let mut entries: Vec<RepoEntry> = config
        .repos
        .iter()
        .filter(|entry| entry.enabled)
        .cloned()
        .collect();
    if config.discovery.enabled {
        let discovered = discover_repos(&[base.to_path_buf()], &config.discovery);
        let known: Vec<PathBuf> = entries
            .iter()
            .map(|entry| absolutize(base, &entry.path))
            .collect();
        entries.extend(
            discovered
                .into_iter()
                .filter(|entry| !known.contains(&absolutize(base, &entry.path))),
        );
    }

    let mut handles = Vec::with_capacity(entries.len());
    let mut prefixes = std::collections::BTreeSet::new();
    for entry in entries {
        let path = absolutize(base, &entry.path);
        let log_path = entry
            .beads_path
            .as_ref()
            .map(|rel| if rel.is_absolute() { rel.clone() } else { path.join(rel) })
            .or_else(|| {
                config
                    .defaults
                    .beads_path
                    .as_ref()
                    .map(|rel| path.join(rel))
            })
            .or_else(|| find_log(&path.join(".beads")))
            .ok_or_else(|| {
                ViewerError::Config(format!("repo {} has no issue log", entry.name))
            })?;
        let prefix = entry.effective_prefix();
        if !prefixes.insert(prefix.clone()) {
            return Err(ViewerError::Config(format!("duplicate prefix {prefix:?}")));
        }
        handles.push(RepoHandle {
            name: entry.name,
            path,
            prefix,
            log_path,
        });
    }
    Ok(handles)
}

fn absolutize(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

/// One-shot synchronous load of the aggregate snapshot.
pub fn load_aggregate(repos: &[RepoHandle]) -> Result<Arc<Snapshot>> {
    let mut parts = Vec::with_capacity(repos.len());
    for repo in repos {
        let snapshot = Snapshot::load(&repo.log_path)?;
        parts.push((repo.prefix.clone(), snapshot));
    }
    Ok(Arc::new(aggregate_snapshots(&parts)))
}

/// A live workspace: one snapshot pipeline per repo.
pub struct Workspace {
    repos: Vec<RepoHandle>,
    pipelines: Vec<Pipeline>,
    events: Vec<(String, Receiver<PipelineEvent>)>,
    resolver: IdResolver,
}

impl Workspace {
    /// Spawns one pipeline per repo handle and triggers initial builds.
    pub fn open(repos: Vec<RepoHandle>) -> Result<Workspace> {
        let prefixes: Vec<String> = repos.iter().map(|r| r.prefix.clone()).collect();
        let current = prefixes.first().cloned().unwrap_or_default();
        let mut pipelines = Vec::with_capacity(repos.len());
        let mut events = Vec::with_capacity(repos.len());
        for repo in &repos {
            let (pipeline, rx) = Pipeline::spawn(PipelineConfig::new(&repo.log_path))?;
            pipeline.trigger();
            pipelines.push(pipeline);
            events.push((repo.name.clone(), rx));
        }
        info!(repos = repos.len(), "workspace.opened");
        Ok(Workspace {
            repos,
            pipelines,
            events,
            resolver: IdResolver::new(prefixes, current),
        })
    }

    pub fn repos(&self) -> &[RepoHandle] {
        &self.repos
    }

    pub fn resolver(&self) -> &IdResolver {
        &self.resolver
    }

    /// Asks every pipeline for a refresh. Coalescing applies per repo.
    pub fn refresh(&self) {
        for pipeline in &self.pipelines {
            pipeline.trigger();
        }
    }

    /// Drains pending per-repo notifications without blocking.
    pub fn drain_events(&self) -> Vec<(String, PipelineEvent)> {
        let mut drained = Vec::new();
        for (name, rx) in &self.events {
            while let Ok(event) = rx.try_recv() {
                drained.push((name.clone(), event));
            }
        }
        drained
    }

    /// Recomputes the aggregate from whatever snapshots are currently
    /// published. Repos that have not built yet contribute nothing; returns
    /// `None` when no repo has published.
    pub fn aggregate(&self) -> Option<Arc<Snapshot>> {
        let parts: Vec<(String, Arc<Snapshot>)> = self
            .repos
            .iter()
            .zip(&self.pipelines)
            .filter_map(|(repo, pipeline)| {
                pipeline.current().map(|snap| (repo.prefix.clone(), snap))
            })
            .collect();
        if parts.is_empty() {
            return None;
        }
        Some(Arc::new(aggregate_snapshots(&parts)))
    }

    pub fn shutdown(&mut self) {
        for pipeline in &mut self.pipelines {
            pipeline.shutdown();
        }
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        self.shutdown();
    }
}

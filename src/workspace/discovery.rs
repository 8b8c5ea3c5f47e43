//! Repository discovery: scan roots for `.beads/` logs.

use std::path::{Path, PathBuf};

use tracing::debug;
use walkdir::WalkDir;

use crate::loader;

use super::config::{DiscoveryConfig, RepoEntry};

/// Depth limit when scanning without an explicit config.
pub const DEFAULT_SCAN_DEPTH: usize = 3;

/// Walks the scan roots to the configured depth and returns entries for
/// every qualifying repository. A repository qualifies only if its log
/// parses into at least one valid issue.
pub fn discover_repos(roots: &[PathBuf], config: &DiscoveryConfig) -> Vec<RepoEntry> {
    let max_depth = if config.max_depth == 0 {
        DEFAULT_SCAN_DEPTH
    } else {
        config.max_depth
    };

    let mut found = Vec::new();
    for root in roots {
        for entry in WalkDir::new(root)
            .max_depth(max_depth)
            .follow_links(false)
            .into_iter()
            .filter_entry(|entry| keep_dir(entry, config))
        {
            let Ok(entry) = entry else { continue };
            if !entry.file_type().is_dir() || entry.file_name() != ".beads" {
                continue;
            }
            let repo_dir = match entry.path().parent() {
                Some(parent) => parent.to_path_buf(),
                None => continue,
            };
            let Some(log) = find_log(entry.path()) else {
                continue;
            };
            if !log_qualifies(&log) {
                debug!(log = %log.display(), "discovery.skip_empty_log");
                continue;
            }
            let name = repo_dir
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| "repo".to_string());
            if !matches_patterns(&name, &config.patterns) {
                continue;
            }
            debug!(repo = %repo_dir.display(), "discovery.found");
            found.push(RepoEntry {
                name,
                path: repo_dir,
                prefix: None,
                enabled: true,
                beads_path: Some(log),
            });
        }
    }
    found.sort_by(|a, b| a.name.cmp(&b.name));
    found
}

/// Finds the issue log inside a `.beads` directory: the first `.jsonl`
/// file in name order.
pub fn find_log(beads_dir: &Path) -> Option<PathBuf> {
    let mut logs: Vec<PathBuf> = std::fs::read_dir(beads_dir)
        .ok()?
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "jsonl"))
        .collect();
    logs.sort();
    logs.into_iter().next()
}

fn log_qualifies(log: &Path) -> bool {
    loader::read_log(log)
        .map(|bytes| !loader::parse_log(&bytes).issues.is_empty())
        .unwrap_or(false)
}

fn keep_dir(entry: &walkdir::DirEntry, config: &DiscoveryConfig) -> bool {
    // The scan root itself is always visited.
    if entry.depth() == 0 {
        return true;
    }
    let Some(name) = entry.file_name().to_str() else {
        return true;
    };
    // Dot-directories are skipped, except the .beads target itself.
    if name.starts_with('.') && name != ".beads" {
        return false;
    }
    !config.exclude.iter().any(|excluded| excluded == name)
}

fn matches_patterns(name: &str, patterns: &[String]) -> bool {
    if patterns.is_empty() {
        return true;
    }
    patterns.iter().any(|pattern| {
        match pattern.strip_suffix('*') {
            Some(prefix) => name.starts_with(prefix),
            None => name == pattern,
        }
    })
}

//! Revision-pinned log loading.
//!
//! The bytes are retrieved through the host version-control system without
//! touching the working tree; the snapshot is then built through the same
//! loader primitives as a live build.

use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;

use chrono::NaiveDate;
use tracing::debug;

use crate::error::{Result, ViewerError};
use crate::snapshot::Snapshot;
use crate::workspace::find_log;

/// Resolves a revision identifier (SHA, branch, tag, or `YYYY-MM-DD` date)
/// to a commit SHA.
pub fn resolve_revision(repo: &Path, revision: &str) -> Result<String> {
    // Date-looking revisions pick the last commit at or before that day.
    if NaiveDate::parse_from_str(revision, "%Y-%m-%d").is_ok() {
        let output = git(repo, &["rev-list", "-1", &format!("--before={revision} 23:59:59"), "HEAD"])?;
        let sha = output.trim().to_string();
        if sha.is_empty() {
            return Err(ViewerError::History(format!(
                "no commit found at or before {revision}"
            )));
        }
        return Ok(sha);
    }
    let output = git(repo, &["rev-parse", "--verify", &format!("{revision}^{{commit}}")])?;
    Ok(output.trim().to_string())
}

/// The issue log's path relative to the repository root.
pub fn log_relpath(repo: &Path) -> Result<PathBuf> {
    let log = find_log(&repo.join(".beads"))
        .ok_or(ViewerError::NotFound("issue log"))?;
    log.strip_prefix(repo)
        .map(Path::to_path_buf)
        .map_err(|_| ViewerError::History("issue log is outside the repository".into()))
}

/// Reads the issue log bytes as they were at `revision`.
pub fn log_bytes_at(repo: &Path, revision: &str, relpath: &Path) -> Result<Vec<u8>> {
    let sha = resolve_revision(repo, revision)?;
    let spec = format!("{sha}:{}", relpath.display());
    debug!(spec = %spec, "history.show");
    git_bytes(repo, &["show", &spec])
}

/// Builds a read-only snapshot of the log at `revision`.
pub fn snapshot_at(repo: &Path, revision: &str) -> Result<Arc<Snapshot>> {
    let relpath = log_relpath(repo)?;
    let bytes = log_bytes_at(repo, revision, &relpath)?;
    Ok(Arc::new(Snapshot::from_bytes(&bytes)))
}

fn git(repo: &Path, args: &[&str]) -> Result<String> {
    let bytes = git_bytes(repo, args)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn git_bytes(repo: &Path, args: &[&str]) -> Result<Vec<u8>> {
    let output = Command::new("git")
        .arg("-C")
        .arg(repo)
        .args(args)
        .output()
        .map_err(|err| ViewerError::History(format!("cannot run git: {err}")))?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(ViewerError::History(stderr.trim().to_string()));
    }
    Ok(output.stdout)
}

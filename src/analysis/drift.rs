//! Baseline capture and drift detection.
//!
//! A baseline is a persisted subset of metrics from a prior snapshot, keyed
//! by a user-annotated revision string. Drift compares the live snapshot
//! against it and escalates through `info`, `warning`, and `critical`; the
//! overall severity drives the CLI exit-code contract.

use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, ViewerError};
use crate::graph::{betweenness, pagerank, BlocksGraph};
use crate::snapshot::Snapshot;

/// Baseline file schema version.
pub const BASELINE_VERSION: u32 = 1;

/// New blocked issues beyond this delta (or +50%) raise a warning.
const BLOCKED_SPIKE_FLOOR: f64 = 5.0;
/// Additional direct dependents on the heaviest blocker that raise a warning.
const BLOCKER_SPIKE_FLOOR: f64 = 3.0;
/// Density change worth an informational alert.
const DENSITY_SHIFT: f64 = 0.1;
/// Relative centrality growth that raises a warning.
const CENTRALITY_SPIKE_RATIO: f64 = 1.5;

/// Persisted metric snapshot for drift comparison.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Baseline {
    pub version: u32,
    pub saved_at: DateTime<Utc>,
    /// Opaque user annotation, typically a VCS revision.
    pub revision: String,
    pub metrics: BTreeMap<String, f64>,
    #[serde(alias = "Cycles", alias = "cycles")]
    pub cycles_present: bool,
    pub status_counts: BTreeMap<String, u64>,
}

impl Baseline {
    /// Captures the drift-relevant metrics of a snapshot.
    pub fn capture(snapshot: &Snapshot, revision: impl Into<String>) -> Baseline {
        let graph = BlocksGraph::open_blocks(snapshot);
        let max_pagerank = pagerank(&graph).into_iter().fold(0.0_f64, f64::max);
        let max_betweenness = betweenness(&graph).into_iter().fold(0.0_f64, f64::max);
        let max_blockers = (0..graph.len())
            .map(|v| graph.dependents_of(v as u32).len())
            .max()
            .unwrap_or(0);

        let mut metrics = BTreeMap::new();
        metrics.insert("issue_count".into(), snapshot.len() as f64);
        metrics.insert(
            "open_count".into(),
            snapshot.open_issues().count() as f64,
        );
        metrics.insert("blocked_count".into(), snapshot.blocked_count() as f64);
        metrics.insert(
            "actionable_count".into(),
            snapshot.actionable().len() as f64,
        );
        metrics.insert("edge_count".into(), graph.edge_count() as f64);
        metrics.insert("density".into(), graph.density());
        metrics.insert("max_pagerank".into(), max_pagerank);
        metrics.insert("max_betweenness".into(), max_betweenness);
        metrics.insert("max_blocker_count".into(), max_blockers as f64);

        let mut status_counts = BTreeMap::new();
        for issue in snapshot.analyzable() {
            *status_counts
                .entry(issue.status.as_str().to_string())
                .or_default() += 1;
        }

        Baseline {
            version: BASELINE_VERSION,
            saved_at: Utc::now(),
            revision: revision.into(),
            metrics,
            cycles_present: graph.has_cycle(),
            status_counts,
        }
    }

    /// Default location under the repository root.
    pub fn default_path(repo: &Path) -> PathBuf {
        repo.join(".bv").join("baseline.json")
    }

    pub fn load(path: &Path) -> Result<Baseline> {
        let bytes = fs::read(path)?;
        let baseline: Baseline = serde_json::from_slice(&bytes)?;
        if baseline.version > BASELINE_VERSION {
            return Err(ViewerError::Config(format!(
                "baseline schema version {} is newer than supported {}",
                baseline.version, BASELINE_VERSION
            )));
        }
        Ok(baseline)
    }

    /// Read-modify-write under an OS file lock where available; without it
    /// last-writer-wins is acceptable (baselines are user-initiated). The
    /// write itself is atomic via tempfile + rename.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        let lock = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(path)?;
        lock.lock_exclusive()?;

        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        serde_json::to_writer_pretty(&mut tmp, self)?;
        tmp.write_all(b"\n")?;
        tmp.persist(path)
            .map_err(|err| ViewerError::Io(err.error))?;

        let _ = fs2::FileExt::unlock(&lock);
        debug!(path = %path.display(), revision = %self.revision, "baseline.saved");
        Ok(())
    }
}

/// Overall drift severity, escalating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriftSeverity {
    None,
    Info,
    Warning,
    Critical,
}

impl DriftSeverity {
    pub fn as_str(self) -> &'static str {
        match self {
            DriftSeverity::None => "none",
            DriftSeverity::Info => "info",
            DriftSeverity::Warning => "warning",
            DriftSeverity::Critical => "critical",
        }
    }

    /// The process exit code contract: critical is 1, warning is 2.
    pub fn exit_code(self) -> i32 {
        match self {
            DriftSeverity::Critical => 1,
            DriftSeverity::Warning => 2,
            DriftSeverity::None | DriftSeverity::Info => 0,
        }
    }
}

/// One detected drift condition.
#[derive(Debug, Clone, Serialize)]
pub struct DriftAlert {
    pub kind: String,
    pub severity: DriftSeverity,
    pub message: String,
}

/// The drift comparison result.
#[derive(Debug, Clone, Serialize)]
pub struct DriftReport {
    pub severity: DriftSeverity,
    pub alerts: Vec<DriftAlert>,
    pub deltas: BTreeMap<String, f64>,
}

/// Compares a snapshot against a stored baseline. Deterministic: identical
/// inputs always produce the same severity and alerts.
pub fn detect_drift(baseline: &Baseline, snapshot: &Snapshot) -> DriftReport {
    let current = Baseline::capture(snapshot, baseline.revision.clone());
    let mut alerts = Vec::new();

    let mut deltas = BTreeMap::new();
    for (key, now) in &current.metrics {
        let before = baseline.metrics.get(key).copied().unwrap_or(0.0);
        deltas.insert(key.clone(), now - before);
    }

    if current.cycles_present && !baseline.cycles_present {
        alerts.push(DriftAlert {
            kind: "new_cycle".into(),
            severity: DriftSeverity::Critical,
            message: "dependency cycle introduced since baseline".into(),
        });
    } else if !current.cycles_present && baseline.cycles_present {
        alerts.push(DriftAlert {
            kind: "cycles_resolved".into(),
            severity: DriftSeverity::Info,
            message: "dependency cycles present at baseline are resolved".into(),
        });
    }

    let blocked_before = baseline.metrics.get("blocked_count").copied().unwrap_or(0.0);
    let blocked_delta = deltas.get("blocked_count").copied().unwrap_or(0.0);
    if blocked_delta >= BLOCKED_SPIKE_FLOOR.max(0.5 * blocked_before) {
        alerts.push(DriftAlert {
            kind: "blocker_spike".into(),
            severity: DriftSeverity::Warning,
            message: format!(
                "blocked issues rose from {} to {}",
                blocked_before,
                blocked_before + blocked_delta
            ),
        });
    }

    let heaviest_delta = deltas.get("max_blocker_count").copied().unwrap_or(0.0);
    if heaviest_delta >= BLOCKER_SPIKE_FLOOR {
        alerts.push(DriftAlert {
            kind: "blocker_spike".into(),
            severity: DriftSeverity::Warning,
            message: format!(
                "heaviest blocker gained {heaviest_delta} direct dependents"
            ),
        });
    }

    for key in ["max_pagerank", "max_betweenness"] {
        let before = baseline.metrics.get(key).copied().unwrap_or(0.0);
        let now = current.metrics.get(key).copied().unwrap_or(0.0);
        if before > 0.0 && now > before * CENTRALITY_SPIKE_RATIO {
            alerts.push(DriftAlert {
                kind: "centrality_shift".into(),
                severity: DriftSeverity::Warning,
                message: format!("{key} grew from {before:.3} to {now:.3}"),
            });
        }
    }

    let density_delta = deltas.get("density").copied().unwrap_or(0.0);
    if density_delta.abs() >= DENSITY_SHIFT {
        alerts.push(DriftAlert {
            kind: "density_change".into(),
            severity: DriftSeverity::Info,
            message: format!("graph density changed by {density_delta:+.3}"),
        });
    }

    let severity = alerts
        .iter()
        .map(|alert| alert.severity)
        .max()
        .unwrap_or(DriftSeverity::None);

    DriftReport {
        severity,
        alerts,
        deltas,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_issue(id: &str, blocks_on: &[&str]) -> String {
        let deps: Vec<String> = blocks_on
            .iter()
            .map(|t| format!(r#"{{"depends_on_id":"{t}","type":"blocks"}}"#))
            .collect();
        format!(
            r#"{{"id":"{id}","title":"{id}","status":"open","issue_type":"task","dependencies":[{}]}}"#,
            deps.join(",")
        )
    }

    fn snap(lines: &[String]) -> Snapshot {
        Snapshot::from_bytes(lines.join("\n").as_bytes())
    }

    #[test]
    fn new_cycle_is_critical_with_exit_code_one() {
        let clean = snap(&[open_issue("a", &[]), open_issue("b", &["a"])]);
        let baseline = Baseline::capture(&clean, "v1");
        assert!(!baseline.cycles_present);

        let cyclic = snap(&[open_issue("a", &["b"]), open_issue("b", &["a"])]);
        let report = detect_drift(&baseline, &cyclic);
        assert_eq!(report.severity, DriftSeverity::Critical);
        assert_eq!(report.severity.exit_code(), 1);
        assert!(report.alerts.iter().any(|a| a.kind == "new_cycle"));
    }

    #[test]
    fn identical_snapshots_drift_nothing() {
        let s = snap(&[open_issue("a", &[]), open_issue("b", &["a"])]);
        let baseline = Baseline::capture(&s, "v1");
        let report = detect_drift(&baseline, &s);
        assert_eq!(report.severity, DriftSeverity::None);
        assert!(report.alerts.is_empty());
        assert!(report.deltas.values().all(|d| d.abs() < 1e-9));
    }

    #[test]
    fn drift_is_deterministic() {
        let before = snap(&[open_issue("a", &[])]);
        let baseline = Baseline::capture(&before, "v1");
        let after = snap(&(0..8).map(|i| open_issue(&format!("b-{i}"), &["b-0"])).collect::<Vec<_>>());
        let one = detect_drift(&baseline, &after);
        let two = detect_drift(&baseline, &after);
        assert_eq!(one.severity, two.severity);
        assert_eq!(one.alerts.len(), two.alerts.len());
    }

    #[test]
    fn baseline_round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".bv").join("baseline.json");
        let s = snap(&[open_issue("a", &[])]);
        let baseline = Baseline::capture(&s, "rev-abc");
        baseline.save(&path).unwrap();

        let loaded = Baseline::load(&path).unwrap();
        assert_eq!(loaded.version, BASELINE_VERSION);
        assert_eq!(loaded.revision, "rev-abc");
        assert_eq!(loaded.metrics, baseline.metrics);
        assert_eq!(loaded.status_counts["open"], 1);
    }

    #[test]
    fn newer_schema_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("baseline.json");
        std::fs::write(
            &path,
            br#"{"version":99,"saved_at":"2026-01-01T00:00:00Z","revision":"x","metrics":{},"cycles_present":false,"status_counts":{}}"#,
        )
        .unwrap();
        assert!(Baseline::load(&path).is_err());
    }
}

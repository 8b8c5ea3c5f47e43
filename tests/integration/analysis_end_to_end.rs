#![allow(missing_docs)]

use std::time::{Duration, Instant};

use beadview::analysis::{
    detect_drift, execution_plan, Baseline, DriftSeverity, ImpactIndex,
};
use beadview::robot;
use beadview::snapshot::Snapshot;
use chrono::{DateTime, Utc};

fn now() -> DateTime<Utc> {
    "2026-02-01T00:00:00Z".parse().unwrap()
}

fn chain_issue(id: &str, blocker: Option<&str>) -> String {
    let deps = blocker
        .map(|b| format!(r#"{{"depends_on_id":"{b}","type":"blocks"}}"#))
        .unwrap_or_default();
    format!(
        r#"{{"id":"{id}","title":"{id}","status":"open","issue_type":"task","priority":2,"created_at":"2026-01-01T00:00:00Z","updated_at":"2026-01-01T00:00:00Z","dependencies":[{deps}]}}"#
    )
}

#[test]
fn two_chains_make_two_ordered_tracks() {
    let lines = [
        chain_issue("A1", None),
        chain_issue("A2", Some("A1")),
        chain_issue("A3", Some("A2")),
        chain_issue("B1", None),
        chain_issue("B2", Some("B1")),
        chain_issue("B3", Some("B2")),
    ];
    let snapshot = Snapshot::from_bytes(lines.join("\n").as_bytes());
    let index = ImpactIndex::compute(&snapshot, now());
    let plan = execution_plan(&snapshot, &index);

    assert_eq!(plan.tracks.len(), 2);
    for track in &plan.tracks {
        let ids: Vec<&str> = track.items.iter().map(|item| item.id.as_str()).collect();
        let head = &ids[0][..1];
        assert_eq!(ids, [format!("{head}1"), format!("{head}2"), format!("{head}3")]);
    }
    let a1 = plan
        .tracks
        .iter()
        .flat_map(|t| &t.items)
        .find(|item| item.id == "A1")
        .unwrap();
    assert_eq!(a1.unblocks, ["A2".to_string()]);

    let top = plan.highest_impact.as_ref().unwrap();
    assert!(top.id == "A1" || top.id == "B1", "got {}", top.id);
}

#[test]
fn drift_scenario_baseline_clean_then_cycle() {
    let clean = Snapshot::from_bytes(
        [chain_issue("a", None), chain_issue("b", Some("a"))]
            .join("\n")
            .as_bytes(),
    );
    let baseline = Baseline::capture(&clean, "main@t0");
    assert!(!baseline.cycles_present);

    let cyclic = Snapshot::from_bytes(
        [chain_issue("a", Some("b")), chain_issue("b", Some("a"))]
            .join("\n")
            .as_bytes(),
    );
    let report = detect_drift(&baseline, &cyclic);
    assert_eq!(report.severity, DriftSeverity::Critical);
    assert_eq!(report.severity.exit_code(), 1);
    assert!(report.alerts.iter().any(|alert| alert.kind == "new_cycle"));

    // Determinism: same inputs, same verdict.
    let again = detect_drift(&baseline, &cyclic);
    assert_eq!(again.severity, report.severity);
    assert_eq!(
        serde_json::to_string(&again.alerts).unwrap(),
        serde_json::to_string(&report.alerts).unwrap()
    );
}

fn mesh(nodes: usize) -> Snapshot {
    // A layered mesh: each node blocks on a couple of earlier nodes.
    let lines: Vec<String> = (0..nodes)
        .map(|i| {
            let mut deps = Vec::new();
            if i > 0 {
                deps.push(format!(
                    r#"{{"depends_on_id":"n-{}","type":"blocks"}}"#,
                    i - 1
                ));
            }
            if i >= 10 {
                deps.push(format!(
                    r#"{{"depends_on_id":"n-{}","type":"blocks"}}"#,
                    i - 10
                ));
            }
            format!(
                r#"{{"id":"n-{i}","title":"node {i}","status":"open","issue_type":"task","priority":{},"created_at":"2026-01-01T00:00:00Z","updated_at":"2026-01-01T00:00:00Z","dependencies":[{}]}}"#,
                i % 5,
                deps.join(",")
            )
        })
        .collect();
    Snapshot::from_bytes(lines.join("\n").as_bytes())
}

#[test]
fn insights_finish_quickly_at_fifty_nodes() {
    let snapshot = mesh(50);
    let started = Instant::now();
    let report = robot::insights_report(&snapshot, now());
    assert!(
        started.elapsed() < Duration::from_secs(5),
        "insights took {:?}",
        started.elapsed()
    );
    assert_eq!(report.data.status["cycles"], "ok");
}

#[test]
fn full_analysis_finishes_quickly_at_five_hundred_nodes() {
    let snapshot = mesh(500);
    let started = Instant::now();
    let index = ImpactIndex::compute(&snapshot, now());
    let plan = execution_plan(&snapshot, &index);
    let _ = robot::triage_report(&snapshot, now(), Default::default());
    let _ = robot::priority_report(&snapshot, now());
    assert!(
        started.elapsed() < Duration::from_secs(10),
        "analysis took {:?}",
        started.elapsed()
    );
    let planned: usize = plan.tracks.iter().map(|t| t.items.len()).sum();
    assert_eq!(planned, 500);
}

#[test]
fn phase2_guard_reports_panics_as_errors() {
    let err = beadview::analysis::guarded_phase2(|| -> usize { panic!("synthetic") })
        .unwrap_err();
    assert!(err.to_string().contains("analyze_phase2"));
    assert!(err.to_string().contains("synthetic"));
}

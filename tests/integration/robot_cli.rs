#![allow(missing_docs)]

use std::path::Path;

use assert_cmd::Command;
use serde_json::Value;

fn seed(dir: &Path, lines: &[&str]) {
    let beads = dir.join(".beads");
    std::fs::create_dir_all(&beads).unwrap();
    std::fs::write(beads.join("issues.jsonl"), lines.join("\n")).unwrap();
}

fn bv(repo: &Path) -> Command {
    let mut cmd = Command::cargo_bin("bv").unwrap();
    cmd.arg("--repo").arg(repo);
    cmd
}

fn parse_stdout(output: &[u8]) -> Value {
    serde_json::from_slice(output).expect("robot output must be a single JSON object")
}

const CHAIN: &[&str] = &[
    r#"{"id":"A1","title":"start","status":"open","issue_type":"task","priority":1}"#,
    r#"{"id":"A2","title":"then","status":"open","issue_type":"task","priority":2,"dependencies":[{"depends_on_id":"A1","type":"blocks"}]}"#,
];

#[test]
fn plan_emits_envelope_and_tracks() {
    let dir = tempfile::tempdir().unwrap();
    seed(dir.path(), CHAIN);

    let out = bv(dir.path()).arg("plan").assert().success();
    let json = parse_stdout(&out.get_output().stdout);
    assert!(json["generated_at"].is_string());
    assert_eq!(json["data_hash"].as_str().unwrap().len(), 16);
    assert_eq!(json["total_actionable"], 1);
    assert_eq!(json["total_blocked"], 1);
    assert_eq!(json["tracks"].as_array().unwrap().len(), 1);
    assert_eq!(json["summary"]["highest_impact"], "A1");
}

#[test]
fn triage_carries_quick_ref_and_health() {
    let dir = tempfile::tempdir().unwrap();
    seed(dir.path(), CHAIN);

    let out = bv(dir.path())
        .args(["triage", "--by-label"])
        .assert()
        .success();
    let json = parse_stdout(&out.get_output().stdout);
    assert_eq!(json["quick_ref"]["total"], 2);
    assert_eq!(json["quick_ref"]["actionable"], 1);
    assert_eq!(json["quick_ref"]["blocked"], 1);
    assert_eq!(json["project_health"]["status_distribution"]["open"], 2);
    assert!(json["by_label"].is_object());
}

#[test]
fn next_points_at_the_chain_head() {
    let dir = tempfile::tempdir().unwrap();
    seed(dir.path(), CHAIN);

    let out = bv(dir.path()).arg("next").assert().success();
    let json = parse_stdout(&out.get_output().stdout);
    assert_eq!(json["recommendation"]["id"], "A1");
    assert_eq!(
        json["commands"]["claim"],
        "bd update A1 --status in_progress"
    );
}

#[test]
fn empty_project_is_healthy_for_every_robot_command() {
    let dir = tempfile::tempdir().unwrap();
    seed(dir.path(), &[]);

    for command in ["plan", "triage", "next", "insights", "priority"] {
        let out = bv(dir.path()).arg(command).assert().success();
        let json = parse_stdout(&out.get_output().stdout);
        assert!(json["data_hash"].is_string(), "{command} lacks data_hash");
    }
}

#[test]
fn drift_exit_codes_follow_severity() {
    let dir = tempfile::tempdir().unwrap();
    seed(dir.path(), CHAIN);

    // Save a clean baseline, then introduce a cycle.
    bv(dir.path())
        .args(["drift", "--save-baseline", "--revision", "t0"])
        .assert()
        .success();

    seed(
        dir.path(),
        &[
            r#"{"id":"A1","title":"start","status":"open","issue_type":"task","dependencies":[{"depends_on_id":"A2","type":"blocks"}]}"#,
            r#"{"id":"A2","title":"then","status":"open","issue_type":"task","dependencies":[{"depends_on_id":"A1","type":"blocks"}]}"#,
        ],
    );
    let out = bv(dir.path()).arg("drift").assert().code(1);
    let json = parse_stdout(&out.get_output().stdout);
    assert_eq!(json["severity"], "critical");
    let kinds: Vec<&str> = json["alerts"]
        .as_array()
        .unwrap()
        .iter()
        .map(|alert| alert["kind"].as_str().unwrap())
        .collect();
    assert!(kinds.contains(&"new_cycle"));

    // Unchanged project drifts nothing.
    seed(dir.path(), CHAIN);
    bv(dir.path()).arg("drift").assert().code(0);
}

#[test]
fn graph_formats_are_selectable() {
    let dir = tempfile::tempdir().unwrap();
    seed(dir.path(), CHAIN);

    let out = bv(dir.path())
        .args(["graph", "--format", "mermaid"])
        .assert()
        .success();
    let json = parse_stdout(&out.get_output().stdout);
    assert_eq!(json["format"], "mermaid");
    assert!(json["content"].as_str().unwrap().starts_with("graph TD"));
    assert!(json["data_hash"].is_string());

    let out = bv(dir.path()).arg("graph").assert().success();
    let json = parse_stdout(&out.get_output().stdout);
    assert_eq!(json["format"], "json");
    assert_eq!(json["nodes"].as_array().unwrap().len(), 2);
    assert_eq!(json["edges"].as_array().unwrap().len(), 1);
}

#[test]
fn export_runs_the_hook_with_the_env_contract() {
    let dir = tempfile::tempdir().unwrap();
    seed(dir.path(), CHAIN);
    let out_file = dir.path().join("export.jsonl");
    let seen = dir.path().join("hook-env.txt");

    bv(dir.path())
        .arg("export")
        .arg(&out_file)
        .arg("--hook")
        .arg(format!(
            "printf '%s %s' \"$BV_EXPORT_FORMAT\" \"$BV_ISSUE_COUNT\" > {}",
            seen.display()
        ))
        .assert()
        .success();

    assert_eq!(std::fs::read_to_string(&seen).unwrap(), "jsonl 2");
    let exported = std::fs::read_to_string(&out_file).unwrap();
    assert_eq!(exported.lines().count(), 2);
}

#[test]
fn failing_hook_fails_the_export() {
    let dir = tempfile::tempdir().unwrap();
    seed(dir.path(), CHAIN);

    bv(dir.path())
        .arg("export")
        .arg(dir.path().join("out.jsonl"))
        .args(["--hook", "exit 9"])
        .assert()
        .failure();
}

#[test]
fn list_applies_filters() {
    let dir = tempfile::tempdir().unwrap();
    seed(
        dir.path(),
        &[
            r#"{"id":"A1","title":"Fix login","status":"open","issue_type":"bug","labels":["auth"]}"#,
            r#"{"id":"A2","title":"Old chore","status":"closed","issue_type":"chore"}"#,
        ],
    );

    let out = bv(dir.path())
        .args(["list", "--open", "--label", "auth"])
        .assert()
        .success();
    let json = parse_stdout(&out.get_output().stdout);
    assert_eq!(json["total"], 1);
    assert_eq!(json["issues"][0]["id"], "A1");

    let out = bv(dir.path())
        .args(["list", "--status", "bogus"])
        .assert()
        .failure();
    assert!(!out.get_output().stderr.is_empty());
}

#[test]
fn tree_flattens_the_hierarchy() {
    let dir = tempfile::tempdir().unwrap();
    seed(
        dir.path(),
        &[
            r#"{"id":"top","title":"epic","status":"open","issue_type":"epic"}"#,
            r#"{"id":"kid","title":"child","status":"open","issue_type":"task","dependencies":[{"depends_on_id":"top","type":"parent-child"}]}"#,
        ],
    );

    let out = bv(dir.path()).arg("tree").assert().success();
    let json = parse_stdout(&out.get_output().stdout);
    assert_eq!(json["roots"].as_array().unwrap().len(), 1);
    let rows = json["rows"].as_array().unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[1]["id"], "kid");
    assert_eq!(rows[1]["depth"], 1);
}

#[test]
fn missing_log_is_an_io_failure() {
    let dir = tempfile::tempdir().unwrap();
    bv(dir.path()).arg("plan").assert().code(74);
}

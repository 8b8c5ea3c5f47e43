#![allow(missing_docs)]

use std::path::Path;
use std::time::{Duration, Instant};

use beadview::workspace::{
    self, IdResolver, Workspace, WorkspaceConfig,
};

fn seed_repo(base: &Path, name: &str, lines: &[String]) {
    let beads = base.join(name).join(".beads");
    std::fs::create_dir_all(&beads).unwrap();
    std::fs::write(beads.join("issues.jsonl"), lines.join("\n")).unwrap();
}

fn issue(id: &str, deps: &[(&str, &str)]) -> String {
    let deps: Vec<String> = deps
        .iter()
        .map(|(target, ty)| format!(r#"{{"depends_on_id":"{target}","type":"{ty}"}}"#))
        .collect();
    format!(
        r#"{{"id":"{id}","title":"{id}","status":"open","issue_type":"task","dependencies":[{}]}}"#,
        deps.join(",")
    )
}

fn workspace_yaml(dir: &Path) -> std::path::PathBuf {
    let config = dir.join("workspace.yaml");
    std::fs::write(
        &config,
        r#"
repos:
  - name: core
    path: core
  - name: ui
    path: ui
"#,
    )
    .unwrap();
    config
}

#[test]
fn aggregate_namespaces_ids_and_cross_repo_blocking() {
    let dir = tempfile::tempdir().unwrap();
    seed_repo(dir.path(), "core", &[issue("1", &[])]);
    seed_repo(
        dir.path(),
        "ui",
        // ui-1 waits on core-1 across repos.
        &[issue("1", &[("core-1", "blocks")])],
    );
    let config = WorkspaceConfig::load(&workspace_yaml(dir.path())).unwrap();
    let repos = workspace::resolve_repos(&config, dir.path()).unwrap();
    assert_eq!(repos.len(), 2);
    assert_eq!(repos[0].prefix, "core-");

    let aggregate = workspace::load_aggregate(&repos).unwrap();
    assert_eq!(aggregate.len(), 2);
    assert!(aggregate.is_actionable("core-1"));
    assert!(!aggregate.is_actionable("ui-1"));
    assert_eq!(aggregate.reverse_blocks("core-1"), ["ui-1".to_string()]);
}

#[test]
fn duplicate_prefixes_fail_at_startup() {
    let dir = tempfile::tempdir().unwrap();
    seed_repo(dir.path(), "app", &[issue("1", &[])]);
    let config = dir.path().join("workspace.yaml");
    std::fs::write(
        &config,
        r#"
repos:
  - name: app
    path: app
  - name: other
    path: app
    prefix: "app-"
"#,
    )
    .unwrap();
    let err = WorkspaceConfig::load(&config).unwrap_err();
    assert!(err.to_string().contains("duplicate prefix"));
}

#[test]
fn discovery_merges_with_explicit_repos() {
    let dir = tempfile::tempdir().unwrap();
    seed_repo(dir.path(), "listed", &[issue("1", &[])]);
    seed_repo(dir.path(), "found", &[issue("1", &[])]);
    let config_path = dir.path().join("workspace.yaml");
    std::fs::write(
        &config_path,
        r#"
repos:
  - name: listed
    path: listed
discovery:
  enabled: true
  max_depth: 3
"#,
    )
    .unwrap();
    let config = WorkspaceConfig::load(&config_path).unwrap();
    let repos = workspace::resolve_repos(&config, dir.path()).unwrap();
    let names: Vec<&str> = repos.iter().map(|r| r.name.as_str()).collect();
    assert!(names.contains(&"listed"));
    assert!(names.contains(&"found"));
}

#[test]
fn resolver_round_trips_known_prefixes() {
    let resolver = IdResolver::new(vec!["core-".into(), "ui-".into()], "core-");
    assert_eq!(resolver.parse("core-12"), ("core-", "12"));
    assert_eq!(resolver.parse("ui-3"), ("ui-", "3"));
    assert_eq!(resolver.parse("stray"), ("", "stray"));
    assert_eq!(resolver.display("core-12"), "12");
    assert_eq!(resolver.display("ui-3"), "ui-3");
}

#[test]
fn live_workspace_runs_one_pipeline_per_repo() {
    let dir = tempfile::tempdir().unwrap();
    seed_repo(dir.path(), "core", &[issue("1", &[])]);
    seed_repo(dir.path(), "ui", &[issue("1", &[])]);
    let config = WorkspaceConfig::load(&workspace_yaml(dir.path())).unwrap();
    let repos = workspace::resolve_repos(&config, dir.path()).unwrap();

    let mut ws = Workspace::open(repos).unwrap();
    let deadline = Instant::now() + Duration::from_secs(5);
    let aggregate = loop {
        if let Some(aggregate) = ws.aggregate() {
            if aggregate.len() == 2 {
                break aggregate;
            }
        }
        assert!(Instant::now() < deadline, "aggregate never completed");
        std::thread::sleep(Duration::from_millis(20));
    };
    assert!(aggregate.contains("core-1"));
    assert!(aggregate.contains("ui-1"));
    ws.shutdown();
}

#![allow(missing_docs)]

use std::path::Path;
use std::process::Command;

use beadview::history;
use beadview::snapshot::Snapshot;

fn git(repo: &Path, args: &[&str]) {
    let status = Command::new("git")
        .arg("-C")
        .arg(repo)
        .args(args)
        .env("GIT_AUTHOR_NAME", "test")
        .env("GIT_AUTHOR_EMAIL", "test@example.com")
        .env("GIT_COMMITTER_NAME", "test")
        .env("GIT_COMMITTER_EMAIL", "test@example.com")
        .status()
        .expect("git must be runnable");
    assert!(status.success(), "git {args:?} failed");
}

fn issue(id: &str, status: &str, title: &str) -> String {
    format!(
        r#"{{"id":"{id}","title":"{title}","status":"{status}","issue_type":"task","created_at":"2026-01-01T00:00:00Z","updated_at":"2026-01-01T00:00:00Z"}}"#
    )
}

fn write_log(repo: &Path, lines: &[String]) {
    let beads = repo.join(".beads");
    std::fs::create_dir_all(&beads).unwrap();
    std::fs::write(beads.join("issues.jsonl"), lines.join("\n")).unwrap();
}

fn seeded_repo() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    git(dir.path(), &["init", "--quiet", "--initial-branch=main"]);
    write_log(
        dir.path(),
        &[issue("a", "open", "first"), issue("b", "open", "second")],
    );
    git(dir.path(), &["add", "."]);
    git(dir.path(), &["commit", "--quiet", "-m", "seed"]);
    git(dir.path(), &["tag", "v1"]);

    write_log(
        dir.path(),
        &[
            issue("a", "closed", "first"),
            issue("b", "open", "renamed"),
            issue("c", "open", "third"),
        ],
    );
    git(dir.path(), &["add", "."]);
    git(dir.path(), &["commit", "--quiet", "-m", "progress"]);
    dir
}

#[test]
fn snapshot_at_tag_sees_the_old_log() {
    let repo = seeded_repo();
    let snapshot = history::snapshot_at(repo.path(), "v1").unwrap();
    assert_eq!(snapshot.len(), 2);
    assert_eq!(snapshot.get("a").unwrap().title, "first");
    assert!(snapshot.get("c").is_none());

    // The working tree is untouched by history loads.
    let live = Snapshot::load(&repo.path().join(".beads/issues.jsonl")).unwrap();
    assert_eq!(live.len(), 3);
}

#[test]
fn diff_between_revisions_classifies_changes() {
    let repo = seeded_repo();
    let earlier = history::snapshot_at(repo.path(), "v1").unwrap();
    let later = history::snapshot_at(repo.path(), "main").unwrap();
    let diff = history::graph_diff(&earlier, &later);

    assert_eq!(diff.new_issues, ["c".to_string()]);
    assert_eq!(diff.closed_issues, ["a".to_string()]);
    assert_eq!(diff.modified_issues, ["b".to_string()]);
    assert!(diff.removed_issues.is_empty());
    assert_eq!(diff.metric_delta["issue_count"], 1.0);
}

#[test]
fn unresolvable_revision_is_a_history_error() {
    let repo = seeded_repo();
    let err = history::snapshot_at(repo.path(), "no-such-rev").unwrap_err();
    assert!(matches!(err, beadview::ViewerError::History(_)));
}

#[test]
fn date_revision_resolves_to_a_commit() {
    let repo = seeded_repo();
    // All commits are in the past relative to this far-future date.
    let snapshot = history::snapshot_at(repo.path(), "2999-01-01").unwrap();
    assert_eq!(snapshot.len(), 3);
}

#![allow(missing_docs)]

//! Literal-input scenarios for index construction and the actionable set.

use beadview::snapshot::Snapshot;

fn issue(id: &str, status: &str, deps: &[(&str, &str)]) -> String {
    let deps: Vec<String> = deps
        .iter()
        .map(|(target, ty)| format!(r#"{{"depends_on_id":"{target}","type":"{ty}"}}"#))
        .collect();
    format!(
        r#"{{"id":"{id}","title":"{id}","status":"{status}","issue_type":"task","dependencies":[{}]}}"#,
        deps.join(",")
    )
}

fn snap(lines: &[String]) -> Snapshot {
    Snapshot::from_bytes(lines.join("\n").as_bytes())
}

#[test]
fn actionable_set_follows_blocker_status() {
    // b-2 waits on b-1 while b-1 is open.
    let s = snap(&[
        issue("b-1", "open", &[]),
        issue("b-2", "open", &[("b-1", "blocks")]),
    ]);
    assert!(s.is_actionable("b-1"));
    assert!(!s.is_actionable("b-2"));
    assert_eq!(s.actionable().len(), 1);

    // Closing b-1 frees b-2 and removes b-1 from the set.
    let s = snap(&[
        issue("b-1", "closed", &[]),
        issue("b-2", "open", &[("b-1", "blocks")]),
    ]);
    assert!(!s.is_actionable("b-1"));
    assert!(s.is_actionable("b-2"));
    assert_eq!(s.actionable().len(), 1);
}

#[test]
fn dangling_parent_is_a_root_without_errors() {
    let s = snap(&[issue("orphan", "open", &[("missing", "parent-child")])]);
    assert_eq!(s.roots(), ["orphan".to_string()]);
    assert_eq!(s.len(), 1);
    assert_eq!(s.parse_stats().skipped, 0);
}

#[test]
fn pure_parent_cycle_yields_zero_roots_and_terminates() {
    let s = snap(&[
        issue("c-a", "open", &[("c-b", "parent-child")]),
        issue("c-b", "open", &[("c-a", "parent-child")]),
    ]);
    assert!(s.roots().is_empty());
    assert_eq!(s.children("c-a"), ["c-b".to_string()]);
    assert_eq!(s.children("c-b"), ["c-a".to_string()]);
}

#[test]
fn index_consistency_reverse_blocks_and_children() {
    let s = snap(&[
        issue("x", "open", &[]),
        issue("y", "open", &[("x", "blocks"), ("x", "parent-child")]),
        issue("z", "open", &[("x", "blocks")]),
    ]);
    // Forward deps imply reverse index membership, and nothing more.
    let mut reverse = s.reverse_blocks("x").to_vec();
    reverse.sort();
    assert_eq!(reverse, ["y".to_string(), "z".to_string()]);
    assert_eq!(s.children("x"), ["y".to_string()]);
    assert!(s.reverse_blocks("y").is_empty());
}

#[test]
fn empty_dependency_type_blocks_for_compatibility() {
    let line = r#"{"id":"new","title":"n","status":"open","issue_type":"task","dependencies":[{"depends_on_id":"old","type":""}]}"#;
    let s = snap(&[issue("old", "open", &[]), line.to_string()]);
    assert!(!s.is_actionable("new"));
    assert_eq!(s.reverse_blocks("old"), ["new".to_string()]);
}

#[test]
fn issue_count_equals_valid_line_count() {
    let mut lines: Vec<String> = (0..10).map(|i| issue(&format!("n-{i}"), "open", &[])).collect();
    lines.insert(3, "{broken".to_string());
    lines.insert(7, "".to_string());
    let s = snap(&lines);
    assert_eq!(s.len(), 10);
    assert_eq!(s.parse_stats().parsed, 10);
    assert_eq!(s.parse_stats().skipped, 1);
}

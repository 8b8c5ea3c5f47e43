//! Issue filtering shared by the list view and robot listings.

use crate::model::{Issue, Status};
use crate::snapshot::Snapshot;

/// A conjunctive filter over issues. Empty fields match everything.
#[derive(Debug, Clone, Default)]
pub struct IssueFilter {
    pub statuses: Vec<Status>,
    pub types: Vec<String>,
    pub labels: Vec<String>,
    pub assignee: Option<String>,
    /// Case-insensitive substring over id, title, and description.
    pub text: Option<String>,
    /// Keep only issues in the snapshot's actionable set.
    pub actionable_only: bool,
    /// Drop closed and tombstoned issues.
    pub open_only: bool,
}

impl IssueFilter {
    pub fn is_empty(&self) -> bool {
        self.statuses.is_empty()
            && self.types.is_empty()
            && self.labels.is_empty()
            && self.assignee.is_none()
            && self.text.is_none()
            && !self.actionable_only
            && !self.open_only
    }

    /// Whether one issue passes every configured clause.
    pub fn matches(&self, issue: &Issue, snapshot: &Snapshot) -> bool {
        if self.open_only && (issue.is_closed() || issue.status.is_tombstone()) {
            return false;
        }
        if !self.statuses.is_empty() && !self.statuses.contains(&issue.status) {
            return false;
        }
        if !self.types.is_empty()
            && !self
                .types
                .iter()
                .any(|ty| ty == issue.issue_type.as_str())
        {
            return false;
        }
        if !self.labels.is_empty()
            && !self
                .labels
                .iter()
                .all(|label| issue.labels.contains(label))
        {
            return false;
        }
        if let Some(assignee) = &self.assignee {
            if issue.assignee.as_deref() != Some(assignee.as_str()) {
                return false;
            }
        }
        if let Some(needle) = &self.text {
            let needle = needle.to_lowercase();
            let hit = issue.id.to_lowercase().contains(&needle)
                || issue.title.to_lowercase().contains(&needle)
                || issue.description.to_lowercase().contains(&needle);
            if !hit {
                return false;
            }
        }
        if self.actionable_only && !snapshot.is_actionable(&issue.id) {
            return false;
        }
        true
    }

    /// Applies the filter in snapshot order.
    pub fn apply<'a>(&'a self, snapshot: &'a Snapshot) -> impl Iterator<Item = &'a Issue> + 'a {
        snapshot
            .issues()
            .iter()
            .filter(move |issue| self.matches(issue, snapshot))
    }
}

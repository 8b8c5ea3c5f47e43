//! Data model for issues and their typed dependencies.
//!
//! This module defines the entities decoded from the on-disk issue log.
//! Records are self-delimited JSON objects, one per line; unknown keys are
//! ignored and missing optional keys take the defaults documented on each
//! field.
//!
//! # Key Types
//!
//! - [`Issue`] - A trackable work item with status, priority, and timestamps
//! - [`Dependency`] - A typed directed relation between two issues
//! - [`Status`] - The closed set of workflow states
//! - [`IssueType`] - Open-ended issue kind; five known kinds drive sort order

use std::cmp::Ordering;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};

use crate::error::{Result, ViewerError};

/// Workflow state of an issue. The set is closed: records carrying any other
/// value fail validation and are skipped by the loader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Open,
    InProgress,
    Blocked,
    Deferred,
    Pinned,
    Hooked,
    Review,
    Closed,
    Tombstone,
}

impl Status {
    /// All members of the closed set, in display order.
    pub const ALL: [Status; 9] = [
        Status::Open,
        Status::InProgress,
        Status::Blocked,
        Status::Deferred,
        Status::Pinned,
        Status::Hooked,
        Status::Review,
        Status::Closed,
        Status::Tombstone,
    ];

    /// Whether the issue no longer participates in blocking analysis.
    pub fn is_closed(self) -> bool {
        matches!(self, Status::Closed)
    }

    /// Tombstones are deletion markers: excluded from analysis input and
    /// reported as removed in history diffs.
    pub fn is_tombstone(self) -> bool {
        matches!(self, Status::Tombstone)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Status::Open => "open",
            Status::InProgress => "in_progress",
            Status::Blocked => "blocked",
            Status::Deferred => "deferred",
            Status::Pinned => "pinned",
            Status::Hooked => "hooked",
            Status::Review => "review",
            Status::Closed => "closed",
            Status::Tombstone => "tombstone",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of an issue. Arbitrary non-empty values are accepted; only the five
/// known kinds participate in default sort order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IssueType(String);

impl IssueType {
    pub fn new(kind: impl Into<String>) -> Self {
        IssueType(kind.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Rank used for child ordering: epic, feature, task, bug, chore, then
    /// everything else.
    pub fn known_rank(&self) -> u8 {
        match self.0.as_str() {
            "epic" => 0,
            "feature" => 1,
            "task" => 2,
            "bug" => 3,
            "chore" => 4,
            _ => 5,
        }
    }

    pub fn is_epic(&self) -> bool {
        self.0 == "epic"
    }
}

impl fmt::Display for IssueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Kind of a dependency edge.
///
/// Only `Blocks` contributes to blocker analysis and only `ParentChild`
/// contributes to the tree hierarchy. The empty string decodes as `Blocks`
/// for backward compatibility with old logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DepType {
    #[default]
    Blocks,
    Related,
    ParentChild,
    DiscoveredFrom,
}

impl DepType {
    pub fn as_str(self) -> &'static str {
        match self {
            DepType::Blocks => "blocks",
            DepType::Related => "related",
            DepType::ParentChild => "parent-child",
            DepType::DiscoveredFrom => "discovered-from",
        }
    }
}

impl fmt::Display for DepType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for DepType {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for DepType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        match raw.as_str() {
            // Empty type predates typed dependencies; treat as blocks.
            "" | "blocks" => Ok(DepType::Blocks),
            "related" => Ok(DepType::Related),
            "parent-child" | "parent_child" => Ok(DepType::ParentChild),
            "discovered-from" | "discovered_from" => Ok(DepType::DiscoveredFrom),
            other => Err(de::Error::unknown_variant(
                other,
                &["blocks", "related", "parent-child", "discovered-from"],
            )),
        }
    }
}

/// A typed directed relation `issue_id -> depends_on_id`.
///
/// `issue_id` may be empty inside an issue record; the loader fills it in
/// from the owning issue. `depends_on_id` may dangle: the target is allowed
/// to be absent from the snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dependency {
    #[serde(default)]
    pub issue_id: String,
    pub depends_on_id: String,
    #[serde(default, rename = "type", alias = "dep_type")]
    pub dep_type: DepType,
}

/// A comment attached to an issue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Comment {
    #[serde(default)]
    pub author: String,
    #[serde(default, alias = "body")]
    pub text: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Compaction metadata carried by summarised issues.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct CompactionInfo {
    #[serde(default)]
    pub level: u32,
    #[serde(default)]
    pub compacted_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub original_size: Option<u64>,
}

fn default_priority() -> i64 {
    2
}

/// A trackable work item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    /// Stable identifier, globally unique within a project. In a workspace
    /// the aggregate rewrites it to `<prefix><local>` form.
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub status: Status,
    /// 0 is highest, 4 is lowest. Out-of-range values are clamped on access.
    #[serde(default = "default_priority")]
    pub priority: i64,
    pub issue_type: IssueType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub closed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<Dependency>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub comments: Vec<Comment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_minutes: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compaction: Option<CompactionInfo>,
}

impl Issue {
    /// Checks record-level invariants. Records failing validation are
    /// counted as parse errors and skipped.
    pub fn validate(&self) -> Result<()> {
        if self.id.is_empty() {
            return Err(ViewerError::InvalidArgument("issue id is empty".into()));
        }
        if self.title.is_empty() {
            return Err(ViewerError::InvalidArgument(format!(
                "issue {} has an empty title",
                self.id
            )));
        }
        if self.issue_type.is_empty() {
            return Err(ViewerError::InvalidArgument(format!(
                "issue {} has an empty type",
                self.id
            )));
        }
        if let (Some(created), Some(updated)) = (self.created_at, self.updated_at) {
            if updated < created {
                return Err(ViewerError::InvalidArgument(format!(
                    "issue {} was updated before it was created",
                    self.id
                )));
            }
        }
        Ok(())
    }

    /// Priority clamped to the valid 0..=4 band.
    pub fn priority(&self) -> i64 {
        self.priority.clamp(0, 4)
    }

    pub fn is_closed(&self) -> bool {
        self.status.is_closed()
    }

    /// Dependencies of the given type, in declaration order.
    pub fn deps_of(&self, dep_type: DepType) -> impl Iterator<Item = &Dependency> {
        self.dependencies
            .iter()
            .filter(move |dep| dep.dep_type == dep_type)
    }

    /// The declared parent, if any. Multiple parent edges keep the first.
    pub fn parent_id(&self) -> Option<&str> {
        self.deps_of(DepType::ParentChild)
            .next()
            .map(|dep| dep.depends_on_id.as_str())
    }

    /// Ordering key for children within a parent: priority ascending, then
    /// known-type rank, then creation time ascending.
    pub fn child_sort_key(&self) -> (i64, u8, DateTime<Utc>) {
        (
            self.priority(),
            self.issue_type.known_rank(),
            self.created_at.unwrap_or(DateTime::<Utc>::MIN_UTC),
        )
    }

    /// Compares two issues by the child ordering contract.
    pub fn cmp_children(&self, other: &Issue) -> Ordering {
        self.child_sort_key().cmp(&other.child_sort_key())
    }
}

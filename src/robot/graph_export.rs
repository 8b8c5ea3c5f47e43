//! Dependency-graph export in machine and diagram formats.

use serde::Serialize;
use serde_json::json;

use crate::model::DepType;
use crate::snapshot::Snapshot;

/// Supported export formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphFormat {
    Json,
    Dot,
    Mermaid,
}

impl GraphFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            GraphFormat::Json => "json",
            GraphFormat::Dot => "dot",
            GraphFormat::Mermaid => "mermaid",
        }
    }
}

#[derive(Debug, Serialize)]
struct NodeExport<'a> {
    id: &'a str,
    title: &'a str,
    status: &'a str,
    issue_type: &'a str,
    priority: i64,
}

#[derive(Debug, Serialize)]
struct EdgeExport<'a> {
    from: &'a str,
    to: &'a str,
    #[serde(rename = "type")]
    dep_type: &'a str,
}

/// Renders the dependency graph in the requested format. JSON carries
/// `nodes`/`edges`; diagram formats carry a single `content` string.
pub fn export_graph(snapshot: &Snapshot, format: GraphFormat) -> serde_json::Value {
    match format {
        GraphFormat::Json => {
            let nodes: Vec<NodeExport<'_>> = snapshot
                .analyzable()
                .map(|issue| NodeExport {
                    id: &issue.id,
                    title: &issue.title,
                    status: issue.status.as_str(),
                    issue_type: issue.issue_type.as_str(),
                    priority: issue.priority(),
                })
                .collect();
            let edges: Vec<EdgeExport<'_>> = present_edges(snapshot)
                .map(|(from, to, dep_type)| EdgeExport {
                    from,
                    to,
                    dep_type: dep_type.as_str(),
                })
                .collect();
            json!({ "format": "json", "nodes": nodes, "edges": edges })
        }
        GraphFormat::Dot => json!({ "format": "dot", "content": to_dot(snapshot) }),
        GraphFormat::Mermaid => {
            json!({ "format": "mermaid", "content": to_mermaid(snapshot) })
        }
    }
}

/// Typed dependency edges whose endpoints are both present.
fn present_edges(snapshot: &Snapshot) -> impl Iterator<Item = (&str, &str, DepType)> {
    snapshot.analyzable().flat_map(move |issue| {
        issue.dependencies.iter().filter_map(move |dep| {
            snapshot
                .contains(&dep.depends_on_id)
                .then(|| (issue.id.as_str(), dep.depends_on_id.as_str(), dep.dep_type))
        })
    })
}

fn to_dot(snapshot: &Snapshot) -> String {
    let mut out = String::from("digraph issues {\n  rankdir=LR;\n");
    for issue in snapshot.analyzable() {
        let shape = if issue.issue_type.is_epic() { "box" } else { "ellipse" };
        let style = if issue.is_closed() { ",style=dashed" } else { "" };
        out.push_str(&format!(
            "  \"{}\" [label=\"{}\\n{}\",shape={shape}{style}];\n",
            escape(&issue.id),
            escape(&issue.id),
            escape(&issue.title),
        ));
    }
    for (from, to, dep_type) in present_edges(snapshot) {
        let style = match dep_type {
            DepType::Blocks => "solid",
            DepType::ParentChild => "bold",
            DepType::Related | DepType::DiscoveredFrom => "dotted",
        };
        out.push_str(&format!(
            "  \"{}\" -> \"{}\" [style={style},label=\"{}\"];\n",
            escape(from),
            escape(to),
            dep_type.as_str()
        ));
    }
    out.push_str("}\n");
    out
}

fn to_mermaid(snapshot: &Snapshot) -> String {
    let mut out = String::from("graph TD\n");
    for issue in snapshot.analyzable() {
        out.push_str(&format!(
            "  {}[\"{}: {}\"]\n",
            mermaid_id(&issue.id),
            escape(&issue.id),
            escape(&issue.title)
        ));
    }
    for (from, to, dep_type) in present_edges(snapshot) {
        let arrow = match dep_type {
            DepType::Blocks => "-->",
            DepType::ParentChild => "==>",
            DepType::Related | DepType::DiscoveredFrom => "-.->",
        };
        out.push_str(&format!(
            "  {} {arrow} {}\n",
            mermaid_id(from),
            mermaid_id(to)
        ));
    }
    out
}

fn escape(raw: &str) -> String {
    raw.replace('"', "\\\"")
}

fn mermaid_id(raw: &str) -> String {
    raw.chars()
        .map(|c| if c.is_alphanumeric() { c } else { '_' })
        .collect()
}

use pulsegraph_core::{CodeEdge, CodeNode, NodeStatus};
use serde::{Deserialize, Serialize};

/// Runtime measurements accumulated for one node.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Telemetry {
    pub execution_count: u64,
    /// Whole milliseconds, rounded half up.
    pub avg_duration_ms: u64,
    /// RFC 3339 UTC with millisecond precision, e.g. `2023-11-14T22:13:20.000Z`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_seen: Option<String>,
    /// `"{event}:{detail}"`, unique, in first-seen order.
    #[serde(default)]
    pub discovered_dependencies: Vec<String>,
    pub errors: u64,
}

/// A [`CodeNode`] annotated with what the traces said about it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconciledNode {
    #[serde(flatten)]
    pub node: CodeNode,
    pub status: NodeStatus,
    pub telemetry: Telemetry,
}

impl ReconciledNode {
    pub fn new(node: CodeNode, status: NodeStatus) -> Self {
        Self {
            node,
            status,
            telemetry: Telemetry::default(),
        }
    }

    pub fn id(&self) -> &str {
        &self.node.id
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub total_nodes: usize,
    /// `verified` plus `error` nodes.
    pub verified: usize,
    pub zombies: usize,
    pub discovered: usize,
}

impl Summary {
    pub fn from_nodes(nodes: &[ReconciledNode]) -> Self {
        let mut summary = Summary {
            total_nodes: nodes.len(),
            ..Default::default()
        };
        for node in nodes {
            if node.status.is_exercised() {
                summary.verified += 1;
            } else if node.status == NodeStatus::Discovered {
                summary.discovered += 1;
            } else {
                summary.zombies += 1;
            }
        }
        summary
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReconciledGraph {
    pub nodes: Vec<ReconciledNode>,
    pub edges: Vec<CodeEdge>,
    pub summary: Summary,
}

impl ReconciledGraph {
    pub fn new(nodes: Vec<ReconciledNode>, edges: Vec<CodeEdge>) -> Self {
        let summary = Summary::from_nodes(&nodes);
        Self {
            nodes,
            edges,
            summary,
        }
    }

    pub fn node(&self, id: &str) -> Option<&ReconciledNode> {
        self.nodes.iter().find(|n| n.node.id == id)
    }
}

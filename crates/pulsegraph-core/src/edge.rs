use crate::{CodeNode, EdgeType};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeEdge {
    pub source_id: String,
    pub target_id: String,
    #[serde(rename = "type")]
    pub edge_type: EdgeType,
}

impl CodeEdge {
    pub fn new(source_id: impl Into<String>, target_id: impl Into<String>, edge_type: EdgeType) -> Self {
        Self {
            source_id: source_id.into(),
            target_id: target_id.into(),
            edge_type,
        }
    }

    pub fn calls(source_id: impl Into<String>, target_id: impl Into<String>) -> Self {
        Self::new(source_id, target_id, EdgeType::Calls)
    }
}

/// Nodes and edges extracted from one file or a whole project.
///
/// Node ids are not deduplicated here; the reconciler owns that invariant.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CodeGraph {
    pub nodes: Vec<CodeNode>,
    pub edges: Vec<CodeEdge>,
}

impl CodeGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }

    /// Concatenate another graph onto this one.
    pub fn merge(&mut self, other: CodeGraph) {
        self.nodes.extend(other.nodes);
        self.edges.extend(other.edges);
    }
}

impl FromIterator<CodeGraph> for CodeGraph {
    fn from_iter<I: IntoIterator<Item = CodeGraph>>(iter: I) -> Self {
        let mut graph = CodeGraph::new();
        for part in iter {
            graph.merge(part);
        }
        graph
    }
}

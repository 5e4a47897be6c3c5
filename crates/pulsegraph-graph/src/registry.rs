use crate::ReconciledNode;
use pulsegraph_core::{CodeGraph, CodeNode, NodeStatus, NodeType, TraceSpan, SPAN_KIND_SERVER};
use std::collections::HashMap;

/// Arena of reconciled nodes with name and route lookups.
///
/// Both lookup maps hold slot indices, so a node reached through its id,
/// its name or a route key is the same record.
#[derive(Debug, Default)]
pub struct NodeRegistry {
    slots: Vec<ReconciledNode>,
    /// Node ids only; duplicate detection must not hit a name key.
    ids: HashMap<String, usize>,
    /// `id` and `name` keys.
    lookup: HashMap<String, usize>,
    /// `"{httpMethod} {route}"` and bare `route` keys.
    routes: HashMap<String, usize>,
}

impl NodeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry seeded with every static node as `potentially_dead`.
    pub fn from_graph(graph: &CodeGraph) -> Self {
        let mut registry = Self::new();
        for node in &graph.nodes {
            registry.register_static(node);
        }
        registry
    }

    /// A node whose id is already registered overwrites the static data in
    /// that slot instead of adding a second record.
    pub fn register_static(&mut self, node: &CodeNode) -> usize {
        let index = match self.ids.get(&node.id) {
            Some(&index) => {
                self.slots[index] = ReconciledNode::new(node.clone(), NodeStatus::PotentiallyDead);
                index
            }
            None => self.push(ReconciledNode::new(node.clone(), NodeStatus::PotentiallyDead)),
        };

        self.ids.insert(node.id.clone(), index);
        self.lookup.insert(node.id.clone(), index);
        self.lookup.insert(node.name.clone(), index);

        if let Some(key) = node.route_key() {
            self.routes.insert(key, index);
        }
        if let Some(route) = &node.metadata.route {
            self.routes.entry(route.clone()).or_insert(index);
        }
        index
    }

    /// Runtime-only node named after the span. Server spans are taken to be
    /// methods.
    pub fn register_discovered(&mut self, span: &TraceSpan) -> usize {
        let node_type = if span.kind == SPAN_KIND_SERVER {
            NodeType::Method
        } else {
            NodeType::Unknown
        };
        let index = self.push(ReconciledNode::new(
            CodeNode::new(span.name.clone(), node_type, 0, 0),
            NodeStatus::Discovered,
        ));
        self.ids.insert(span.name.clone(), index);
        self.lookup.insert(span.name.clone(), index);
        index
    }

    fn push(&mut self, node: ReconciledNode) -> usize {
        self.slots.push(node);
        self.slots.len() - 1
    }

    pub fn resolve_name(&self, name: &str) -> Option<usize> {
        self.lookup.get(name).copied()
    }

    /// Compound `"{method} {route}"` key first, then the bare route.
    pub fn resolve_route(&self, method: Option<&str>, route: &str) -> Option<usize> {
        let compound = format!("{} {}", method.unwrap_or(""), route);
        self.routes
            .get(compound.trim())
            .or_else(|| self.routes.get(route))
            .copied()
    }

    pub fn get(&self, index: usize) -> Option<&ReconciledNode> {
        self.slots.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut ReconciledNode> {
        self.slots.get_mut(index)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Nodes in registration order.
    pub fn into_nodes(self) -> Vec<ReconciledNode> {
        self.slots
    }
}

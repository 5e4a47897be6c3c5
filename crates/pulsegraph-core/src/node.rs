use crate::NodeType;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Recognized metadata keys plus an open extension map.
///
/// Unknown keys found when deserializing land in `extra` and are written back
/// at the same level, so the JSON object stays flat.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub route: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method_name: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl NodeMetadata {
    pub fn is_empty(&self) -> bool {
        self.http_method.is_none()
            && self.route.is_none()
            && self.class_name.is_none()
            && self.method_name.is_none()
            && self.extra.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeNode {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub node_type: NodeType,
    pub start_line: u32,
    pub end_line: u32,
    #[serde(default, skip_serializing_if = "NodeMetadata::is_empty")]
    pub metadata: NodeMetadata,
}

impl CodeNode {
    /// A node whose display name equals its id.
    pub fn new(id: impl Into<String>, node_type: NodeType, start_line: u32, end_line: u32) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            node_type,
            start_line,
            end_line,
            metadata: NodeMetadata::default(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_metadata(mut self, metadata: NodeMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Compound `"{httpMethod} {route}"` key, trimmed, when the node carries a route.
    pub fn route_key(&self) -> Option<String> {
        let route = self.metadata.route.as_deref()?;
        let method = self.metadata.http_method.as_deref().unwrap_or("");
        Some(format!("{} {}", method, route).trim().to_string())
    }
}

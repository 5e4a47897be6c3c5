use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Java,
}

impl Language {
    pub fn name(&self) -> &'static str {
        match self {
            Language::Java => "Java",
        }
    }

    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            Language::Java => &["java"],
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Kind of callable or structural unit in a [`crate::CodeGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeType {
    Class,
    Interface,
    Method,
    Function,
    ClassProperty,
    Unknown,
}

impl NodeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeType::Class => "class",
            NodeType::Interface => "interface",
            NodeType::Method => "method",
            NodeType::Function => "function",
            NodeType::ClassProperty => "class_property",
            NodeType::Unknown => "unknown",
        }
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Relationship kinds a [`crate::CodeEdge`] can carry. The Java extractor
/// only produces `Calls`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeType {
    #[default]
    Calls,
    Defines,
    Imports,
    Implements,
    Extends,
}

impl EdgeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EdgeType::Calls => "calls",
            EdgeType::Defines => "defines",
            EdgeType::Imports => "imports",
            EdgeType::Implements => "implements",
            EdgeType::Extends => "extends",
        }
    }
}

impl fmt::Display for EdgeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Runtime classification of a node after reconciliation.
///
/// Static nodes start `PotentiallyDead` and move to `Verified`, then to
/// `Error` once a span carries an exception. `Discovered` is assigned at
/// creation and only left for `Error`. `Error` is never left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeStatus {
    Verified,
    PotentiallyDead,
    Discovered,
    Error,
}

impl NodeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeStatus::Verified => "verified",
            NodeStatus::PotentiallyDead => "potentially_dead",
            NodeStatus::Discovered => "discovered",
            NodeStatus::Error => "error",
        }
    }

    /// Counted as live code in the summary.
    pub fn is_exercised(&self) -> bool {
        matches!(self, NodeStatus::Verified | NodeStatus::Error)
    }
}

impl fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where instrumented output is meant to be written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InjectionMode {
    /// Rewrite the source file in place.
    #[default]
    Intrusive,
    /// Leave the source untouched; the caller writes the result elsewhere.
    Sidecar,
}

impl FromStr for InjectionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "intrusive" => Ok(InjectionMode::Intrusive),
            "sidecar" => Ok(InjectionMode::Sidecar),
            other => Err(format!("unknown injection mode: {}", other)),
        }
    }
}

impl fmt::Display for InjectionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InjectionMode::Intrusive => f.write_str("intrusive"),
            InjectionMode::Sidecar => f.write_str("sidecar"),
        }
    }
}

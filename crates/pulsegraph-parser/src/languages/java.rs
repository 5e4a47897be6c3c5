// ABOUTME: Java static graph extractor
// ABOUTME: Emits one node per method with Spring route metadata and URL-inferred call edges

use super::extractor_utils::{
    child_by_kind, child_text_by_field, descendants_of_kind, last_segment, line_span,
    named_children, node_text, string_literal_value,
};
use crate::heuristics::ExtractionHeuristics;
use pulsegraph_core::{CodeEdge, CodeGraph, CodeNode, Language, NodeMetadata, NodeType};
use tree_sitter::{Node, Tree, TreeCursor};

/// Declarations that introduce a named type.
pub(crate) const TYPE_DECLARATIONS: &[&str] = &[
    "class_declaration",
    "interface_declaration",
    "enum_declaration",
    "record_declaration",
];

const UNKNOWN_CLASS: &str = "Unknown";

/// Java extractor for service call graphs.
///
/// Extracts:
/// - one `method` node per method declaration, keyed `{Class}.{method}`
/// - Spring route metadata from `@RequestMapping` on the type plus
///   `@GetMapping`/`@PostMapping`/... (or `@RequestMapping(method = ...)`)
///   on the method
/// - `calls` edges to `{host}.{method}` for every URL string literal found
///   in a method body
///
/// Notes:
/// - The class part of every id is the file's top-level type, nested
///   types included
/// - Routes need both a type-level `@RequestMapping` path and a method
///   mapping path; anything less leaves `route` and `httpMethod` unset
#[derive(Debug, Clone, Default)]
pub struct JavaExtractor {
    heuristics: ExtractionHeuristics,
}

impl JavaExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_heuristics(heuristics: ExtractionHeuristics) -> Self {
        Self { heuristics }
    }

    pub fn extract(&self, tree: &Tree, content: &str) -> CodeGraph {
        let root = tree.root_node();
        let top_type = top_level_type(&root);

        let class_identifier = top_type
            .and_then(|t| child_text_by_field(&t, "name", content))
            .unwrap_or(UNKNOWN_CLASS)
            .to_string();
        let base_path = top_type.and_then(|t| class_base_path(&t, content));

        let mut collector = JavaCollector {
            content,
            heuristics: &self.heuristics,
            class_identifier,
            base_path,
            graph: CodeGraph::new(),
        };
        let mut cursor = tree.walk();
        collector.walk(&mut cursor);
        collector.graph
    }
}

impl super::LanguageExtractor for JavaExtractor {
    fn extract(&self, tree: &Tree, content: &str, _file_path: &str) -> CodeGraph {
        JavaExtractor::extract(self, tree, content)
    }

    fn language(&self) -> Language {
        Language::Java
    }
}

struct JavaCollector<'a> {
    content: &'a str,
    heuristics: &'a ExtractionHeuristics,
    class_identifier: String,
    /// `None` when the top-level type has no readable `@RequestMapping`
    /// path; no method gets a route then.
    base_path: Option<String>,
    graph: CodeGraph,
}

impl<'a> JavaCollector<'a> {
    fn walk(&mut self, cursor: &mut TreeCursor) {
        let node = cursor.node();

        if node.kind() == "method_declaration" {
            self.visit_method(&node);
        }

        if cursor.goto_first_child() {
            loop {
                self.walk(cursor);
                if !cursor.goto_next_sibling() {
                    break;
                }
            }
            cursor.goto_parent();
        }
    }

    fn visit_method(&mut self, node: &Node) {
        let Some(method_name) = child_text_by_field(node, "name", self.content) else {
            return;
        };
        let id = format!("{}.{}", self.class_identifier, method_name);
        let (start_line, end_line) = line_span(node);

        let mut metadata = NodeMetadata {
            class_name: Some(self.class_identifier.clone()),
            method_name: Some(method_name.to_string()),
            ..Default::default()
        };
        if let (Some(base), Some(mapping)) = (&self.base_path, method_mapping(node, self.content)) {
            metadata.http_method = mapping.http_method;
            metadata.route = Some(normalize_route(&format!("{}/{}", base, mapping.path)));
        }

        // Interface and abstract methods have no body to scan.
        if let Some(body) = node.child_by_field_name("body") {
            for literal in descendants_of_kind(&body, "string_literal", &[]) {
                let value = string_literal_value(&literal, self.content);
                if let Some(target) = self.heuristics.match_url(value) {
                    self.graph.edges.push(CodeEdge::calls(id.clone(), target.target_id()));
                }
            }
        }

        self.graph.nodes.push(
            CodeNode::new(id, NodeType::Method, start_line, end_line).with_metadata(metadata),
        );
    }
}

fn top_level_type<'t>(root: &Node<'t>) -> Option<Node<'t>> {
    named_children(root)
        .into_iter()
        .find(|child| TYPE_DECLARATIONS.contains(&child.kind()))
}

struct RouteMapping {
    http_method: Option<String>,
    path: String,
}

/// Base path from a type-level `@RequestMapping` with a string path.
fn class_base_path(type_decl: &Node, content: &str) -> Option<String> {
    let mapping = annotations(type_decl)
        .into_iter()
        .find(|a| annotation_name(a, content) == "RequestMapping")?;
    annotation_path(&mapping, content).map(|p| normalize_route(&p))
}

/// First mapping annotation on a method that carries a string path.
fn method_mapping(method: &Node, content: &str) -> Option<RouteMapping> {
    annotations(method).into_iter().find_map(|annotation| {
        let http_method = match annotation_name(&annotation, content) {
            "GetMapping" => Some("GET".to_string()),
            "PostMapping" => Some("POST".to_string()),
            "PutMapping" => Some("PUT".to_string()),
            "DeleteMapping" => Some("DELETE".to_string()),
            "PatchMapping" => Some("PATCH".to_string()),
            "RequestMapping" => request_method(&annotation, content),
            _ => return None,
        };
        let path = annotation_path(&annotation, content)?;
        Some(RouteMapping { http_method, path })
    })
}

fn annotations<'t>(declaration: &Node<'t>) -> Vec<Node<'t>> {
    let Some(modifiers) = child_by_kind(declaration, "modifiers") else {
        return Vec::new();
    };
    named_children(&modifiers)
        .into_iter()
        .filter(|m| matches!(m.kind(), "annotation" | "marker_annotation"))
        .collect()
}

fn annotation_name<'a>(annotation: &Node, content: &'a str) -> &'a str {
    child_text_by_field(annotation, "name", content)
        .map(last_segment)
        .unwrap_or("")
}

fn annotation_element<'t>(annotation: &Node<'t>, key: &str, content: &str) -> Option<Node<'t>> {
    let arguments = annotation.child_by_field_name("arguments")?;
    named_children(&arguments)
        .into_iter()
        .filter(|arg| arg.kind() == "element_value_pair")
        .find(|pair| child_text_by_field(pair, "key", content) == Some(key))
        .and_then(|pair| pair.child_by_field_name("value"))
}

/// Path string of a mapping annotation: the positional argument, or the
/// `value`/`path` element. Array values contribute their first string.
fn annotation_path(annotation: &Node, content: &str) -> Option<String> {
    let arguments = annotation.child_by_field_name("arguments")?;
    let positional = named_children(&arguments)
        .into_iter()
        .find(|arg| arg.kind() != "element_value_pair" && !arg.kind().ends_with("comment"));

    positional
        .or_else(|| annotation_element(annotation, "value", content))
        .or_else(|| annotation_element(annotation, "path", content))
        .and_then(|value| first_string(&value, content))
}

fn first_string(value: &Node, content: &str) -> Option<String> {
    match value.kind() {
        "string_literal" => Some(string_literal_value(value, content).to_string()),
        "element_value_array_initializer" => named_children(value)
            .into_iter()
            .find(|v| v.kind() == "string_literal")
            .map(|v| string_literal_value(&v, content).to_string()),
        _ => None,
    }
}

/// `RequestMapping(method = RequestMethod.POST)` -> `POST`.
fn request_method(annotation: &Node, content: &str) -> Option<String> {
    let value = annotation_element(annotation, "method", content)?;
    let verb = if value.kind() == "element_value_array_initializer" {
        named_children(&value).into_iter().next()?
    } else {
        value
    };
    let text = last_segment(node_text(&verb, content));
    (!text.is_empty()).then(|| text.to_uppercase())
}

/// Collapse repeated `/`, force a leading `/` and drop a trailing one
/// (the root route stays `/`).
pub fn normalize_route(raw: &str) -> String {
    let segments: Vec<&str> = raw.split('/').filter(|s| !s.trim().is_empty()).collect();
    format!("/{}", segments.join("/"))
}

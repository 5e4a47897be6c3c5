// ABOUTME: Java source instrumentation with OpenTelemetry spans
// ABOUTME: Plans imports, a tracer field per class, span wraps and dependency events as insertions

use super::{EditSet, MARKER_AUTO_IMPORT, MARKER_INJECTION, MARKER_TRACE_START, SPAN_BUILDER_IDIOM};
use crate::heuristics::CallSiteSets;
use crate::languages::extractor_utils::{
    child_by_kind, child_text_by_field, children_by_kind, descendants_of_kind, line_indent,
    node_text, starts_line,
};
use crate::languages::java::TYPE_DECLARATIONS;
use crate::languages::LanguageInstrumenter;
use once_cell::sync::Lazy;
use pulsegraph_core::{InjectionOptions, Language, PulseGraphError, Result};
use regex::Regex;
use tracing::debug;
use tree_sitter::{Node, Tree};

const TRACE_PACKAGE: &str = "io.opentelemetry.api.trace";
const SPAN_FQN: &str = "io.opentelemetry.api.trace.Span";
const TRACER_FQN: &str = "io.opentelemetry.api.trace.Tracer";
const SPAN_IMPORT: &str = "import io.opentelemetry.api.trace.Span;";
const TRACER_IMPORT: &str = "import io.opentelemetry.api.trace.Tracer;";
const SUPPORT_IMPORTS: &[&str] = &[
    "import io.opentelemetry.api.common.AttributeKey;",
    "import io.opentelemetry.api.common.Attributes;",
    "import org.springframework.beans.factory.annotation.Autowired;",
];
const INDENT: &str = "    ";

static SPAN_COLLISION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\bSpan\s+\w+\s*[=;)]|\bclass\s+Span\b|\binterface\s+Span\b")
        .expect("span collision pattern compiles")
});
static TRACER_COLLISION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\bTracer\s+\w+\s*[=;)]|\bclass\s+Tracer\b|\binterface\s+Tracer\b")
        .expect("tracer collision pattern compiles")
});

/// How injected code spells the tracing types in one file.
struct TypeNames {
    span: &'static str,
    tracer: &'static str,
    qualified: bool,
}

impl TypeNames {
    /// Fully qualified names when the file declares or uses its own `Span`
    /// or `Tracer`. A file that already imports the OpenTelemetry `Span`
    /// keeps the short names.
    fn for_source(content: &str) -> Self {
        let qualified = !content.contains(SPAN_IMPORT)
            && (SPAN_COLLISION.is_match(content) || TRACER_COLLISION.is_match(content));
        if qualified {
            Self {
                span: SPAN_FQN,
                tracer: TRACER_FQN,
                qualified,
            }
        } else {
            Self {
                span: "Span",
                tracer: "Tracer",
                qualified,
            }
        }
    }
}

/// Rewrites Spring services so every instance method runs inside a span.
///
/// Per class declaration (nested ones included) an `@Autowired` tracer
/// field is added; every non-static method with a non-empty body whose
/// nearest enclosing type is a class gets a span named
/// `{Class}.{method}` closed in a `finally` block. Calls whose name is in
/// [`CallSiteSets`] get a `db_call` / `external_api_call` event just
/// before the statement that contains them.
///
/// Re-running on its own output plans nothing.
#[derive(Debug, Clone, Default)]
pub struct JavaInstrumenter {
    call_sites: CallSiteSets,
}

impl JavaInstrumenter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_call_sites(call_sites: CallSiteSets) -> Self {
        Self { call_sites }
    }

    pub fn plan(&self, tree: &Tree, content: &str, options: &InjectionOptions) -> Result<EditSet> {
        let root = tree.root_node();
        if root.has_error() {
            return Err(PulseGraphError::Instrumentation(
                "source contains syntax errors".to_string(),
            ));
        }

        let names = TypeNames::for_source(content);
        let mut edits = EditSet::new();

        for class in descendants_of_kind(&root, "class_declaration", &[]) {
            self.plan_tracer_field(&class, content, &names, &mut edits);
        }
        for method in descendants_of_kind(&root, "method_declaration", &[]) {
            self.plan_span(&method, content, &names, options, &mut edits);
        }

        if !edits.is_empty() {
            self.plan_imports(&root, content, &names, &mut edits);
        }

        debug!(
            "Planned {} insertions (qualified names: {})",
            edits.len(),
            names.qualified
        );
        Ok(edits)
    }

    pub fn instrument(&self, tree: &Tree, content: &str, options: &InjectionOptions) -> Result<String> {
        self.plan(tree, content, options)?.apply(content)
    }

    /// The import block goes in once, headed by the marker. A file that
    /// already uses the OpenTelemetry trace API only gets the imports it
    /// lacks.
    fn plan_imports(&self, root: &Node, content: &str, names: &TypeNames, edits: &mut EditSet) {
        let already_traced = content.contains(MARKER_AUTO_IMPORT) || content.contains(TRACE_PACKAGE);

        let mut lines: Vec<&str> = Vec::new();
        if !already_traced {
            lines.push(MARKER_AUTO_IMPORT);
        }
        if !names.qualified {
            lines.extend([SPAN_IMPORT, TRACER_IMPORT].into_iter().filter(|line| !content.contains(line)));
        }
        lines.extend(SUPPORT_IMPORTS.iter().filter(|line| !content.contains(*line)));
        if lines.is_empty() {
            return;
        }
        let block = lines.join("\n");

        let anchor = children_by_kind(root, "import_declaration")
            .last()
            .copied()
            .or_else(|| child_by_kind(root, "package_declaration"));
        match anchor {
            Some(node) => edits.insert(node.end_byte(), format!("\n{}", block)),
            None => edits.insert(0, format!("{}\n\n", block)),
        }
    }

    fn plan_tracer_field(&self, class: &Node, content: &str, names: &TypeNames, edits: &mut EditSet) {
        let Some(body) = class.child_by_field_name("body") else {
            return;
        };
        if declares_tracer(&body, content) {
            return;
        }

        let indent = format!("{}{}", line_indent(content, class.start_byte()), INDENT);
        edits.insert(
            body.start_byte() + 1,
            format!(
                "\n{i}{}\n{i}@Autowired private {} tracer;\n",
                MARKER_INJECTION,
                names.tracer,
                i = indent
            ),
        );
    }

    fn plan_span(
        &self,
        method: &Node,
        content: &str,
        names: &TypeNames,
        options: &InjectionOptions,
        edits: &mut EditSet,
    ) {
        let Some(body) = method.child_by_field_name("body") else {
            return;
        };
        // `{` and `}` only
        if body.child_count() <= 2 {
            return;
        }
        if is_static(method) || node_text(&body, content).contains(SPAN_BUILDER_IDIOM) {
            return;
        }
        let Some(owner) = enclosing_type(method).filter(|t| t.kind() == "class_declaration") else {
            return;
        };
        let Some(method_name) = child_text_by_field(method, "name", content) else {
            return;
        };

        let class_name = options
            .class_name_override
            .as_deref()
            .or_else(|| child_text_by_field(&owner, "name", content))
            .unwrap_or("Unknown");
        let span_name = format!("{}.{}", class_name, method_name);
        let inner = format!("{}{}", line_indent(content, method.start_byte()), INDENT);

        edits.insert(
            body.start_byte() + 1,
            format!(
                "\n{i}{}\n{i}{} span = tracer.spanBuilder(\"{}\").startSpan();\n{i}try (var scope = span.makeCurrent()) {{",
                MARKER_TRACE_START,
                names.span,
                span_name,
                i = inner
            ),
        );

        self.plan_call_events(&body, content, edits);

        let close = body.end_byte() - 1;
        if starts_line(content, close) {
            edits.insert(
                close,
                format!(
                    "{}}} finally {{ span.end(); }}\n{}",
                    INDENT,
                    line_indent(content, close)
                ),
            );
        } else {
            edits.insert(close, " } finally { span.end(); } ");
        }
    }

    fn plan_call_events(&self, body: &Node, content: &str, edits: &mut EditSet) {
        // Anonymous class bodies belong to their own methods.
        for invocation in descendants_of_kind(body, "method_invocation", &["class_body"]) {
            let Some(name) = child_text_by_field(&invocation, "name", content) else {
                continue;
            };
            let Some(kind) = self.call_sites.classify(name) else {
                continue;
            };
            let Some(statement) = statement_in_block(invocation, body) else {
                continue;
            };

            let offset = statement.start_byte();
            let event = format!(
                "span.addEvent(\"{}\", Attributes.of(AttributeKey.stringKey(\"{}\"), \"{}\"));",
                kind.event_name(),
                kind.attribute_key(),
                name
            );
            if starts_line(content, offset) {
                edits.insert(offset, format!("{}\n{}", event, line_indent(content, offset)));
            } else {
                edits.insert(offset, format!("{} ", event));
            }
        }
    }
}

impl LanguageInstrumenter for JavaInstrumenter {
    fn plan(&self, tree: &Tree, content: &str, options: &InjectionOptions) -> Result<EditSet> {
        JavaInstrumenter::plan(self, tree, content, options)
    }

    fn language(&self) -> Language {
        Language::Java
    }
}

/// A `Tracer tracer` field declared directly in `body`.
fn declares_tracer(body: &Node, content: &str) -> bool {
    children_by_kind(body, "field_declaration").iter().any(|field| {
        let typed_tracer = child_text_by_field(field, "type", content)
            .is_some_and(|t| t.ends_with("Tracer"));
        typed_tracer
            && field
                .children_by_field_name("declarator", &mut field.walk())
                .any(|d| child_text_by_field(&d, "name", content) == Some("tracer"))
    })
}

fn is_static(method: &Node) -> bool {
    child_by_kind(method, "modifiers")
        .is_some_and(|modifiers| child_by_kind(&modifiers, "static").is_some())
}

/// Nearest type-like ancestor: a type declaration, an anonymous class or
/// an enum constant with a body.
fn enclosing_type<'t>(node: &Node<'t>) -> Option<Node<'t>> {
    let mut current = node.parent();
    while let Some(candidate) = current {
        let kind = candidate.kind();
        if TYPE_DECLARATIONS.contains(&kind)
            || kind == "object_creation_expression"
            || kind == "enum_constant"
        {
            return Some(candidate);
        }
        current = candidate.parent();
    }
    None
}

/// Ancestor of `node` (or `node` itself) that is a direct child of `block`.
fn statement_in_block<'t>(node: Node<'t>, block: &Node<'t>) -> Option<Node<'t>> {
    let mut current = node;
    while let Some(parent) = current.parent() {
        if parent.id() == block.id() {
            return Some(current);
        }
        current = parent;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LanguageRegistry;

    fn instrument_with(source: &str, options: &InjectionOptions) -> Result<String> {
        let mut parser = LanguageRegistry::new()
            .create_parser(&Language::Java)
            .unwrap();
        let tree = parser.parse(source, None).unwrap();
        JavaInstrumenter::new().instrument(&tree, source, options)
    }

    fn instrument(source: &str) -> String {
        instrument_with(source, &InjectionOptions::default()).unwrap()
    }

    #[test]
    fn test_wraps_method_in_span() {
        let out = instrument(
            "package demo;\n\nimport java.util.List;\n\npublic class OrderService {\n    public int count() {\n        return 1;\n    }\n}\n",
        );
        let expected = r#"package demo;

import java.util.List;
// [pulsegraph] Auto-Import
import io.opentelemetry.api.trace.Span;
import io.opentelemetry.api.trace.Tracer;
import io.opentelemetry.api.common.AttributeKey;
import io.opentelemetry.api.common.Attributes;
import org.springframework.beans.factory.annotation.Autowired;

public class OrderService {
    // [pulsegraph] Injection
    @Autowired private Tracer tracer;

    public int count() {
        // [pulsegraph] Trace Start
        Span span = tracer.spanBuilder("OrderService.count").startSpan();
        try (var scope = span.makeCurrent()) {
        return 1;
        } finally { span.end(); }
    }
}
"#;
        assert_eq!(out, expected);
    }

    #[test]
    fn test_skips_static_empty_and_interface_methods() {
        let source = "interface Repo {\n    default void touch() { log(); }\n}\n\nclass Util {\n    static void helper() { work(); }\n    void noop() {}\n}\n";
        let out = instrument(source);
        assert!(!out.contains("spanBuilder"));
        // Util still gets its field.
        assert!(out.contains("@Autowired private Tracer tracer;"));
    }

    #[test]
    fn test_class_name_override() {
        let options = InjectionOptions {
            class_name_override: Some("Checkout".to_string()),
            ..Default::default()
        };
        let out = instrument_with("class Impl {\n    void pay() {\n        go();\n    }\n}\n", &options).unwrap();
        assert!(out.contains("tracer.spanBuilder(\"Checkout.pay\")"));
    }

    #[test]
    fn test_syntax_error_is_reported() {
        let result = instrument_with("class Broken { void f( { }", &InjectionOptions::default());
        assert!(matches!(result, Err(PulseGraphError::Instrumentation(_))));
    }

    #[test]
    fn test_nothing_to_do_leaves_source_untouched() {
        let source = "package a;\n\ninterface Api {\n    void call();\n}\n";
        assert_eq!(instrument(source), source);
    }
}

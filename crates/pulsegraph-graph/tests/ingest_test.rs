use pulsegraph_graph::{parse_trace_file, parse_traces, FlowReconciler};
use pulsegraph_core::{CodeGraph, CodeNode, NodeStatus, NodeType};
use std::fs;
use tempfile::TempDir;

const ENVELOPE: &str = r#"{"resourceSpans":[{"resource":{"attributes":[{"key":"service.name","value":{"stringValue":"orders"}}]},"scopeSpans":[{"scope":{"name":"manual"},"spans":[{"traceId":"t1","spanId":"s1","name":"OrderController.create","kind":2,"startTimeUnixNano":"1000000000","endTimeUnixNano":"1250000000","attributes":[{"key":"http.route","value":{"stringValue":"/orders"}}],"events":[{"name":"db_call","attributes":[{"key":"db.statement","value":{"stringValue":"save"}}]}]},{"traceId":"t1","spanId":"s2","parentSpanId":"s1","name":"INSERT orders","kind":3,"startTimeUnixNano":1100000000,"endTimeUnixNano":1200000000}]}]}]}"#;

#[test]
fn jsonl_with_bad_line_keeps_the_rest() {
    let content = [
        r#"{"name":"A.one","startTimeUnixNano":"0","endTimeUnixNano":"1000000"}"#,
        "{ this is not json",
        "",
        r#"{"name":"A.two","startTimeUnixNano":"0","endTimeUnixNano":"2000000"}"#,
    ]
    .join("\n");

    let spans = parse_traces(&content);
    let names: Vec<&str> = spans.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["A.one", "A.two"]);
}

#[test]
fn envelope_line_is_flattened_with_resource_attributes() {
    let content = format!(
        "{}\n{}\n",
        ENVELOPE, r#"{"name":"Plain.span","startTimeUnixNano":"5","endTimeUnixNano":"6"}"#
    );
    let spans = parse_traces(&content);
    assert_eq!(spans.len(), 3);

    let create = &spans[0];
    assert_eq!(create.name, "OrderController.create");
    assert_eq!(create.kind, 2);
    assert_eq!(create.string_attribute("http.route"), Some("/orders"));
    assert_eq!(create.string_attribute("service.name"), Some("orders"));
    // Span attributes come before resource attributes.
    assert_eq!(create.attributes[0].key, "http.route");
    assert_eq!(create.events.len(), 1);

    let child = &spans[1];
    assert_eq!(child.parent_span_id.as_deref(), Some("s1"));
    assert_eq!(child.start_time_unix_nano, "1100000000");
    assert_eq!(child.string_attribute("service.name"), Some("orders"));

    assert_eq!(spans[2].name, "Plain.span");
}

#[test]
fn pretty_printed_envelope_is_read_whole() {
    let value: serde_json::Value = serde_json::from_str(ENVELOPE).unwrap();
    let pretty = serde_json::to_string_pretty(&value).unwrap();
    assert!(pretty.lines().count() > 10);

    let spans = parse_traces(&pretty);
    assert_eq!(spans.len(), 2);
    assert_eq!(spans[0].name, "OrderController.create");
}

#[test]
fn whole_file_array_of_spans() {
    let content = r#"[
  {"name": "A.one", "startTimeUnixNano": "0", "endTimeUnixNano": "1000000"},
  {"name": "A.two", "startTimeUnixNano": 0, "endTimeUnixNano": 3000000}
]"#;
    let spans = parse_traces(content);
    assert_eq!(spans.len(), 2);
    assert_eq!(spans[1].end_time_unix_nano, "3000000");
}

#[test]
fn trace_file_feeds_the_reconciler() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("traces.jsonl");
    fs::write(&path, format!("{}\n", ENVELOPE)).unwrap();

    let spans = parse_trace_file(&path).unwrap();
    let graph = CodeGraph {
        nodes: vec![CodeNode::new("OrderController.create", NodeType::Method, 10, 20)],
        edges: Vec::new(),
    };
    let result = FlowReconciler::new().reconcile(&graph, &spans);

    let create = result.node("OrderController.create").unwrap();
    assert_eq!(create.status, NodeStatus::Verified);
    assert_eq!(create.telemetry.avg_duration_ms, 250);
    assert_eq!(create.telemetry.discovered_dependencies, vec!["db_call:save".to_string()]);

    let client = result.node("INSERT orders").unwrap();
    assert_eq!(client.status, NodeStatus::Discovered);
    assert_eq!(client.node.node_type, NodeType::Unknown);
    assert_eq!(result.summary.discovered, 1);
}

#[test]
fn missing_trace_file_is_an_error() {
    let dir = TempDir::new().unwrap();
    assert!(parse_trace_file(&dir.path().join("absent.jsonl")).is_err());
}

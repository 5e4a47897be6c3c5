// ABOUTME: Trace file loading for the reconciler
// ABOUTME: Accepts JSON Lines, JSON arrays and OTLP resourceSpans envelopes

use pulsegraph_core::{PulseGraphError, Result, TraceSpan};
use serde_json::{Map, Value};
use std::path::Path;
use tracing::{debug, info, warn};

const TIME_FIELDS: &[&str] = &["startTimeUnixNano", "endTimeUnixNano"];

/// Read and normalize a trace file. Only an unreadable file is an error;
/// bad lines and bad spans are logged and skipped.
pub fn parse_trace_file(path: &Path) -> Result<Vec<TraceSpan>> {
    let content = std::fs::read_to_string(path)?;
    let spans = parse_traces(&content);
    info!("Loaded {} spans from {}", spans.len(), path.display());
    Ok(spans)
}

/// Spans from trace text in any accepted shape.
///
/// The whole text is first tried as one JSON document (a span array or a
/// pretty-printed envelope); otherwise every non-blank line is a document
/// of its own.
pub fn parse_traces(content: &str) -> Vec<TraceSpan> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }

    if let Ok(document) = serde_json::from_str::<Value>(trimmed) {
        debug!("Trace input is a single JSON document");
        return spans_from_document(document, None);
    }

    let mut spans = Vec::new();
    for (number, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str::<Value>(line) {
            Ok(document) => spans.extend(spans_from_document(document, Some(number + 1))),
            Err(e) => warn!("Skipping trace line {}: {}", number + 1, e),
        }
    }
    spans
}

fn spans_from_document(document: Value, line: Option<usize>) -> Vec<TraceSpan> {
    let mut raw = Vec::new();
    collect_raw_spans(document, &mut raw);

    raw.into_iter()
        .filter_map(|value| match to_span(value) {
            Ok(span) => Some(span),
            Err(e) => {
                match line {
                    Some(line) => warn!("Skipping span on line {}: {}", line, e),
                    None => warn!("Skipping span: {}", e),
                }
                None
            }
        })
        .collect()
}

/// Flatten arrays and OTLP envelopes into span objects.
fn collect_raw_spans(document: Value, out: &mut Vec<Value>) {
    match document {
        Value::Array(items) => {
            for item in items {
                collect_raw_spans(item, out);
            }
        }
        Value::Object(mut object) => match object.remove("resourceSpans") {
            Some(resource_spans) => flatten_envelope(resource_spans, out),
            None => out.push(Value::Object(object)),
        },
        other => out.push(other),
    }
}

/// `resourceSpans[].scopeSpans[].spans[]`; each span gets the resource
/// attributes appended after its own.
fn flatten_envelope(resource_spans: Value, out: &mut Vec<Value>) {
    let Value::Array(resource_spans) = resource_spans else {
        warn!("Ignoring resourceSpans that is not an array");
        return;
    };

    for mut resource_span in resource_spans {
        let resource_attributes = resource_span
            .pointer_mut("/resource/attributes")
            .map(Value::take)
            .and_then(|v| match v {
                Value::Array(items) => Some(items),
                _ => None,
            })
            .unwrap_or_default();

        let scopes = match resource_span.get_mut("scopeSpans") {
            Some(Value::Array(scopes)) => std::mem::take(scopes),
            _ => Vec::new(),
        };

        for mut scope in scopes {
            let Some(Value::Array(spans)) = scope.get_mut("spans").map(Value::take) else {
                continue;
            };
            for mut span in spans {
                if let Value::Object(object) = &mut span {
                    append_attributes(object, &resource_attributes);
                }
                out.push(span);
            }
        }
    }
}

fn append_attributes(span: &mut Map<String, Value>, extra: &[Value]) {
    if extra.is_empty() {
        return;
    }
    let attributes = span
        .entry("attributes")
        .or_insert_with(|| Value::Array(Vec::new()));
    match attributes {
        Value::Array(items) => items.extend(extra.iter().cloned()),
        other => *other = Value::Array(extra.to_vec()),
    }
}

/// Nanosecond fields become decimal strings; a missing one becomes `"0"`.
fn to_span(value: Value) -> Result<TraceSpan> {
    let mut object = match value {
        Value::Object(object) => object,
        other => {
            return Err(PulseGraphError::Trace(format!(
                "expected a span object, got {}",
                other
            )))
        }
    };

    for field in TIME_FIELDS {
        let normalized = match object.get(*field) {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            None | Some(Value::Null) => "0".to_string(),
            Some(other) => other.to_string(),
        };
        object.insert(field.to_string(), Value::String(normalized));
    }

    serde_json::from_value(Value::Object(object)).map_err(|e| PulseGraphError::Trace(e.to_string()))
}

use crate::{NodeRegistry, ReconciledGraph, ReconciledNode};
use chrono::{DateTime, SecondsFormat, Utc};
use pulsegraph_core::{
    CodeGraph, NodeStatus, TraceSpan, EVENT_DB_CALL, EVENT_EXCEPTION, EVENT_EXTERNAL_API_CALL,
};
use tracing::{debug, info, warn};

const NANOS_PER_MILLI: i128 = 1_000_000;

/// Span attributes consulted for route matching, in priority order.
const ROUTE_ATTRIBUTES: &[&str] = &["http.route", "url.path"];
const METHOD_ATTRIBUTES: &[&str] = &["http.request.method", "http.method"];
/// Event attributes holding a dependency's short name.
const DETAIL_ATTRIBUTES: &[&str] = &["db.statement", "api.operation"];

/// Start and end of a span in nanoseconds since the epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpanTiming {
    pub start: i128,
    pub end: i128,
}

impl SpanTiming {
    /// `None` when either timestamp is not a decimal integer.
    pub fn parse(span: &TraceSpan) -> Option<Self> {
        Some(Self {
            start: span.start_time_unix_nano.trim().parse().ok()?,
            end: span.end_time_unix_nano.trim().parse().ok()?,
        })
    }

    /// Whole milliseconds, floored; negative intervals count as zero.
    pub fn duration_ms(&self) -> u64 {
        let millis = self.end.saturating_sub(self.start).div_euclid(NANOS_PER_MILLI);
        u64::try_from(millis.max(0)).unwrap_or(u64::MAX)
    }

    /// End time as an RFC 3339 timestamp, when representable.
    pub fn last_seen(&self) -> Option<String> {
        let millis = i64::try_from(self.end.div_euclid(NANOS_PER_MILLI)).ok()?;
        let at: DateTime<Utc> = DateTime::from_timestamp_millis(millis)?;
        Some(at.to_rfc3339_opts(SecondsFormat::Millis, true))
    }
}

/// How a span found its node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    Name,
    Route,
    Discovered,
}

/// Merges a static [`CodeGraph`] with runtime spans.
///
/// Each span resolves to exactly one node: by exact name, then by HTTP
/// route, and failing both a new `discovered` node is created under the
/// span's name so later spans with that name land on it.
#[derive(Debug, Clone, Default)]
pub struct FlowReconciler;

impl FlowReconciler {
    pub fn new() -> Self {
        Self
    }

    pub fn reconcile(&self, graph: &CodeGraph, spans: &[TraceSpan]) -> ReconciledGraph {
        let mut registry = NodeRegistry::from_graph(graph);
        if registry.is_empty() {
            debug!("Static graph is empty; every span becomes a discovered node");
        }
        let mut skipped = 0usize;
        let (mut by_name, mut by_route, mut discovered) = (0usize, 0usize, 0usize);

        for span in spans {
            let Some(timing) = SpanTiming::parse(span) else {
                warn!(
                    "Skipping span {:?}: malformed timestamps ({:?}, {:?})",
                    span.name, span.start_time_unix_nano, span.end_time_unix_nano
                );
                skipped += 1;
                continue;
            };

            let (index, kind) = self.resolve(&mut registry, span);
            match kind {
                MatchKind::Name => by_name += 1,
                MatchKind::Route => by_route += 1,
                MatchKind::Discovered => discovered += 1,
            }
            if let Some(node) = registry.get_mut(index) {
                apply_span(node, span, timing);
            }
        }

        info!(
            "Reconciled {} spans: {} by name, {} by route, {} discovered, {} skipped",
            spans.len(),
            by_name,
            by_route,
            discovered,
            skipped
        );

        ReconciledGraph::new(registry.into_nodes(), graph.edges.clone())
    }

    fn resolve(&self, registry: &mut NodeRegistry, span: &TraceSpan) -> (usize, MatchKind) {
        if let Some(index) = registry.resolve_name(&span.name) {
            return (index, MatchKind::Name);
        }

        let route = first_attribute(span, ROUTE_ATTRIBUTES);
        if let Some(route) = route {
            let method = first_attribute(span, METHOD_ATTRIBUTES);
            if let Some(index) = registry.resolve_route(method, route) {
                debug!("Span {:?} matched route {:?} {}", span.name, method, route);
                return (index, MatchKind::Route);
            }
        }

        debug!("Span {:?} has no static counterpart", span.name);
        (registry.register_discovered(span), MatchKind::Discovered)
    }
}

fn first_attribute<'a>(span: &'a TraceSpan, keys: &[&str]) -> Option<&'a str> {
    keys.iter().find_map(|key| span.string_attribute(key))
}

/// Fold one span into a node's status and telemetry.
fn apply_span(node: &mut ReconciledNode, span: &TraceSpan, timing: SpanTiming) {
    if node.status == NodeStatus::PotentiallyDead {
        node.status = NodeStatus::Verified;
    }

    let telemetry = &mut node.telemetry;
    telemetry.execution_count += 1;
    telemetry.avg_duration_ms = running_average(
        telemetry.avg_duration_ms,
        telemetry.execution_count,
        timing.duration_ms(),
    );
    if let Some(last_seen) = timing.last_seen() {
        telemetry.last_seen = Some(last_seen);
    }

    if span.has_event(EVENT_EXCEPTION) {
        node.status = NodeStatus::Error;
        node.telemetry.errors += 1;
    }

    for event in &span.events {
        if event.name != EVENT_DB_CALL && event.name != EVENT_EXTERNAL_API_CALL {
            continue;
        }
        let detail = DETAIL_ATTRIBUTES
            .iter()
            .find_map(|key| event.string_attribute(key))
            .unwrap_or("unknown");
        let dependency = format!("{}:{}", event.name, detail);
        if !node.telemetry.discovered_dependencies.contains(&dependency) {
            node.telemetry.discovered_dependencies.push(dependency);
        }
    }
}

/// `round((previous * (count - 1) + sample) / count)` with halves rounded
/// up, in integer arithmetic. `count` includes the new sample.
pub fn running_average(previous: u64, count: u64, sample: u64) -> u64 {
    if count == 0 {
        return 0;
    }
    let count = count as u128;
    let total = previous as u128 * (count - 1) + sample as u128;
    let rounded = (2 * total + count) / (2 * count);
    u64::try_from(rounded).unwrap_or(u64::MAX)
}

// ABOUTME: Tunable pattern data used by the language bindings
// ABOUTME: URL detection for call edges and call-name sets for dependency events

use once_cell::sync::Lazy;
use pulsegraph_core::{InstrumentationConfig, EVENT_DB_CALL, EVENT_EXTERNAL_API_CALL};
use regex::Regex;
use std::collections::HashSet;

/// `scheme://host[:port][/path]`; the path class stops at template
/// placeholders such as `{id}`.
pub const DEFAULT_URL_PATTERN: &str =
    r"[A-Za-z][A-Za-z0-9+.-]*://([A-Za-z0-9.-]+)(?::\d+)?(/[A-Za-z0-9_./-]*)?";

static DEFAULT_URL_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(DEFAULT_URL_PATTERN).expect("default URL pattern compiles"));

/// Logical call target recovered from a URL literal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlTarget {
    pub host: String,
    pub method: String,
}

impl UrlTarget {
    pub fn target_id(&self) -> String {
        format!("{}.{}", self.host, self.method)
    }
}

/// Inputs to static edge inference.
#[derive(Debug, Clone)]
pub struct ExtractionHeuristics {
    url_pattern: Regex,
}

impl Default for ExtractionHeuristics {
    fn default() -> Self {
        Self {
            url_pattern: DEFAULT_URL_REGEX.clone(),
        }
    }
}

impl ExtractionHeuristics {
    /// Use a custom URL pattern. Capture group 1 must be the host and
    /// group 2 the optional path.
    pub fn with_url_pattern(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            url_pattern: Regex::new(pattern)?,
        })
    }

    /// First URL in `literal`, mapped to `host` and the last non-empty path
    /// segment (`"root"` when there is none).
    pub fn match_url(&self, literal: &str) -> Option<UrlTarget> {
        let caps = self.url_pattern.captures(literal)?;
        let host = caps.get(1)?.as_str();
        if host.is_empty() {
            return None;
        }
        let method = caps
            .get(2)
            .and_then(|path| path.as_str().split('/').filter(|s| !s.is_empty()).last())
            .unwrap_or("root");

        Some(UrlTarget {
            host: host.to_string(),
            method: method.to_string(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallKind {
    Storage,
    Remote,
}

impl CallKind {
    pub fn event_name(&self) -> &'static str {
        match self {
            CallKind::Storage => EVENT_DB_CALL,
            CallKind::Remote => EVENT_EXTERNAL_API_CALL,
        }
    }

    /// Event attribute that carries the call's short name.
    pub fn attribute_key(&self) -> &'static str {
        match self {
            CallKind::Storage => "db.statement",
            CallKind::Remote => "api.operation",
        }
    }
}

/// Invocation names that get a dependency event injected before them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallSiteSets {
    pub storage: HashSet<String>,
    pub remote: HashSet<String>,
}

impl Default for CallSiteSets {
    fn default() -> Self {
        Self::from(&InstrumentationConfig::default())
    }
}

impl From<&InstrumentationConfig> for CallSiteSets {
    fn from(config: &InstrumentationConfig) -> Self {
        Self {
            storage: config.db_calls.iter().cloned().collect(),
            remote: config.http_calls.iter().cloned().collect(),
        }
    }
}

impl CallSiteSets {
    /// Storage wins when a name is listed in both sets.
    pub fn classify(&self, name: &str) -> Option<CallKind> {
        if self.storage.contains(name) {
            Some(CallKind::Storage)
        } else if self.remote.contains(name) {
            Some(CallKind::Remote)
        } else {
            None
        }
    }
}

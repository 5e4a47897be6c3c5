use serde::{Deserialize, Deserializer, Serialize};

/// OTLP span kind for server-side handlers.
pub const SPAN_KIND_SERVER: i32 = 2;

pub const EVENT_DB_CALL: &str = "db_call";
pub const EVENT_EXTERNAL_API_CALL: &str = "external_api_call";
pub const EVENT_EXCEPTION: &str = "exception";

/// One observed execution, in the OTLP JSON shape.
///
/// Nanosecond timestamps stay decimal strings; they are parsed at the point
/// of use so a malformed value only affects the span that carries it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraceSpan {
    #[serde(default)]
    pub trace_id: String,
    #[serde(default)]
    pub span_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_span_id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub kind: i32,
    pub start_time_unix_nano: String,
    pub end_time_unix_nano: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attributes: Vec<KeyValue>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub events: Vec<SpanEvent>,
}

impl TraceSpan {
    pub fn new(
        name: impl Into<String>,
        start_time_unix_nano: impl Into<String>,
        end_time_unix_nano: impl Into<String>,
    ) -> Self {
        Self {
            trace_id: String::new(),
            span_id: String::new(),
            parent_span_id: None,
            name: name.into(),
            kind: SPAN_KIND_SERVER,
            start_time_unix_nano: start_time_unix_nano.into(),
            end_time_unix_nano: end_time_unix_nano.into(),
            attributes: Vec::new(),
            events: Vec::new(),
        }
    }

    pub fn with_kind(mut self, kind: i32) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<AnyValue>) -> Self {
        self.attributes.push(KeyValue::new(key, value));
        self
    }

    pub fn with_event(mut self, event: SpanEvent) -> Self {
        self.events.push(event);
        self
    }

    /// First string value stored under `key`.
    pub fn string_attribute(&self, key: &str) -> Option<&str> {
        find_string(&self.attributes, key)
    }

    pub fn has_event(&self, name: &str) -> bool {
        self.events.iter().any(|e| e.name == name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpanEvent {
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attributes: Vec<KeyValue>,
}

impl SpanEvent {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<AnyValue>) -> Self {
        self.attributes.push(KeyValue::new(key, value));
        self
    }

    pub fn string_attribute(&self, key: &str) -> Option<&str> {
        find_string(&self.attributes, key)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyValue {
    pub key: String,
    #[serde(default)]
    pub value: AnyValue,
}

impl KeyValue {
    pub fn new(key: impl Into<String>, value: impl Into<AnyValue>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// OTLP attribute value. Only string and integer payloads are read; other
/// OTLP value kinds deserialize to an empty value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnyValue {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub string_value: Option<String>,
    // OTLP JSON encodes int64 as a string; accept both.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_int_value"
    )]
    pub int_value: Option<i64>,
}

impl From<&str> for AnyValue {
    fn from(value: &str) -> Self {
        AnyValue {
            string_value: Some(value.to_string()),
            int_value: None,
        }
    }
}

impl From<String> for AnyValue {
    fn from(value: String) -> Self {
        AnyValue {
            string_value: Some(value),
            int_value: None,
        }
    }
}

impl From<i64> for AnyValue {
    fn from(value: i64) -> Self {
        AnyValue {
            string_value: None,
            int_value: Some(value),
        }
    }
}

fn find_string<'a>(attributes: &'a [KeyValue], key: &str) -> Option<&'a str> {
    attributes
        .iter()
        .filter(|kv| kv.key == key)
        .find_map(|kv| kv.value.string_value.as_deref())
}

fn deserialize_int_value<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum IntOrString {
        Int(i64),
        Str(String),
    }

    match Option::<IntOrString>::deserialize(deserializer)? {
        None => Ok(None),
        Some(IntOrString::Int(v)) => Ok(Some(v)),
        Some(IntOrString::Str(s)) => s.trim().parse().map(Some).map_err(serde::de::Error::custom),
    }
}

//! OTLP/HTTP JSON payload shapes for the trace export request.

use super::span::{self as span_model, SpanData, SpanEvent};
use serde::{Deserialize, Serialize};
use std::time::SystemTime;

#[derive(Serialize, Deserialize, Debug)]
pub struct ExportTraceServiceRequest {
    #[serde(rename = "resourceSpans")]
    pub resource_spans: Vec<ResourceSpan>,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct ResourceSpan {
    pub resource: Resource,
    #[serde(rename = "scopeSpans")]
    pub scope_spans: Vec<ScopeSpan>,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct Resource {
    pub attributes: Vec<Attribute>,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct ScopeSpan {
    pub scope: Scope,
    pub spans: Vec<Span>,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct Scope {
    pub name: String,
    pub version: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Span {
    #[serde(rename = "traceId")]
    pub trace_id: String,
    #[serde(rename = "spanId")]
    pub span_id: String,
    #[serde(rename = "traceState", skip_serializing_if = "String::is_empty", default)]
    pub trace_state: String,
    #[serde(rename = "parentSpanId", skip_serializing_if = "Option::is_none", default)]
    pub parent_span_id: Option<String>,
    pub flags: u32,
    pub name: String,
    pub kind: u32,
    #[serde(rename = "startTimeUnixNano")]
    pub start_time_unix_nano: String,
    #[serde(rename = "endTimeUnixNano")]
    pub end_time_unix_nano: String,
    pub attributes: Vec<Attribute>,
    pub events: Vec<Event>,
    pub status: Status,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Event {
    #[serde(rename = "timeUnixNano")]
    pub time_unix_nano: String,
    pub name: String,
    pub attributes: Vec<Attribute>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Status {
    pub code: u32,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub message: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Attribute {
    pub key: String,
    pub value: AttributeValue,
}

/// OTLP `AnyValue`; exactly one field is set. Integers are JSON strings per
/// the OTLP/JSON mapping of int64.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct AttributeValue {
    #[serde(rename = "stringValue", skip_serializing_if = "Option::is_none", default)]
    pub string_value: Option<String>,
    #[serde(rename = "boolValue", skip_serializing_if = "Option::is_none", default)]
    pub bool_value: Option<bool>,
    #[serde(rename = "intValue", skip_serializing_if = "Option::is_none", default)]
    pub int_value: Option<String>,
    #[serde(rename = "doubleValue", skip_serializing_if = "Option::is_none", default)]
    pub double_value: Option<f64>,
}

impl From<span_model::AttributeValue> for AttributeValue {
    fn from(value: span_model::AttributeValue) -> Self {
        match value {
            span_model::AttributeValue::String(s) => AttributeValue {
                string_value: Some(s),
                ..Default::default()
            },
            span_model::AttributeValue::Bool(b) => AttributeValue {
                bool_value: Some(b),
                ..Default::default()
            },
            span_model::AttributeValue::I64(i) => AttributeValue {
                int_value: Some(i.to_string()),
                ..Default::default()
            },
            span_model::AttributeValue::F64(f) => AttributeValue {
                double_value: Some(f),
                ..Default::default()
            },
        }
    }
}

impl Attribute {
    pub fn new(key: impl Into<String>, value: impl Into<span_model::AttributeValue>) -> Self {
        Attribute {
            key: key.into(),
            value: value.into().into(),
        }
    }
}

fn to_attributes(attributes: Vec<(String, span_model::AttributeValue)>) -> Vec<Attribute> {
    attributes
        .into_iter()
        .map(|(key, value)| Attribute {
            key,
            value: value.into(),
        })
        .collect()
}

/// Convert SystemTime to nanoseconds since UNIX epoch for OTEL
fn system_time_to_nanos(time: SystemTime) -> String {
    time.duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos()
        .to_string()
}

impl From<SpanEvent> for Event {
    fn from(event: SpanEvent) -> Self {
        Event {
            time_unix_nano: system_time_to_nanos(event.timestamp),
            name: event.name,
            attributes: to_attributes(event.attributes),
        }
    }
}

impl From<span_model::Status> for Status {
    fn from(status: span_model::Status) -> Self {
        match status {
            span_model::Status::Unset => Status {
                code: 0,
                message: None,
            },
            span_model::Status::Ok => Status {
                code: 1,
                message: None,
            },
            span_model::Status::Error { description } => Status {
                code: 2,
                message: Some(description),
            },
        }
    }
}

impl From<SpanData> for Span {
    fn from(span: SpanData) -> Self {
        Span {
            trace_id: span.span_context.trace_id().to_string(),
            span_id: span.span_context.span_id().to_string(),
            trace_state: span.span_context.trace_state().header(),
            parent_span_id: span.parent_span_id.map(|id| id.to_string()),
            flags: u32::from(span.span_context.trace_flags().to_u8()),
            name: span.name,
            kind: span.kind as u32,
            start_time_unix_nano: system_time_to_nanos(span.start_time),
            end_time_unix_nano: system_time_to_nanos(span.end_time),
            attributes: to_attributes(span.attributes),
            events: span.events.into_iter().map(Event::from).collect(),
            status: span.status.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traces::{Context, InMemorySpanProcessor, SpanKind, Tracer};
    use serde_json::json;
    use std::sync::Arc;

    #[test]
    fn test_span_serializes_to_otlp_json() {
        let processor = InMemorySpanProcessor::new();
        let tracer = Tracer::new(Arc::new(processor.clone()));

        let mut parent = tracer.start_span("GET /ping", None);
        let cx = Context::new().with_trace_context(parent.span_context().clone());
        let mut child = tracer
            .span_builder("make_get_request()")
            .with_kind(SpanKind::Client)
            .with_attribute("http.method", "GET")
            .start(&tracer, Some(&cx));
        child.set_attribute("http.status_code", 502_i64);
        child.set_status(span_model::Status::error("Exception: boom"));
        child.end();
        parent.end();

        let spans = processor.finished_spans();
        let child_json = serde_json::to_value(Span::from(spans[0].clone())).unwrap();
        let parent_json = serde_json::to_value(Span::from(spans[1].clone())).unwrap();

        assert_eq!(child_json["parentSpanId"], parent_json["spanId"]);
        assert_eq!(child_json["traceId"], parent_json["traceId"]);
        assert_eq!(child_json["kind"], 3);
        assert_eq!(child_json["flags"], 1);
        assert_eq!(
            child_json["status"],
            json!({"code": 2, "message": "Exception: boom"})
        );
        assert_eq!(
            child_json["attributes"],
            json!([
                {"key": "http.method", "value": {"stringValue": "GET"}},
                {"key": "http.status_code", "value": {"intValue": "502"}},
            ])
        );
        assert!(parent_json.get("parentSpanId").is_none());
        assert!(parent_json.get("traceState").is_none());
        assert_eq!(parent_json["status"], json!({"code": 0}));
    }
}

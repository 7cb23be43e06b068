//! Integration tests for the OTLP export pipeline
//!
//! These tests record spans through a `Tracer` backed by a `TraceCollector`
//! and validate the raw JSON payloads received by the mock collector.
//!
//! ## Test Design
//! Each test creates its own MockOtelCollector and TraceCollector:
//! 1. Start MockOtelCollector on random port
//! 2. Create TraceCollector pointing at it and start the background flusher
//! 3. Record spans using a Tracer
//! 4. Flush explicitly (the flush interval is long enough not to interfere)
//! 5. Get raw JSON payloads (GET /v1/traces) and validate structure

use super::MockOtelCollector;
use crate::configuration::Tracing;
use crate::errors::ExportError;
use crate::traces::{
    Carrier, Context, Propagator, SpanKind, Status, TraceCollector, Tracer,
};
use axum::http::StatusCode;
use pretty_assertions::assert_eq;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

const REMOTE_TRACE_ID: &str = "4bf92f3577b34da6a3ce929d0e0e4736";
const REMOTE_SPAN_ID: &str = "00f067aa0ba902b7";

fn tracing_config(collector_url: String) -> Tracing {
    Tracing {
        enabled: true,
        collector_url,
        flush_interval: Duration::from_secs(60),
        ..Tracing::default()
    }
}

fn start_collector(config: &Tracing) -> (Arc<TraceCollector>, Tracer) {
    let collector = Arc::new(TraceCollector::new(config, "ServiceA").unwrap());
    collector.start_background_flusher();
    let tracer = Tracer::new(collector.clone());
    (collector, tracer)
}

/// Helper to extract all spans from OTLP JSON payloads
fn extract_spans(payloads: &[Value]) -> Vec<&Value> {
    let mut spans = Vec::new();
    for payload in payloads {
        if let Some(resource_spans) = payload.get("resourceSpans").and_then(|v| v.as_array()) {
            for resource_span in resource_spans {
                if let Some(scope_spans) =
                    resource_span.get("scopeSpans").and_then(|v| v.as_array())
                {
                    for scope_span in scope_spans {
                        if let Some(span_list) = scope_span.get("spans").and_then(|v| v.as_array())
                        {
                            spans.extend(span_list.iter());
                        }
                    }
                }
            }
        }
    }
    spans
}

/// Helper to get string attribute value from a span
fn get_string_attr<'a>(span: &'a Value, key: &str) -> Option<&'a str> {
    span.get("attributes")
        .and_then(|attrs| attrs.as_array())
        .and_then(|attrs| {
            attrs
                .iter()
                .find(|attr| attr.get("key").and_then(|k| k.as_str()) == Some(key))
        })
        .and_then(|attr| attr.get("value"))
        .and_then(|v| v.get("stringValue"))
        .and_then(|v| v.as_str())
}

fn find_span<'a>(spans: &[&'a Value], name: &str) -> &'a Value {
    spans
        .iter()
        .find(|span| span.get("name").and_then(|v| v.as_str()) == Some(name))
        .copied()
        .unwrap_or_else(|| panic!("span '{name}' not exported"))
}

#[tokio::test]
async fn test_exported_spans_keep_remote_parent_linkage() {
    let mock_collector = MockOtelCollector::start().await;
    let (collector, tracer) = start_collector(&tracing_config(mock_collector.traces_url()));

    let inbound: Carrier = [
        (
            "traceparent",
            format!("00-{REMOTE_TRACE_ID}-{REMOTE_SPAN_ID}-01"),
        ),
        ("tracestate", "congo=t61rcWkgMzE".to_string()),
    ]
    .into_iter()
    .collect();
    let propagator: Propagator = Propagator::default();
    let parent_cx = propagator.extract(&Context::new(), &inbound);

    let mut request_span = tracer
        .span_builder("GET /ping")
        .with_kind(SpanKind::Server)
        .with_attribute("language", "rust")
        .start(&tracer, Some(&parent_cx));
    let request_cx = parent_cx.with_trace_context(request_span.span_context().clone());
    let mut child = tracer
        .span_builder("make_get_request()")
        .with_kind(SpanKind::Client)
        .with_attribute("http.method", "GET")
        .with_attribute("http.url", "http://service-b/ping")
        .start(&tracer, Some(&request_cx));
    child.end();
    request_span.end();

    collector.flush().await.expect("Failed to flush");

    let payloads = mock_collector.get_traces().await;
    let resource_attrs = &payloads[0]["resourceSpans"][0]["resource"];
    assert_eq!(get_string_attr(resource_attrs, "service.name"), Some("ServiceA"));

    let spans = extract_spans(&payloads);
    assert_eq!(spans.len(), 2);
    let server = find_span(&spans, "GET /ping");
    let client = find_span(&spans, "make_get_request()");

    assert_eq!(server["traceId"], REMOTE_TRACE_ID);
    assert_eq!(client["traceId"], REMOTE_TRACE_ID);
    assert_eq!(server["parentSpanId"], REMOTE_SPAN_ID);
    assert_eq!(client["parentSpanId"], server["spanId"]);
    assert_eq!(server["traceState"], "congo=t61rcWkgMzE");
    assert_eq!(server["kind"], 2);
    assert_eq!(client["kind"], 3);
    assert_eq!(get_string_attr(server, "language"), Some("rust"));
    assert_eq!(get_string_attr(client, "http.url"), Some("http://service-b/ping"));
}

#[tokio::test]
async fn test_error_span_exports_status_and_exception_event() {
    let mock_collector = MockOtelCollector::start().await;
    let (collector, tracer) = start_collector(&tracing_config(mock_collector.traces_url()));

    let error = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "connection refused");
    let mut span = tracer.start_span("make_get_request()", None);
    span.record_exception(&error);
    span.set_status(Status::error(format!("Exception: {error}")));
    span.end();

    collector.flush().await.expect("Failed to flush");

    let payloads = mock_collector.get_traces().await;
    let spans = extract_spans(&payloads);
    assert_eq!(spans.len(), 1);
    let span = spans[0];

    assert_eq!(span["status"]["code"], 2);
    assert_eq!(span["status"]["message"], "Exception: connection refused");
    let event = &span["events"][0];
    assert_eq!(event["name"], "exception");
    assert_eq!(
        get_string_attr(event, "exception.message"),
        Some("connection refused")
    );
}

#[tokio::test]
async fn test_flush_splits_into_export_batches() {
    let mock_collector = MockOtelCollector::start().await;
    let config = Tracing {
        max_export_batch_size: 2,
        ..tracing_config(mock_collector.traces_url())
    };
    let (collector, tracer) = start_collector(&config);

    for i in 0..5 {
        tracer.start_span(format!("span-{i}"), None).end();
    }
    collector.flush().await.expect("Failed to flush");

    let payloads = mock_collector.get_traces().await;
    assert!(payloads.len() >= 3, "expected at least 3 export requests");
    for payload in &payloads {
        assert!(extract_spans(std::slice::from_ref(payload)).len() <= 2);
    }
    assert_eq!(extract_spans(&payloads).len(), 5);
}

#[tokio::test]
async fn test_background_flusher_exports_periodically() {
    let mock_collector = MockOtelCollector::start().await;
    let config = Tracing {
        flush_interval: Duration::from_millis(50),
        ..tracing_config(mock_collector.traces_url())
    };
    let (_collector, tracer) = start_collector(&config);

    tracer.start_span("periodic", None).end();
    tokio::time::sleep(Duration::from_millis(300)).await;

    let payloads = mock_collector.get_traces().await;
    let spans = extract_spans(&payloads);
    assert_eq!(spans.len(), 1);
    assert_eq!(spans[0]["name"], "periodic");
}

#[tokio::test]
async fn test_unreachable_collector_fails_only_the_flush() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let (collector, tracer) =
        start_collector(&tracing_config(format!("http://127.0.0.1:{port}/v1/traces")));

    tracer.start_span("lost", None).end();
    let result = collector.flush().await;
    assert!(matches!(result, Err(ExportError::Transport(_))));

    // the pipeline keeps working; the failed batch is not retried
    tracer.start_span("also lost", None).end();
    assert!(collector.flush().await.is_err());
    assert_eq!(collector.queued_count(), 0);
}

#[tokio::test]
async fn test_rejected_export_reports_status() {
    let mock_collector = MockOtelCollector::start_replying(StatusCode::SERVICE_UNAVAILABLE).await;
    let (collector, tracer) = start_collector(&tracing_config(mock_collector.traces_url()));

    tracer.start_span("rejected", None).end();

    assert!(matches!(
        collector.flush().await,
        Err(ExportError::Rejected(503))
    ));
    assert_eq!(mock_collector.get_traces().await.len(), 1);
}

#[tokio::test]
async fn test_shutdown_flushes_and_stops_recording() {
    let mock_collector = MockOtelCollector::start().await;
    let (collector, tracer) = start_collector(&tracing_config(mock_collector.traces_url()));

    tracer.start_span("before shutdown", None).end();
    collector.shutdown().await.expect("Failed to shut down");

    let spans_before = extract_spans(&mock_collector.get_traces().await).len();
    assert_eq!(spans_before, 1);

    mock_collector.clear().await;
    tracer.start_span("after shutdown", None).end();

    assert_eq!(collector.dropped_count(), 1);
    assert!(matches!(
        collector.flush().await,
        Err(ExportError::ShutDown)
    ));
    assert!(mock_collector.get_traces().await.is_empty());
}

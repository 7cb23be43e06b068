use super::constants::attributes::exception;
use super::context::{SpanId, TraceContext, TraceId};
use super::processor::SpanProcessor;
use super::span_builder::SpanKind;
use std::sync::Arc;
use std::time::{Instant, SystemTime};

/// Scalar span attribute value
#[derive(Clone, Debug, PartialEq)]
pub enum AttributeValue {
    String(String),
    Bool(bool),
    I64(i64),
    F64(f64),
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        AttributeValue::String(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        AttributeValue::String(value)
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        AttributeValue::Bool(value)
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        AttributeValue::I64(value)
    }
}

impl From<f64> for AttributeValue {
    fn from(value: f64) -> Self {
        AttributeValue::F64(value)
    }
}

/// Terminal outcome of a span
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum Status {
    #[default]
    Unset,
    Ok,
    Error {
        description: String,
    },
}

impl Status {
    pub fn error(description: impl Into<String>) -> Self {
        Status::Error {
            description: description.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Status::Error { .. })
    }

    // Ok > Error > Unset: a status is only replaced by one of equal or higher rank
    fn rank(&self) -> u8 {
        match self {
            Status::Unset => 0,
            Status::Error { .. } => 1,
            Status::Ok => 2,
        }
    }
}

/// Timestamped event recorded on a span, e.g. an exception
#[derive(Clone, Debug, PartialEq)]
pub struct SpanEvent {
    pub name: String,
    pub timestamp: SystemTime,
    pub attributes: Vec<(String, AttributeValue)>,
}

/// Finished span record handed to a [`SpanProcessor`]
#[derive(Clone, Debug, PartialEq)]
pub struct SpanData {
    pub name: String,
    pub kind: SpanKind,
    pub span_context: TraceContext,
    pub parent_span_id: Option<SpanId>,
    pub start_time: SystemTime,
    pub end_time: SystemTime,
    pub attributes: Vec<(String, AttributeValue)>,
    pub status: Status,
    pub events: Vec<SpanEvent>,
}

impl SpanData {
    pub fn trace_id(&self) -> TraceId {
        self.span_context.trace_id()
    }

    pub fn span_id(&self) -> SpanId {
        self.span_context.span_id()
    }

    pub fn attribute(&self, key: &str) -> Option<&AttributeValue> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }
}

/// Mutable state of a span that has not ended yet
#[derive(Debug)]
pub(crate) struct OpenSpan {
    pub(crate) name: String,
    pub(crate) kind: SpanKind,
    pub(crate) parent_span_id: Option<SpanId>,
    pub(crate) start_time: SystemTime,
    pub(crate) started: Instant,
    pub(crate) attributes: Vec<(String, AttributeValue)>,
    pub(crate) status: Status,
    pub(crate) events: Vec<SpanEvent>,
}

/// An open span, owned by the task performing the operation it covers.
///
/// Ending is terminal: `end` a second time, or any mutation after it, is a
/// no-op. A span still open when dropped is ended by `Drop`, so it is
/// finalized on every exit path.
pub struct Span {
    span_context: TraceContext,
    state: Option<OpenSpan>,
    processor: Arc<dyn SpanProcessor>,
}

impl Span {
    pub(crate) fn new(
        span_context: TraceContext,
        state: OpenSpan,
        processor: Arc<dyn SpanProcessor>,
    ) -> Self {
        Self {
            span_context,
            state: Some(state),
            processor,
        }
    }

    pub fn span_context(&self) -> &TraceContext {
        &self.span_context
    }

    /// False once the span has ended
    pub fn is_recording(&self) -> bool {
        self.state.is_some()
    }

    /// Set an attribute, replacing any previous value under the same key
    pub fn set_attribute(&mut self, key: impl Into<String>, value: impl Into<AttributeValue>) {
        let Some(state) = self.state.as_mut() else {
            return;
        };
        let (key, value) = (key.into(), value.into());
        match state.attributes.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => state.attributes.push((key, value)),
        }
    }

    /// Record an error as an `exception` event
    pub fn record_exception<E>(&mut self, err: &E)
    where
        E: std::error::Error + ?Sized,
    {
        let Some(state) = self.state.as_mut() else {
            return;
        };
        state.events.push(SpanEvent {
            name: exception::EVENT_NAME.to_string(),
            timestamp: SystemTime::now(),
            attributes: vec![
                (
                    exception::TYPE.to_string(),
                    std::any::type_name::<E>().into(),
                ),
                (exception::MESSAGE.to_string(), err.to_string().into()),
            ],
        });
    }

    pub fn set_status(&mut self, status: Status) {
        if let Some(state) = self.state.as_mut() {
            if status.rank() >= state.status.rank() {
                state.status = status;
            }
        }
    }

    /// Finalize the span and hand it to the processor
    pub fn end(&mut self) {
        let Some(state) = self.state.take() else {
            return;
        };

        // never earlier than start, even if the wall clock steps backwards
        let monotonic_end = state.start_time + state.started.elapsed();
        let end_time = SystemTime::now().max(monotonic_end);

        self.processor.on_end(SpanData {
            name: state.name,
            kind: state.kind,
            span_context: self.span_context.clone(),
            parent_span_id: state.parent_span_id,
            start_time: state.start_time,
            end_time,
            attributes: state.attributes,
            status: state.status,
            events: state.events,
        });
    }
}

impl Drop for Span {
    fn drop(&mut self) {
        self.end();
    }
}

impl std::fmt::Debug for Span {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Span")
            .field("span_context", &self.span_context)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traces::{InMemorySpanProcessor, Tracer};

    #[derive(Debug, thiserror::Error)]
    #[error("connection refused")]
    struct Refused;

    fn tracer() -> (Tracer, InMemorySpanProcessor) {
        let processor = InMemorySpanProcessor::new();
        (Tracer::new(Arc::new(processor.clone())), processor)
    }

    #[test]
    fn test_end_is_idempotent() {
        let (tracer, processor) = tracer();
        let mut span = tracer.start_span("op", None);

        span.end();
        span.end();
        drop(span);

        assert_eq!(processor.finished_spans().len(), 1);
    }

    #[test]
    fn test_drop_ends_open_span() {
        let (tracer, processor) = tracer();

        fn early_return(tracer: &Tracer) -> Result<(), Refused> {
            let _span = tracer.start_span("early", None);
            Err(Refused)
        }

        assert!(early_return(&tracer).is_err());
        let spans = processor.finished_spans();
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].name, "early");
        assert!(spans[0].end_time >= spans[0].start_time);
    }

    #[test]
    fn test_mutation_after_end_is_ignored() {
        let (tracer, processor) = tracer();
        let mut span = tracer.start_span("op", None);
        span.end();

        span.set_attribute("late", true);
        span.set_status(Status::error("late"));
        span.record_exception(&Refused);

        assert!(!span.is_recording());
        let spans = processor.finished_spans();
        assert!(spans[0].attributes.is_empty());
        assert_eq!(spans[0].status, Status::Unset);
        assert!(spans[0].events.is_empty());
    }

    #[test]
    fn test_set_attribute_replaces_existing_key() {
        let (tracer, processor) = tracer();
        let mut span = tracer.start_span("op", None);
        span.set_attribute("http.status_code", 200_i64);
        span.set_attribute("http.status_code", 503_i64);
        span.end();

        let spans = processor.finished_spans();
        assert_eq!(spans[0].attributes.len(), 1);
        assert_eq!(
            spans[0].attribute("http.status_code"),
            Some(&AttributeValue::I64(503))
        );
    }

    #[test]
    fn test_record_exception_and_error_status() {
        let (tracer, processor) = tracer();
        let mut span = tracer.start_span("op", None);

        span.record_exception(&Refused);
        span.set_status(Status::error("Exception: connection refused"));
        span.set_status(Status::Unset);
        span.end();

        let spans = processor.finished_spans();
        assert_eq!(
            spans[0].status,
            Status::error("Exception: connection refused")
        );
        let event = &spans[0].events[0];
        assert_eq!(event.name, "exception");
        assert!(event.attributes.contains(&(
            "exception.message".to_string(),
            AttributeValue::String("connection refused".to_string())
        )));
    }

    #[test]
    fn test_ok_status_is_final() {
        let (tracer, processor) = tracer();
        let mut span = tracer.start_span("op", None);
        span.set_status(Status::Ok);
        span.set_status(Status::error("too late"));
        span.end();

        assert_eq!(processor.finished_spans()[0].status, Status::Ok);
    }
}

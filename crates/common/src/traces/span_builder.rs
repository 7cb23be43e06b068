use super::context::Context;
use super::span::{AttributeValue, Span};
use super::tracer::Tracer;
use std::time::SystemTime;

/// OpenTelemetry span kinds
/// https://opentelemetry.io/docs/specs/otel/trace/api/#spankind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SpanKind {
    /// Default value. Indicates that the span represents an internal operation within an application
    #[default]
    Internal = 1,
    /// Indicates that the span covers server-side handling of a remote request
    Server = 2,
    /// Indicates that the span describes a request to some remote service
    Client = 3,
}

/// Builder for starting spans with a fluent API
///
/// # Example
/// ```no_run
/// use common::traces::{Context, InMemorySpanProcessor, SpanKind, Tracer};
/// use std::sync::Arc;
///
/// let tracer = Tracer::new(Arc::new(InMemorySpanProcessor::new()));
/// let mut span = tracer
///     .span_builder("GET /ping")
///     .with_kind(SpanKind::Server)
///     .with_attribute("language", "rust")
///     .start(&tracer, Some(&Context::new()));
/// span.end();
/// ```
#[derive(Debug, Clone)]
pub struct SpanBuilder {
    pub(crate) name: String,
    pub(crate) kind: SpanKind,
    pub(crate) attributes: Vec<(String, AttributeValue)>,
    pub(crate) start_time: Option<SystemTime>,
}

impl SpanBuilder {
    /// Create a new span builder
    ///
    /// # Arguments
    /// * `name` - The operation name for this span (e.g., "GET /ping", "make_get_request()")
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: SpanKind::Internal,
            attributes: Vec::new(),
            start_time: None,
        }
    }

    /// Set the span kind (defaults to Internal)
    pub fn with_kind(mut self, kind: SpanKind) -> Self {
        self.kind = kind;
        self
    }

    /// Set explicit start time (defaults to the moment the span is started)
    pub fn with_start_time(mut self, start_time: SystemTime) -> Self {
        self.start_time = Some(start_time);
        self
    }

    /// Add a single attribute to the span
    pub fn with_attribute(
        mut self,
        key: impl Into<String>,
        value: impl Into<AttributeValue>,
    ) -> Self {
        self.attributes.push((key.into(), value.into()));
        self
    }

    /// Add multiple attributes at once
    pub fn with_attributes<I, K, V>(mut self, attributes: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<AttributeValue>,
    {
        self.attributes
            .extend(attributes.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Start the span, parented on the active span of `parent` if there is one
    pub fn start(self, tracer: &Tracer, parent: Option<&Context>) -> Span {
        tracer.build_span(self, parent)
    }
}

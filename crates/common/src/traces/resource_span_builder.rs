use super::constants::{resource, scope};
use super::shapes::{Attribute, Resource, ResourceSpan, Scope, ScopeSpan, Span};
use super::span::SpanData;

/// Builder for creating OTEL ResourceSpan structures
///
/// Provides a fluent API for building the resource/scope/span hierarchy
pub struct ResourceSpanBuilder {
    service_name: String,
    spans: Vec<Span>,
}

impl ResourceSpanBuilder {
    /// Create a new ResourceSpan builder with service name
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            spans: Vec::new(),
        }
    }

    /// Add finished spans
    pub fn add_spans(mut self, spans: impl IntoIterator<Item = SpanData>) -> Self {
        self.spans.extend(spans.into_iter().map(Span::from));
        self
    }

    /// Build the ResourceSpan
    pub fn build(self) -> ResourceSpan {
        ResourceSpan {
            resource: Resource {
                attributes: vec![
                    Attribute::new(resource::SERVICE_NAME, self.service_name),
                    Attribute::new(resource::TELEMETRY_SDK_LANGUAGE, "rust"),
                ],
            },
            scope_spans: vec![ScopeSpan {
                scope: Scope {
                    name: scope::DEFAULT_NAME.to_string(),
                    version: scope::DEFAULT_VERSION.to_string(),
                },
                spans: self.spans,
            }],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traces::{InMemorySpanProcessor, Tracer};
    use std::sync::Arc;

    #[test]
    fn test_resource_span_builder() {
        let processor = InMemorySpanProcessor::new();
        let tracer = Tracer::new(Arc::new(processor.clone()));
        tracer.start_span("operation1", None).end();
        tracer.start_span("operation2", None).end();

        let resource_span = ResourceSpanBuilder::new("test-service")
            .add_spans(processor.finished_spans())
            .build();

        assert_eq!(resource_span.resource.attributes.len(), 2);
        assert_eq!(resource_span.resource.attributes[0].key, "service.name");
        assert_eq!(
            resource_span.resource.attributes[0].value.string_value.as_deref(),
            Some("test-service")
        );
        assert_eq!(resource_span.scope_spans.len(), 1);
        assert_eq!(resource_span.scope_spans[0].scope.name, scope::DEFAULT_NAME);
        assert_eq!(resource_span.scope_spans[0].spans.len(), 2);
    }
}

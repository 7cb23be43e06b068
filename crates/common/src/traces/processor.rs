use super::span::SpanData;
use std::sync::{Arc, Mutex, PoisonError};

/// Receives spans as they end.
///
/// `on_end` is called on the request path and must not block on I/O.
pub trait SpanProcessor: Send + Sync {
    fn on_end(&self, span: SpanData);
}

/// Keeps finished spans in memory, in the order they ended. Meant for tests
/// and local inspection.
#[derive(Clone, Debug, Default)]
pub struct InMemorySpanProcessor {
    spans: Arc<Mutex<Vec<SpanData>>>,
}

impl InMemorySpanProcessor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn finished_spans(&self) -> Vec<SpanData> {
        self.spans
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn reset(&self) {
        self.spans
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl SpanProcessor for InMemorySpanProcessor {
    fn on_end(&self, span: SpanData) {
        self.spans
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(span);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traces::Tracer;

    #[test]
    fn test_clones_share_storage() {
        let processor = InMemorySpanProcessor::new();
        let tracer = Tracer::new(Arc::new(processor.clone()));

        tracer.start_span("a", None).end();
        tracer.start_span("b", None).end();

        let names: Vec<String> = processor
            .finished_spans()
            .into_iter()
            .map(|span| span.name)
            .collect();
        assert_eq!(names, vec!["a", "b"]);

        processor.reset();
        assert!(processor.finished_spans().is_empty());
    }
}

use super::context::{Context, SpanId, TraceContext, TraceFlags, TraceId};
use super::processor::SpanProcessor;
use super::span::{OpenSpan, Span, Status};
use super::span_builder::SpanBuilder;
use super::trace_state::TraceState;
use std::fmt;
use std::sync::Arc;
use std::time::{Instant, SystemTime};

/// Creates spans and routes finished ones to a [`SpanProcessor`].
///
/// Cloning is cheap; every clone shares the same processor.
#[derive(Clone)]
pub struct Tracer {
    processor: Arc<dyn SpanProcessor>,
}

impl Tracer {
    pub fn new(processor: Arc<dyn SpanProcessor>) -> Self {
        Self { processor }
    }

    pub fn span_builder(&self, name: impl Into<String>) -> SpanBuilder {
        SpanBuilder::new(name)
    }

    /// Start a span named `name`.
    ///
    /// With an active span in `parent` the new span joins that trace as its
    /// child; otherwise it starts a new trace.
    pub fn start_span(&self, name: impl Into<String>, parent: Option<&Context>) -> Span {
        SpanBuilder::new(name).start(self, parent)
    }

    pub(crate) fn build_span(&self, builder: SpanBuilder, parent: Option<&Context>) -> Span {
        let parent = parent.and_then(Context::trace_context);

        let (trace_id, parent_span_id, trace_flags, trace_state) = match parent {
            Some(parent) => (
                parent.trace_id(),
                Some(parent.span_id()),
                parent.trace_flags(),
                parent.trace_state().clone(),
            ),
            None => (
                TraceId::random(),
                None,
                TraceFlags::SAMPLED,
                TraceState::default(),
            ),
        };

        let span_context = TraceContext::new(
            trace_id,
            SpanId::random(),
            trace_flags,
            trace_state,
            false,
        );

        let state = OpenSpan {
            name: builder.name,
            kind: builder.kind,
            parent_span_id,
            start_time: builder.start_time.unwrap_or_else(SystemTime::now),
            started: Instant::now(),
            attributes: builder.attributes,
            status: Status::Unset,
            events: Vec::new(),
        };

        Span::new(span_context, state, Arc::clone(&self.processor))
    }
}

impl fmt::Debug for Tracer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tracer").finish_non_exhaustive()
    }
}

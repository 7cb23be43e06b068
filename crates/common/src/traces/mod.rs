// W3C trace context model and propagation
mod carrier;
mod codec;
mod context;
mod propagator;
mod trace_state;
// Span recording
mod processor;
mod span;
mod span_builder;
mod tracer;
// OTLP export
mod collector;
mod constants;
mod resource_span_builder;
pub mod shapes;

#[cfg(test)]
mod tests;

pub use carrier::Carrier;
pub use codec::{CarrierCodec, TraceContextCodec, Traceparent};
pub use context::{Context, SpanId, TraceContext, TraceFlags, TraceId};
pub use propagator::Propagator;
pub use trace_state::TraceState;

pub use processor::{InMemorySpanProcessor, SpanProcessor};
pub use span::{AttributeValue, Span, SpanData, SpanEvent, Status};
pub use span_builder::{SpanBuilder, SpanKind};
pub use tracer::Tracer;

pub use collector::TraceCollector;
pub use constants::*;
pub use resource_span_builder::ResourceSpanBuilder;

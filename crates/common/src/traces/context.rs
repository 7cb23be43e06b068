use super::trace_state::TraceState;
use rand::RngCore;
use std::fmt;
use std::sync::Arc;

/// Returns true when `s` is exactly `len` lowercase hex digits
fn is_lower_hex(s: &str, len: usize) -> bool {
    s.len() == len && s.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}

/// 16-byte W3C trace identifier
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TraceId([u8; 16]);

impl TraceId {
    pub const INVALID: TraceId = TraceId([0; 16]);

    pub const fn from_bytes(bytes: [u8; 16]) -> Self {
        TraceId(bytes)
    }

    pub const fn to_bytes(self) -> [u8; 16] {
        self.0
    }

    /// Parse 32 lowercase hex characters. Uppercase is rejected, as required
    /// for the `traceparent` header.
    pub fn from_hex(hex_id: &str) -> Option<Self> {
        if !is_lower_hex(hex_id, 32) {
            return None;
        }
        let mut bytes = [0u8; 16];
        hex::decode_to_slice(hex_id, &mut bytes).ok()?;
        Some(TraceId(bytes))
    }

    pub fn is_valid(&self) -> bool {
        *self != Self::INVALID
    }

    /// Generate a random, non-zero trace id
    pub fn random() -> Self {
        let mut rng = rand::thread_rng();
        let mut bytes = [0u8; 16];
        loop {
            rng.fill_bytes(&mut bytes);
            if bytes != [0; 16] {
                return TraceId(bytes);
            }
        }
    }
}

impl fmt::Display for TraceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Debug for TraceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TraceId({})", self)
    }
}

/// 8-byte W3C span identifier
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SpanId([u8; 8]);

impl SpanId {
    pub const INVALID: SpanId = SpanId([0; 8]);

    pub const fn from_bytes(bytes: [u8; 8]) -> Self {
        SpanId(bytes)
    }

    pub const fn to_bytes(self) -> [u8; 8] {
        self.0
    }

    pub fn from_hex(hex_id: &str) -> Option<Self> {
        if !is_lower_hex(hex_id, 16) {
            return None;
        }
        let mut bytes = [0u8; 8];
        hex::decode_to_slice(hex_id, &mut bytes).ok()?;
        Some(SpanId(bytes))
    }

    pub fn is_valid(&self) -> bool {
        *self != Self::INVALID
    }

    /// Generate a random, non-zero span id
    pub fn random() -> Self {
        let mut rng = rand::thread_rng();
        let mut bytes = [0u8; 8];
        loop {
            rng.fill_bytes(&mut bytes);
            if bytes != [0; 8] {
                return SpanId(bytes);
            }
        }
    }
}

impl fmt::Display for SpanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Debug for SpanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SpanId({})", self)
    }
}

/// Trace flags. Only the sampled bit is defined for version `00`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub struct TraceFlags(u8);

impl TraceFlags {
    pub const NOT_SAMPLED: TraceFlags = TraceFlags(0x00);
    pub const SAMPLED: TraceFlags = TraceFlags(0x01);

    pub const fn new(flags: u8) -> Self {
        TraceFlags(flags)
    }

    pub fn is_sampled(&self) -> bool {
        self.0 & Self::SAMPLED.0 == Self::SAMPLED.0
    }

    /// Drop every bit except the sampled flag
    pub fn sampled_only(self) -> Self {
        TraceFlags(self.0 & Self::SAMPLED.0)
    }

    pub fn to_u8(self) -> u8 {
        self.0
    }
}

impl fmt::Display for TraceFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02x}", self.0)
    }
}

/// Identity of one span within a trace, as carried across a network hop
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TraceContext {
    trace_id: TraceId,
    span_id: SpanId,
    trace_flags: TraceFlags,
    trace_state: TraceState,
    is_remote: bool,
}

impl TraceContext {
    pub fn new(
        trace_id: TraceId,
        span_id: SpanId,
        trace_flags: TraceFlags,
        trace_state: TraceState,
        is_remote: bool,
    ) -> Self {
        Self {
            trace_id,
            span_id,
            trace_flags,
            trace_state,
            is_remote,
        }
    }

    pub fn trace_id(&self) -> TraceId {
        self.trace_id
    }

    pub fn span_id(&self) -> SpanId {
        self.span_id
    }

    pub fn trace_flags(&self) -> TraceFlags {
        self.trace_flags
    }

    pub fn trace_state(&self) -> &TraceState {
        &self.trace_state
    }

    /// True when this context was decoded from an inbound carrier
    pub fn is_remote(&self) -> bool {
        self.is_remote
    }

    pub fn is_sampled(&self) -> bool {
        self.trace_flags.is_sampled()
    }

    pub fn is_valid(&self) -> bool {
        self.trace_id.is_valid() && self.span_id.is_valid()
    }
}

/// Execution-scoped handle to the active span.
///
/// A `Context` is never mutated. Extraction and span creation derive new
/// values from it, so the context of one request cannot leak into another.
#[derive(Clone, Debug, Default)]
pub struct Context {
    active: Option<Arc<TraceContext>>,
}

impl Context {
    /// An empty context: spans parented on it start a new trace
    pub fn new() -> Self {
        Self::default()
    }

    /// Derive a context whose active span is `trace_context`
    pub fn with_trace_context(&self, trace_context: TraceContext) -> Self {
        Self {
            active: Some(Arc::new(trace_context)),
        }
    }

    pub fn trace_context(&self) -> Option<&TraceContext> {
        self.active.as_deref()
    }

    pub fn has_active_span(&self) -> bool {
        self.active.is_some()
    }
}

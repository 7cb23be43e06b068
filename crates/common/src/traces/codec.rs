use super::carrier::Carrier;
use super::constants::headers::{TRACEPARENT, TRACESTATE};
use super::context::{SpanId, TraceContext, TraceFlags, TraceId};
use super::trace_state::TraceState;
use crate::errors::{TraceStateError, TraceparentError};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

const SUPPORTED_VERSION: &str = "00";

/// Encodes and decodes a [`TraceContext`] to and from a [`Carrier`]
pub trait CarrierCodec: Send + Sync {
    /// Decode the carrier. Malformed or missing input yields `None`.
    fn decode(&self, carrier: &Carrier) -> Option<TraceContext>;

    /// Write `context` into `carrier`
    fn encode(&self, context: &TraceContext, carrier: &mut Carrier);

    /// Header names read and written by this codec
    fn fields(&self) -> &'static [&'static str];
}

/// Parsed `traceparent` header value: `version-traceid-parentid-flags`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Traceparent {
    pub trace_id: TraceId,
    pub parent_id: SpanId,
    pub flags: TraceFlags,
}

impl fmt::Display for Traceparent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{}-{}-{}",
            SUPPORTED_VERSION,
            self.trace_id,
            self.parent_id,
            self.flags.sampled_only()
        )
    }
}

impl FromStr for Traceparent {
    type Err = TraceparentError;

    fn from_str(traceparent: &str) -> Result<Self, Self::Err> {
        let tokens: Vec<&str> = traceparent.trim().split('-').collect();

        // version 00 has exactly four fields; check the version first so a
        // future version reports as unsupported rather than malformed
        if tokens[0] != SUPPORTED_VERSION {
            return Err(TraceparentError::UnsupportedVersion(tokens[0].to_string()));
        }
        if tokens.len() != 4 {
            return Err(TraceparentError::FieldCount(tokens.len()));
        }

        let trace_id = TraceId::from_hex(tokens[1])
            .filter(TraceId::is_valid)
            .ok_or_else(|| TraceparentError::InvalidTraceId(tokens[1].to_string()))?;

        let parent_id = SpanId::from_hex(tokens[2])
            .filter(SpanId::is_valid)
            .ok_or_else(|| TraceparentError::InvalidSpanId(tokens[2].to_string()))?;

        let flags = parse_flags(tokens[3])
            .ok_or_else(|| TraceparentError::InvalidFlags(tokens[3].to_string()))?;

        Ok(Traceparent {
            trace_id,
            parent_id,
            flags,
        })
    }
}

fn parse_flags(flags: &str) -> Option<TraceFlags> {
    let lower_hex = flags
        .bytes()
        .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));
    if flags.len() != 2 || !lower_hex {
        return None;
    }
    u8::from_str_radix(flags, 16)
        .ok()
        .map(|raw| TraceFlags::new(raw).sampled_only())
}

/// W3C Trace Context codec for the `traceparent` and `tracestate` headers.
///
/// Unknown `tracestate` entries are passed through untouched. When the codec
/// owns a vendor entry it is inserted at the front on every encode.
#[derive(Debug, Clone, Default)]
pub struct TraceContextCodec {
    vendor_entry: Option<(String, String)>,
}

impl TraceContextCodec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Give this codec its own `tracestate` entry. Fails if the key or value
    /// is not valid W3C tracestate syntax.
    pub fn with_vendor_entry(
        mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<Self, TraceStateError> {
        let (key, value) = (key.into(), value.into());
        TraceState::NONE.insert(key.as_str(), value.as_str())?;
        self.vendor_entry = Some((key, value));
        Ok(self)
    }
}

impl CarrierCodec for TraceContextCodec {
    fn decode(&self, carrier: &Carrier) -> Option<TraceContext> {
        let header = carrier.get(TRACEPARENT)?;
        let traceparent = match header.parse::<Traceparent>() {
            Ok(traceparent) => traceparent,
            Err(err) => {
                debug!(traceparent = %header, error = %err, "ignoring malformed traceparent");
                return None;
            }
        };

        let trace_state = match carrier.get(TRACESTATE) {
            Some(header) => header.parse::<TraceState>().unwrap_or_else(|err| {
                debug!(tracestate = %header, error = %err, "discarding malformed tracestate");
                TraceState::default()
            }),
            None => TraceState::default(),
        };

        Some(TraceContext::new(
            traceparent.trace_id,
            traceparent.parent_id,
            traceparent.flags,
            trace_state,
            true,
        ))
    }

    fn encode(&self, context: &TraceContext, carrier: &mut Carrier) {
        if !context.is_valid() {
            return;
        }

        let traceparent = Traceparent {
            trace_id: context.trace_id(),
            parent_id: context.span_id(),
            flags: context.trace_flags(),
        };
        carrier.set(TRACEPARENT, traceparent.to_string());

        let trace_state = match &self.vendor_entry {
            // key and value were validated in `with_vendor_entry`
            Some((key, value)) => context
                .trace_state()
                .insert(key.as_str(), value.as_str())
                .unwrap_or_else(|_| context.trace_state().clone()),
            None => context.trace_state().clone(),
        };
        if !trace_state.is_empty() {
            carrier.set(TRACESTATE, trace_state.header());
        }
    }

    fn fields(&self) -> &'static [&'static str] {
        &[TRACEPARENT, TRACESTATE]
    }
}

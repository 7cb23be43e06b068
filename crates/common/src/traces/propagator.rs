use super::carrier::Carrier;
use super::codec::{CarrierCodec, TraceContextCodec};
use super::context::Context;

/// Moves trace identity between a [`Context`] and a [`Carrier`] through a codec
#[derive(Debug, Clone, Default)]
pub struct Propagator<C = TraceContextCodec> {
    codec: C,
}

impl<C: CarrierCodec> Propagator<C> {
    pub fn new(codec: C) -> Self {
        Self { codec }
    }

    /// Derive a context whose active span is the remote one found in
    /// `carrier`. If nothing valid is found the ambient context is returned
    /// as is. `ambient` itself is never changed.
    pub fn extract(&self, ambient: &Context, carrier: &Carrier) -> Context {
        match self.codec.decode(carrier) {
            Some(remote) => ambient.with_trace_context(remote),
            None => ambient.clone(),
        }
    }

    /// Write the active span of `active` into `carrier`. Call once per
    /// outbound request, right before it is sent.
    pub fn inject(&self, active: &Context, carrier: &mut Carrier) {
        if let Some(trace_context) = active.trace_context() {
            self.codec.encode(trace_context, carrier);
        }
    }

    pub fn fields(&self) -> &'static [&'static str] {
        self.codec.fields()
    }
}

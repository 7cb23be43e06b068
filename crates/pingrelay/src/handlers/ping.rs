use crate::errors::RelayError;
use crate::handlers::downstream::Downstream;
use common::traces::{
    attributes, Carrier, Context, Propagator, Span, SpanKind, Status, Tracer,
};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};

pub const REQUEST_SPAN_NAME: &str = "GET /ping";
pub const RELAY_SPAN_NAME: &str = "make_get_request()";
const LANGUAGE: &str = "rust";

/// Body of a successful `/ping`. Field order is the wire order.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PingResponse {
    Pong {
        message: String,
    },
    Relayed {
        this: String,
        next: String,
        response: Value,
    },
}

impl PingResponse {
    pub fn pong() -> Self {
        PingResponse::Pong {
            message: "pong".to_string(),
        }
    }
}

/// Serves `/ping`: joins the caller's trace, and either answers `pong` or
/// relays to the next service and wraps its answer.
pub struct RelayHandler {
    service_name: String,
    next_service_url: Option<String>,
    tracer: Tracer,
    propagator: Propagator,
    downstream: Arc<dyn Downstream>,
}

impl RelayHandler {
    pub fn new(
        service_name: impl Into<String>,
        next_service_url: Option<String>,
        tracer: Tracer,
        downstream: Arc<dyn Downstream>,
    ) -> Self {
        Self {
            service_name: service_name.into(),
            next_service_url,
            tracer,
            propagator: Propagator::default(),
            downstream,
        }
    }

    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    pub async fn ping(&self, inbound: &Carrier) -> Result<PingResponse, RelayError> {
        let parent_cx = self.propagator.extract(&Context::new(), inbound);

        let mut request_span = self
            .tracer
            .span_builder(REQUEST_SPAN_NAME)
            .with_kind(SpanKind::Server)
            .with_attribute(attributes::LANGUAGE, LANGUAGE)
            .start(&self.tracer, Some(&parent_cx));

        let Some(target) = self.next_service_url.as_deref() else {
            request_span.end();
            return Ok(PingResponse::pong());
        };

        let request_cx = parent_cx.with_trace_context(request_span.span_context().clone());
        let result = self.relay(target, &request_cx).await;

        if let Err(err) = &result {
            request_span.set_status(Status::error(format!("Exception: {err}")));
        }
        request_span.end();

        result.map(|response| PingResponse::Relayed {
            this: self.service_name.clone(),
            next: target.to_string(),
            response,
        })
    }

    /// Runs the downstream call inside its own client span. The span is
    /// closed before this returns.
    async fn relay(&self, target: &str, request_cx: &Context) -> Result<Value, RelayError> {
        let mut span = self
            .tracer
            .span_builder(RELAY_SPAN_NAME)
            .with_kind(SpanKind::Client)
            .with_attribute(attributes::http::METHOD, "GET")
            .with_attribute(attributes::http::URL, target)
            .start(&self.tracer, Some(request_cx));

        let mut carrier = Carrier::new();
        self.propagator.inject(
            &request_cx.with_trace_context(span.span_context().clone()),
            &mut carrier,
        );

        let result = self.call(target, &carrier, &mut span).await;
        match &result {
            Ok(_) => info!(next = %target, "relay succeeded"),
            Err(err) => {
                warn!(next = %target, error = %err, "relay failed");
                span.record_exception(err);
                span.set_status(Status::error(format!("Exception: {err}")));
            }
        }
        span.end();
        result
    }

    async fn call(&self, target: &str, carrier: &Carrier, span: &mut Span) -> Result<Value, RelayError> {
        let response = self.downstream.get(target, carrier.to_header_map()).await?;
        span.set_attribute(attributes::http::STATUS_CODE, i64::from(response.status));

        if !(200..300).contains(&response.status) {
            return Err(RelayError::UpstreamStatus {
                url: target.to_string(),
                status: response.status,
                body: String::from_utf8_lossy(&response.body).into_owned(),
            });
        }

        serde_json::from_slice(&response.body).map_err(|source| RelayError::BodyParse {
            url: target.to_string(),
            source,
        })
    }
}

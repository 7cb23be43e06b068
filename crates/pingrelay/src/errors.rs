use bytes::Bytes;
use http_body_util::{combinators::BoxBody, BodyExt, Full};
use hyper::{Error as HyperError, Response, StatusCode};
use serde_json::json;
use std::time::Duration;
use thiserror::Error;

/// Failure to obtain a usable answer from the downstream service.
///
/// Every variant fails the whole `/ping` request; none of them falls back to
/// `pong`.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("request to {url} timed out after {}ms", .timeout.as_millis())]
    Timeout { url: String, timeout: Duration },

    #[error("{url} responded with status {status}")]
    UpstreamStatus {
        url: String,
        status: u16,
        body: String,
    },

    #[error("response from {url} is not valid JSON: {source}")]
    BodyParse {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

impl RelayError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            RelayError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            RelayError::Transport { .. }
            | RelayError::UpstreamStatus { .. }
            | RelayError::BodyParse { .. } => StatusCode::BAD_GATEWAY,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            RelayError::Transport { .. } => "RelayTransportError",
            RelayError::Timeout { .. } => "RelayTimeout",
            RelayError::UpstreamStatus { .. } => "RelayUpstreamStatus",
            RelayError::BodyParse { .. } => "RelayBodyParseError",
        }
    }

    pub fn into_response(self) -> Response<BoxBody<Bytes, HyperError>> {
        let details = match &self {
            RelayError::Transport { url, .. } => json!({ "url": url }),
            RelayError::Timeout { url, timeout } => json!({
                "url": url,
                "timeout_ms": timeout.as_millis() as u64,
            }),
            RelayError::UpstreamStatus { url, status, body } => json!({
                "url": url,
                "status": status,
                "body": body,
            }),
            RelayError::BodyParse { url, source } => json!({
                "url": url,
                "reason": source.to_string(),
            }),
        };

        let body_json = json!({
            "error": {
                "code": self.code(),
                "message": self.to_string(),
                "details": details
            }
        });

        let boxed_body = Full::new(Bytes::from(body_json.to_string()))
            .map_err(|never| match never {})
            .boxed();

        Response::builder()
            .status(self.status_code())
            .header("content-type", "application/json")
            .body(boxed_body)
            .unwrap_or_else(|_| {
                Response::new(
                    Full::new(Bytes::from("Internal Error"))
                        .map_err(|never| match never {})
                        .boxed(),
                )
            })
    }
}

use crate::errors::RelayError;
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::HeaderMap;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct DownstreamResponse {
    pub status: u16,
    pub body: Bytes,
}

/// Outbound HTTP GET to the next service in the chain
#[async_trait]
pub trait Downstream: Send + Sync {
    async fn get(&self, url: &str, headers: HeaderMap) -> Result<DownstreamResponse, RelayError>;
}

pub struct HttpDownstream {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpDownstream {
    pub fn new(timeout: Duration) -> Result<Self, RelayError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RelayError::Transport {
                url: String::new(),
                source: Box::new(e),
            })?;
        Ok(Self { client, timeout })
    }

    fn map_error(&self, url: &str, err: reqwest::Error) -> RelayError {
        if err.is_timeout() {
            RelayError::Timeout {
                url: url.to_string(),
                timeout: self.timeout,
            }
        } else {
            RelayError::Transport {
                url: url.to_string(),
                source: Box::new(err),
            }
        }
    }
}

#[async_trait]
impl Downstream for HttpDownstream {
    async fn get(&self, url: &str, headers: HeaderMap) -> Result<DownstreamResponse, RelayError> {
        debug!(url = %url, "sending relay request");
        let response = self
            .client
            .get(url)
            .headers(headers)
            .send()
            .await
            .map_err(|e| self.map_error(url, e))?;

        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|e| self.map_error(url, e))?;

        debug!(url = %url, status, bytes = body.len(), "relay response received");
        Ok(DownstreamResponse { status, body })
    }
}

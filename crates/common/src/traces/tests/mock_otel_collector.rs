//! Mock OTLP collector for testing trace export
//!
//! A small axum server standing in for an OTLP/HTTP collector:
//! - POST /v1/traces: capture incoming OTLP JSON payloads
//! - GET /v1/traces: return all captured payloads as JSON array
//! - DELETE /v1/traces: clear all captured payloads
//!
//! Each test creates its own MockOtelCollector instance.

use axum::{
    extract::State,
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Clone)]
struct CollectorState {
    traces: Arc<RwLock<Vec<Value>>>,
    reply: StatusCode,
}

/// POST /v1/traces - capture incoming OTLP payload
async fn post_traces(State(state): State<CollectorState>, Json(payload): Json<Value>) -> StatusCode {
    state.traces.write().await.push(payload);
    state.reply
}

/// GET /v1/traces - return all captured payloads
async fn get_traces(State(state): State<CollectorState>) -> Json<Vec<Value>> {
    Json(state.traces.read().await.clone())
}

/// DELETE /v1/traces - clear all captured payloads
async fn delete_traces(State(state): State<CollectorState>) -> StatusCode {
    state.traces.write().await.clear();
    StatusCode::NO_CONTENT
}

pub struct MockOtelCollector {
    address: String,
    client: reqwest::Client,
    #[allow(dead_code)]
    server_handle: tokio::task::JoinHandle<()>,
}

impl MockOtelCollector {
    /// Start a collector on a random port that accepts every export
    pub async fn start() -> Self {
        Self::start_replying(StatusCode::OK).await
    }

    /// Start a collector that records payloads but answers with `reply`
    pub async fn start_replying(reply: StatusCode) -> Self {
        let state = CollectorState {
            traces: Arc::new(RwLock::new(Vec::new())),
            reply,
        };

        let app = Router::new()
            .route("/v1/traces", post(post_traces))
            .route("/v1/traces", get(get_traces))
            .route("/v1/traces", delete(delete_traces))
            .with_state(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");

        let addr = listener.local_addr().expect("Failed to get local address");
        let address = format!("http://127.0.0.1:{}", addr.port());

        let server_handle = tokio::spawn(async move {
            axum::serve(listener, app).await.expect("Server failed");
        });

        Self {
            address,
            client: reqwest::Client::new(),
            server_handle,
        }
    }

    pub fn traces_url(&self) -> String {
        format!("{}/v1/traces", self.address)
    }

    /// GET /v1/traces - fetch all captured payloads
    pub async fn get_traces(&self) -> Vec<Value> {
        self.client
            .get(self.traces_url())
            .send()
            .await
            .expect("Failed to GET traces")
            .json()
            .await
            .expect("Failed to parse traces JSON")
    }

    /// DELETE /v1/traces - clear captured payloads
    pub async fn clear(&self) {
        self.client
            .delete(self.traces_url())
            .send()
            .await
            .expect("Failed to DELETE traces");
    }
}

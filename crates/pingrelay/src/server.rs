use crate::handlers::ping::RelayHandler;
use bytes::Bytes;
use common::traces::Carrier;
use http_body_util::{combinators::BoxBody, BodyExt, Empty, Full};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

pub const PING_PATH: &str = "/ping";
pub const REQUEST_ID_HEADER: &str = "x-request-id";
pub const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

pub type ResponseBody = BoxBody<Bytes, hyper::Error>;

pub fn empty() -> ResponseBody {
    Empty::<Bytes>::new()
        .map_err(|never| match never {})
        .boxed()
}

fn full(bytes: impl Into<Bytes>) -> ResponseBody {
    Full::new(bytes.into())
        .map_err(|never| match never {})
        .boxed()
}

fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response<ResponseBody> {
    let (status, body) = match serde_json::to_vec(body) {
        Ok(json) => (status, full(json)),
        Err(err) => {
            warn!(error = %err, "failed to serialize response body");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                full(Bytes::from_static(
                    b"{\"error\":\"Failed to serialize response\"}",
                )),
            )
        }
    };
    let mut response = Response::new(body);
    *response.status_mut() = status;
    response.headers_mut().insert(
        hyper::header::CONTENT_TYPE,
        hyper::header::HeaderValue::from_static("application/json"),
    );
    response
}

/// Dispatch one request. Only `GET /ping` is served.
pub async fn route<B>(
    req: Request<B>,
    handler: Arc<RelayHandler>,
) -> Result<Response<ResponseBody>, hyper::Error> {
    let inbound = match (req.method(), req.uri().path()) {
        (&Method::GET, PING_PATH) => Carrier::from_header_map(req.headers()),
        _ => {
            debug!(method = %req.method(), path = %req.uri().path(), "no route found");
            let mut not_found = Response::new(empty());
            *not_found.status_mut() = StatusCode::NOT_FOUND;
            return Ok(not_found);
        }
    };
    drop(req);

    match handler.ping(&inbound).await {
        Ok(body) => Ok(json_response(StatusCode::OK, &body)),
        Err(err) => {
            warn!(error = %err, "ping failed");
            Ok(err.into_response())
        }
    }
}

fn request_id<B>(req: &Request<B>) -> String {
    req.headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}

/// Accept connections until `shutdown` resolves, then let open connections
/// finish their current request for up to [`DRAIN_TIMEOUT`].
pub async fn serve<F>(
    listener: TcpListener,
    handler: Arc<RelayHandler>,
    shutdown: F,
) -> std::io::Result<()>
where
    F: Future<Output = ()>,
{
    tokio::pin!(shutdown);
    let (closing_tx, closing_rx) = watch::channel(false);
    let mut connections = JoinSet::new();

    loop {
        let (stream, peer_addr) = tokio::select! {
            accepted = listener.accept() => accepted?,
            _ = &mut shutdown => {
                info!("shutdown requested, no longer accepting connections");
                break;
            }
        };
        let io = TokioIo::new(stream);
        let handler = Arc::clone(&handler);

        let service = service_fn(move |req: Request<Incoming>| {
            let handler = Arc::clone(&handler);
            let span = info_span!("request", request_id = %request_id(&req));

            async move {
                debug!(
                    method = %req.method(),
                    path = %req.uri().path(),
                    headers = ?req.headers(),
                    "request received"
                );
                let response = route(req, handler).await;
                if let Ok(response) = &response {
                    info!(status = response.status().as_u16(), "request completed");
                }
                response
            }
            .instrument(span)
        });

        let mut closing = closing_rx.clone();
        connections.spawn(async move {
            debug!(peer = ?peer_addr, "accepted connection");
            let conn = http1::Builder::new().serve_connection(io, service);
            tokio::pin!(conn);
            let result = tokio::select! {
                result = conn.as_mut() => result,
                _ = closing.changed() => {
                    conn.as_mut().graceful_shutdown();
                    conn.await
                }
            };
            if let Err(err) = result {
                warn!(error = ?err, "error serving connection");
            }
        });
        while connections.try_join_next().is_some() {}
    }

    let _ = closing_tx.send(true);
    let drained = tokio::time::timeout(DRAIN_TIMEOUT, async {
        while connections.join_next().await.is_some() {}
    })
    .await;
    if drained.is_err() {
        warn!(
            open_connections = connections.len(),
            "connections still open after drain timeout, aborting"
        );
        connections.abort_all();
    }
    Ok(())
}

use common::configuration::Configuration;
use common::traces::{TraceCollector, Tracer};
use pingrelay::handlers::downstream::HttpDownstream;
use pingrelay::handlers::ping::RelayHandler;
use pingrelay::server::serve;
use pingrelay::utils::tracing::init_logger;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "failed to listen for ctrl-c, running until killed");
        std::future::pending::<()>().await;
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    init_logger();

    let config = Configuration::from_env()?;
    info!(
        service = %config.service_name,
        next = ?config.next_service_url,
        collector = %config.tracing.collector_url,
        tracing_enabled = config.tracing.enabled,
        "loaded configuration"
    );

    // Initialize trace collector and start background flusher
    let collector = Arc::new(TraceCollector::new(
        &config.tracing,
        config.service_name.clone(),
    )?);
    let _flusher = collector.start_background_flusher();
    if !collector.is_enabled() {
        info!("trace export disabled, spans are discarded");
    }
    let tracer = Tracer::new(collector.clone());

    let downstream = Arc::new(HttpDownstream::new(config.relay_timeout)?);
    let handler = Arc::new(RelayHandler::new(
        config.service_name.clone(),
        config.next_service_url.clone(),
        tracer,
        downstream,
    ));

    let listener = TcpListener::bind(config.bind_address).await?;
    info!(address = %config.bind_address, "listening");

    // returns once in-flight requests are drained, so their spans are queued
    serve(listener, handler, shutdown_signal()).await?;

    if let Err(err) = collector.shutdown().await {
        warn!(error = %err, "failed to flush spans on shutdown");
    }
    info!(dropped_spans = collector.dropped_count(), "stopped");
    Ok(())
}

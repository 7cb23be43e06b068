use super::processor::SpanProcessor;
use super::resource_span_builder::ResourceSpanBuilder;
use super::shapes::ExportTraceServiceRequest;
use super::span::SpanData;
use crate::configuration::Tracing;
use crate::errors::ExportError;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::oneshot;
use tokio::time::{interval_at, Duration, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

enum Control {
    Flush(oneshot::Sender<Result<(), ExportError>>),
    Shutdown(oneshot::Sender<Result<(), ExportError>>),
}

struct Receivers {
    spans: mpsc::Receiver<SpanData>,
    control: mpsc::Receiver<Control>,
}

/// Batches finished spans and exports them to an OTLP/HTTP collector
///
/// `on_end` only enqueues; a background task started with
/// [`TraceCollector::start_background_flusher`] drains the queue every
/// `flush_interval`, or as soon as a full batch is waiting. When the queue is
/// full, new spans are dropped and counted instead of blocking the caller.
///
/// When tracing is disabled, span recording and flushing are no-ops.
pub struct TraceCollector {
    spans: mpsc::Sender<SpanData>,
    control: mpsc::Sender<Control>,
    receivers: Mutex<Option<Receivers>>,
    exporter: OtlpHttpExporter,
    flush_interval: Duration,
    max_export_batch_size: usize,
    enabled: bool,
    started: AtomicBool,
    shut_down: AtomicBool,
    dropped: AtomicUsize,
}

impl TraceCollector {
    pub fn new(config: &Tracing, service_name: impl Into<String>) -> Result<Self, ExportError> {
        let max_queue_size = config.max_queue_size.max(1);
        let (spans_tx, spans_rx) = mpsc::channel(max_queue_size);
        let (control_tx, control_rx) = mpsc::channel(8);

        let exporter = OtlpHttpExporter::new(
            config.collector_url.clone(),
            service_name.into(),
            config.export_timeout,
        )?;

        debug!(
            "TraceCollector initialized: flush_interval={:?}, url={}, enabled={}, max_queue_size={}",
            config.flush_interval, config.collector_url, config.enabled, max_queue_size
        );

        Ok(Self {
            spans: spans_tx,
            control: control_tx,
            receivers: Mutex::new(Some(Receivers {
                spans: spans_rx,
                control: control_rx,
            })),
            exporter,
            flush_interval: config.flush_interval.max(Duration::from_millis(1)),
            max_export_batch_size: config.max_export_batch_size.clamp(1, max_queue_size),
            enabled: config.enabled,
            started: AtomicBool::new(false),
            shut_down: AtomicBool::new(false),
            dropped: AtomicUsize::new(0),
        })
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Start the task that drains the queue and exports batches.
    /// Calling it again is a no-op that returns an already finished handle.
    pub fn start_background_flusher(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let receivers = self
            .receivers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        let Some(receivers) = receivers else {
            warn!("background trace flusher already started");
            return tokio::spawn(async {});
        };

        self.started.store(true, Ordering::Release);
        let worker = Worker {
            exporter: self.exporter.clone(),
            batch: Vec::with_capacity(self.max_export_batch_size),
            max_export_batch_size: self.max_export_batch_size,
        };
        tokio::spawn(worker.run(receivers, self.flush_interval))
    }

    /// Export everything queued so far and wait for the result
    pub async fn flush(&self) -> Result<(), ExportError> {
        if !self.enabled {
            return Ok(());
        }
        let (tx, rx) = oneshot::channel();
        self.send_control(Control::Flush(tx)).await?;
        rx.await.map_err(|_| ExportError::ShutDown)?
    }

    /// Flush remaining spans and stop the background flusher.
    /// Spans ending afterwards are dropped.
    pub async fn shutdown(&self) -> Result<(), ExportError> {
        if !self.enabled {
            return Ok(());
        }
        if !self.started.load(Ordering::Acquire) {
            return Err(ExportError::NotStarted);
        }
        if self.shut_down.swap(true, Ordering::AcqRel) {
            return Err(ExportError::ShutDown);
        }
        let (tx, rx) = oneshot::channel();
        self.control
            .send(Control::Shutdown(tx))
            .await
            .map_err(|_| ExportError::ShutDown)?;
        rx.await.map_err(|_| ExportError::ShutDown)?
    }

    async fn send_control(&self, message: Control) -> Result<(), ExportError> {
        if self.shut_down.load(Ordering::Acquire) {
            return Err(ExportError::ShutDown);
        }
        if !self.started.load(Ordering::Acquire) {
            return Err(ExportError::NotStarted);
        }
        self.control
            .send(message)
            .await
            .map_err(|_| ExportError::ShutDown)
    }

    /// Spans waiting in the queue (for testing/monitoring)
    pub fn queued_count(&self) -> usize {
        self.spans.max_capacity() - self.spans.capacity()
    }

    /// Spans discarded because the queue was full or the collector was shut down
    pub fn dropped_count(&self) -> usize {
        self.dropped.load(Ordering::Relaxed)
    }

    fn record_drop(&self, reason: &str) {
        let dropped = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
        if dropped == 1 {
            warn!("dropping span: {}", reason);
        } else {
            debug!("dropping span: {} (total dropped: {})", reason, dropped);
        }
    }
}

impl SpanProcessor for TraceCollector {
    fn on_end(&self, span: SpanData) {
        if !self.enabled {
            return;
        }
        if self.shut_down.load(Ordering::Acquire) {
            self.record_drop("trace collector is shut down");
            return;
        }
        match self.spans.try_send(span) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => self.record_drop("export queue is full"),
            Err(TrySendError::Closed(_)) => self.record_drop("export queue is closed"),
        }
    }
}

struct Worker {
    exporter: OtlpHttpExporter,
    batch: Vec<SpanData>,
    max_export_batch_size: usize,
}

impl Worker {
    async fn run(mut self, mut receivers: Receivers, flush_interval: Duration) {
        let mut ticker = interval_at(Instant::now() + flush_interval, flush_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                span = receivers.spans.recv() => match span {
                    Some(span) => {
                        self.batch.push(span);
                        if self.batch.len() >= self.max_export_batch_size {
                            let _ = self.export_pending().await;
                        }
                    }
                    None => {
                        let _ = self.export_pending().await;
                        break;
                    }
                },
                _ = ticker.tick() => {
                    let _ = self.export_pending().await;
                }
                Some(control) = receivers.control.recv() => {
                    if matches!(control, Control::Shutdown(_)) {
                        // spans racing the final drain fail `try_send` and are counted as dropped
                        receivers.spans.close();
                    }
                    while let Ok(span) = receivers.spans.try_recv() {
                        self.batch.push(span);
                    }
                    let result = self.export_pending().await;
                    match control {
                        Control::Flush(reply) => {
                            let _ = reply.send(result);
                        }
                        Control::Shutdown(reply) => {
                            info!("trace collector shut down");
                            let _ = reply.send(result);
                            break;
                        }
                    }
                }
            }
        }
    }

    /// Export pending spans in chunks of at most `max_export_batch_size`.
    /// A failed chunk is logged and dropped; the first failure is returned.
    async fn export_pending(&mut self) -> Result<(), ExportError> {
        let mut result = Ok(());
        while !self.batch.is_empty() {
            let take = self.batch.len().min(self.max_export_batch_size);
            let chunk: Vec<SpanData> = self.batch.drain(..take).collect();
            let count = chunk.len();
            match self.exporter.export(chunk).await {
                Ok(()) => debug!("Successfully flushed {} spans", count),
                Err(e) => {
                    warn!("Failed to send {} spans to trace collector: {}", count, e);
                    if result.is_ok() {
                        result = Err(e);
                    }
                }
            }
        }
        result
    }
}

/// Sends `{"resourceSpans": [...]}` to the collector endpoint
#[derive(Clone)]
struct OtlpHttpExporter {
    client: reqwest::Client,
    endpoint: Arc<str>,
    service_name: Arc<str>,
}

impl OtlpHttpExporter {
    fn new(endpoint: String, service_name: String, timeout: Duration) -> Result<Self, ExportError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            service_name: service_name.into(),
        })
    }

    async fn export(&self, spans: Vec<SpanData>) -> Result<(), ExportError> {
        let request = ExportTraceServiceRequest {
            resource_spans: vec![ResourceSpanBuilder::new(self.service_name.as_ref())
                .add_spans(spans)
                .build()],
        };
        let body = serde_json::to_vec(&request)?;

        let response = self
            .client
            .post(self.endpoint.as_ref())
            .header("Content-Type", "application/json")
            .body(body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ExportError::Rejected(response.status().as_u16()));
        }
        Ok(())
    }
}

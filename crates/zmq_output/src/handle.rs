//! SinkHandle - runs a sink on its own worker task behind a bounded queue

use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, instrument, warn};

use contracts::{Metric, MetricSink};

use crate::metrics::SinkMetrics;

/// Handle to a running sink worker
pub struct SinkHandle {
    /// Sink name
    name: String,
    /// Channel to send batches to worker
    tx: mpsc::Sender<Vec<Metric>>,
    /// Shared metrics
    metrics: Arc<SinkMetrics>,
    /// Worker task handle
    worker_handle: JoinHandle<()>,
}

impl SinkHandle {
    /// Spawn the worker with fresh metrics
    pub fn spawn<S: MetricSink + Send + 'static>(sink: S, queue_capacity: usize) -> Self {
        Self::spawn_with_metrics(sink, queue_capacity, Arc::new(SinkMetrics::new()))
    }

    /// Spawn the worker, reporting into `metrics` (typically the sink's own)
    pub fn spawn_with_metrics<S: MetricSink + Send + 'static>(
        sink: S,
        queue_capacity: usize,
        metrics: Arc<SinkMetrics>,
    ) -> Self {
        let name = sink.name().to_string();
        let (tx, rx) = mpsc::channel(queue_capacity.max(1));

        let worker_metrics = Arc::clone(&metrics);
        let worker_name = name.clone();

        let worker_handle = tokio::spawn(async move {
            sink_worker(sink, rx, worker_metrics, worker_name).await;
        });

        Self {
            name,
            tx,
            metrics,
            worker_handle,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn metrics(&self) -> &Arc<SinkMetrics> {
        &self.metrics
    }

    /// Queue a batch (non-blocking)
    ///
    /// Returns true if queued, false if the queue is full (batch dropped)
    pub fn try_send(&self, batch: Vec<Metric>) -> bool {
        match self.tx.try_send(batch) {
            Ok(()) => {
                self.metrics
                    .set_queue_len(self.tx.max_capacity() - self.tx.capacity());
                true
            }
            Err(mpsc::error::TrySendError::Full(b)) => {
                self.metrics.inc_dropped_count();
                warn!(sink = %self.name, size = b.len(), "Queue full, batch dropped");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                error!(sink = %self.name, "Sink worker closed unexpectedly");
                false
            }
        }
    }

    /// Queue a batch, waiting for room
    ///
    /// Returns false if the worker has stopped.
    pub async fn send(&self, batch: Vec<Metric>) -> bool {
        if self.tx.send(batch).await.is_err() {
            error!(sink = %self.name, "Sink worker closed unexpectedly");
            return false;
        }
        true
    }

    /// Drain queued batches, close the sink and wait for the worker
    #[instrument(name = "sink_handle_shutdown", skip(self), fields(sink = %self.name))]
    pub async fn shutdown(self) {
        drop(self.tx);
        if let Err(e) = self.worker_handle.await {
            error!(sink = %self.name, error = ?e, "Worker task panicked");
        }
        debug!(sink = %self.name, "SinkHandle shutdown complete");
    }
}

/// Worker task that consumes batches and writes them to the sink
#[instrument(name = "sink_worker_loop", skip(sink, rx, metrics), fields(sink = %name))]
async fn sink_worker<S: MetricSink>(
    mut sink: S,
    mut rx: mpsc::Receiver<Vec<Metric>>,
    metrics: Arc<SinkMetrics>,
    name: String,
) {
    debug!(sink = %name, "Sink worker started");

    while let Some(batch) = rx.recv().await {
        metrics.set_queue_len(rx.len());

        match sink.write(&batch).await {
            Ok(()) => {
                metrics.inc_batches_written();
                observability::record_batch_dispatched(&name, true);
            }
            Err(e) => {
                metrics.inc_failed_batches();
                observability::record_batch_dispatched(&name, false);
                error!(
                    sink = %name,
                    size = batch.len(),
                    kind = e.kind().as_str(),
                    error = %e,
                    "Write failed"
                );
                // Keep going; the next batch gets a fresh attempt
            }
        }
    }

    if let Err(e) = sink.close().await {
        warn!(sink = %name, error = %e, "Close failed on shutdown");
    }

    debug!(sink = %name, "Sink worker stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::ForwarderError;
    use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
    use tokio::time::{sleep, Duration};

    /// Mock sink for testing
    struct MockSink {
        name: String,
        metric_count: Arc<AtomicU64>,
        closed: Arc<AtomicBool>,
        should_fail: bool,
        delay_ms: u64,
    }

    impl MockSink {
        fn new(name: &str) -> Self {
            Self {
                name: name.to_string(),
                metric_count: Arc::new(AtomicU64::new(0)),
                closed: Arc::new(AtomicBool::new(false)),
                should_fail: false,
                delay_ms: 0,
            }
        }
    }

    impl MetricSink for MockSink {
        fn name(&self) -> &str {
            &self.name
        }

        async fn connect(&mut self) -> Result<(), ForwarderError> {
            Ok(())
        }

        async fn write(&mut self, metrics: &[Metric]) -> Result<(), ForwarderError> {
            if self.delay_ms > 0 {
                sleep(Duration::from_millis(self.delay_ms)).await;
            }
            if self.should_fail {
                return Err(ForwarderError::WouldBlock {
                    endpoint: "inproc://mock".to_string(),
                });
            }
            self.metric_count
                .fetch_add(metrics.len() as u64, Ordering::Relaxed);
            Ok(())
        }

        async fn close(&mut self) -> Result<(), ForwarderError> {
            self.closed.store(true, Ordering::Relaxed);
            Ok(())
        }
    }

    fn batch(n: usize) -> Vec<Metric> {
        (0..n).map(|i| Metric::new(format!("m{i}"))).collect()
    }

    #[tokio::test]
    async fn test_sink_handle_basic() {
        let sink = MockSink::new("test");
        let count = Arc::clone(&sink.metric_count);
        let closed = Arc::clone(&sink.closed);

        let handle = SinkHandle::spawn(sink, 10);
        for _ in 0..5 {
            assert!(handle.try_send(batch(2)));
        }
        let metrics = Arc::clone(handle.metrics());

        handle.shutdown().await;
        assert_eq!(count.load(Ordering::Relaxed), 10);
        assert_eq!(metrics.batches_written(), 5);
        assert!(closed.load(Ordering::Relaxed));
    }

    #[tokio::test]
    async fn test_sink_handle_queue_full() {
        let mut sink = MockSink::new("slow");
        sink.delay_ms = 100;

        let handle = SinkHandle::spawn(sink, 2);
        for _ in 0..10 {
            handle.try_send(batch(1));
        }

        assert!(handle.metrics().dropped_count() > 0);
        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_sink_handle_failure_isolation() {
        let mut sink = MockSink::new("failing");
        sink.should_fail = true;

        let handle = SinkHandle::spawn(sink, 10);
        for _ in 0..3 {
            handle.try_send(batch(1));
        }
        let metrics = Arc::clone(handle.metrics());

        handle.shutdown().await;
        assert_eq!(metrics.failed_batches(), 3);
        assert_eq!(metrics.batches_written(), 0);
    }

    #[tokio::test]
    async fn test_send_waits_for_room() {
        let mut sink = MockSink::new("slow");
        sink.delay_ms = 10;
        let count = Arc::clone(&sink.metric_count);

        let handle = SinkHandle::spawn(sink, 1);
        for _ in 0..4 {
            assert!(handle.send(batch(1)).await);
        }

        handle.shutdown().await;
        assert_eq!(count.load(Ordering::Relaxed), 4);
    }
}

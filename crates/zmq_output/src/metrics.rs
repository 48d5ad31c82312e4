//! Sink metrics for observability

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Metrics for a single sink
#[derive(Debug, Default)]
pub struct SinkMetrics {
    /// Current queue length (batches)
    queue_len: AtomicUsize,
    /// Batches fully written
    batches_written: AtomicU64,
    /// Batches aborted by an error
    failed_batches: AtomicU64,
    /// Envelopes accepted by the socket
    payloads_sent: AtomicU64,
    /// Payload bytes accepted by the socket
    bytes_sent: AtomicU64,
    /// Envelope send failures of any kind
    send_failures: AtomicU64,
    /// Send failures caused by a full outbound buffer
    would_block_count: AtomicU64,
    /// Batches dropped due to full queue
    dropped_count: AtomicU64,
}

impl SinkMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn queue_len(&self) -> usize {
        self.queue_len.load(Ordering::Relaxed)
    }

    pub fn set_queue_len(&self, len: usize) {
        self.queue_len.store(len, Ordering::Relaxed);
    }

    pub fn batches_written(&self) -> u64 {
        self.batches_written.load(Ordering::Relaxed)
    }

    pub fn inc_batches_written(&self) {
        self.batches_written.fetch_add(1, Ordering::Relaxed);
    }

    pub fn failed_batches(&self) -> u64 {
        self.failed_batches.load(Ordering::Relaxed)
    }

    pub fn inc_failed_batches(&self) {
        self.failed_batches.fetch_add(1, Ordering::Relaxed);
    }

    pub fn payloads_sent(&self) -> u64 {
        self.payloads_sent.load(Ordering::Relaxed)
    }

    pub fn bytes_sent(&self) -> u64 {
        self.bytes_sent.load(Ordering::Relaxed)
    }

    /// Record one accepted envelope carrying `bytes` payload bytes
    pub fn record_sent(&self, bytes: usize) {
        self.payloads_sent.fetch_add(1, Ordering::Relaxed);
        self.bytes_sent.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    pub fn send_failures(&self) -> u64 {
        self.send_failures.load(Ordering::Relaxed)
    }

    pub fn would_block_count(&self) -> u64 {
        self.would_block_count.load(Ordering::Relaxed)
    }

    /// Record a failed envelope send
    pub fn record_send_failure(&self, would_block: bool) {
        self.send_failures.fetch_add(1, Ordering::Relaxed);
        if would_block {
            self.would_block_count.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn dropped_count(&self) -> u64 {
        self.dropped_count.load(Ordering::Relaxed)
    }

    pub fn inc_dropped_count(&self) {
        self.dropped_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot of all metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            queue_len: self.queue_len(),
            batches_written: self.batches_written(),
            failed_batches: self.failed_batches(),
            payloads_sent: self.payloads_sent(),
            bytes_sent: self.bytes_sent(),
            send_failures: self.send_failures(),
            would_block_count: self.would_block_count(),
            dropped_count: self.dropped_count(),
        }
    }
}

/// Snapshot of sink metrics (for reporting)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub queue_len: usize,
    pub batches_written: u64,
    pub failed_batches: u64,
    pub payloads_sent: u64,
    pub bytes_sent: u64,
    pub send_failures: u64,
    pub would_block_count: u64,
    pub dropped_count: u64,
}

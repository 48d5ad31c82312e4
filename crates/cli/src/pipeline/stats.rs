//! Pipeline statistics.

use std::time::Duration;

use observability::ForwardStatsAggregator;
use zmq_output::{MetricsSnapshot, ShutdownReport};

/// Statistics from a forwarder run
#[derive(Debug, Clone, Default)]
pub struct PipelineStats {
    /// Metrics parsed from the input
    pub metrics_read: u64,

    /// Input lines that did not parse as a metric
    pub parse_errors: u64,

    /// Batches cut from the input
    pub batches: u64,

    /// Total duration of the run
    pub duration: Duration,

    /// Per-output counters at shutdown
    pub sinks: Vec<(String, MetricsSnapshot)>,

    /// Dispatch aggregation across outputs
    pub forward: ForwardStatsAggregator,

    /// Result of the final shutdown sweep
    pub shutdown: ShutdownReport,
}

impl PipelineStats {
    /// Metrics read per second
    pub fn metrics_per_sec(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.metrics_read as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        println!("\n=== Forwarder Statistics ===\n");

        println!("Overview");
        println!("   ├─ Duration: {:.2}s", self.duration.as_secs_f64());
        println!("   ├─ Metrics read: {}", self.metrics_read);
        println!("   ├─ Parse errors: {}", self.parse_errors);
        println!("   ├─ Batches: {}", self.batches);
        println!("   └─ Rate: {:.2} metrics/s", self.metrics_per_sec());

        for (name, s) in &self.sinks {
            println!("\nOutput '{}'", name);
            println!("   ├─ Envelopes sent: {}", s.payloads_sent);
            println!("   ├─ Bytes sent: {}", s.bytes_sent);
            println!("   ├─ Batches written: {}", s.batches_written);
            println!("   ├─ Batches failed: {}", s.failed_batches);
            println!("   ├─ Batches dropped: {}", s.dropped_count);
            println!(
                "   └─ Send failures: {} (would block: {})",
                s.send_failures, s.would_block_count
            );
        }

        println!("\n{}", self.forward.summary());

        println!(
            "Shutdown: {} closed, {} already closed, {} never connected, {} failed",
            self.shutdown.closed,
            self.shutdown.already_closed,
            self.shutdown.never_connected,
            self.shutdown.failed
        );
        println!();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate() {
        let stats = PipelineStats {
            metrics_read: 50,
            duration: Duration::from_secs(2),
            ..Default::default()
        };
        assert!((stats.metrics_per_sec() - 25.0).abs() < 1e-10);
        assert_eq!(PipelineStats::default().metrics_per_sec(), 0.0);
    }
}

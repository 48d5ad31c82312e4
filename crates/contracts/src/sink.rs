//! MetricSink trait - output interface
//!
//! Defines the abstract interface for metric outputs.

use crate::{ForwarderError, Metric};

/// Metric output trait
///
/// All output implementations must implement this trait.
#[trait_variant::make(MetricSink: Send)]
pub trait LocalMetricSink {
    /// Sink name (used for logging/metrics)
    fn name(&self) -> &str;

    /// Establish the connection to the remote end
    async fn connect(&mut self) -> Result<(), ForwarderError>;

    /// Write a batch of metrics
    ///
    /// # Errors
    /// Returns the first failure (should include context); metrics before
    /// the failing one have already been delivered.
    async fn write(&mut self, metrics: &[Metric]) -> Result<(), ForwarderError>;

    /// Close sink
    async fn close(&mut self) -> Result<(), ForwarderError>;
}

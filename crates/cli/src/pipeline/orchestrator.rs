//! Pipeline orchestrator - wires input, outputs and teardown together.
//!
//! One `SinkHandle` worker per configured output, each with its own socket
//! and identity. Every session registers with a single `ShutdownList` owned
//! here, which is swept once after the workers have drained.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use contracts::{ErrorKind, ForwarderConfig, Metric, MetricSink, OutputConfig};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tracing::{debug, info, warn};
use zmq_output::{DefaultZmqSink, ShutdownList, SinkHandle};

use super::PipelineStats;
use crate::error::CliError;

/// Pipeline configuration
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Validated forwarder configuration
    pub forwarder: ForwarderConfig,

    /// JSON-lines input (None = stdin)
    pub input: Option<PathBuf>,

    /// Metrics per batch
    pub batch_size: usize,

    /// Stop after this many metrics (None = unlimited)
    pub max_metrics: Option<u64>,

    /// Metrics server port (None = disabled)
    pub metrics_port: Option<u16>,
}

/// Main pipeline orchestrator
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Forward until the input ends, the metric limit is hit or `stop`
    /// resolves. Outputs are always drained and swept before returning.
    pub async fn run<F>(self, stop: F) -> Result<PipelineStats>
    where
        F: Future<Output = ()>,
    {
        let start_time = Instant::now();

        if let Some(port) = self.config.metrics_port {
            observability::init_metrics_only(port)?;
            info!("Metrics endpoint available on port {}", port);
        }

        let reader = open_input(self.config.input.as_deref()).await?;

        let shutdown = Arc::new(ShutdownList::new());
        let handles = match start_outputs(&self.config.forwarder, &shutdown).await {
            Ok(handles) => handles,
            Err(e) => {
                shutdown.close_all();
                return Err(e);
            }
        };
        info!(outputs = handles.len(), "Outputs started");

        let mut stats = PipelineStats::default();
        let result = forward(
            reader,
            &handles,
            &mut stats,
            self.config.batch_size,
            self.config.max_metrics,
            stop,
        )
        .await;

        info!("Shutting down outputs...");
        drain_outputs(handles, &mut stats).await;
        stats.shutdown = shutdown.close_all();
        stats.duration = start_time.elapsed();

        result.map(|()| stats)
    }
}

async fn open_input(path: Option<&Path>) -> Result<Box<dyn AsyncBufRead + Unpin + Send>> {
    match path {
        Some(path) => {
            let file = tokio::fs::File::open(path)
                .await
                .with_context(|| format!("Failed to open input {}", path.display()))?;
            info!(input = %path.display(), "Reading metrics from file");
            Ok(Box::new(BufReader::new(file)))
        }
        None => {
            info!("Reading metrics from stdin");
            Ok(Box::new(BufReader::new(tokio::io::stdin())))
        }
    }
}

/// Open, connect and spawn every output; on failure the ones already
/// running are shut down again.
async fn start_outputs(
    config: &ForwarderConfig,
    shutdown: &Arc<ShutdownList>,
) -> Result<Vec<SinkHandle>> {
    let mut handles = Vec::with_capacity(config.outputs.len());
    for output in &config.outputs {
        match start_output(output, shutdown).await {
            Ok(handle) => handles.push(handle),
            Err(e) => {
                for handle in handles {
                    handle.shutdown().await;
                }
                return Err(e);
            }
        }
    }
    Ok(handles)
}

async fn start_output(output: &OutputConfig, shutdown: &Arc<ShutdownList>) -> Result<SinkHandle> {
    let mut sink = DefaultZmqSink::open(output, Arc::clone(shutdown))
        .map_err(|e| CliError::output_start(&output.name, e.to_string()))?;
    MetricSink::connect(&mut sink)
        .await
        .map_err(|e| CliError::output_start(&output.name, e.to_string()))?;

    info!(
        output = %output.name,
        endpoint = %output.endpoint,
        identity = ?sink.session().identity().map(ToString::to_string),
        "Output connected"
    );

    let metrics = Arc::clone(sink.metrics());
    Ok(SinkHandle::spawn_with_metrics(
        sink,
        output.queue_capacity,
        metrics,
    ))
}

/// Read JSON-lines metrics and hand them to every output in batches
pub(crate) async fn forward<R, F>(
    reader: R,
    handles: &[SinkHandle],
    stats: &mut PipelineStats,
    batch_size: usize,
    max_metrics: Option<u64>,
    stop: F,
) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    F: Future<Output = ()>,
{
    let batch_size = batch_size.max(1);
    let mut lines = reader.lines();
    let mut batch = Vec::with_capacity(batch_size);
    let mut line_no = 0u64;
    tokio::pin!(stop);

    let outcome = loop {
        if max_metrics.is_some_and(|max| stats.metrics_read >= max) {
            info!(metrics = stats.metrics_read, "Reached max metrics limit");
            break Ok(());
        }

        let next = tokio::select! {
            biased;
            _ = &mut stop => {
                info!("Stop requested");
                break Ok(());
            }
            next = lines.next_line() => next,
        };

        let line = match next {
            Ok(Some(line)) => line,
            Ok(None) => break Ok(()),
            Err(e) => break Err(anyhow::Error::new(e).context("Failed to read input")),
        };
        line_no += 1;

        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match serde_json::from_str::<Metric>(line) {
            Ok(metric) => {
                stats.metrics_read += 1;
                batch.push(metric);
            }
            Err(e) => {
                stats.parse_errors += 1;
                warn!(error = %CliError::input(line_no, e.to_string()), "Skipping malformed metric");
                continue;
            }
        }

        if batch.len() >= batch_size {
            dispatch(std::mem::take(&mut batch), handles, stats).await;
        }
    };

    if !batch.is_empty() {
        dispatch(batch, handles, stats).await;
    }
    outcome
}

async fn dispatch(batch: Vec<Metric>, handles: &[SinkHandle], stats: &mut PipelineStats) {
    let size = batch.len();
    stats.batches += 1;
    debug!(size, outputs = handles.len(), "Dispatching batch");

    for handle in handles {
        let accepted = handle.send(batch.clone()).await;
        stats.forward.record_batch(size, accepted);
    }
}

async fn drain_outputs(handles: Vec<SinkHandle>, stats: &mut PipelineStats) {
    for handle in handles {
        let name = handle.name().to_string();
        let metrics = Arc::clone(handle.metrics());
        handle.shutdown().await;

        let snapshot = metrics.snapshot();
        stats.forward.record_failed_batches(snapshot.failed_batches);
        stats
            .forward
            .record_failures(ErrorKind::WouldBlock, snapshot.would_block_count);
        stats.forward.record_failures(
            ErrorKind::Transport,
            snapshot
                .send_failures
                .saturating_sub(snapshot.would_block_count),
        );
        stats.sinks.push((name, snapshot));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{Endpoint, Identity};
    use serializers::InfluxSerializer;
    use zmq_output::mock::MockTransport;
    use zmq_output::{Sender, Session, ZmqSink};

    fn mock_handle(mock: &MockTransport, queue: usize) -> SinkHandle {
        let mut session = Session::new(mock.clone(), Endpoint::parse("inproc://broker").unwrap())
            .with_identity(Identity::unknown());
        session.connect().unwrap();
        let sink = ZmqSink::new("mock", session, Sender::default(), InfluxSerializer::new());
        let metrics = Arc::clone(sink.metrics());
        SinkHandle::spawn_with_metrics(sink, queue, metrics)
    }

    const INPUT: &str = r#"{"name":"cpu","fields":{"value":1},"timestamp":1}
{"name":"cpu","fields":{"value":2},"timestamp":2}

not json
{"name":"mem","fields":{"used":0.5},"timestamp":3}
"#;

    #[tokio::test]
    async fn test_forward_batches_and_skips_garbage() {
        let mock = MockTransport::new();
        let handles = vec![mock_handle(&mock, 4)];
        let mut stats = PipelineStats::default();

        forward(INPUT.as_bytes(), &handles, &mut stats, 2, None, std::future::pending())
            .await
            .unwrap();
        drain_outputs(handles, &mut stats).await;

        assert_eq!(stats.metrics_read, 3);
        assert_eq!(stats.parse_errors, 1);
        assert_eq!(stats.batches, 2);

        let payloads: Vec<Vec<u8>> = mock.envelopes().into_iter().map(|e| e[3].clone()).collect();
        assert_eq!(payloads.len(), 3);
        assert!(payloads[0].starts_with(b"cpu value=1i"));
        assert!(payloads[2].starts_with(b"mem used=0.5"));
        assert!(payloads.iter().all(|p| p.ends_with(b"\n")));

        let (name, snapshot) = &stats.sinks[0];
        assert_eq!(name, "mock");
        assert_eq!(snapshot.batches_written, 2);
        assert_eq!(snapshot.payloads_sent, 3);
        assert!(mock.is_closed());
    }

    #[tokio::test]
    async fn test_forward_fans_out_to_every_output() {
        let first = MockTransport::new();
        let second = MockTransport::new();
        let handles = vec![mock_handle(&first, 4), mock_handle(&second, 4)];
        let mut stats = PipelineStats::default();

        forward(INPUT.as_bytes(), &handles, &mut stats, 10, None, std::future::pending())
            .await
            .unwrap();
        drain_outputs(handles, &mut stats).await;

        assert_eq!(first.envelopes().len(), 3);
        assert_eq!(second.envelopes().len(), 3);
        assert_eq!(stats.forward.summary().total_batches, 2);
    }

    #[tokio::test]
    async fn test_max_metrics_limit() {
        let mock = MockTransport::new();
        let handles = vec![mock_handle(&mock, 4)];
        let mut stats = PipelineStats::default();

        forward(INPUT.as_bytes(), &handles, &mut stats, 10, Some(2), std::future::pending())
            .await
            .unwrap();
        drain_outputs(handles, &mut stats).await;

        assert_eq!(stats.metrics_read, 2);
        assert_eq!(mock.envelopes().len(), 2);
    }

    #[tokio::test]
    async fn test_stop_before_reading() {
        let mock = MockTransport::new();
        let handles = vec![mock_handle(&mock, 4)];
        let mut stats = PipelineStats::default();

        forward(INPUT.as_bytes(), &handles, &mut stats, 10, None, std::future::ready(()))
            .await
            .unwrap();
        drain_outputs(handles, &mut stats).await;

        assert_eq!(stats.metrics_read, 0);
        assert_eq!(mock.send_count(), 0);
    }

    #[tokio::test]
    async fn test_would_block_counted_in_summary() {
        let mock = MockTransport::new();
        mock.set_would_block(true);
        let handles = vec![mock_handle(&mock, 4)];
        let mut stats = PipelineStats::default();

        forward(INPUT.as_bytes(), &handles, &mut stats, 1, None, std::future::pending())
            .await
            .unwrap();
        drain_outputs(handles, &mut stats).await;

        let summary = stats.forward.summary();
        assert_eq!(summary.failed_batches, 3);
        assert_eq!(summary.failure_counts.get("would_block"), Some(&3));
    }
}

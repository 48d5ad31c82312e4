//! ZmqSink - metric batches in, envelopes out

use std::sync::Arc;

use bytes::Bytes;
use contracts::{
    ErrorKind, ForwarderError, Identity, Metric, MetricSink, OutputConfig, Serializer,
    ServiceName,
};
use tracing::{debug, info, instrument, warn};

use crate::metrics::SinkMetrics;
use crate::sender::Sender;
use crate::session::Session;
use crate::shutdown::ShutdownList;
use crate::transport::{SocketOptions, Transport, ZmqTransport};

/// Longest payload excerpt carried by a write error
pub const MAX_SNIPPET_CHARS: usize = 120;

/// The production sink: a libzmq socket and the configured serializer
pub type DefaultZmqSink = ZmqSink<ZmqTransport, Box<dyn Serializer>>;

/// ZeroMQ metric output
pub struct ZmqSink<T: Transport, S: Serializer> {
    name: String,
    service: ServiceName,
    session: Session<T>,
    sender: Sender,
    serializer: S,
    metrics: Arc<SinkMetrics>,
}

impl<T: Transport + 'static, S: Serializer> ZmqSink<T, S> {
    pub fn new(name: impl Into<String>, session: Session<T>, sender: Sender, serializer: S) -> Self {
        Self {
            name: name.into(),
            service: ServiceName::default(),
            session,
            sender,
            serializer,
            metrics: Arc::new(SinkMetrics::new()),
        }
    }

    /// Build an unconnected sink for `config` over `transport`
    pub fn from_config(
        config: &OutputConfig,
        transport: T,
        serializer: S,
        shutdown: Arc<ShutdownList>,
    ) -> Self {
        let mut session =
            Session::new(transport, config.endpoint.clone()).with_shutdown_list(shutdown);
        if let Some(identity) = &config.identity {
            session = session.with_identity(Identity::new(identity.as_str()));
        }

        Self::new(&config.name, session, Sender::new(config.delivery), serializer)
            .with_service(config.service.clone())
    }

    pub fn with_service(mut self, service: ServiceName) -> Self {
        self.service = service;
        self
    }

    pub fn service(&self) -> &ServiceName {
        &self.service
    }

    pub fn session(&self) -> &Session<T> {
        &self.session
    }

    pub fn metrics(&self) -> &Arc<SinkMetrics> {
        &self.metrics
    }

    /// Connect the underlying session
    pub fn open_session(&mut self) -> Result<(), ForwarderError> {
        self.session.connect()
    }

    /// Serialize and send every metric in order, stopping at the first
    /// failure. Returns the number of envelopes sent.
    ///
    /// # Errors
    /// - `Serialize` from the serializer, unchanged
    /// - `Write` wrapping the send failure, with a payload excerpt
    pub fn write_batch(&mut self, metrics: &[Metric]) -> Result<usize, ForwarderError> {
        if metrics.is_empty() {
            return Ok(0);
        }

        let mut sent = 0;
        for metric in metrics {
            let payloads = self.serializer.serialize(metric).inspect_err(|e| {
                warn!(sink = %self.name, metric = %metric.name, error = %e, "serialize failed");
            })?;

            for payload in payloads {
                let mut line = payload;
                line.push('\n');
                let line = Bytes::from(line);

                match self
                    .sender
                    .send(&self.session, self.service.as_str(), line.clone())
                {
                    Ok(bytes) => {
                        self.metrics.record_sent(bytes);
                        observability::record_envelope_sent(&self.name, bytes);
                        sent += 1;
                    }
                    Err(e) => {
                        let kind = e.kind();
                        self.metrics.record_send_failure(kind == ErrorKind::WouldBlock);
                        observability::record_send_failure(&self.name, kind);
                        return Err(ForwarderError::write(payload_snippet(&line), e));
                    }
                }
            }
        }

        debug!(sink = %self.name, metrics = metrics.len(), envelopes = sent, "batch written");
        Ok(sent)
    }

    /// Release the socket
    pub fn close_session(&mut self) -> Result<(), ForwarderError> {
        self.session.close()
    }
}

impl DefaultZmqSink {
    /// Create the DEALER socket and serializer `config` asks for.
    ///
    /// # Errors
    /// `Connect` if the socket cannot be created or configured.
    pub fn open(config: &OutputConfig, shutdown: Arc<ShutdownList>) -> Result<Self, ForwarderError> {
        let transport = ZmqTransport::new(SocketOptions::from(config))
            .map_err(|e| ForwarderError::connect(config.endpoint.as_str(), e.to_string()))?;
        let serializer = serializers::create_serializer(config);

        info!(
            sink = %config.name,
            endpoint = %config.endpoint,
            format = serializer.format_name(),
            "ZeroMQ output created"
        );
        Ok(Self::from_config(config, transport, serializer, shutdown))
    }
}

impl<T, S> MetricSink for ZmqSink<T, S>
where
    T: Transport + 'static,
    S: Serializer,
{
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(name = "zmq_sink_connect", skip(self), fields(sink = %self.name))]
    async fn connect(&mut self) -> Result<(), ForwarderError> {
        self.open_session()
    }

    #[instrument(name = "zmq_sink_write", skip(self, metrics), fields(sink = %self.name, count = metrics.len()))]
    async fn write(&mut self, metrics: &[Metric]) -> Result<(), ForwarderError> {
        self.write_batch(metrics).map(|_| ())
    }

    #[instrument(name = "zmq_sink_close", skip(self), fields(sink = %self.name))]
    async fn close(&mut self) -> Result<(), ForwarderError> {
        self.close_session()
    }
}

/// Payload text for error context, newline stripped, at most
/// [`MAX_SNIPPET_CHARS`] characters
fn payload_snippet(payload: &[u8]) -> String {
    let text = String::from_utf8_lossy(payload);
    let text = text.trim_end_matches('\n');
    if text.chars().count() <= MAX_SNIPPET_CHARS {
        return text.to_string();
    }
    let mut snippet: String = text.chars().take(MAX_SNIPPET_CHARS - 3).collect();
    snippet.push_str("...");
    snippet
}

//! ForwarderConfig - Config Loader output
//!
//! Describes every ZeroMQ output: broker endpoint, service token, data
//! format and socket tuning.

use serde::{Deserialize, Serialize};

use crate::{Endpoint, ServiceName};

/// Config version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// Complete forwarder configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForwarderConfig {
    /// Config version
    #[serde(default)]
    pub version: ConfigVersion,

    /// Output definitions
    pub outputs: Vec<OutputConfig>,
}

/// One ZeroMQ output (one session, one socket)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Output name
    pub name: String,

    /// Broker address (e.g., "tcp://127.0.0.1:9999")
    pub endpoint: Endpoint,

    /// Service token carried in every envelope
    #[serde(default)]
    pub service: ServiceName,

    /// Payload serialization format
    #[serde(default)]
    pub data_format: DataFormat,

    /// Send mode for the payload frame
    #[serde(default)]
    pub delivery: DeliveryMode,

    /// Socket linger on close, in milliseconds (-1 = wait forever)
    #[serde(default = "default_linger_ms")]
    pub linger_ms: i32,

    /// Outbound high water mark (None = transport default)
    #[serde(default)]
    pub send_high_water_mark: Option<i32>,

    /// Routing identity override (None = host name)
    #[serde(default)]
    pub identity: Option<String>,

    /// Metric path prefix for the graphite format
    #[serde(default)]
    pub graphite_prefix: Option<String>,

    /// Worker queue capacity, in batches
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

impl OutputConfig {
    /// Config with defaults for everything but name and endpoint
    pub fn new(name: impl Into<String>, endpoint: Endpoint) -> Self {
        Self {
            name: name.into(),
            endpoint,
            service: ServiceName::default(),
            data_format: DataFormat::default(),
            delivery: DeliveryMode::default(),
            linger_ms: default_linger_ms(),
            send_high_water_mark: None,
            identity: None,
            graphite_prefix: None,
            queue_capacity: default_queue_capacity(),
        }
    }
}

fn default_linger_ms() -> i32 {
    1000
}

fn default_queue_capacity() -> usize {
    100
}

/// Payload serialization format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataFormat {
    /// InfluxDB line protocol
    #[default]
    Influx,
    /// Graphite plaintext, one line per field
    Graphite,
    /// One JSON object per metric
    Json,
}

/// How the final (payload) frame is handed to the socket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryMode {
    /// Fail immediately when the outbound buffer is full
    #[default]
    NonBlocking,
    /// Wait for buffer space
    Blocking,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_defaults() {
        let json = r#"{ "name": "zmq", "endpoint": "tcp://127.0.0.1:9999" }"#;
        let cfg: OutputConfig = serde_json::from_str(json).unwrap();

        assert_eq!(cfg.service, "telegraf");
        assert_eq!(cfg.data_format, DataFormat::Influx);
        assert_eq!(cfg.delivery, DeliveryMode::NonBlocking);
        assert_eq!(cfg.linger_ms, 1000);
        assert_eq!(cfg.queue_capacity, 100);
        assert!(cfg.identity.is_none());
    }

    #[test]
    fn test_enum_names() {
        let cfg: OutputConfig = serde_json::from_str(
            r#"{ "name": "g", "endpoint": "ipc:///tmp/b", "data_format": "graphite", "delivery": "blocking" }"#,
        )
        .unwrap();
        assert_eq!(cfg.data_format, DataFormat::Graphite);
        assert_eq!(cfg.delivery, DeliveryMode::Blocking);
    }
}

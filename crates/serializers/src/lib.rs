//! # Serializers
//!
//! Metric serializers producing the opaque payload strings the ZeroMQ
//! output forwards.
//!
//! - `influx`: InfluxDB line protocol, one line per metric
//! - `graphite`: graphite plaintext, one line per numeric field
//! - `json`: one JSON object per metric

mod graphite;
mod influx;
mod json;

pub use graphite::GraphiteSerializer;
pub use influx::InfluxSerializer;
pub use json::JsonSerializer;

use contracts::{DataFormat, OutputConfig, Serializer};

/// Build the serializer an output is configured for
pub fn create_serializer(config: &OutputConfig) -> Box<dyn Serializer> {
    match config.data_format {
        DataFormat::Influx => Box::new(InfluxSerializer::new()),
        DataFormat::Graphite => Box::new(GraphiteSerializer::new(
            config.graphite_prefix.clone().unwrap_or_default(),
        )),
        DataFormat::Json => Box::new(JsonSerializer::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::Endpoint;

    #[test]
    fn test_factory_follows_data_format() {
        let mut config = OutputConfig::new("out", Endpoint::parse("inproc://broker").unwrap());
        assert_eq!(create_serializer(&config).format_name(), "influx");

        config.data_format = DataFormat::Graphite;
        assert_eq!(create_serializer(&config).format_name(), "graphite");

        config.data_format = DataFormat::Json;
        assert_eq!(create_serializer(&config).format_name(), "json");
    }
}

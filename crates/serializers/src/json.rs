//! JSON - one object per metric

use contracts::{ForwarderError, Metric, Serializer};
use serde_json::json;

/// JSON serializer, timestamps in whole seconds
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSerializer;

impl JsonSerializer {
    pub fn new() -> Self {
        Self
    }
}

impl Serializer for JsonSerializer {
    fn format_name(&self) -> &str {
        "json"
    }

    fn serialize(&self, metric: &Metric) -> Result<Vec<String>, ForwarderError> {
        let obj = json!({
            "name": metric.name,
            "tags": metric.tags,
            "fields": metric.fields,
            "timestamp": metric.timestamp_secs(),
        });

        serde_json::to_string(&obj)
            .map(|s| vec![s])
            .map_err(|e| ForwarderError::serialize(&metric.name, format!("json error: {e}")))
    }
}

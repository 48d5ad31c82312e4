//! InfluxDB line protocol
//!
//! `measurement[,tag=value...] field=value[,field=value...] timestamp_ns`

use std::fmt::Write;

use contracts::{FieldValue, ForwarderError, Metric, Serializer};
use tracing::trace;

/// Line protocol serializer
#[derive(Debug, Clone, Copy, Default)]
pub struct InfluxSerializer;

impl InfluxSerializer {
    pub fn new() -> Self {
        Self
    }

    fn write_fields(line: &mut String, metric: &Metric) -> usize {
        let mut written = 0;
        for (key, value) in &metric.fields {
            let Some(encoded) = encode_field_value(value) else {
                trace!(metric = %metric.name, field = %key, "skipping non-finite field");
                continue;
            };
            line.push(if written == 0 { ' ' } else { ',' });
            line.push_str(&escape_key(key));
            line.push('=');
            line.push_str(&encoded);
            written += 1;
        }
        written
    }
}

impl Serializer for InfluxSerializer {
    fn format_name(&self) -> &str {
        "influx"
    }

    fn serialize(&self, metric: &Metric) -> Result<Vec<String>, ForwarderError> {
        if metric.name.is_empty() {
            return Err(ForwarderError::serialize("", "measurement name is empty"));
        }

        let mut line = escape_measurement(&metric.name);
        for (key, value) in &metric.tags {
            // Line protocol cannot carry empty tag keys or values
            if key.is_empty() || value.is_empty() {
                continue;
            }
            line.push(',');
            line.push_str(&escape_key(key));
            line.push('=');
            line.push_str(&escape_key(value));
        }

        if Self::write_fields(&mut line, metric) == 0 {
            return Ok(Vec::new());
        }

        let _ = write!(line, " {}", metric.timestamp);
        Ok(vec![line])
    }
}

fn escape_measurement(s: &str) -> String {
    escape(s, &[',', ' '])
}

fn escape_key(s: &str) -> String {
    escape(s, &[',', '=', ' '])
}

fn escape(s: &str, special: &[char]) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if special.contains(&c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

fn encode_field_value(value: &FieldValue) -> Option<String> {
    match value {
        FieldValue::Float(f) if !f.is_finite() => None,
        FieldValue::Float(f) => Some(f.to_string()),
        FieldValue::Integer(i) => Some(format!("{i}i")),
        FieldValue::UInteger(u) => Some(format!("{u}u")),
        FieldValue::Bool(b) => Some(b.to_string()),
        FieldValue::String(s) => {
            let escaped = s.replace('\\', "\\\\").replace('"', "\\\"");
            Some(format!("\"{escaped}\""))
        }
    }
}

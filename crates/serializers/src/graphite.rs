//! Graphite plaintext protocol
//!
//! One line per numeric field:
//! `[prefix.]host.tag_values.measurement[.field] value timestamp_s`

use contracts::{ForwarderError, Metric, Serializer};

/// Graphite serializer
#[derive(Debug, Clone, Default)]
pub struct GraphiteSerializer {
    prefix: String,
}

impl GraphiteSerializer {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// Path shared by every field of the metric
    fn base_path(&self, metric: &Metric) -> String {
        let mut parts: Vec<String> = Vec::with_capacity(metric.tags.len() + 2);
        if !self.prefix.is_empty() {
            parts.push(sanitize(&self.prefix));
        }
        // host leads, remaining tag values follow in key order
        if let Some(host) = metric.tags.get("host") {
            parts.push(sanitize(host));
        }
        parts.extend(
            metric
                .tags
                .iter()
                .filter(|(k, v)| k.as_str() != "host" && !v.is_empty())
                .map(|(_, v)| sanitize(v)),
        );
        parts.push(sanitize(&metric.name));
        parts.join(".")
    }
}

impl Serializer for GraphiteSerializer {
    fn format_name(&self) -> &str {
        "graphite"
    }

    fn serialize(&self, metric: &Metric) -> Result<Vec<String>, ForwarderError> {
        if metric.name.is_empty() {
            return Err(ForwarderError::serialize("", "measurement name is empty"));
        }

        let base = self.base_path(metric);
        let ts = metric.timestamp_secs();

        let lines = metric
            .fields
            .iter()
            .filter_map(|(field, value)| {
                let v = value.as_f64().filter(|v| v.is_finite())?;
                let path = if field == "value" {
                    base.clone()
                } else {
                    format!("{}.{}", base, sanitize(field))
                };
                Some(format!("{} {} {}", path, v, ts))
            })
            .collect();

        Ok(lines)
    }
}

fn sanitize(s: &str) -> String {
    let replaced: String = s
        .chars()
        .map(|c| match c {
            '/' | '@' | '*' => '-',
            ' ' | ',' | '=' => '_',
            other => other,
        })
        .collect();

    let mut out = String::with_capacity(replaced.len());
    for c in replaced.chars() {
        if c == '.' && out.ends_with('.') {
            continue;
        }
        out.push(c);
    }
    out
}

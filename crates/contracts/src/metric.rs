//! Metric - telemetry record handed to the output
//!
//! The core never looks inside a metric; only serializers do.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};

/// Field value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Bool(bool),
    Integer(i64),
    UInteger(u64),
    Float(f64),
    String(String),
}

impl FieldValue {
    /// Numeric view, bools as 0/1; None for strings
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            Self::Integer(i) => Some(*i as f64),
            Self::UInteger(u) => Some(*u as f64),
            Self::Float(f) => Some(*f),
            Self::String(_) => None,
        }
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        Self::Integer(v)
    }
}

impl From<u64> for FieldValue {
    fn from(v: u64) -> Self {
        Self::UInteger(v)
    }
}

impl From<bool> for FieldValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

/// A single measurement with tags and fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    /// Measurement name (e.g., "cpu")
    pub name: String,

    /// Tag set, sorted by key
    #[serde(default)]
    pub tags: BTreeMap<String, String>,

    /// Field set, sorted by key
    pub fields: BTreeMap<String, FieldValue>,

    /// Nanoseconds since the Unix epoch
    #[serde(default = "now_nanos")]
    pub timestamp: i64,
}

impl Metric {
    /// Create a metric stamped with the current time
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tags: BTreeMap::new(),
            fields: BTreeMap::new(),
            timestamp: now_nanos(),
        }
    }

    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    pub fn with_timestamp(mut self, nanos: i64) -> Self {
        self.timestamp = nanos;
        self
    }

    /// Timestamp truncated to whole seconds
    pub fn timestamp_secs(&self) -> i64 {
        self.timestamp.div_euclid(1_000_000_000)
    }
}

fn now_nanos() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as i64)
        .unwrap_or(0)
}

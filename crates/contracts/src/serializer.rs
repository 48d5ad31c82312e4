//! Serializer trait - turns a metric into wire payloads
//!
//! The output treats payloads as opaque strings.

use crate::{ForwarderError, Metric};

/// Metric serializer
///
/// A metric may produce zero, one or several payloads (graphite emits one
/// per field). Errors are propagated unchanged by the output.
pub trait Serializer: Send {
    /// Data format name (used for logging)
    fn format_name(&self) -> &str;

    /// Serialize one metric
    ///
    /// # Errors
    /// Returns `ForwarderError::Serialize` naming the metric
    fn serialize(&self, metric: &Metric) -> Result<Vec<String>, ForwarderError>;
}

impl<T: Serializer + ?Sized> Serializer for Box<T> {
    fn format_name(&self) -> &str {
        (**self).format_name()
    }

    fn serialize(&self, metric: &Metric) -> Result<Vec<String>, ForwarderError> {
        (**self).serialize(metric)
    }
}

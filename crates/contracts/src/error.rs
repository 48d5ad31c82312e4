//! Layered error definitions
//!
//! Categorized by source: config / session / send / serialize

use thiserror::Error;

/// Coarse classification of a [`ForwarderError`].
///
/// `Write` wrappers report the kind of the error they carry, so callers can
/// match on what actually went wrong without unpacking the payload context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Connect,
    NotConnected,
    WouldBlock,
    Serialize,
    Close,
    Transport,
    Config,
    Io,
    Other,
}

impl ErrorKind {
    /// Stable label used for metric tags and log fields
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Connect => "connect",
            Self::NotConnected => "not_connected",
            Self::WouldBlock => "would_block",
            Self::Serialize => "serialize",
            Self::Close => "close",
            Self::Transport => "transport",
            Self::Config => "config",
            Self::Io => "io",
            Self::Other => "other",
        }
    }
}

/// Unified error type
#[derive(Debug, Error)]
pub enum ForwarderError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== Session Errors =====
    /// Address invalid or connect refused
    #[error("connect to '{endpoint}' failed: {message}")]
    Connect { endpoint: String, message: String },

    /// Send/close issued outside the Connected state
    #[error("session for '{endpoint}' is not connected ({state})")]
    NotConnected { endpoint: String, state: String },

    /// Socket already released
    #[error("close of '{endpoint}' failed: {message}")]
    Close { endpoint: String, message: String },

    // ===== Send Errors =====
    /// Outbound buffer full on a non-blocking send
    #[error("send to '{endpoint}' would block: outbound buffer full")]
    WouldBlock { endpoint: String },

    /// Any other transport failure while sending an envelope frame
    #[error("send of frame {frame} to '{endpoint}' failed: {message}")]
    Transport {
        endpoint: String,
        frame: usize,
        message: String,
    },

    /// Send failure with the offending payload attached
    #[error("failed to write message: {payload}, {source}")]
    Write {
        payload: String,
        #[source]
        source: Box<ForwarderError>,
    },

    // ===== Serialize Errors =====
    /// Propagated from the serializer
    #[error("serialize error for metric '{metric}': {message}")]
    Serialize { metric: String, message: String },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl ForwarderError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create connect error
    pub fn connect(endpoint: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Connect {
            endpoint: endpoint.into(),
            message: message.into(),
        }
    }

    /// Create close error
    pub fn close(endpoint: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Close {
            endpoint: endpoint.into(),
            message: message.into(),
        }
    }

    /// Create serialize error
    pub fn serialize(metric: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Serialize {
            metric: metric.into(),
            message: message.into(),
        }
    }

    /// Wrap a send failure with the payload that caused it
    pub fn write(payload: impl Into<String>, source: ForwarderError) -> Self {
        Self::Write {
            payload: payload.into(),
            source: Box::new(source),
        }
    }

    /// Classify the error, looking through `Write` wrappers
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ConfigParse { .. } | Self::ConfigValidation { .. } => ErrorKind::Config,
            Self::Connect { .. } => ErrorKind::Connect,
            Self::NotConnected { .. } => ErrorKind::NotConnected,
            Self::Close { .. } => ErrorKind::Close,
            Self::WouldBlock { .. } => ErrorKind::WouldBlock,
            Self::Transport { .. } => ErrorKind::Transport,
            Self::Write { source, .. } => source.kind(),
            Self::Serialize { .. } => ErrorKind::Serialize,
            Self::Io(_) => ErrorKind::Io,
            Self::Other(_) => ErrorKind::Other,
        }
    }

    /// True if the caller may resubmit the same payload later
    pub fn is_recoverable(&self) -> bool {
        self.kind() == ErrorKind::WouldBlock
    }
}

//! Endpoint and Identity - connection target and socket routing token

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::ForwarderError;

/// Socket transport named by the endpoint scheme
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportKind {
    Tcp,
    Ipc,
    Inproc,
    Pgm,
    Epgm,
    Ws,
    Wss,
    Tipc,
    Vmci,
}

impl TransportKind {
    fn from_scheme(scheme: &str) -> Option<Self> {
        match scheme {
            "tcp" => Some(Self::Tcp),
            "ipc" => Some(Self::Ipc),
            "inproc" => Some(Self::Inproc),
            "pgm" => Some(Self::Pgm),
            "epgm" => Some(Self::Epgm),
            "ws" => Some(Self::Ws),
            "wss" => Some(Self::Wss),
            "tipc" => Some(Self::Tipc),
            "vmci" => Some(Self::Vmci),
            _ => None,
        }
    }

    pub fn scheme(&self) -> &'static str {
        match self {
            Self::Tcp => "tcp",
            Self::Ipc => "ipc",
            Self::Inproc => "inproc",
            Self::Pgm => "pgm",
            Self::Epgm => "epgm",
            Self::Ws => "ws",
            Self::Wss => "wss",
            Self::Tipc => "tipc",
            Self::Vmci => "vmci",
        }
    }
}

/// Broker address, `transport://address`. Immutable once parsed.
///
/// # Examples
/// ```
/// use contracts::{Endpoint, TransportKind};
///
/// let ep = Endpoint::parse("tcp://127.0.0.1:9999").unwrap();
/// assert_eq!(ep.transport(), TransportKind::Tcp);
/// assert_eq!(ep.address(), "127.0.0.1:9999");
/// ```
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Endpoint {
    raw: String,
    transport: TransportKind,
}

impl Endpoint {
    /// Parse and check an endpoint string
    ///
    /// # Errors
    /// `ConfigValidation` when the scheme is unknown or the address is
    /// malformed for its transport.
    pub fn parse(raw: &str) -> Result<Self, ForwarderError> {
        let raw = raw.trim();
        let (scheme, address) = raw.split_once("://").ok_or_else(|| {
            ForwarderError::config_validation("endpoint", format!("'{raw}' has no transport://"))
        })?;

        let transport = TransportKind::from_scheme(scheme).ok_or_else(|| {
            ForwarderError::config_validation(
                "endpoint",
                format!("unsupported transport '{scheme}' in '{raw}'"),
            )
        })?;

        if address.is_empty() {
            return Err(ForwarderError::config_validation(
                "endpoint",
                format!("'{raw}' has an empty address"),
            ));
        }

        if transport == TransportKind::Tcp {
            Self::check_tcp_address(raw, address)?;
        }

        Ok(Self {
            raw: raw.to_string(),
            transport,
        })
    }

    fn check_tcp_address(raw: &str, address: &str) -> Result<(), ForwarderError> {
        let (host, port) = address.rsplit_once(':').ok_or_else(|| {
            ForwarderError::config_validation("endpoint", format!("'{raw}' is missing a port"))
        })?;

        if host.is_empty() {
            return Err(ForwarderError::config_validation(
                "endpoint",
                format!("'{raw}' is missing a host"),
            ));
        }

        if port != "*" && port.parse::<u16>().is_err() {
            return Err(ForwarderError::config_validation(
                "endpoint",
                format!("'{raw}' has an invalid port '{port}'"),
            ));
        }
        Ok(())
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn transport(&self) -> TransportKind {
        self.transport
    }

    /// Part after `transport://`
    pub fn address(&self) -> &str {
        &self.raw[self.transport.scheme().len() + 3..]
    }
}

impl FromStr for Endpoint {
    type Err = ForwarderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Endpoint({:?})", self.raw)
    }
}

impl Serialize for Endpoint {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.raw)
    }
}

impl<'de> Deserialize<'de> for Endpoint {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// Identity used when the host name cannot be determined
pub const UNKNOWN_IDENTITY: &str = "unknown";

/// Routing token bound to a socket before it connects
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identity(Vec<u8>);

impl Identity {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// The fallback identity
    pub fn unknown() -> Self {
        Self::new(UNKNOWN_IDENTITY)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn is_unknown(&self) -> bool {
        self.0 == UNKNOWN_IDENTITY.as_bytes()
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(&self.0))
    }
}

//! ServiceName - Cheap-to-clone broker service token
//!
//! Uses Arc<str> internally for O(1) clone operations.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::borrow::Borrow;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Deref;
use std::sync::Arc;

/// Default service name used when the configuration does not set one.
pub const DEFAULT_SERVICE_NAME: &str = "telegraf";

/// Service token attached to every envelope.
///
/// Created once at configuration time and cloned into every sender, so
/// internally it is an `Arc<str>`.
///
/// # Examples
/// ```
/// use contracts::ServiceName;
///
/// let svc: ServiceName = "telegraf".into();
/// let svc2 = svc.clone();  // O(1) - just increments ref count
/// assert_eq!(svc, svc2);
/// assert_eq!(svc.as_bytes(), b"telegraf");
/// ```
#[derive(Clone)]
pub struct ServiceName(Arc<str>);

impl ServiceName {
    /// Create a new ServiceName from a string slice.
    #[inline]
    pub fn new(s: &str) -> Self {
        Self(Arc::from(s))
    }

    /// Get the underlying string slice.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// An empty service routes nowhere useful at the broker
    #[inline]
    pub fn is_degenerate(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for ServiceName {
    fn default() -> Self {
        Self::new(DEFAULT_SERVICE_NAME)
    }
}

impl Deref for ServiceName {
    type Target = str;

    #[inline]
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<str> for ServiceName {
    #[inline]
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for ServiceName {
    #[inline]
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ServiceName {
    #[inline]
    fn from(s: &str) -> Self {
        Self(Arc::from(s))
    }
}

impl From<String> for ServiceName {
    #[inline]
    fn from(s: String) -> Self {
        Self(Arc::from(s))
    }
}

impl fmt::Display for ServiceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for ServiceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ServiceName({:?})", self.0)
    }
}

impl PartialEq for ServiceName {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0) || self.0 == other.0
    }
}

impl Eq for ServiceName {}

impl PartialEq<str> for ServiceName {
    #[inline]
    fn eq(&self, other: &str) -> bool {
        self.0.as_ref() == other
    }
}

impl PartialEq<&str> for ServiceName {
    #[inline]
    fn eq(&self, other: &&str) -> bool {
        self.0.as_ref() == *other
    }
}

impl Hash for ServiceName {
    #[inline]
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.hash(state)
    }
}

impl Serialize for ServiceName {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for ServiceName {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(Self::from(s))
    }
}

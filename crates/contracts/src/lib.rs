//! # Contracts
//!
//! Frozen interface contracts shared by every crate of the forwarder.
//! All business crates can only depend on this crate, reverse dependencies are prohibited.
//!
//! ## Wire Model
//! - Each payload travels as `["", service, "", payload]`
//! - The broker's ROUTER socket prepends the sender identity

mod config;
mod endpoint;
mod error;
mod metric;
mod serializer;
mod service_name;
mod sink;

pub use config::*;
pub use endpoint::{Endpoint, Identity, TransportKind, UNKNOWN_IDENTITY};
pub use error::*;
pub use metric::{FieldValue, Metric};
pub use serializer::Serializer;
pub use service_name::{ServiceName, DEFAULT_SERVICE_NAME};
pub use sink::*;

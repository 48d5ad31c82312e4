//! # ZeroMQ Output
//!
//! Forwards serialized metrics to a broker over a DEALER socket.
//!
//! ## Wire Format
//! Each payload travels as one four-frame message:
//!
//! ```text
//! [ "" | service | "" | payload\n ]
//! ```
//!
//! The broker's ROUTER socket prepends the sender identity (host name by
//! default) before it reaches the broker logic.
//!
//! ## Layers
//! - [`Envelope`]: frame layout
//! - [`Session`]: socket lifecycle and identity
//! - [`Sender`]: one envelope per call, first failure aborts
//! - [`ZmqSink`]: metric batches through the serializer into the sender
//! - [`SinkHandle`]: sink on its own worker task
//! - [`ShutdownList`]: explicit teardown sweep

pub mod envelope;
pub mod handle;
pub mod identity;
pub mod metrics;
pub mod mock;
pub mod sender;
pub mod session;
pub mod shutdown;
pub mod sink;
pub mod transport;

pub use envelope::{Envelope, ENVELOPE_FRAMES};
pub use handle::SinkHandle;
pub use identity::host_identity;
pub use metrics::{MetricsSnapshot, SinkMetrics};
pub use sender::Sender;
pub use session::{Session, SessionState};
pub use shutdown::{Closer, ShutdownList, ShutdownReport};
pub use sink::{DefaultZmqSink, ZmqSink, MAX_SNIPPET_CHARS};
pub use transport::{SendFlags, SocketOptions, Transport, TransportError, ZmqTransport};

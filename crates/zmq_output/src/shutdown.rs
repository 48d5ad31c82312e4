//! ShutdownList - closables swept once at process teardown
//!
//! Owned by whoever builds the sessions (the CLI orchestrator) and passed
//! into each of them; there is no module-level registry.

use std::sync::{Arc, Mutex, PoisonError};

use contracts::{ErrorKind, ForwarderError};
use tracing::{debug, info, warn};

/// A resource the shutdown sweep can close
pub trait Closer: Send + Sync {
    /// Unique key; a second registration under the same key is ignored
    fn key(&self) -> u64;

    /// Human-readable name for logs
    fn describe(&self) -> String;

    /// Release the resource
    fn close(&self) -> Result<(), ForwarderError>;
}

/// Outcome of a shutdown sweep
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ShutdownReport {
    /// Closed by this sweep
    pub closed: usize,
    /// Already released or dropped by their owner
    pub already_closed: usize,
    /// Never connected
    pub never_connected: usize,
    /// Any other failure
    pub failed: usize,
}

/// Explicit list of closables
#[derive(Default)]
pub struct ShutdownList {
    closers: Mutex<Vec<Arc<dyn Closer>>>,
}

impl ShutdownList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a closer; returns false if its key is already present
    pub fn register(&self, closer: Arc<dyn Closer>) -> bool {
        let mut closers = self.closers.lock().unwrap_or_else(PoisonError::into_inner);
        if closers.iter().any(|c| c.key() == closer.key()) {
            debug!(resource = %closer.describe(), "already registered for shutdown");
            return false;
        }
        debug!(resource = %closer.describe(), "registered for shutdown");
        closers.push(closer);
        true
    }

    pub fn len(&self) -> usize {
        self.closers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Close every registered resource once, logging and swallowing errors
    ///
    /// The list is drained, so a second sweep is a no-op.
    pub fn close_all(&self) -> ShutdownReport {
        let closers: Vec<_> = self
            .closers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
            .collect();

        let mut report = ShutdownReport::default();
        for closer in closers {
            match closer.close() {
                Ok(()) => {
                    debug!(resource = %closer.describe(), "closed on shutdown");
                    report.closed += 1;
                }
                Err(e) if e.kind() == ErrorKind::Close => {
                    debug!(resource = %closer.describe(), error = %e, "already closed");
                    report.already_closed += 1;
                }
                Err(e) if e.kind() == ErrorKind::NotConnected => {
                    debug!(resource = %closer.describe(), error = %e, "never connected");
                    report.never_connected += 1;
                }
                Err(e) => {
                    warn!(resource = %closer.describe(), error = %e, "close failed on shutdown");
                    report.failed += 1;
                }
            }
        }

        info!(
            closed = report.closed,
            already_closed = report.already_closed,
            failed = report.failed,
            "Shutdown sweep complete"
        );
        report
    }
}

//! Session - one DEALER socket and its lifecycle
//!
//! ```text
//! Unconnected --connect()--> Connected --close()--> Closed
//! ```
//!
//! `Closed` is terminal. The identity is resolved and applied at connect
//! time, strictly before the transport connects.
//!
//! A session has exactly one writer. The transport sits behind a mutex only
//! so the shutdown sweep can release it; callers sharing one session between
//! several writers must serialize their sends themselves.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use contracts::{Endpoint, ForwarderError, Identity};
use tracing::{debug, info, instrument, warn};

use crate::identity::host_identity;
use crate::shutdown::{Closer, ShutdownList};
use crate::transport::Transport;

static NEXT_SESSION_KEY: AtomicU64 = AtomicU64::new(1);

/// Session lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Unconnected,
    Connected,
    Closed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Unconnected => "unconnected",
            Self::Connected => "connected",
            Self::Closed => "closed",
        };
        f.write_str(s)
    }
}

struct SessionCore<T> {
    transport: T,
    state: SessionState,
}

type SharedCore<T> = Arc<Mutex<SessionCore<T>>>;

fn lock<T>(core: &Mutex<SessionCore<T>>) -> MutexGuard<'_, SessionCore<T>> {
    core.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Connection to one broker endpoint
pub struct Session<T: Transport> {
    key: u64,
    endpoint: Endpoint,
    identity_override: Option<Identity>,
    identity: Option<Identity>,
    core: SharedCore<T>,
    shutdown: Option<Arc<ShutdownList>>,
    registered: bool,
}

impl<T: Transport + 'static> Session<T> {
    /// Create an unconnected session over `transport`
    pub fn new(transport: T, endpoint: Endpoint) -> Self {
        Self {
            key: NEXT_SESSION_KEY.fetch_add(1, Ordering::Relaxed),
            endpoint,
            identity_override: None,
            identity: None,
            core: Arc::new(Mutex::new(SessionCore {
                transport,
                state: SessionState::Unconnected,
            })),
            shutdown: None,
            registered: false,
        }
    }

    /// Use a fixed identity instead of the host name
    pub fn with_identity(mut self, identity: Identity) -> Self {
        self.identity_override = Some(identity);
        self
    }

    /// Register with `list` on first connect
    pub fn with_shutdown_list(mut self, list: Arc<ShutdownList>) -> Self {
        self.shutdown = Some(list);
        self
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Identity applied at the last successful connect
    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    pub fn state(&self) -> SessionState {
        lock(&self.core).state
    }

    pub fn is_connected(&self) -> bool {
        self.state() == SessionState::Connected
    }

    /// Handle the shutdown sweep uses to close this session
    ///
    /// The handle does not keep the socket alive; once the session is
    /// dropped, closing through it reports the session as already closed.
    pub fn closer(&self) -> Arc<dyn Closer> {
        Arc::new(SessionCloser {
            key: self.key,
            endpoint: self.endpoint.clone(),
            core: Arc::downgrade(&self.core),
        })
    }

    /// Set the identity, then connect.
    ///
    /// Retrying from `Unconnected` after a failure is allowed; connecting a
    /// connected session is a no-op.
    ///
    /// # Errors
    /// `Connect` when the identity or the connect call is refused, or when
    /// the session is already closed.
    #[instrument(name = "session_connect", skip(self), fields(endpoint = %self.endpoint))]
    pub fn connect(&mut self) -> Result<(), ForwarderError> {
        match self.state() {
            SessionState::Connected => {
                debug!("session already connected");
                return Ok(());
            }
            SessionState::Closed => {
                return Err(ForwarderError::connect(
                    self.endpoint.as_str(),
                    "session is closed; build a new one",
                ));
            }
            SessionState::Unconnected => {}
        }

        self.register_for_shutdown();

        let identity = self
            .identity_override
            .clone()
            .unwrap_or_else(host_identity);

        let mut core = lock(&self.core);
        core.transport
            .set_identity(identity.as_bytes())
            .map_err(|e| {
                ForwarderError::connect(self.endpoint.as_str(), format!("set identity: {e}"))
            })?;
        core.transport
            .connect(self.endpoint.as_str())
            .map_err(|e| ForwarderError::connect(self.endpoint.as_str(), e.to_string()))?;
        core.state = SessionState::Connected;
        drop(core);

        info!(identity = %identity, "Session connected");
        self.identity = Some(identity);
        Ok(())
    }

    /// Release the socket.
    ///
    /// # Errors
    /// `Close` if the socket was already released, `NotConnected` if the
    /// session never connected.
    #[instrument(name = "session_close", skip(self), fields(endpoint = %self.endpoint))]
    pub fn close(&self) -> Result<(), ForwarderError> {
        close_core(&self.core, &self.endpoint)
    }

    /// Run `f` against the transport of a connected session
    pub(crate) fn with_transport<R>(
        &self,
        f: impl FnOnce(&mut T) -> Result<R, ForwarderError>,
    ) -> Result<R, ForwarderError> {
        let mut core = lock(&self.core);
        if core.state != SessionState::Connected {
            return Err(ForwarderError::NotConnected {
                endpoint: self.endpoint.to_string(),
                state: core.state.to_string(),
            });
        }
        f(&mut core.transport)
    }

    fn register_for_shutdown(&mut self) {
        if self.registered {
            return;
        }
        if let Some(list) = &self.shutdown {
            list.register(self.closer());
            self.registered = true;
        }
    }
}

fn close_core<T: Transport>(
    core: &Mutex<SessionCore<T>>,
    endpoint: &Endpoint,
) -> Result<(), ForwarderError> {
    let mut core = lock(core);
    match core.state {
        SessionState::Unconnected => Err(ForwarderError::NotConnected {
            endpoint: endpoint.to_string(),
            state: core.state.to_string(),
        }),
        SessionState::Closed => Err(ForwarderError::close(
            endpoint.as_str(),
            "socket already released",
        )),
        SessionState::Connected => {
            // The socket counts as gone even if the release reports an error
            core.state = SessionState::Closed;
            match core.transport.close() {
                Ok(()) => {
                    info!(endpoint = %endpoint, "Session closed");
                    Ok(())
                }
                Err(e) => {
                    warn!(endpoint = %endpoint, error = %e, "socket release failed");
                    Err(ForwarderError::close(endpoint.as_str(), e.to_string()))
                }
            }
        }
    }
}

struct SessionCloser<T> {
    key: u64,
    endpoint: Endpoint,
    core: Weak<Mutex<SessionCore<T>>>,
}

impl<T: Transport> Closer for SessionCloser<T> {
    fn key(&self) -> u64 {
        self.key
    }

    fn describe(&self) -> String {
        format!("session {}", self.endpoint)
    }

    fn close(&self) -> Result<(), ForwarderError> {
        match self.core.upgrade() {
            Some(core) => close_core(&core, &self.endpoint),
            // Dropping the session released its socket
            None => Err(ForwarderError::close(
                self.endpoint.as_str(),
                "session dropped",
            )),
        }
    }
}

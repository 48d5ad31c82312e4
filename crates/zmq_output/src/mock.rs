//! Mock transport for tests
//!
//! Records every call the transport accepts and can be scripted to refuse
//! connects, fail a given send attempt, or report a full outbound buffer.

use std::sync::{Arc, Mutex, PoisonError};

use crate::transport::{SendFlags, Transport, TransportError};

/// A call accepted by [`MockTransport`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportCall {
    SetIdentity(Vec<u8>),
    Connect(String),
    Send { frame: Vec<u8>, flags: SendFlags },
    Close,
}

#[derive(Debug, Default)]
struct MockState {
    calls: Vec<TransportCall>,
    connected: bool,
    closed: bool,
    failing_connects: usize,
    fail_send_at: Option<usize>,
    would_block: bool,
    send_attempts: usize,
    failed_sends: usize,
}

/// Cloneable handle; clones share state so a test can keep one and hand the
/// other to a session.
#[derive(Debug, Clone, Default)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut MockState) -> R) -> R {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut state)
    }

    /// Refuse the next `n` connect calls
    pub fn fail_next_connects(&self, n: usize) {
        self.with_state(|s| s.failing_connects = n);
    }

    /// Fail the send attempt with this zero-based index, counted over the
    /// transport's lifetime
    pub fn fail_send_at(&self, attempt: usize) {
        self.with_state(|s| s.fail_send_at = Some(attempt));
    }

    /// Report a full buffer on every non-blocking final frame
    pub fn set_would_block(&self, on: bool) {
        self.with_state(|s| s.would_block = on);
    }

    pub fn calls(&self) -> Vec<TransportCall> {
        self.with_state(|s| s.calls.clone())
    }

    /// Accepted frames grouped into messages by the "more" flag
    pub fn envelopes(&self) -> Vec<Vec<Vec<u8>>> {
        self.with_state(|s| {
            let mut envelopes = Vec::new();
            let mut current = Vec::new();
            for call in &s.calls {
                if let TransportCall::Send { frame, flags } = call {
                    current.push(frame.clone());
                    if !flags.more {
                        envelopes.push(std::mem::take(&mut current));
                    }
                }
            }
            envelopes
        })
    }

    /// Accepted frame count
    pub fn send_count(&self) -> usize {
        self.with_state(|s| {
            s.calls
                .iter()
                .filter(|c| matches!(c, TransportCall::Send { .. }))
                .count()
        })
    }

    pub fn failed_sends(&self) -> usize {
        self.with_state(|s| s.failed_sends)
    }

    pub fn last_send_flags(&self) -> Option<SendFlags> {
        self.with_state(|s| {
            s.calls.iter().rev().find_map(|c| match c {
                TransportCall::Send { flags, .. } => Some(*flags),
                _ => None,
            })
        })
    }

    pub fn is_closed(&self) -> bool {
        self.with_state(|s| s.closed)
    }
}

impl Transport for MockTransport {
    fn set_identity(&mut self, identity: &[u8]) -> Result<(), TransportError> {
        self.with_state(|s| {
            if s.closed {
                return Err(TransportError::Closed);
            }
            if s.connected {
                return Err(TransportError::IdentityAfterConnect);
            }
            s.calls.push(TransportCall::SetIdentity(identity.to_vec()));
            Ok(())
        })
    }

    fn connect(&mut self, endpoint: &str) -> Result<(), TransportError> {
        self.with_state(|s| {
            if s.closed {
                return Err(TransportError::Closed);
            }
            if s.failing_connects > 0 {
                s.failing_connects -= 1;
                return Err(TransportError::Other("connection refused".to_string()));
            }
            s.connected = true;
            s.calls.push(TransportCall::Connect(endpoint.to_string()));
            Ok(())
        })
    }

    fn send(&mut self, frame: &[u8], flags: SendFlags) -> Result<usize, TransportError> {
        self.with_state(|s| {
            if s.closed {
                return Err(TransportError::Closed);
            }
            let attempt = s.send_attempts;
            s.send_attempts += 1;

            if s.fail_send_at == Some(attempt) {
                s.fail_send_at = None;
                s.failed_sends += 1;
                return Err(TransportError::Other(format!("scripted failure at send {attempt}")));
            }
            if s.would_block && !flags.more && flags.dont_wait {
                s.failed_sends += 1;
                return Err(TransportError::WouldBlock);
            }

            s.calls.push(TransportCall::Send {
                frame: frame.to_vec(),
                flags,
            });
            Ok(frame.len())
        })
    }

    fn close(&mut self) -> Result<(), TransportError> {
        self.with_state(|s| {
            if s.closed {
                return Err(TransportError::Closed);
            }
            s.closed = true;
            s.connected = false;
            s.calls.push(TransportCall::Close);
            Ok(())
        })
    }
}

//! Transport - the DEALER socket seam
//!
//! `Session` and `Sender` only talk to a `Transport`; `ZmqTransport` is the
//! libzmq-backed implementation and `mock::MockTransport` the test double.

use contracts::{DeliveryMode, OutputConfig};
use thiserror::Error;
use tracing::debug;

/// Per-frame send flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SendFlags {
    /// More frames of the same message follow
    pub more: bool,
    /// Fail instead of waiting for buffer space
    pub dont_wait: bool,
}

impl SendFlags {
    /// Non-final frame: more follows, blocking
    pub const MORE: Self = Self {
        more: true,
        dont_wait: false,
    };

    /// Flags for the last frame of a message
    pub fn final_frame(mode: DeliveryMode) -> Self {
        Self {
            more: false,
            dont_wait: mode == DeliveryMode::NonBlocking,
        }
    }

    fn to_zmq(self) -> i32 {
        let mut flags = 0;
        if self.more {
            flags |= zmq::SNDMORE;
        }
        if self.dont_wait {
            flags |= zmq::DONTWAIT;
        }
        flags
    }
}

/// Transport-level failures
#[derive(Debug, Error)]
pub enum TransportError {
    /// Outbound buffer full on a non-blocking send
    #[error("outbound buffer full")]
    WouldBlock,

    /// Socket already released
    #[error("socket already closed")]
    Closed,

    /// Identity changes after connect have no effect
    #[error("identity must be set before connect")]
    IdentityAfterConnect,

    #[error("zmq error: {0}")]
    Zmq(#[from] zmq::Error),

    #[error("{0}")]
    Other(String),
}

/// DEALER-style socket operations used by the output
pub trait Transport: Send {
    /// Set the routing identity; only valid before `connect`
    fn set_identity(&mut self, identity: &[u8]) -> Result<(), TransportError>;

    /// Connect to `endpoint`
    fn connect(&mut self, endpoint: &str) -> Result<(), TransportError>;

    /// Send one frame, returning the bytes accepted
    fn send(&mut self, frame: &[u8], flags: SendFlags) -> Result<usize, TransportError>;

    /// Release the socket
    fn close(&mut self) -> Result<(), TransportError>;
}

/// Socket options applied at creation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SocketOptions {
    /// Linger on close (ms, -1 = forever)
    pub linger_ms: i32,
    /// Outbound high water mark
    pub send_high_water_mark: Option<i32>,
}

impl Default for SocketOptions {
    fn default() -> Self {
        Self {
            linger_ms: 1000,
            send_high_water_mark: None,
        }
    }
}

impl From<&OutputConfig> for SocketOptions {
    fn from(config: &OutputConfig) -> Self {
        Self {
            linger_ms: config.linger_ms,
            send_high_water_mark: config.send_high_water_mark,
        }
    }
}

/// libzmq DEALER socket with its own context
pub struct ZmqTransport {
    socket: Option<zmq::Socket>,
    connected: bool,
    _context: zmq::Context,
}

impl ZmqTransport {
    /// Create a context and an unconnected DEALER socket
    pub fn new(options: SocketOptions) -> Result<Self, TransportError> {
        let context = zmq::Context::new();
        let socket = context.socket(zmq::DEALER)?;
        socket.set_linger(options.linger_ms)?;
        if let Some(hwm) = options.send_high_water_mark {
            socket.set_sndhwm(hwm)?;
        }

        debug!(
            linger_ms = options.linger_ms,
            sndhwm = ?options.send_high_water_mark,
            "DEALER socket created"
        );

        Ok(Self {
            socket: Some(socket),
            connected: false,
            _context: context,
        })
    }

    fn socket(&self) -> Result<&zmq::Socket, TransportError> {
        self.socket.as_ref().ok_or(TransportError::Closed)
    }
}

impl Transport for ZmqTransport {
    fn set_identity(&mut self, identity: &[u8]) -> Result<(), TransportError> {
        if self.connected {
            return Err(TransportError::IdentityAfterConnect);
        }
        self.socket()?.set_identity(identity)?;
        Ok(())
    }

    fn connect(&mut self, endpoint: &str) -> Result<(), TransportError> {
        self.socket()?.connect(endpoint)?;
        self.connected = true;
        Ok(())
    }

    fn send(&mut self, frame: &[u8], flags: SendFlags) -> Result<usize, TransportError> {
        match self.socket()?.send(frame, flags.to_zmq()) {
            Ok(()) => Ok(frame.len()),
            Err(zmq::Error::EAGAIN) => Err(TransportError::WouldBlock),
            Err(e) => Err(TransportError::Zmq(e)),
        }
    }

    fn close(&mut self) -> Result<(), TransportError> {
        // Dropping the socket closes it; linger bounds the flush
        match self.socket.take() {
            Some(socket) => {
                drop(socket);
                self.connected = false;
                Ok(())
            }
            None => Err(TransportError::Closed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_bits() {
        assert_eq!(SendFlags::MORE.to_zmq(), zmq::SNDMORE);
        assert_eq!(
            SendFlags::final_frame(DeliveryMode::NonBlocking).to_zmq(),
            zmq::DONTWAIT
        );
        assert_eq!(SendFlags::final_frame(DeliveryMode::Blocking).to_zmq(), 0);
    }

    #[test]
    fn test_identity_rejected_after_connect() {
        let mut transport = ZmqTransport::new(SocketOptions {
            linger_ms: 0,
            send_high_water_mark: None,
        })
        .unwrap();

        transport.set_identity(b"edge-01").unwrap();
        transport.connect("tcp://127.0.0.1:5999").unwrap();
        assert!(matches!(
            transport.set_identity(b"late"),
            Err(TransportError::IdentityAfterConnect)
        ));
    }

    #[test]
    fn test_close_twice() {
        let mut transport = ZmqTransport::new(SocketOptions {
            linger_ms: 0,
            send_high_water_mark: None,
        })
        .unwrap();

        assert!(transport.close().is_ok());
        assert!(matches!(transport.close(), Err(TransportError::Closed)));
        assert!(matches!(
            transport.send(b"x", SendFlags::MORE),
            Err(TransportError::Closed)
        ));
    }

    #[test]
    fn test_invalid_endpoint_fails_connect() {
        let mut transport = ZmqTransport::new(SocketOptions::default()).unwrap();
        assert!(transport.connect("bogus://nowhere").is_err());
    }
}

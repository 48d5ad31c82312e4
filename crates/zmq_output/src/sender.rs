//! Sender - pushes one envelope through a connected session

use bytes::Bytes;
use contracts::{DeliveryMode, ForwarderError};
use tracing::trace;

use crate::envelope::Envelope;
use crate::session::Session;
use crate::transport::{SendFlags, Transport, TransportError};

/// Frame-level sender
#[derive(Debug, Clone, Copy, Default)]
pub struct Sender {
    delivery: DeliveryMode,
}

impl Sender {
    pub fn new(delivery: DeliveryMode) -> Self {
        Self { delivery }
    }

    pub fn delivery(&self) -> DeliveryMode {
        self.delivery
    }

    /// Send `payload` to `service` as one four-frame envelope.
    ///
    /// Header frames go out with the "more" flag; the payload frame uses the
    /// configured delivery mode. The first failing frame aborts the rest.
    /// Returns the byte count accepted for the payload frame.
    ///
    /// # Errors
    /// - `NotConnected` if the session is not connected (nothing is sent)
    /// - `WouldBlock` if the outbound buffer is full
    /// - `Transport` for any other socket failure, naming the frame
    pub fn send<T: Transport + 'static>(
        &self,
        session: &Session<T>,
        service: &str,
        payload: impl Into<Bytes>,
    ) -> Result<usize, ForwarderError> {
        let envelope = Envelope::build(service, payload);
        let endpoint = session.endpoint().as_str();

        session.with_transport(|transport| {
            for (frame, bytes) in envelope.header().iter().enumerate() {
                transport
                    .send(bytes, SendFlags::MORE)
                    .map_err(|e| map_send_error(endpoint, frame, e))?;
            }

            let last = envelope.header().len();
            let sent = transport
                .send(envelope.payload(), SendFlags::final_frame(self.delivery))
                .map_err(|e| map_send_error(endpoint, last, e))?;

            trace!(endpoint, service, bytes = sent, "envelope sent");
            Ok(sent)
        })
    }
}

fn map_send_error(endpoint: &str, frame: usize, err: TransportError) -> ForwarderError {
    match err {
        TransportError::WouldBlock => ForwarderError::WouldBlock {
            endpoint: endpoint.to_string(),
        },
        other => ForwarderError::Transport {
            endpoint: endpoint.to_string(),
            frame,
            message: other.to_string(),
        },
    }
}

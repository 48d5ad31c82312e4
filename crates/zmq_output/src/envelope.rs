//! Envelope - fixed four-frame multipart message
//!
//! `["", service, "", payload]`. The broker's ROUTER socket prepends the
//! sender identity; it then strips the identity, the two delimiters and the
//! service token, leaving the raw payload.

use bytes::Bytes;

/// Number of frames in every envelope
pub const ENVELOPE_FRAMES: usize = 4;

/// Ordered frame sequence wrapping one payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    frames: [Bytes; ENVELOPE_FRAMES],
}

impl Envelope {
    /// Build the envelope for `payload` addressed to `service`.
    ///
    /// Pure; an empty service or payload still yields four frames.
    pub fn build(service: &str, payload: impl Into<Bytes>) -> Self {
        Self {
            frames: [
                Bytes::new(),
                Bytes::copy_from_slice(service.as_bytes()),
                Bytes::new(),
                payload.into(),
            ],
        }
    }

    /// All frames in wire order
    pub fn frames(&self) -> &[Bytes] {
        &self.frames
    }

    /// Frames sent with the "more" flag
    pub fn header(&self) -> &[Bytes] {
        &self.frames[..ENVELOPE_FRAMES - 1]
    }

    /// Final frame
    pub fn payload(&self) -> &Bytes {
        &self.frames[ENVELOPE_FRAMES - 1]
    }

    pub fn service(&self) -> &Bytes {
        &self.frames[1]
    }

    pub fn into_frames(self) -> [Bytes; ENVELOPE_FRAMES] {
        self.frames
    }
}

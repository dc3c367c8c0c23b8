//! Frame encoding and decoding.
//!
//! Each frame is a 1-byte direction marker, a 2-byte little-endian payload
//! length, and the payload itself:
//!
//! ```text
//! +--------+--------+--------+-------------------+
//! | marker | len_lo | len_hi | payload[0..len]   |
//! +--------+--------+--------+-------------------+
//! ```

use bytes::{BufMut, Bytes};

use crate::error::ProtocolError;

/// Marker byte for host→device frames.
pub const MARKER_HOST_TO_DEVICE: u8 = b'<';
/// Marker byte for device→host frames.
pub const MARKER_DEVICE_TO_HOST: u8 = b'>';

/// Frame header size: marker byte plus 2-byte length.
pub const FRAME_HEADER_SIZE: usize = 3;
/// Maximum payload size supported.
pub const MAX_FRAME_SIZE: usize = 1024;

/// Direction of a frame on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameDirection {
    /// Host → device (commands).
    HostToDevice,
    /// Device → host (responses and push notifications).
    DeviceToHost,
}

impl FrameDirection {
    /// The marker byte for this direction.
    pub fn marker(self) -> u8 {
        match self {
            FrameDirection::HostToDevice => MARKER_HOST_TO_DEVICE,
            FrameDirection::DeviceToHost => MARKER_DEVICE_TO_HOST,
        }
    }

    /// Map a marker byte back to a direction, if legal.
    pub fn from_marker(byte: u8) -> Option<Self> {
        match byte {
            MARKER_HOST_TO_DEVICE => Some(FrameDirection::HostToDevice),
            MARKER_DEVICE_TO_HOST => Some(FrameDirection::DeviceToHost),
            _ => None,
        }
    }
}

/// Whether a byte is one of the two legal direction markers.
pub fn is_marker(byte: u8) -> bool {
    byte == MARKER_HOST_TO_DEVICE || byte == MARKER_DEVICE_TO_HOST
}

/// One complete protocol frame in either direction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Which way the frame travels.
    pub direction: FrameDirection,
    /// The length-delimited payload (at least the code byte).
    pub payload: Bytes,
}

impl Frame {
    /// The command/response/push code: byte 0 of the payload.
    pub fn code(&self) -> u8 {
        self.payload[0]
    }
}

/// Result of attempting to decode one frame from a byte slice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decoded {
    /// A complete frame and the number of bytes it consumed
    /// (header plus payload).
    Frame {
        /// The decoded frame.
        frame: Frame,
        /// Bytes consumed from the front of the input.
        consumed: usize,
    },
    /// The input may hold a frame but not all of it has arrived yet.
    NeedMoreData,
    /// The input cannot begin a legal frame at offset 0.
    Invalid,
}

/// Stateless frame encoder/decoder.
///
/// [`FrameCodec::try_decode`] has no side effects and is safe to call
/// repeatedly against a growing buffer; buffer ownership and
/// resynchronization live in [`crate::StreamFramer`].
#[derive(Debug)]
pub struct FrameCodec;

impl FrameCodec {
    /// Encode a payload into wire bytes for the given direction.
    ///
    /// The payload must carry at least the code byte and at most
    /// [`MAX_FRAME_SIZE`] bytes.
    pub fn encode(direction: FrameDirection, payload: &[u8]) -> Result<Vec<u8>, ProtocolError> {
        if payload.is_empty() {
            return Err(ProtocolError::EmptyPayload);
        }
        if payload.len() > MAX_FRAME_SIZE {
            return Err(ProtocolError::OversizedFrame {
                max: MAX_FRAME_SIZE,
                actual: payload.len(),
            });
        }

        let mut buf = Vec::with_capacity(FRAME_HEADER_SIZE + payload.len());
        buf.push(direction.marker());
        buf.put_u16_le(payload.len() as u16);
        buf.extend_from_slice(payload);
        Ok(buf)
    }

    /// Try to decode one frame from the front of `buf`.
    ///
    /// Returns [`Decoded::Invalid`] if byte 0 is not a legal marker or the
    /// declared length exceeds [`MAX_FRAME_SIZE`]; [`Decoded::NeedMoreData`]
    /// if the header or the declared payload has not fully arrived.
    pub fn try_decode(buf: &[u8]) -> Decoded {
        if buf.is_empty() {
            return Decoded::NeedMoreData;
        }

        let direction = match FrameDirection::from_marker(buf[0]) {
            Some(d) => d,
            None => return Decoded::Invalid,
        };

        if buf.len() < FRAME_HEADER_SIZE {
            return Decoded::NeedMoreData;
        }

        let len = u16::from_le_bytes([buf[1], buf[2]]) as usize;
        if len == 0 || len > MAX_FRAME_SIZE {
            // A declared length the protocol can never produce means the
            // marker byte was noise, not a frame start.
            return Decoded::Invalid;
        }

        let total = FRAME_HEADER_SIZE + len;
        if buf.len() < total {
            return Decoded::NeedMoreData;
        }

        Decoded::Frame {
            frame: Frame {
                direction,
                payload: Bytes::copy_from_slice(&buf[FRAME_HEADER_SIZE..total]),
            },
            consumed: total,
        }
    }
}

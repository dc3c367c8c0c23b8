//! Structured view of device→host payloads.

use std::ops::RangeInclusive;

use bytes::Bytes;

use crate::constants::RESP_CODE_ERR;
use crate::error::ProtocolError;
use crate::frame::{Frame, FrameDirection};

/// A decoded device→host payload: response code, optional status byte, data.
///
/// Byte 0 of the payload is the response/push code. Byte 1 is a status code,
/// meaningful only when the code is [`RESP_CODE_ERR`]. The rest is opaque
/// data handed to the layer above; this crate does not interpret domain
/// field layouts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseEnvelope {
    /// Response or push code (payload byte 0).
    pub code: u8,
    /// Status byte, present only for error responses.
    pub status: Option<u8>,
    /// Remaining payload bytes.
    pub data: Bytes,
}

impl ResponseEnvelope {
    /// Build an envelope from a device→host frame.
    ///
    /// Rejects host→device frames (a host should never see its own marker
    /// reflected back as a well-formed frame) and error frames too short to
    /// carry their status byte.
    pub fn from_frame(frame: &Frame) -> Result<Self, ProtocolError> {
        if frame.direction != FrameDirection::DeviceToHost {
            return Err(ProtocolError::InvalidMarker(frame.direction.marker()));
        }
        if frame.payload.is_empty() {
            return Err(ProtocolError::EmptyPayload);
        }

        let code = frame.payload[0];
        if code == RESP_CODE_ERR {
            if frame.payload.len() < 2 {
                return Err(ProtocolError::FrameTooShort {
                    expected: 2,
                    actual: frame.payload.len(),
                });
            }
            return Ok(ResponseEnvelope {
                code,
                status: Some(frame.payload[1]),
                data: frame.payload.slice(2..),
            });
        }

        Ok(ResponseEnvelope {
            code,
            status: None,
            data: frame.payload.slice(1..),
        })
    }

    /// Whether this envelope is the generic error response.
    pub fn is_err(&self) -> bool {
        self.code == RESP_CODE_ERR
    }
}

/// The set of codes classified as asynchronous push notifications.
///
/// Frames carrying one of these codes are never matched against a pending
/// command, regardless of timing. The range is configurable because later
/// protocol revisions may widen the push code space.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushTable {
    range: RangeInclusive<u8>,
}

impl Default for PushTable {
    fn default() -> Self {
        PushTable { range: 0x80..=0x8E }
    }
}

impl PushTable {
    /// Build a table covering an inclusive code range.
    pub fn new(range: RangeInclusive<u8>) -> Self {
        PushTable { range }
    }

    /// Whether `code` denotes an unsolicited push notification.
    pub fn is_push(&self, code: u8) -> bool {
        self.range.contains(&code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::*;

    fn inbound(payload: &[u8]) -> Frame {
        Frame {
            direction: FrameDirection::DeviceToHost,
            payload: Bytes::copy_from_slice(payload),
        }
    }

    #[test]
    fn test_plain_response_envelope() {
        let env = ResponseEnvelope::from_frame(&inbound(&[0x16, 0x00, 0x01, 0x02])).unwrap();
        assert_eq!(env.code, 0x16);
        assert_eq!(env.status, None);
        assert_eq!(&env.data[..], &[0x00, 0x01, 0x02]);
    }

    #[test]
    fn test_error_envelope_carries_status() {
        let env = ResponseEnvelope::from_frame(&inbound(&[RESP_CODE_ERR, ERR_CODE_NOT_FOUND]))
            .unwrap();
        assert!(env.is_err());
        assert_eq!(env.status, Some(ERR_CODE_NOT_FOUND));
        assert!(env.data.is_empty());
    }

    #[test]
    fn test_error_envelope_missing_status() {
        let err = ResponseEnvelope::from_frame(&inbound(&[RESP_CODE_ERR])).unwrap_err();
        assert_eq!(err, ProtocolError::FrameTooShort { expected: 2, actual: 1 });
    }

    #[test]
    fn test_outbound_frame_rejected() {
        let frame = Frame {
            direction: FrameDirection::HostToDevice,
            payload: Bytes::from_static(&[CMD_GET_DEVICE_TIME]),
        };
        assert!(ResponseEnvelope::from_frame(&frame).is_err());
    }

    #[test]
    fn test_push_table_default_range() {
        let table = PushTable::default();
        assert!(table.is_push(PUSH_CODE_ADVERT));
        assert!(table.is_push(PUSH_CODE_CONTROL_DATA));
        assert!(!table.is_push(RESP_CODE_OK));
        assert!(!table.is_push(RESP_CODE_STATS));
        assert!(!table.is_push(0x8F));
    }

    #[test]
    fn test_push_table_custom_range() {
        let table = PushTable::new(0x80..=0x9F);
        assert!(table.is_push(0x8F));
        assert!(table.is_push(0x9F));
        assert!(!table.is_push(0xA0));
    }
}

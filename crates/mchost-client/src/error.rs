//! Client error types.

use mchost_protocol::{FirmwareErrorCode, ProtocolError};
use thiserror::Error;

use crate::sequence::SyncRecord;

/// Errors surfaced by [`crate::DeviceSession`] operations.
#[derive(Error, Debug)]
pub enum ClientError {
    /// Transport I/O failure. Fatal to the session.
    #[error("transport error: {0}")]
    Io(#[from] std::io::Error),

    /// Wire-protocol violation in data we tried to interpret.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// The device answered a command with its error response.
    /// The session remains usable for subsequent commands.
    #[error("device rejected command 0x{command:02X}: {code}")]
    Device {
        /// The command that was rejected.
        command: u8,
        /// Firmware error code from the status byte.
        code: FirmwareErrorCode,
    },

    /// No reply arrived before the deadline. The pending slot is cleared,
    /// so the next command can proceed; retry policy belongs to the caller.
    #[error("timed out waiting for reply to command 0x{command:02X}")]
    Timeout {
        /// The command that timed out.
        command: u8,
    },

    /// The device answered with a well-formed reply of the wrong kind for
    /// the command that was issued.
    #[error("unexpected reply 0x{code:02X} to command 0x{command:02X}")]
    UnexpectedReply {
        /// The command that was issued.
        command: u8,
        /// The reply code received instead.
        code: u8,
    },

    /// The session was disconnected (or the device closed the stream)
    /// while the operation was in flight.
    #[error("connection closed")]
    ConnectionClosed,

    /// A multi-frame sequence aborted. `partial` holds the records
    /// accumulated before the fault when [`crate::SyncPolicy::KeepPartial`]
    /// is configured, and is empty otherwise.
    #[error("sync sequence failed: {fault}")]
    Sequence {
        /// What went wrong.
        fault: SequenceFault,
        /// Records accumulated before the fault (policy-dependent).
        partial: Vec<SyncRecord>,
    },
}

/// Reasons a multi-frame sequence can abort.
#[derive(Error, Debug)]
pub enum SequenceFault {
    /// The device sent a frame whose code has no place in this sequence.
    #[error("unexpected response code 0x{code:02X}")]
    UnexpectedCode {
        /// The offending code.
        code: u8,
    },

    /// An item frame failed structural validation. Skipping it silently
    /// would desynchronize the caller's count, so the sequence aborts.
    #[error("malformed item: {reason}")]
    MalformedItem {
        /// What the validation found.
        reason: String,
    },

    /// The draining loop hit its safety bound without seeing the
    /// terminal marker.
    #[error("no terminal marker after {limit} iterations")]
    IterationLimit {
        /// The configured bound.
        limit: usize,
    },

    /// No item frame arrived within the per-item deadline.
    #[error("timed out waiting for the next item")]
    ItemTimeout,

    /// A command issued by the sequence failed.
    #[error("command failed mid-sequence: {0}")]
    Aborted(#[source] Box<ClientError>),
}

/// Result type alias for client operations.
pub type Result<T> = std::result::Result<T, ClientError>;

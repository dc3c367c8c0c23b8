//! MeshCore Companion Serial Protocol (host side)
//!
//! This crate implements the wire layer of the companion protocol as seen
//! from a host application talking to a radio over serial/USB. Frames are
//! length-prefixed with a 1-byte direction marker:
//!
//! ```text
//! +--------+--------+--------+-------------------+
//! | marker | len_lo | len_hi | payload[0..len]   |
//! +--------+--------+--------+-------------------+
//! ```
//!
//! - `0x3C` ('<') marks host→device frames
//! - `0x3E` ('>') marks device→host frames
//!
//! The first payload byte is a command code (host→device) or a
//! response/push code (device→host). Response codes below `0x80` answer a
//! specific command; codes `0x80` and above are unsolicited push
//! notifications.
//!
//! Everything here is transport-agnostic and free of I/O: [`FrameCodec`]
//! turns payloads into wire bytes and back, [`StreamFramer`] recovers frame
//! boundaries from a noisy byte stream, and [`ResponseEnvelope`] gives a
//! structured view of a device→host payload.

mod constants;
mod envelope;
mod error;
mod frame;
mod framer;

pub use constants::*;
pub use envelope::*;
pub use error::*;
pub use frame::*;
pub use framer::*;

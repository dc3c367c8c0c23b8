//! Stream framing with resynchronization.
//!
//! Serial links deliver frames chopped at arbitrary boundaries and sometimes
//! with garbage in between (boot banners, line noise, a frame torn by a
//! reconnect). [`StreamFramer`] owns the accumulation buffer and recovers
//! frame alignment: leading bytes that cannot start a frame are discarded,
//! and a byte that merely looks like a marker costs exactly one byte of
//! progress, never a stall.

use bytes::{Buf, BytesMut};

use crate::frame::{is_marker, Decoded, Frame, FrameCodec, MAX_FRAME_SIZE};

/// Counters for framing-layer events.
///
/// Framing faults are recovered locally and never surface as errors; these
/// counters (and the [`DiagnosticsSink`]) are the only way to observe them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FramerStats {
    /// Noise bytes discarded during resynchronization.
    pub bytes_discarded: u64,
    /// Marker-valued bytes that did not begin a valid frame.
    pub false_markers: u64,
    /// Frames successfully decoded.
    pub frames_decoded: u64,
}

/// Sink for framing-layer diagnostics.
///
/// Injected rather than global so embedders decide where resync noise goes.
/// The default [`LogSink`] forwards to the `log` crate at trace/debug level.
pub trait DiagnosticsSink: Send {
    /// `count` leading noise bytes were discarded while scanning for a marker.
    fn noise_discarded(&mut self, count: usize) {
        let _ = count;
    }

    /// A marker-valued byte at the buffer head did not begin a valid frame.
    fn false_marker(&mut self, byte: u8) {
        let _ = byte;
    }
}

/// Diagnostics sink that reports through the `log` crate.
#[derive(Debug, Default)]
pub struct LogSink;

impl DiagnosticsSink for LogSink {
    fn noise_discarded(&mut self, count: usize) {
        log::debug!("framer: discarded {} noise byte(s) during resync", count);
    }

    fn false_marker(&mut self, byte: u8) {
        log::trace!("framer: false marker 0x{:02X}, discarding one byte", byte);
    }
}

/// Converts an append-only byte stream into a sequence of [`Frame`]s.
///
/// Feed received chunks with [`push`](Self::push), then drain decoded frames
/// with [`next_frame`](Self::next_frame) until it returns `None`.
#[derive(Debug)]
pub struct StreamFramer {
    /// Accumulation buffer; exclusively owned by the framer.
    buffer: BytesMut,
    stats: FramerStats,
}

impl Default for StreamFramer {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamFramer {
    /// Create a new framer with an empty buffer.
    pub fn new() -> Self {
        StreamFramer {
            buffer: BytesMut::with_capacity(MAX_FRAME_SIZE * 2),
            stats: FramerStats::default(),
        }
    }

    /// Append newly received bytes to the buffer.
    pub fn push(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Try to produce the next complete frame from the buffer.
    ///
    /// Returns `None` when the buffer holds no complete frame (either empty,
    /// pure noise that was discarded, or a legitimately incomplete frame
    /// waiting for more bytes). Every iteration that does not wait for data
    /// consumes at least one byte, so malformed input cannot livelock.
    pub fn next_frame(&mut self, diagnostics: &mut dyn DiagnosticsSink) -> Option<Frame> {
        loop {
            // Resync: drop everything ahead of the first marker-valued byte.
            match self.buffer.iter().position(|&b| is_marker(b)) {
                Some(0) => {}
                Some(k) => {
                    self.buffer.advance(k);
                    self.stats.bytes_discarded += k as u64;
                    diagnostics.noise_discarded(k);
                }
                None => {
                    let n = self.buffer.len();
                    if n > 0 {
                        self.buffer.clear();
                        self.stats.bytes_discarded += n as u64;
                        diagnostics.noise_discarded(n);
                    }
                    return None;
                }
            }

            match FrameCodec::try_decode(&self.buffer) {
                Decoded::Frame { frame, consumed } => {
                    self.buffer.advance(consumed);
                    self.stats.frames_decoded += 1;
                    return Some(frame);
                }
                Decoded::NeedMoreData => {
                    // The frame at the marker is incomplete; keep the buffer
                    // intact (including the marker) and wait.
                    return None;
                }
                Decoded::Invalid => {
                    // The marker byte was a false positive. Discard exactly
                    // one byte and rescan.
                    let byte = self.buffer[0];
                    self.buffer.advance(1);
                    self.stats.bytes_discarded += 1;
                    self.stats.false_markers += 1;
                    diagnostics.false_marker(byte);
                }
            }
        }
    }

    /// Current framing counters.
    pub fn stats(&self) -> FramerStats {
        self.stats
    }

    /// Number of bytes currently buffered.
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    /// Drop all buffered bytes (e.g. on reconnect).
    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}

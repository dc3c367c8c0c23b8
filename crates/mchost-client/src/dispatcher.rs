//! Command dispatch: single-flight issuance and frame correlation.
//!
//! The companion protocol is half-duplex at the command level: the device
//! never multiplexes replies to concurrent commands, so the host must not
//! have more than one command outstanding. The dispatcher enforces this with
//! an exclusive gate (an async mutex over the transport's write half, held
//! from frame write until resolution) and correlates each inbound frame to
//! either the pending command or the push router.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use mchost_protocol::{
    FrameCodec, FrameDirection, PushTable, ResponseEnvelope, RESP_CODE_ERR,
};
use parking_lot::Mutex;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::{mpsc, oneshot, Mutex as AsyncMutex, MutexGuard};

use crate::error::{ClientError, Result};
use crate::push::{PushEvent, PushRouter};

type Writer = Box<dyn AsyncWrite + Send + Unpin>;

/// Completion slot of the pending command.
enum Completion {
    /// Plain command: resolved by the first matching reply.
    Single(oneshot::Sender<ResponseEnvelope>),
    /// Burst sequence: receives every reply frame until the caller is done.
    Stream(mpsc::UnboundedSender<ResponseEnvelope>),
}

/// The at-most-one command currently awaiting a reply.
struct Pending {
    command: u8,
    completion: Completion,
}

/// Dispatch state shared between command issuers and the read loop.
#[derive(Default)]
pub(crate) struct DispatchState {
    /// Exactly zero or one pending command exists at any instant.
    pending: Mutex<Option<Pending>>,
    closed: AtomicBool,
}

impl DispatchState {
    /// Route one inbound envelope to the pending command or the push router.
    ///
    /// Push-coded frames never resolve a pending command, even while one is
    /// outstanding. A response-coded frame with no pending command is a late
    /// reply (the caller timed out or cancelled); it goes to the push router
    /// where unrecognizing subscribers drop it.
    pub(crate) fn route(&self, env: ResponseEnvelope, push_codes: &PushTable, push: &PushRouter) {
        if push_codes.is_push(env.code) {
            tracing::trace!(code = format_args!("0x{:02X}", env.code), "push notification");
            push.deliver(PushEvent { code: env.code, data: env.data });
            return;
        }

        let mut slot = self.pending.lock();
        match slot.take() {
            Some(Pending { command, completion: Completion::Single(tx) }) => {
                drop(slot);
                if tx.send(env).is_err() {
                    tracing::trace!(command, "reply arrived after the caller gave up");
                }
            }
            Some(Pending { command, completion: Completion::Stream(tx) }) => {
                // Streaming slots survive across many reply frames; put the
                // sender back unless the consumer went away.
                if tx.send(env).is_ok() {
                    *slot = Some(Pending { command, completion: Completion::Stream(tx) });
                }
            }
            None => {
                drop(slot);
                tracing::debug!(
                    code = format_args!("0x{:02X}", env.code),
                    "stray reply with no pending command"
                );
                push.deliver(PushEvent { code: env.code, data: env.data });
            }
        }
    }

    /// Mark the session closed and fail the pending command, if any.
    ///
    /// Dropping the completion sender wakes the waiting caller, which maps
    /// the closed channel to [`ClientError::ConnectionClosed`].
    pub(crate) fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.pending.lock().take();
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

/// Clears the pending slot when the issuing future is dropped.
///
/// Covers caller cancellation and timeout alike: whatever path unwinds the
/// `send`, the slot is empty afterwards so the next command can proceed.
struct ClearPending<'a> {
    state: &'a DispatchState,
}

impl Drop for ClearPending<'_> {
    fn drop(&mut self) {
        self.state.pending.lock().take();
    }
}

/// Serializes command issuance and owns the transport's write half.
pub(crate) struct CommandDispatcher {
    gate: AsyncMutex<Writer>,
    state: Arc<DispatchState>,
}

impl CommandDispatcher {
    pub(crate) fn new(writer: Writer, state: Arc<DispatchState>) -> Self {
        CommandDispatcher {
            gate: AsyncMutex::new(writer),
            state,
        }
    }

    /// Send one command and wait for its reply.
    ///
    /// Suspends until the gate is free, writes the frame, then waits for
    /// resolution: a reply frame, the deadline, or connection loss. An
    /// error-coded reply surfaces as [`ClientError::Device`] with the
    /// firmware's status byte.
    pub(crate) async fn send(
        &self,
        command: u8,
        payload: &[u8],
        timeout: Duration,
    ) -> Result<ResponseEnvelope> {
        let mut writer = self.gate.lock().await;
        if self.state.is_closed() {
            return Err(ClientError::ConnectionClosed);
        }

        let wire = encode_command(command, payload)?;
        let (tx, rx) = oneshot::channel();
        // Install the pending slot before the bytes hit the wire so a fast
        // reply cannot race past the read loop unmatched.
        *self.state.pending.lock() = Some(Pending {
            command,
            completion: Completion::Single(tx),
        });
        let _clear = ClearPending { state: &self.state };

        writer.write_all(&wire).await?;
        writer.flush().await?;
        tracing::debug!(
            command = format_args!("0x{:02X}", command),
            len = payload.len(),
            "command sent"
        );

        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(env)) => resolve(command, env),
            // Sender dropped without a reply: the read loop shut down.
            Ok(Err(_)) => Err(ClientError::ConnectionClosed),
            Err(_) => {
                tracing::debug!(command = format_args!("0x{:02X}", command), "command timed out");
                Err(ClientError::Timeout { command })
            }
        }
    }

    /// Send a command whose reply is a burst of frames (e.g. contact
    /// listing: start, items, end — all without further commands).
    ///
    /// The returned stream holds the gate until dropped, so the burst
    /// cannot interleave with another command.
    pub(crate) async fn send_streaming(
        &self,
        command: u8,
        payload: &[u8],
    ) -> Result<ResponseStream<'_>> {
        let mut writer = self.gate.lock().await;
        if self.state.is_closed() {
            return Err(ClientError::ConnectionClosed);
        }

        let wire = encode_command(command, payload)?;
        let (tx, rx) = mpsc::unbounded_channel();
        *self.state.pending.lock() = Some(Pending {
            command,
            completion: Completion::Stream(tx),
        });

        if let Err(e) = async {
            writer.write_all(&wire).await?;
            writer.flush().await
        }
        .await
        {
            self.state.pending.lock().take();
            return Err(e.into());
        }
        tracing::debug!(command = format_args!("0x{:02X}", command), "sequence command sent");

        Ok(ResponseStream {
            _gate: writer,
            rx,
            state: &self.state,
            command,
        })
    }

    /// Shut down the write half. Waits for the gate, so any in-flight
    /// command must have resolved (the session fails it first).
    pub(crate) async fn shutdown(&self) {
        let mut writer = self.gate.lock().await;
        if let Err(e) = writer.shutdown().await {
            tracing::debug!(error = %e, "write half shutdown failed");
        }
    }
}

/// Reply frames for one streaming command, in arrival order.
///
/// Holds the dispatch gate for its whole lifetime; dropping it clears the
/// pending slot and releases the gate.
pub(crate) struct ResponseStream<'a> {
    _gate: MutexGuard<'a, Writer>,
    rx: mpsc::UnboundedReceiver<ResponseEnvelope>,
    state: &'a DispatchState,
    command: u8,
}

impl ResponseStream<'_> {
    /// Wait for the next reply frame.
    pub(crate) async fn next(&mut self, timeout: Duration) -> Result<ResponseEnvelope> {
        match tokio::time::timeout(timeout, self.rx.recv()).await {
            Ok(Some(env)) => Ok(env),
            Ok(None) => Err(ClientError::ConnectionClosed),
            Err(_) => Err(ClientError::Timeout { command: self.command }),
        }
    }
}

impl Drop for ResponseStream<'_> {
    fn drop(&mut self) {
        self.state.pending.lock().take();
    }
}

/// Frame a command code plus argument bytes for the wire.
fn encode_command(command: u8, payload: &[u8]) -> Result<Vec<u8>> {
    let mut buf = Vec::with_capacity(1 + payload.len());
    buf.push(command);
    buf.extend_from_slice(payload);
    Ok(FrameCodec::encode(FrameDirection::HostToDevice, &buf)?)
}

/// Classify a resolved reply: error-coded replies become typed errors.
fn resolve(command: u8, env: ResponseEnvelope) -> Result<ResponseEnvelope> {
    if env.code == RESP_CODE_ERR {
        let status = env.status.unwrap_or(0);
        return Err(ClientError::Device {
            command,
            code: status.into(),
        });
    }
    Ok(env)
}

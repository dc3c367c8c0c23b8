//! Device session: the top-level façade.
//!
//! A [`DeviceSession`] owns one background reader task and one command
//! dispatcher over a byte stream connected to a companion radio. The stream
//! can be anything implementing tokio's `AsyncRead + AsyncWrite` — a serial
//! port, a TCP socket to a simulator's UART port, a PTY. Opening and
//! enumerating devices is the caller's concern.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use mchost_protocol::{
    DiagnosticsSink, FramerStats, LogSink, PushTable, ResponseEnvelope, StreamFramer,
    CMD_APP_START, CMD_DEVICE_QUERY, CMD_GET_BATT_AND_STORAGE, CMD_GET_DEVICE_TIME,
    CMD_SEND_SELF_ADVERT, CMD_SET_DEVICE_TIME, ProtocolError, RESP_CODE_BATT_AND_STORAGE,
    RESP_CODE_CURR_TIME, RESP_CODE_DEVICE_INFO, RESP_CODE_OK, RESP_CODE_SELF_INFO,
};
use parking_lot::Mutex;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite};
use tokio::task::JoinHandle;

use crate::config::SessionConfig;
use crate::dispatcher::{CommandDispatcher, DispatchState};
use crate::error::{ClientError, Result};
use crate::push::{PushRouter, PushSubscription};
use crate::sequence::{run_contact_sync, run_message_sync, ContactSyncResult, MessageSyncResult};

/// Battery voltage and storage usage, as reported by the device.
///
/// These fields are protocol-level little-endian integers; everything
/// richer stays with the domain layer above.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatteryAndStorage {
    /// Battery voltage in millivolts.
    pub battery_millivolts: u16,
    /// Storage used, in kilobytes.
    pub storage_used_kb: u32,
    /// Storage total, in kilobytes.
    pub storage_total_kb: u32,
}

/// State shared between the session handle and the reader task.
struct SessionShared {
    dispatch: Arc<DispatchState>,
    push: PushRouter,
    push_codes: PushTable,
    framer: Mutex<StreamFramer>,
}

/// An open session with a companion radio.
///
/// Dropping the session aborts the reader task; prefer
/// [`disconnect`](Self::disconnect) so the write half is shut down too.
pub struct DeviceSession {
    dispatcher: CommandDispatcher,
    shared: Arc<SessionShared>,
    config: SessionConfig,
    read_task: Option<JoinHandle<()>>,
}

impl DeviceSession {
    /// Open a session over a connected byte stream.
    ///
    /// Spawns the background reader task on the current tokio runtime;
    /// framing diagnostics go to the `log` crate.
    pub fn connect<T>(transport: T, config: SessionConfig) -> Self
    where
        T: AsyncRead + AsyncWrite + Send + Unpin + 'static,
    {
        Self::connect_with_diagnostics(transport, config, Box::new(LogSink))
    }

    /// Open a session with a custom framing diagnostics sink.
    pub fn connect_with_diagnostics<T>(
        transport: T,
        config: SessionConfig,
        diagnostics: Box<dyn DiagnosticsSink>,
    ) -> Self
    where
        T: AsyncRead + AsyncWrite + Send + Unpin + 'static,
    {
        let (reader, writer) = tokio::io::split(transport);

        let shared = Arc::new(SessionShared {
            dispatch: Arc::new(DispatchState::default()),
            push: PushRouter::default(),
            push_codes: config.push_codes.clone(),
            framer: Mutex::new(StreamFramer::new()),
        });

        let read_task = tokio::spawn(read_loop(
            Box::new(reader),
            shared.clone(),
            diagnostics,
            config.read_chunk_size,
        ));

        DeviceSession {
            dispatcher: CommandDispatcher::new(Box::new(writer), shared.dispatch.clone()),
            shared,
            config,
            read_task: Some(read_task),
        }
    }

    /// Execute a single command with the configured default timeout.
    ///
    /// `payload` is the command's argument bytes; the command code is
    /// prepended and framed here.
    pub async fn execute(&self, command: u8, payload: &[u8]) -> Result<ResponseEnvelope> {
        self.dispatcher
            .send(command, payload, self.config.command_timeout)
            .await
    }

    /// Execute a single command with an explicit timeout.
    pub async fn execute_with_timeout(
        &self,
        command: u8,
        payload: &[u8],
        timeout: Duration,
    ) -> Result<ResponseEnvelope> {
        self.dispatcher.send(command, payload, timeout).await
    }

    /// Retrieve the full contact list from the device.
    pub async fn contact_sync(&self) -> Result<ContactSyncResult> {
        run_contact_sync(&self.dispatcher, &self.config, None).await
    }

    /// Retrieve contacts modified after `since` (a lastmod timestamp,
    /// typically the `latest_lastmod` of the previous sync).
    pub async fn contact_sync_since(&self, since: u32) -> Result<ContactSyncResult> {
        run_contact_sync(&self.dispatcher, &self.config, Some(since)).await
    }

    /// Drain the device's queued-message store.
    pub async fn message_sync(&self) -> Result<MessageSyncResult> {
        run_message_sync(&self.dispatcher, &self.config).await
    }

    /// Subscribe to unsolicited push notifications.
    pub fn subscribe(&self) -> PushSubscription {
        self.shared.push.subscribe()
    }

    /// Framing-layer counters (resync noise, false markers, frame count).
    pub fn framer_stats(&self) -> FramerStats {
        self.shared.framer.lock().stats()
    }

    /// Close the session: cancel the reader task, fail any in-flight
    /// command with [`ClientError::ConnectionClosed`], shut down the
    /// write half.
    pub async fn disconnect(mut self) {
        self.shutdown_read_side();
        self.dispatcher.shutdown().await;
        tracing::debug!("session disconnected");
    }

    fn shutdown_read_side(&mut self) {
        // Fail the pending command before touching the gate: the in-flight
        // caller holds the gate and releases it once its completion drops.
        self.shared.dispatch.close();
        self.shared.push.close();
        if let Some(task) = self.read_task.take() {
            task.abort();
        }
    }

    // ========================================================================
    // Typed convenience commands
    // ========================================================================

    /// Query device information (protocol version handshake). Returns the
    /// raw device-info bytes.
    pub async fn device_query(&self, app_version: u8) -> Result<Bytes> {
        let env = self.execute(CMD_DEVICE_QUERY, &[app_version]).await?;
        expect_code(CMD_DEVICE_QUERY, &env, RESP_CODE_DEVICE_INFO)?;
        Ok(env.data)
    }

    /// Start the app connection. Returns the raw self-info bytes.
    pub async fn app_start(&self, app_name: &str) -> Result<Bytes> {
        let mut payload = vec![0u8; 7];
        payload.extend_from_slice(app_name.as_bytes());
        let env = self.execute(CMD_APP_START, &payload).await?;
        expect_code(CMD_APP_START, &env, RESP_CODE_SELF_INFO)?;
        Ok(env.data)
    }

    /// Read the device clock (seconds since the Unix epoch).
    pub async fn get_device_time(&self) -> Result<u32> {
        let env = self.execute(CMD_GET_DEVICE_TIME, &[]).await?;
        expect_code(CMD_GET_DEVICE_TIME, &env, RESP_CODE_CURR_TIME)?;
        read_u32_le(&env.data)
    }

    /// Set the device clock.
    pub async fn set_device_time(&self, time_secs: u32) -> Result<()> {
        let env = self
            .execute(CMD_SET_DEVICE_TIME, &time_secs.to_le_bytes())
            .await?;
        expect_code(CMD_SET_DEVICE_TIME, &env, RESP_CODE_OK)?;
        Ok(())
    }

    /// Broadcast a self-advertisement, flooded or zero-hop.
    pub async fn send_self_advert(&self, flood: bool) -> Result<()> {
        let env = self
            .execute(CMD_SEND_SELF_ADVERT, &[u8::from(flood)])
            .await?;
        expect_code(CMD_SEND_SELF_ADVERT, &env, RESP_CODE_OK)?;
        Ok(())
    }

    /// Read battery voltage and storage usage.
    pub async fn get_battery_and_storage(&self) -> Result<BatteryAndStorage> {
        let env = self.execute(CMD_GET_BATT_AND_STORAGE, &[]).await?;
        expect_code(CMD_GET_BATT_AND_STORAGE, &env, RESP_CODE_BATT_AND_STORAGE)?;
        let d = &env.data;
        if d.len() < 10 {
            return Err(ProtocolError::FrameTooShort { expected: 10, actual: d.len() }.into());
        }
        Ok(BatteryAndStorage {
            battery_millivolts: u16::from_le_bytes([d[0], d[1]]),
            storage_used_kb: u32::from_le_bytes([d[2], d[3], d[4], d[5]]),
            storage_total_kb: u32::from_le_bytes([d[6], d[7], d[8], d[9]]),
        })
    }
}

impl Drop for DeviceSession {
    fn drop(&mut self) {
        self.shutdown_read_side();
    }
}

/// Check that a reply carries the code its command expects.
fn expect_code(command: u8, env: &ResponseEnvelope, expected: u8) -> Result<()> {
    if env.code != expected {
        return Err(ClientError::UnexpectedReply { command, code: env.code });
    }
    Ok(())
}

fn read_u32_le(data: &Bytes) -> Result<u32> {
    if data.len() < 4 {
        return Err(ProtocolError::FrameTooShort { expected: 4, actual: data.len() }.into());
    }
    Ok(u32::from_le_bytes([data[0], data[1], data[2], data[3]]))
}

/// The background reader: pumps transport bytes through the framer and
/// routes every decoded frame. Never blocks on command issuance.
async fn read_loop(
    mut reader: Box<dyn AsyncRead + Send + Unpin>,
    shared: Arc<SessionShared>,
    mut diagnostics: Box<dyn DiagnosticsSink>,
    chunk_size: usize,
) {
    let mut buf = vec![0u8; chunk_size];
    loop {
        match reader.read(&mut buf).await {
            Ok(0) => {
                tracing::debug!("device closed the stream");
                break;
            }
            Ok(n) => {
                let mut framer = shared.framer.lock();
                framer.push(&buf[..n]);
                while let Some(frame) = framer.next_frame(diagnostics.as_mut()) {
                    match ResponseEnvelope::from_frame(&frame) {
                        Ok(env) => {
                            shared.dispatch.route(env, &shared.push_codes, &shared.push);
                        }
                        Err(e) => {
                            // A well-framed but uninterpretable payload
                            // (e.g. our own marker echoed back).
                            tracing::warn!(error = %e, "dropping undecodable inbound frame");
                        }
                    }
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "transport read failed");
                break;
            }
        }
    }
    // Fail whatever is pending and end all subscriptions.
    shared.dispatch.close();
    shared.push.close();
}

//! Async host client for MeshCore companion radios.
//!
//! This crate drives the companion serial protocol from the host side: it
//! frames commands, correlates replies under the protocol's
//! one-command-at-a-time discipline, routes unsolicited push notifications,
//! and implements the two multi-frame sequences (contact listing and
//! queued-message draining) on top.
//!
//! The transport is any `AsyncRead + AsyncWrite` byte stream — a serial
//! port, a TCP socket to a simulated node's UART port, a PTY. Opening it is
//! the caller's job.
//!
//! # Example
//!
//! ```rust,ignore
//! use mchost_client::{DeviceSession, SessionConfig};
//! use tokio::net::TcpStream;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), mchost_client::ClientError> {
//!     let stream = TcpStream::connect("127.0.0.1:5000").await?;
//!     let session = DeviceSession::connect(stream, SessionConfig::default());
//!
//!     let info = session.device_query(8).await?;
//!     println!("device info: {} bytes", info.len());
//!
//!     let contacts = session.contact_sync().await?;
//!     println!("{} contacts", contacts.records.len());
//!
//!     let mut pushes = session.subscribe();
//!     while let Some(event) = pushes.recv().await {
//!         println!("push 0x{:02X}", event.code);
//!     }
//!
//!     session.disconnect().await;
//!     Ok(())
//! }
//! ```

mod config;
mod dispatcher;
mod error;
mod push;
mod sequence;
mod session;

pub use config::SessionConfig;
pub use error::{ClientError, Result, SequenceFault};
pub use push::{PushEvent, PushSubscription};
pub use sequence::{ContactSyncResult, MessageSyncResult, SyncPolicy, SyncRecord};
pub use session::{BatteryAndStorage, DeviceSession};

// The protocol layer is part of the public surface: callers match on codes
// and may tune the push table.
pub use mchost_protocol as protocol;

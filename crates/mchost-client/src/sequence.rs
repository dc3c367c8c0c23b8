//! Multi-frame sequence protocols: contact listing and message draining.
//!
//! Both ride on the dispatcher and share the same state machine shape:
//!
//! ```text
//! Requesting -> ReceivingItems* -> Complete | Failed
//! ```
//!
//! Contact sync is a burst: one `CMD_GET_CONTACTS` triggers a
//! CONTACTS_START frame, zero or more CONTACT items, and one
//! END_OF_CONTACTS terminal, with no further commands from the host.
//! Message sync drains a queue: each `CMD_SYNC_NEXT_MESSAGE` yields one
//! stored message until NO_MORE_MESSAGES.

use bytes::Bytes;
use mchost_protocol::{
    CMD_GET_CONTACTS, CMD_SYNC_NEXT_MESSAGE, RESP_CODE_CHANNEL_MSG_RECV,
    RESP_CODE_CHANNEL_MSG_RECV_V3, RESP_CODE_CONTACT, RESP_CODE_CONTACTS_START,
    RESP_CODE_CONTACT_MSG_RECV, RESP_CODE_CONTACT_MSG_RECV_V3, RESP_CODE_END_OF_CONTACTS,
    RESP_CODE_ERR, RESP_CODE_NO_MORE_MESSAGES,
};

use crate::config::SessionConfig;
use crate::dispatcher::CommandDispatcher;
use crate::error::{ClientError, Result, SequenceFault};

/// What to do with accumulated records when a sequence aborts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPolicy {
    /// Drop everything; the error carries no records.
    Discard,
    /// Attach the records received before the fault to the error.
    KeepPartial,
}

/// One raw record from a sequence: the protocol item tag plus its bytes.
///
/// Field layouts inside `data` belong to the layer above; the sequence
/// protocol only needs the tag to know where records begin and end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncRecord {
    /// The response code that tagged this record.
    pub code: u8,
    /// Raw record bytes.
    pub data: Bytes,
}

/// Result of a completed contact listing.
#[derive(Debug, Clone)]
pub struct ContactSyncResult {
    /// Raw contact records, in arrival order.
    pub records: Vec<SyncRecord>,
    /// Total count the device declared in CONTACTS_START.
    pub declared_total: u32,
    /// Most recent lastmod timestamp from END_OF_CONTACTS; feed it back as
    /// the `since` filter of the next listing for an incremental sync.
    pub latest_lastmod: u32,
}

/// Result of a completed message drain.
#[derive(Debug, Clone)]
pub struct MessageSyncResult {
    /// Raw queued-message records, in arrival order.
    pub records: Vec<SyncRecord>,
}

/// Sequence progress, for tracing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SyncState {
    Requesting,
    ReceivingItems,
    Complete,
    Failed,
}

/// Build the failure error, applying the partial-result policy.
fn fail<T>(fault: SequenceFault, records: Vec<SyncRecord>, policy: SyncPolicy) -> Result<T> {
    tracing::debug!(state = ?SyncState::Failed, %fault, records = records.len(), "sync aborted");
    let partial = match policy {
        SyncPolicy::KeepPartial => records,
        SyncPolicy::Discard => Vec::new(),
    };
    Err(ClientError::Sequence { fault, partial })
}

/// Run the contact listing sequence.
pub(crate) async fn run_contact_sync(
    dispatcher: &CommandDispatcher,
    config: &SessionConfig,
    since: Option<u32>,
) -> Result<ContactSyncResult> {
    let policy = config.sync_policy;
    let payload = match since {
        Some(s) => s.to_le_bytes().to_vec(),
        None => Vec::new(),
    };

    let mut state = SyncState::Requesting;
    tracing::debug!(state = ?state, ?since, "contact sync started");
    let mut stream = dispatcher.send_streaming(CMD_GET_CONTACTS, &payload).await?;

    let first = stream.next(config.command_timeout).await?;
    if first.code == RESP_CODE_ERR {
        return Err(ClientError::Device {
            command: CMD_GET_CONTACTS,
            code: first.status.unwrap_or(0).into(),
        });
    }
    if first.code != RESP_CODE_CONTACTS_START {
        return fail(
            SequenceFault::UnexpectedCode { code: first.code },
            Vec::new(),
            policy,
        );
    }
    if first.data.len() < 4 {
        return fail(
            SequenceFault::MalformedItem {
                reason: format!(
                    "contacts-start carries {} bytes, expected a 4-byte total",
                    first.data.len()
                ),
            },
            Vec::new(),
            policy,
        );
    }
    let declared_total =
        u32::from_le_bytes([first.data[0], first.data[1], first.data[2], first.data[3]]);

    state = SyncState::ReceivingItems;
    tracing::debug!(state = ?state, declared_total, "receiving contacts");
    let mut records: Vec<SyncRecord> = Vec::new();

    loop {
        if records.len() >= config.max_sync_iterations {
            return fail(
                SequenceFault::IterationLimit { limit: config.max_sync_iterations },
                records,
                policy,
            );
        }

        let env = match stream.next(config.item_timeout).await {
            Ok(env) => env,
            Err(ClientError::Timeout { .. }) => {
                return fail(SequenceFault::ItemTimeout, records, policy)
            }
            Err(e) => return fail(SequenceFault::Aborted(Box::new(e)), records, policy),
        };

        match env.code {
            RESP_CODE_CONTACT => {
                if env.data.is_empty() {
                    return fail(
                        SequenceFault::MalformedItem { reason: "empty contact record".into() },
                        records,
                        policy,
                    );
                }
                records.push(SyncRecord { code: env.code, data: env.data });
            }
            RESP_CODE_END_OF_CONTACTS => {
                if env.data.len() < 4 {
                    return fail(
                        SequenceFault::MalformedItem {
                            reason: "end-of-contacts missing lastmod timestamp".into(),
                        },
                        records,
                        policy,
                    );
                }
                let latest_lastmod =
                    u32::from_le_bytes([env.data[0], env.data[1], env.data[2], env.data[3]]);
                if records.len() != declared_total as usize {
                    // The terminal marker is authoritative; the declared
                    // total can lag when contacts change mid-listing.
                    tracing::warn!(
                        declared_total,
                        received = records.len(),
                        "contact count mismatch"
                    );
                }
                state = SyncState::Complete;
                tracing::debug!(state = ?state, contacts = records.len(), "contact sync complete");
                return Ok(ContactSyncResult { records, declared_total, latest_lastmod });
            }
            code => {
                return fail(SequenceFault::UnexpectedCode { code }, records, policy);
            }
        }
    }
}

/// Run the queued-message draining sequence.
pub(crate) async fn run_message_sync(
    dispatcher: &CommandDispatcher,
    config: &SessionConfig,
) -> Result<MessageSyncResult> {
    let policy = config.sync_policy;
    let mut state = SyncState::Requesting;
    tracing::debug!(state = ?state, "message sync started");
    let mut records: Vec<SyncRecord> = Vec::new();

    for _ in 0..config.max_sync_iterations {
        let env = match dispatcher
            .send(CMD_SYNC_NEXT_MESSAGE, &[], config.command_timeout)
            .await
        {
            Ok(env) => env,
            Err(e) => return fail(SequenceFault::Aborted(Box::new(e)), records, policy),
        };

        match env.code {
            RESP_CODE_NO_MORE_MESSAGES => {
                state = SyncState::Complete;
                tracing::debug!(state = ?state, messages = records.len(), "message sync complete");
                return Ok(MessageSyncResult { records });
            }
            RESP_CODE_CONTACT_MSG_RECV
            | RESP_CODE_CONTACT_MSG_RECV_V3
            | RESP_CODE_CHANNEL_MSG_RECV
            | RESP_CODE_CHANNEL_MSG_RECV_V3 => {
                if env.data.is_empty() {
                    return fail(
                        SequenceFault::MalformedItem { reason: "empty message record".into() },
                        records,
                        policy,
                    );
                }
                if records.is_empty() {
                    state = SyncState::ReceivingItems;
                    tracing::trace!(state = ?state, "first queued message received");
                }
                records.push(SyncRecord { code: env.code, data: env.data });
            }
            code => {
                return fail(SequenceFault::UnexpectedCode { code }, records, policy);
            }
        }
    }

    fail(
        SequenceFault::IterationLimit { limit: config.max_sync_iterations },
        records,
        policy,
    )
}

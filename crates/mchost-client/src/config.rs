//! Session configuration.

use std::time::Duration;

use mchost_protocol::PushTable;

use crate::sequence::SyncPolicy;

/// Configuration for a [`crate::DeviceSession`].
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Deadline for a single command's reply.
    pub command_timeout: Duration,

    /// Deadline for each item frame inside a burst sequence
    /// (contact listing). Items arrive back-to-back, so this can be
    /// shorter than `command_timeout`.
    pub item_timeout: Duration,

    /// Safety bound on sequence iterations/items, protecting against a
    /// device that never sends its terminal marker.
    pub max_sync_iterations: usize,

    /// What to do with accumulated records when a sequence aborts.
    pub sync_policy: SyncPolicy,

    /// Codes classified as unsolicited push notifications. Configurable
    /// because later protocol revisions may widen the range.
    pub push_codes: PushTable,

    /// Read buffer size for the background reader task.
    pub read_chunk_size: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            command_timeout: Duration::from_secs(5),
            item_timeout: Duration::from_secs(2),
            max_sync_iterations: 256,
            sync_policy: SyncPolicy::Discard,
            push_codes: PushTable::default(),
            read_chunk_size: 1024,
        }
    }
}

impl SessionConfig {
    /// Set the per-command reply deadline.
    pub fn with_command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    /// Set the per-item deadline for burst sequences.
    pub fn with_item_timeout(mut self, timeout: Duration) -> Self {
        self.item_timeout = timeout;
        self
    }

    /// Set the sequence iteration safety bound.
    pub fn with_max_sync_iterations(mut self, limit: usize) -> Self {
        self.max_sync_iterations = limit;
        self
    }

    /// Set the partial-result policy for aborted sequences.
    pub fn with_sync_policy(mut self, policy: SyncPolicy) -> Self {
        self.sync_policy = policy;
        self
    }

    /// Override the push-code classification table.
    pub fn with_push_codes(mut self, table: PushTable) -> Self {
        self.push_codes = table;
        self
    }
}

//! Protocol constants.
//!
//! Command, response, push, and firmware error code tables for the
//! companion serial protocol. Only the commands the client surface drives
//! are listed; the response and push tables are complete because frame
//! classification needs to recognize every inbound code.

// ============================================================================
// Command Codes (host → device)
// ============================================================================

/// Start the app connection and get self info.
pub const CMD_APP_START: u8 = 1;
/// Send a text message to a contact.
pub const CMD_SEND_TXT_MSG: u8 = 2;
/// Send a text message to a channel.
pub const CMD_SEND_CHANNEL_TXT_MSG: u8 = 3;
/// Get the list of contacts (with optional 'since' filter).
pub const CMD_GET_CONTACTS: u8 = 4;
/// Get the current device time.
pub const CMD_GET_DEVICE_TIME: u8 = 5;
/// Set the device time.
pub const CMD_SET_DEVICE_TIME: u8 = 6;
/// Send a self-advertisement packet.
pub const CMD_SEND_SELF_ADVERT: u8 = 7;
/// Set the advertisement name.
pub const CMD_SET_ADVERT_NAME: u8 = 8;
/// Sync the next message from the offline queue.
pub const CMD_SYNC_NEXT_MESSAGE: u8 = 10;
/// Reboot the device.
pub const CMD_REBOOT: u8 = 19;
/// Get battery voltage and storage info.
pub const CMD_GET_BATT_AND_STORAGE: u8 = 20;
/// Query device information.
pub const CMD_DEVICE_QUERY: u8 = 22;

// ============================================================================
// Response Codes (device → host, replies to a command)
// ============================================================================

/// Generic OK response.
pub const RESP_CODE_OK: u8 = 0;
/// Generic error response (followed by a status byte).
pub const RESP_CODE_ERR: u8 = 1;
/// Start of contacts list (carries the total count).
pub const RESP_CODE_CONTACTS_START: u8 = 2;
/// A single contact entry.
pub const RESP_CODE_CONTACT: u8 = 3;
/// End of contacts list (carries the most recent lastmod timestamp).
pub const RESP_CODE_END_OF_CONTACTS: u8 = 4;
/// Self info response (reply to CMD_APP_START).
pub const RESP_CODE_SELF_INFO: u8 = 5;
/// Message sent response.
pub const RESP_CODE_SENT: u8 = 6;
/// Contact message from the offline queue (legacy, ver < 3).
pub const RESP_CODE_CONTACT_MSG_RECV: u8 = 7;
/// Channel message from the offline queue (legacy, ver < 3).
pub const RESP_CODE_CHANNEL_MSG_RECV: u8 = 8;
/// Current time response.
pub const RESP_CODE_CURR_TIME: u8 = 9;
/// No more messages in the offline queue.
pub const RESP_CODE_NO_MORE_MESSAGES: u8 = 10;
/// Exported contact data.
pub const RESP_CODE_EXPORT_CONTACT: u8 = 11;
/// Battery and storage info.
pub const RESP_CODE_BATT_AND_STORAGE: u8 = 12;
/// Device info response (reply to CMD_DEVICE_QUERY).
pub const RESP_CODE_DEVICE_INFO: u8 = 13;
/// Private key export response.
pub const RESP_CODE_PRIVATE_KEY: u8 = 14;
/// Feature disabled response.
pub const RESP_CODE_DISABLED: u8 = 15;
/// Contact message from the offline queue (ver >= 3).
pub const RESP_CODE_CONTACT_MSG_RECV_V3: u8 = 16;
/// Channel message from the offline queue (ver >= 3).
pub const RESP_CODE_CHANNEL_MSG_RECV_V3: u8 = 17;
/// Channel info response.
pub const RESP_CODE_CHANNEL_INFO: u8 = 18;
/// Signing started response.
pub const RESP_CODE_SIGN_START: u8 = 19;
/// Signature response.
pub const RESP_CODE_SIGNATURE: u8 = 20;
/// Custom variables response.
pub const RESP_CODE_CUSTOM_VARS: u8 = 21;
/// Advertisement path response.
pub const RESP_CODE_ADVERT_PATH: u8 = 22;
/// Tuning parameters response.
pub const RESP_CODE_TUNING_PARAMS: u8 = 23;
/// Statistics response (v8+).
pub const RESP_CODE_STATS: u8 = 24;

// ============================================================================
// Push Codes (device → host, unsolicited)
// ============================================================================

/// Advertisement received.
pub const PUSH_CODE_ADVERT: u8 = 0x80;
/// Path to a contact was updated.
pub const PUSH_CODE_PATH_UPDATED: u8 = 0x81;
/// Message send confirmed (ACK received).
pub const PUSH_CODE_SEND_CONFIRMED: u8 = 0x82;
/// Message waiting in the offline queue.
pub const PUSH_CODE_MSG_WAITING: u8 = 0x83;
/// Raw data received.
pub const PUSH_CODE_RAW_DATA: u8 = 0x84;
/// Login to server succeeded.
pub const PUSH_CODE_LOGIN_SUCCESS: u8 = 0x85;
/// Login to server failed.
pub const PUSH_CODE_LOGIN_FAIL: u8 = 0x86;
/// Status response from server.
pub const PUSH_CODE_STATUS_RESPONSE: u8 = 0x87;
/// Raw RX data log (debugging).
pub const PUSH_CODE_LOG_RX_DATA: u8 = 0x88;
/// Trace data received.
pub const PUSH_CODE_TRACE_DATA: u8 = 0x89;
/// New advertisement (when auto-add disabled).
pub const PUSH_CODE_NEW_ADVERT: u8 = 0x8A;
/// Telemetry response received.
pub const PUSH_CODE_TELEMETRY_RESPONSE: u8 = 0x8B;
/// Binary response received.
pub const PUSH_CODE_BINARY_RESPONSE: u8 = 0x8C;
/// Path discovery response received.
pub const PUSH_CODE_PATH_DISCOVERY_RESPONSE: u8 = 0x8D;
/// Control data received (v8+).
pub const PUSH_CODE_CONTROL_DATA: u8 = 0x8E;

// ============================================================================
// Error Codes (status byte following RESP_CODE_ERR)
// ============================================================================

/// Unsupported command.
pub const ERR_CODE_UNSUPPORTED_CMD: u8 = 1;
/// Contact/item not found.
pub const ERR_CODE_NOT_FOUND: u8 = 2;
/// Table (contacts, packets, etc.) is full.
pub const ERR_CODE_TABLE_FULL: u8 = 3;
/// Bad state for this operation.
pub const ERR_CODE_BAD_STATE: u8 = 4;
/// File I/O error.
pub const ERR_CODE_FILE_IO_ERROR: u8 = 5;
/// Illegal argument.
pub const ERR_CODE_ILLEGAL_ARG: u8 = 6;

//! Integration tests for the multi-frame sequences: contact listing and
//! queued-message draining.

use std::time::Duration;

use mchost_client::{ClientError, DeviceSession, SequenceFault, SessionConfig, SyncPolicy};
use mchost_protocol::{
    FrameCodec, FrameDirection, CMD_GET_CONTACTS, CMD_SYNC_NEXT_MESSAGE, ERR_CODE_BAD_STATE,
    FirmwareErrorCode, RESP_CODE_CONTACT, RESP_CODE_CONTACTS_START, RESP_CODE_CONTACT_MSG_RECV_V3,
    RESP_CODE_END_OF_CONTACTS, RESP_CODE_ERR, RESP_CODE_NO_MORE_MESSAGES,
};
use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream};

// ============================================================================
// Scripted-device helpers
// ============================================================================

/// Read one host→device frame and return its payload (code + args).
async fn read_command(device: &mut DuplexStream) -> Vec<u8> {
    let mut header = [0u8; 3];
    device.read_exact(&mut header).await.expect("read frame header");
    assert_eq!(header[0], b'<', "host frames must carry the outbound marker");
    let len = u16::from_le_bytes([header[1], header[2]]) as usize;
    let mut payload = vec![0u8; len];
    device.read_exact(&mut payload).await.expect("read frame payload");
    payload
}

/// Write one device→host frame with the given payload.
async fn send_reply(device: &mut DuplexStream, payload: &[u8]) {
    let wire = FrameCodec::encode(FrameDirection::DeviceToHost, payload).expect("encode reply");
    device.write_all(&wire).await.expect("write reply");
}

/// Assert that no bytes arrive from the host within `window`.
async fn assert_wire_quiet(device: &mut DuplexStream, window: Duration) {
    let mut byte = [0u8; 1];
    let outcome = tokio::time::timeout(window, device.read_exact(&mut byte)).await;
    assert!(outcome.is_err(), "unexpected bytes on the wire");
}

fn test_session(config: SessionConfig) -> (DeviceSession, DuplexStream) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
    let (host_end, device_end) = tokio::io::duplex(4096);
    let session = DeviceSession::connect(host_end, config);
    (session, device_end)
}

/// CONTACTS_START payload with a little-endian total count.
fn contacts_start(total: u32) -> Vec<u8> {
    let mut payload = vec![RESP_CODE_CONTACTS_START];
    payload.extend_from_slice(&total.to_le_bytes());
    payload
}

/// END_OF_CONTACTS payload with a little-endian lastmod timestamp.
fn end_of_contacts(lastmod: u32) -> Vec<u8> {
    let mut payload = vec![RESP_CODE_END_OF_CONTACTS];
    payload.extend_from_slice(&lastmod.to_le_bytes());
    payload
}

// ============================================================================
// Contact sync (burst variant)
// ============================================================================

#[tokio::test]
async fn test_contact_sync_burst() {
    let (session, mut device) = test_session(SessionConfig::default());

    let device_script = async {
        let cmd = read_command(&mut device).await;
        assert_eq!(cmd, vec![CMD_GET_CONTACTS]);

        send_reply(&mut device, &contacts_start(3)).await;
        for seed in [0x11u8, 0x22, 0x33] {
            let mut item = vec![RESP_CODE_CONTACT];
            item.extend_from_slice(&[seed; 8]);
            send_reply(&mut device, &item).await;
        }
        send_reply(&mut device, &end_of_contacts(1_700_000_000)).await;

        // The whole burst rides on the one start command.
        assert_wire_quiet(&mut device, Duration::from_millis(100)).await;
    };

    let (result, ()) = tokio::join!(session.contact_sync(), device_script);
    let result = result.expect("contact sync should complete");
    assert_eq!(result.records.len(), 3);
    assert_eq!(result.declared_total, 3);
    assert_eq!(result.latest_lastmod, 1_700_000_000);
    assert_eq!(&result.records[0].data[..], &[0x11; 8]);
    assert_eq!(result.records[2].code, RESP_CODE_CONTACT);
}

#[tokio::test]
async fn test_contact_sync_empty_list() {
    let (session, mut device) = test_session(SessionConfig::default());

    let device_script = async {
        let _cmd = read_command(&mut device).await;
        send_reply(&mut device, &contacts_start(0)).await;
        send_reply(&mut device, &end_of_contacts(0)).await;
    };

    let (result, ()) = tokio::join!(session.contact_sync(), device_script);
    let result = result.expect("empty listing should complete");
    assert!(result.records.is_empty());
    assert_eq!(result.declared_total, 0);
}

#[tokio::test]
async fn test_contact_sync_since_filter_encoded() {
    let (session, mut device) = test_session(SessionConfig::default());

    let device_script = async {
        let cmd = read_command(&mut device).await;
        assert_eq!(cmd[0], CMD_GET_CONTACTS);
        assert_eq!(&cmd[1..], &0xAABBCCDDu32.to_le_bytes());
        send_reply(&mut device, &contacts_start(0)).await;
        send_reply(&mut device, &end_of_contacts(0)).await;
    };

    let (result, ()) = tokio::join!(session.contact_sync_since(0xAABBCCDD), device_script);
    result.expect("incremental sync should complete");
}

#[tokio::test]
async fn test_contact_sync_device_error() {
    let (session, mut device) = test_session(SessionConfig::default());

    let device_script = async {
        let _cmd = read_command(&mut device).await;
        send_reply(&mut device, &[RESP_CODE_ERR, ERR_CODE_BAD_STATE]).await;
    };

    let (result, ()) = tokio::join!(session.contact_sync(), device_script);
    match result.expect_err("device error should abort the sync") {
        ClientError::Device { command, code } => {
            assert_eq!(command, CMD_GET_CONTACTS);
            assert_eq!(code, FirmwareErrorCode::BadState);
        }
        other => panic!("expected Device error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_contact_sync_unexpected_code_discards_by_default() {
    let (session, mut device) = test_session(SessionConfig::default());

    let device_script = async {
        let _cmd = read_command(&mut device).await;
        send_reply(&mut device, &contacts_start(3)).await;
        send_reply(&mut device, &[RESP_CODE_CONTACT, 1, 2, 3]).await;
        // A code that has no place in the listing sequence.
        send_reply(&mut device, &[0x63, 0]).await;
    };

    let (result, ()) = tokio::join!(session.contact_sync(), device_script);
    match result.expect_err("unexpected code should abort") {
        ClientError::Sequence { fault, partial } => {
            assert!(matches!(fault, SequenceFault::UnexpectedCode { code: 0x63 }));
            assert!(partial.is_empty(), "Discard policy must drop partial records");
        }
        other => panic!("expected Sequence error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_contact_sync_keep_partial_policy() {
    let config = SessionConfig::default().with_sync_policy(SyncPolicy::KeepPartial);
    let (session, mut device) = test_session(config);

    let device_script = async {
        let _cmd = read_command(&mut device).await;
        send_reply(&mut device, &contacts_start(5)).await;
        send_reply(&mut device, &[RESP_CODE_CONTACT, 1]).await;
        send_reply(&mut device, &[RESP_CODE_CONTACT, 2]).await;
        send_reply(&mut device, &[0x63, 0]).await;
    };

    let (result, ()) = tokio::join!(session.contact_sync(), device_script);
    match result.expect_err("unexpected code should abort") {
        ClientError::Sequence { partial, .. } => {
            assert_eq!(partial.len(), 2);
            assert_eq!(&partial[0].data[..], &[1]);
            assert_eq!(&partial[1].data[..], &[2]);
        }
        other => panic!("expected Sequence error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_contact_sync_item_timeout() {
    let config = SessionConfig::default().with_item_timeout(Duration::from_millis(50));
    let (session, mut device) = test_session(config);

    let device_script = async {
        let _cmd = read_command(&mut device).await;
        send_reply(&mut device, &contacts_start(2)).await;
        send_reply(&mut device, &[RESP_CODE_CONTACT, 7]).await;
        // Then silence: no second item, no terminal marker.
    };

    let (result, ()) = tokio::join!(session.contact_sync(), device_script);
    match result.expect_err("stalled burst should abort") {
        ClientError::Sequence { fault, .. } => {
            assert!(matches!(fault, SequenceFault::ItemTimeout));
        }
        other => panic!("expected Sequence error, got {:?}", other),
    }
}

// ============================================================================
// Message sync (draining variant)
// ============================================================================

#[tokio::test]
async fn test_message_sync_drains_queue() {
    let (session, mut device) = test_session(SessionConfig::default());

    let device_script = async {
        for seed in [0xA1u8, 0xB2] {
            let cmd = read_command(&mut device).await;
            assert_eq!(cmd, vec![CMD_SYNC_NEXT_MESSAGE]);
            let mut msg = vec![RESP_CODE_CONTACT_MSG_RECV_V3];
            msg.extend_from_slice(&[seed; 12]);
            send_reply(&mut device, &msg).await;
        }
        let cmd = read_command(&mut device).await;
        assert_eq!(cmd, vec![CMD_SYNC_NEXT_MESSAGE]);
        send_reply(&mut device, &[RESP_CODE_NO_MORE_MESSAGES]).await;
    };

    let (result, ()) = tokio::join!(session.message_sync(), device_script);
    let result = result.expect("drain should complete");
    assert_eq!(result.records.len(), 2);
    assert_eq!(result.records[0].code, RESP_CODE_CONTACT_MSG_RECV_V3);
    assert_eq!(&result.records[1].data[..], &[0xB2; 12]);
}

#[tokio::test]
async fn test_message_sync_empty_queue() {
    let (session, mut device) = test_session(SessionConfig::default());

    let device_script = async {
        let cmd = read_command(&mut device).await;
        assert_eq!(cmd, vec![CMD_SYNC_NEXT_MESSAGE]);
        send_reply(&mut device, &[RESP_CODE_NO_MORE_MESSAGES]).await;

        // Zero messages means exactly one fetch command, no extra loop turns.
        assert_wire_quiet(&mut device, Duration::from_millis(100)).await;
    };

    let (result, ()) = tokio::join!(session.message_sync(), device_script);
    assert!(result.expect("empty drain should complete").records.is_empty());
}

#[tokio::test]
async fn test_message_sync_iteration_bound() {
    let config = SessionConfig::default().with_max_sync_iterations(4);
    let (session, mut device) = test_session(config);

    // A misbehaving device that never says "no more messages".
    let device_script = async {
        loop {
            let mut header = [0u8; 3];
            if device.read_exact(&mut header).await.is_err() {
                break;
            }
            let len = u16::from_le_bytes([header[1], header[2]]) as usize;
            let mut payload = vec![0u8; len];
            if device.read_exact(&mut payload).await.is_err() {
                break;
            }
            send_reply(&mut device, &[RESP_CODE_CONTACT_MSG_RECV_V3, 0xFF]).await;
        }
    };

    let sync = async {
        let result = session.message_sync().await;
        session.disconnect().await; // ends the device script's read loop
        result
    };

    let (result, ()) = tokio::join!(sync, device_script);
    match result.expect_err("bound should trip") {
        ClientError::Sequence { fault, .. } => {
            assert!(matches!(fault, SequenceFault::IterationLimit { limit: 4 }));
        }
        other => panic!("expected Sequence error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_message_sync_device_error_mid_drain() {
    let config = SessionConfig::default().with_sync_policy(SyncPolicy::KeepPartial);
    let (session, mut device) = test_session(config);

    let device_script = async {
        let _cmd = read_command(&mut device).await;
        send_reply(&mut device, &[RESP_CODE_CONTACT_MSG_RECV_V3, 0x01]).await;
        let _cmd = read_command(&mut device).await;
        send_reply(&mut device, &[RESP_CODE_ERR, ERR_CODE_BAD_STATE]).await;
    };

    let (result, ()) = tokio::join!(session.message_sync(), device_script);
    match result.expect_err("device error should abort the drain") {
        ClientError::Sequence { fault, partial } => {
            assert!(matches!(fault, SequenceFault::Aborted(_)));
            assert_eq!(partial.len(), 1, "KeepPartial retains drained records");
        }
        other => panic!("expected Sequence error, got {:?}", other),
    }
}

//! Sender and receiver sessions wired through an in-process gateway.

use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::mpsc;

use filerelay_core::config::{RealtimeConfig, TransferConfig};
use filerelay_core::error::ErrorKind;
use filerelay_core::types::UserId;
use filerelay_realtime::{InboundMessage, SENDER_DISCONNECTED};
use filerelay_transfer::{
    AutoAccept, AutoReject, GatewayLink, MemorySink, NoopTransferLog, OutgoingFile,
    ReceiverDriver, ReceiverNotice, RelayLink, SenderSession,
};

use crate::helpers;

fn transfer_config(chunk: usize) -> TransferConfig {
    TransferConfig {
        chunk_size_bytes: chunk,
        pacing_delay_ms: 0,
        ..TransferConfig::default()
    }
}

fn collect(rx: &mut mpsc::UnboundedReceiver<ReceiverNotice>) -> Vec<ReceiverNotice> {
    std::iter::from_fn(|| rx.try_recv().ok()).collect()
}

#[tokio::test]
async fn test_batch_is_assembled_on_the_receiving_side() {
    let gateway = helpers::gateway(RealtimeConfig::default());
    let (alice, _alice_rx) = helpers::join(&gateway, "alice").await;
    let (bob, bob_rx) = helpers::join(&gateway, "bob").await;

    let sink = Arc::new(MemorySink::new());
    let (notice_tx, mut notices) = mpsc::unbounded_channel();
    let driver = ReceiverDriver::new(Arc::new(AutoAccept), sink.clone(), &transfer_config(4))
        .with_notices(notice_tx);
    let receiver = tokio::spawn(driver.run(bob_rx));

    let link: Arc<dyn RelayLink> = Arc::new(GatewayLink::new(gateway.clone(), alice));
    let (progress_tx, mut progress_rx) = mpsc::unbounded_channel();
    let mut sender = SenderSession::new(
        link,
        helpers::profile("alice", "Alice"),
        Arc::new(NoopTransferLog),
        transfer_config(4),
    )
    .with_progress(progress_tx);

    let report = sender
        .send_batch(
            &UserId::new("bob"),
            vec![
                OutgoingFile::new("report.pdf", "application/pdf", Bytes::from_static(b"0123456789")),
                OutgoingFile::new("notes.txt", "text/plain", Bytes::from_static(b"hey")),
            ],
        )
        .await
        .expect("batch sent");

    gateway.unregister(&bob).await;
    let session = receiver.await.expect("receiver task");
    assert!(session.is_idle());

    assert_eq!(report.sent, vec!["report.pdf", "notes.txt"]);
    assert_eq!(report.percent, 100);

    let stored = sink.artifacts();
    assert_eq!(stored.len(), 2);
    assert_eq!(stored[0].file_name, "report.pdf");
    assert_eq!(stored[0].mime_type, "application/pdf");
    assert_eq!(stored[0].data, Bytes::from_static(b"0123456789"));
    assert_eq!(stored[0].from, UserId::new("alice"));
    assert_eq!(stored[1].data, Bytes::from_static(b"hey"));

    let percents: Vec<u8> = std::iter::from_fn(|| progress_rx.try_recv().ok())
        .map(|u| u.percent)
        .collect();
    assert!(percents.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(percents.last(), Some(&100));

    let saved = collect(&mut notices)
        .into_iter()
        .filter(|n| matches!(n, ReceiverNotice::Saved { .. }))
        .count();
    assert_eq!(saved, 2);
}

#[tokio::test]
async fn test_many_chunks_flow_through_bounded_queues() {
    let gateway = helpers::gateway(RealtimeConfig {
        channel_buffer_size: 4,
        ..RealtimeConfig::default()
    });
    let (alice, _alice_rx) = helpers::join(&gateway, "alice").await;
    let (bob, bob_rx) = helpers::join(&gateway, "bob").await;

    let sink = Arc::new(MemorySink::new());
    let driver = ReceiverDriver::new(Arc::new(AutoAccept), sink.clone(), &transfer_config(16));
    let receiver = tokio::spawn(driver.run(bob_rx));

    let payload: Vec<u8> = (0..4096u32).map(|i| (i % 251) as u8).collect();
    let mut sender = SenderSession::new(
        Arc::new(GatewayLink::new(gateway.clone(), alice)),
        helpers::profile("alice", "Alice"),
        Arc::new(NoopTransferLog),
        transfer_config(16),
    );
    sender
        .send_batch(
            &UserId::new("bob"),
            vec![OutgoingFile::new("blob.bin", "application/octet-stream", payload.clone())],
        )
        .await
        .expect("batch sent");

    gateway.unregister(&bob).await;
    receiver.await.expect("receiver task");

    let stored = sink.artifacts();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].data.as_ref(), payload.as_slice());
}

#[tokio::test]
async fn test_rejected_offer_discards_the_stream() {
    let gateway = helpers::gateway(RealtimeConfig::default());
    let (alice, _alice_rx) = helpers::join(&gateway, "alice").await;
    let (bob, bob_rx) = helpers::join(&gateway, "bob").await;

    let sink = Arc::new(MemorySink::new());
    let driver = ReceiverDriver::new(Arc::new(AutoReject), sink.clone(), &transfer_config(4));
    let receiver = tokio::spawn(driver.run(bob_rx));

    let mut sender = SenderSession::new(
        Arc::new(GatewayLink::new(gateway.clone(), alice)),
        helpers::profile("alice", "Alice"),
        Arc::new(NoopTransferLog),
        transfer_config(4),
    );
    let report = sender
        .send_batch(
            &UserId::new("bob"),
            vec![OutgoingFile::new("spam.exe", "application/octet-stream", Bytes::from_static(b"MZ....."))],
        )
        .await
        .expect("sender does not learn about rejection");

    gateway.unregister(&bob).await;
    let session = receiver.await.expect("receiver task");

    assert_eq!(report.sent.len(), 1);
    assert!(sink.artifacts().is_empty());
    assert_eq!(session.buffered_bytes(), 0);
}

#[tokio::test]
async fn test_offline_recipient_with_verification_fails_fast() {
    let gateway = helpers::gateway(RealtimeConfig::default());
    let (alice, _alice_rx) = helpers::join(&gateway, "alice").await;

    let mut sender = SenderSession::new(
        Arc::new(GatewayLink::new(gateway.clone(), alice)),
        helpers::profile("alice", "Alice"),
        Arc::new(NoopTransferLog),
        TransferConfig {
            verify_recipient: true,
            ..transfer_config(4)
        },
    );
    let err = sender
        .send_batch(
            &UserId::new("ghost"),
            vec![OutgoingFile::new("a.txt", "text/plain", Bytes::from_static(b"a"))],
        )
        .await
        .expect_err("recipient is offline");

    assert_eq!(err.kind, ErrorKind::NotFound);
    assert_eq!(gateway.open_stream_count(), 0);
}

#[tokio::test]
async fn test_offline_recipient_without_verification_is_silent() {
    let gateway = helpers::gateway(RealtimeConfig::default());
    let (alice, mut alice_rx) = helpers::join(&gateway, "alice").await;

    let mut sender = SenderSession::new(
        Arc::new(GatewayLink::new(gateway.clone(), alice)),
        helpers::profile("alice", "Alice"),
        Arc::new(NoopTransferLog),
        transfer_config(4),
    );
    let report = sender
        .send_batch(
            &UserId::new("ghost"),
            vec![OutgoingFile::new("a.txt", "text/plain", Bytes::from_static(b"abcdef"))],
        )
        .await
        .expect("drops are silent");

    assert_eq!(report.percent, 100);
    assert!(helpers::drain_events(&mut alice_rx).is_empty());
}

#[tokio::test]
async fn test_sender_disconnect_aborts_receiver() {
    let gateway = helpers::gateway(RealtimeConfig::default());
    let (alice, _alice_rx) = helpers::join(&gateway, "alice").await;
    let (bob, bob_rx) = helpers::join(&gateway, "bob").await;

    let sink = Arc::new(MemorySink::new());
    let (notice_tx, mut notices) = mpsc::unbounded_channel();
    let driver = ReceiverDriver::new(Arc::new(AutoAccept), sink.clone(), &transfer_config(4))
        .with_notices(notice_tx);
    let receiver = tokio::spawn(driver.run(bob_rx));

    let to = UserId::new("bob");
    gateway
        .handle_message(
            &alice,
            InboundMessage::Offer {
                to: to.clone(),
                meta: helpers::meta("movie.mkv", 100),
            },
        )
        .await;
    gateway
        .handle_message(
            &alice,
            InboundMessage::Chunk {
                to,
                chunk: Bytes::from_static(b"first"),
            },
        )
        .await;
    gateway.unregister(&alice).await;

    gateway.unregister(&bob).await;
    let session = receiver.await.expect("receiver task");

    assert!(session.is_idle());
    assert!(sink.artifacts().is_empty());
    let aborted = collect(&mut notices).into_iter().find_map(|n| match n {
        ReceiverNotice::Aborted { file_name, reason } => Some((file_name, reason)),
        _ => None,
    });
    assert_eq!(
        aborted,
        Some(("movie.mkv".to_string(), SENDER_DISCONNECTED.to_string()))
    );
}

//! Relaying between users over a live server.

use std::time::Duration;

use bytes::Bytes;

use filerelay_core::types::UserId;
use filerelay_realtime::{InboundMessage, OutboundMessage, SENDER_DISCONNECTED};

use crate::helpers::{self, TestServer};

#[tokio::test]
async fn test_roster_is_in_join_order_for_everyone() {
    let server = TestServer::start(helpers::trust_config()).await;
    let mut alice = server.connect(None).await;
    let mut bob = server.connect(None).await;
    let mut carol = server.connect(None).await;

    alice.join("alice").await;
    bob.join("bob").await;
    carol.join("carol").await;

    for client in [&mut alice, &mut bob, &mut carol] {
        client.await_roster(&["alice", "bob", "carol"]).await;
    }
}

#[tokio::test]
async fn test_stream_arrives_in_order_with_sender_id() {
    let server = TestServer::start(helpers::trust_config()).await;
    let mut alice = server.connect(None).await;
    let mut bob = server.connect(None).await;
    alice.join("alice").await;
    bob.join("bob").await;

    let to = UserId::new("bob");
    alice
        .send(&InboundMessage::Offer {
            to: to.clone(),
            meta: helpers::meta("photo.png", 9),
        })
        .await;
    for part in [&b"abc"[..], b"def", b"ghi"] {
        alice
            .send(&InboundMessage::Chunk {
                to: to.clone(),
                chunk: Bytes::copy_from_slice(part),
            })
            .await;
    }
    alice.send(&InboundMessage::Complete { to }).await;

    let alice_id = UserId::new("alice");
    match bob.recv_event().await {
        OutboundMessage::Offer { from, meta } => {
            assert_eq!(from, alice_id);
            assert_eq!(meta.name, "photo.png");
            assert_eq!(meta.size, 9);
        }
        other => panic!("expected offer, got {other:?}"),
    }
    let mut payload = Vec::new();
    for _ in 0..3 {
        match bob.recv_event().await {
            OutboundMessage::Chunk { from, chunk } => {
                assert_eq!(from, alice_id);
                payload.extend_from_slice(&chunk);
            }
            other => panic!("expected chunk, got {other:?}"),
        }
    }
    assert_eq!(payload, b"abcdefghi");
    assert_eq!(
        bob.recv_event().await,
        OutboundMessage::Complete { from: alice_id }
    );
}

#[tokio::test]
async fn test_event_for_absent_user_is_dropped_silently() {
    let server = TestServer::start(helpers::trust_config()).await;
    let mut alice = server.connect(None).await;
    let mut bob = server.connect(None).await;
    alice.join("alice").await;
    bob.join("bob").await;
    alice.await_roster(&["alice", "bob"]).await;

    alice
        .send(&InboundMessage::Offer {
            to: UserId::new("ghost"),
            meta: helpers::meta("lost.txt", 1),
        })
        .await;

    assert!(alice.try_recv(Duration::from_millis(200)).await.is_none());
    assert!(bob.try_recv(Duration::from_millis(50)).await.is_none());
    assert_eq!(server.engine.metrics.snapshot().events_dropped, 1);
}

#[tokio::test]
async fn test_undeliverable_nack_when_enabled() {
    let mut config = helpers::trust_config();
    config.realtime.nack_undeliverable = true;
    let server = TestServer::start(config).await;
    let mut alice = server.connect(None).await;
    alice.join("alice").await;

    alice
        .send(&InboundMessage::Chunk {
            to: UserId::new("ghost"),
            chunk: Bytes::from_static(b"x"),
        })
        .await;

    assert_eq!(
        alice.recv_event().await,
        OutboundMessage::Undeliverable {
            to: UserId::new("ghost"),
            event: "chunk".to_string(),
        }
    );
}

#[tokio::test]
async fn test_sender_disconnect_mid_stream_aborts_receiver() {
    let server = TestServer::start(helpers::trust_config()).await;
    let mut alice = server.connect(None).await;
    let mut bob = server.connect(None).await;
    alice.join("alice").await;
    bob.join("bob").await;

    let to = UserId::new("bob");
    alice
        .send(&InboundMessage::Offer {
            to: to.clone(),
            meta: helpers::meta("big.iso", 1_000),
        })
        .await;
    alice
        .send(&InboundMessage::Chunk {
            to,
            chunk: Bytes::from_static(b"partial"),
        })
        .await;

    assert!(matches!(bob.recv_event().await, OutboundMessage::Offer { .. }));
    assert!(matches!(bob.recv_event().await, OutboundMessage::Chunk { .. }));

    alice.close().await;

    assert_eq!(
        bob.recv_event().await,
        OutboundMessage::Abort {
            from: UserId::new("alice"),
            reason: SENDER_DISCONNECTED.to_string(),
        }
    );
    assert_eq!(server.engine.gateway.open_stream_count(), 0);
}

#[tokio::test]
async fn test_completed_stream_is_not_aborted_on_disconnect() {
    let server = TestServer::start(helpers::trust_config()).await;
    let mut alice = server.connect(None).await;
    let mut bob = server.connect(None).await;
    alice.join("alice").await;
    bob.join("bob").await;

    let to = UserId::new("bob");
    alice
        .send(&InboundMessage::Offer {
            to: to.clone(),
            meta: helpers::meta("a.txt", 1),
        })
        .await;
    alice
        .send(&InboundMessage::Chunk {
            to: to.clone(),
            chunk: Bytes::from_static(b"a"),
        })
        .await;
    alice.send(&InboundMessage::Complete { to }).await;

    assert!(matches!(bob.recv_event().await, OutboundMessage::Offer { .. }));
    assert!(matches!(bob.recv_event().await, OutboundMessage::Chunk { .. }));
    assert!(matches!(bob.recv_event().await, OutboundMessage::Complete { .. }));

    alice.close().await;
    bob.await_roster(&["bob"]).await;
    assert!(bob.try_recv(Duration::from_millis(200)).await.is_none());
}

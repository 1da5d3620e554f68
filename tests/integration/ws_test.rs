//! WebSocket upgrade, authentication and protocol error handling.

use std::time::Duration;

use filerelay_auth::JwtEncoder;
use filerelay_core::types::UserId;
use filerelay_realtime::{InboundMessage, OutboundMessage};

use crate::helpers::{self, TestServer};

#[tokio::test]
async fn test_ws_upgrade_without_token_is_rejected_in_jwt_mode() {
    let server = TestServer::start(helpers::jwt_config()).await;

    let result = tokio_tungstenite::connect_async(server.ws_url(None)).await;

    match result {
        Err(tokio_tungstenite::tungstenite::Error::Http(response)) => {
            assert_eq!(response.status().as_u16(), 401);
        }
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("upgrade should be refused"),
    }
}

#[tokio::test]
async fn test_ws_upgrade_with_bad_token_is_rejected() {
    let server = TestServer::start(helpers::jwt_config()).await;

    let result = tokio_tungstenite::connect_async(server.ws_url(Some("not.a.token"))).await;

    assert!(result.is_err());
    assert_eq!(server.engine.gateway.connection_count(), 0);
}

#[tokio::test]
async fn test_verified_identity_supplies_roster_profile() {
    let config = helpers::jwt_config();
    let token = JwtEncoder::new(&config.auth)
        .issue(&helpers::profile("alice", "Alice Liddell"))
        .expect("issue token");
    let server = TestServer::start(config).await;

    let mut alice = server.connect(Some(&token)).await;
    let roster = alice.join("alice").await;

    assert_eq!(roster.len(), 1);
    assert_eq!(roster[0].name, "Alice Liddell");
    assert_eq!(roster[0].user_id, "USR-ALICE");
}

#[tokio::test]
async fn test_join_under_another_identity_is_refused() {
    let config = helpers::jwt_config();
    let token = JwtEncoder::new(&config.auth)
        .issue(&helpers::profile("alice", "Alice"))
        .expect("issue token");
    let server = TestServer::start(config).await;

    let mut client = server.connect(Some(&token)).await;
    client
        .send(&InboundMessage::Join {
            user_id: UserId::new("mallory"),
        })
        .await;

    match client.recv_event().await {
        OutboundMessage::Error { code, .. } => assert_eq!(code, "IDENTITY_MISMATCH"),
        other => panic!("expected error, got {other:?}"),
    }
    assert!(server.engine.gateway.roster().is_empty());
}

#[tokio::test]
async fn test_malformed_frame_keeps_connection_open() {
    let server = TestServer::start(helpers::trust_config()).await;
    let mut client = server.connect(None).await;

    client.send_raw("{not json").await;
    match client.recv_event().await {
        OutboundMessage::Error { code, .. } => assert_eq!(code, "INVALID_MESSAGE"),
        other => panic!("expected error, got {other:?}"),
    }

    let roster = client.join("alice").await;
    assert_eq!(roster.len(), 1);
}

#[tokio::test]
async fn test_events_before_join_are_refused() {
    let server = TestServer::start(helpers::trust_config()).await;
    let mut client = server.connect(None).await;

    client
        .send(&InboundMessage::Complete {
            to: UserId::new("bob"),
        })
        .await;

    match client.recv_event().await {
        OutboundMessage::Error { code, .. } => assert_eq!(code, "NOT_JOINED"),
        other => panic!("expected error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_disconnect_removes_user_from_roster() {
    let server = TestServer::start(helpers::trust_config()).await;
    let mut alice = server.connect(None).await;
    let mut bob = server.connect(None).await;
    alice.join("alice").await;
    bob.join("bob").await;
    alice.await_roster(&["alice", "bob"]).await;

    bob.close().await;

    alice.await_roster(&["alice"]).await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(server.engine.gateway.online_count(), 1);
}

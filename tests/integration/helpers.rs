//! Shared test helpers for integration tests.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use filerelay_api::{AppState, build_app};
use filerelay_core::config::{AppConfig, AuthMode, RealtimeConfig};
use filerelay_core::types::{ConnectionId, OfferMeta, PublicProfile, UserId};
use filerelay_realtime::message::serializer::{deserialize_outbound, serialize_inbound};
use filerelay_realtime::{
    InboundMessage, MemoryPresenceRegistry, OutboundMessage, RelayEngine, RelayGateway,
    RelayMetrics,
};

const RECV_TIMEOUT: Duration = Duration::from_secs(5);

/// Configuration for a trust-mode test server.
pub fn trust_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.auth.mode = AuthMode::Trust;
    config
}

/// Configuration for a jwt-mode test server.
pub fn jwt_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.auth.mode = AuthMode::Jwt;
    config.auth.jwt_secret = "integration-test-secret".to_string();
    config
}

/// Offer metadata for tests.
pub fn meta(name: &str, size: u64) -> OfferMeta {
    OfferMeta {
        name: name.to_string(),
        size,
        mime_type: "application/octet-stream".to_string(),
        sender: None,
    }
}

/// Profile for tests.
pub fn profile(id: &str, name: &str) -> PublicProfile {
    PublicProfile {
        id: UserId::new(id),
        name: name.to_string(),
        user_id: format!("USR-{}", id.to_uppercase()),
        avatar: String::new(),
    }
}

/// In-process gateway with default relay settings.
pub fn gateway(config: RealtimeConfig) -> Arc<RelayGateway> {
    Arc::new(RelayGateway::new(
        config,
        Arc::new(MemoryPresenceRegistry::new()),
        Arc::new(RelayMetrics::new()),
    ))
}

/// Register a connection on `gateway` and join it as `id`.
pub async fn join(
    gateway: &RelayGateway,
    id: &str,
) -> (ConnectionId, mpsc::Receiver<OutboundMessage>) {
    let (handle, rx) = gateway.register(None);
    gateway
        .handle_message(
            &handle.id,
            InboundMessage::Join {
                user_id: UserId::new(id),
            },
        )
        .await;
    (handle.id, rx)
}

/// Relay events other than rosters and pings, drained without waiting.
pub fn drain_events(rx: &mut mpsc::Receiver<OutboundMessage>) -> Vec<OutboundMessage> {
    let mut out = Vec::new();
    while let Ok(msg) = rx.try_recv() {
        if !matches!(msg, OutboundMessage::Roster { .. } | OutboundMessage::Ping { .. }) {
            out.push(msg);
        }
    }
    out
}

/// A relay server bound to an ephemeral local port.
pub struct TestServer {
    /// Bound address.
    pub addr: SocketAddr,
    /// Engine shared with the server.
    pub engine: RelayEngine,
    handle: JoinHandle<()>,
}

impl TestServer {
    /// Start serving `config` on 127.0.0.1:0.
    pub async fn start(config: AppConfig) -> Self {
        let engine = RelayEngine::new(config.realtime.clone());
        let authenticator = filerelay_auth::build_authenticator(&config.auth);
        let app = build_app(AppState::new(config, engine.clone(), authenticator));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind test listener");
        let addr = listener.local_addr().expect("local addr");
        let handle = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self {
            addr,
            engine,
            handle,
        }
    }

    /// WebSocket URL, optionally carrying a token.
    pub fn ws_url(&self, token: Option<&str>) -> String {
        match token {
            Some(token) => format!("ws://{}/ws?token={}", self.addr, token),
            None => format!("ws://{}/ws", self.addr),
        }
    }

    /// Open a client connection.
    pub async fn connect(&self, token: Option<&str>) -> WsClient {
        let (stream, _) = tokio_tungstenite::connect_async(self.ws_url(token))
            .await
            .expect("websocket connect");
        WsClient { stream }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Raw WebSocket client speaking the relay protocol.
pub struct WsClient {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl WsClient {
    /// Send one client event.
    pub async fn send(&mut self, msg: &InboundMessage) {
        let text = serialize_inbound(msg).expect("serialize");
        self.send_raw(&text).await;
    }

    /// Send a raw text frame.
    pub async fn send_raw(&mut self, text: &str) {
        self.stream
            .send(Message::Text(text.to_string().into()))
            .await
            .expect("send frame");
    }

    /// Next server event, skipping pings. `None` when nothing arrives in time
    /// or the connection closed.
    pub async fn try_recv(&mut self, wait: Duration) -> Option<OutboundMessage> {
        let deadline = tokio::time::Instant::now() + wait;
        loop {
            let frame = tokio::time::timeout_at(deadline, self.stream.next())
                .await
                .ok()??;
            match frame {
                Ok(Message::Text(text)) => {
                    let msg = deserialize_outbound(text.as_str()).expect("valid server event");
                    if !matches!(msg, OutboundMessage::Ping { .. }) {
                        return Some(msg);
                    }
                }
                Ok(Message::Close(_)) | Err(_) => return None,
                Ok(_) => {}
            }
        }
    }

    /// Skip events until one matches `pred`.
    pub async fn recv_until<F>(&mut self, mut pred: F) -> OutboundMessage
    where
        F: FnMut(&OutboundMessage) -> bool,
    {
        loop {
            let msg = self
                .try_recv(RECV_TIMEOUT)
                .await
                .expect("expected event before timeout");
            if pred(&msg) {
                return msg;
            }
        }
    }

    /// Next event that is not a roster broadcast.
    pub async fn recv_event(&mut self) -> OutboundMessage {
        self.recv_until(|m| !matches!(m, OutboundMessage::Roster { .. }))
            .await
    }

    /// Join as `id` and return the first roster that lists it.
    pub async fn join(&mut self, id: &str) -> Vec<PublicProfile> {
        self.send(&InboundMessage::Join {
            user_id: UserId::new(id),
        })
        .await;
        let me = UserId::new(id);
        match self
            .recv_until(|m| match m {
                OutboundMessage::Roster { users } => users.iter().any(|p| p.id == me),
                OutboundMessage::Error { .. } => true,
                _ => false,
            })
            .await
        {
            OutboundMessage::Roster { users } => users,
            other => panic!("join failed: {other:?}"),
        }
    }

    /// Wait until a roster lists exactly `ids`, in order.
    pub async fn await_roster(&mut self, ids: &[&str]) -> Vec<PublicProfile> {
        match self
            .recv_until(|m| match m {
                OutboundMessage::Roster { users } => {
                    users.iter().map(|p| p.id.as_str()).eq(ids.iter().copied())
                }
                _ => false,
            })
            .await
        {
            OutboundMessage::Roster { users } => users,
            _ => unreachable!(),
        }
    }

    /// Close the connection.
    pub async fn close(mut self) {
        let _ = self.stream.close(None).await;
    }
}

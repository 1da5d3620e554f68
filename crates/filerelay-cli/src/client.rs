//! WebSocket connection to a relay server.

use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, warn};

use filerelay_core::error::{AppError, ErrorKind};
use filerelay_core::result::AppResult;
use filerelay_core::types::UserId;
use filerelay_realtime::message::serializer::{deserialize_outbound, serialize_inbound};
use filerelay_realtime::{InboundMessage, OutboundMessage, Roster};
use filerelay_transfer::RelayLink;

const JOIN_TIMEOUT: Duration = Duration::from_secs(10);
const CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

/// Frames queued for the writer task, in send order.
#[derive(Debug)]
enum Outgoing {
    Event(InboundMessage),
    Close,
}

/// [`RelayLink`] over a WebSocket connection.
///
/// Events go through a single writer task, so they reach the server in
/// the order they were emitted.
#[derive(Debug, Clone)]
pub struct WsLink {
    tx: mpsc::Sender<Outgoing>,
    roster: Arc<RwLock<Roster>>,
}

impl WsLink {
    /// Last roster received from the server.
    pub fn roster(&self) -> Roster {
        match self.roster.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

#[async_trait]
impl RelayLink for WsLink {
    async fn emit(&self, msg: InboundMessage) -> AppResult<()> {
        self.tx
            .send(Outgoing::Event(msg))
            .await
            .map_err(|_| AppError::transport("Relay connection closed"))
    }

    async fn recipient_online(&self, user_id: &UserId) -> AppResult<bool> {
        Ok(self.roster().iter().any(|p| &p.id == user_id))
    }
}

/// An open relay connection.
#[derive(Debug)]
pub struct Connection {
    link: Arc<WsLink>,
    events: Option<mpsc::Receiver<OutboundMessage>>,
    writer: JoinHandle<()>,
    reader: JoinHandle<()>,
}

/// Build the WebSocket URL for a relay base URL.
pub fn ws_url(server: &str, token: Option<&str>) -> String {
    let base = server.trim_end_matches('/');
    let base = if let Some(rest) = base.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = base.strip_prefix("http://") {
        format!("ws://{rest}")
    } else {
        base.to_string()
    };
    match token {
        Some(token) => format!("{base}/ws?token={token}"),
        None => format!("{base}/ws"),
    }
}

/// Open a connection. Server pings are answered automatically.
pub async fn connect(server: &str, token: Option<&str>, buffer: usize) -> AppResult<Connection> {
    let url = ws_url(server, token);
    let (stream, _) = tokio_tungstenite::connect_async(url.as_str())
        .await
        .map_err(|e| {
            AppError::with_source(
                ErrorKind::Transport,
                format!("Failed to connect to {server}"),
                e,
            )
        })?;
    debug!(server = %server, "Connected to relay");

    let (mut ws_sink, mut ws_stream) = stream.split();
    let buffer = buffer.max(1);
    let (out_tx, mut out_rx) = mpsc::channel::<Outgoing>(buffer);
    let (event_tx, event_rx) = mpsc::channel::<OutboundMessage>(buffer);
    let roster: Arc<RwLock<Roster>> = Arc::new(RwLock::new(Vec::new()));

    let writer = tokio::spawn(async move {
        while let Some(item) = out_rx.recv().await {
            match item {
                Outgoing::Event(msg) => {
                    let text = match serialize_inbound(&msg) {
                        Ok(text) => text,
                        Err(e) => {
                            warn!(error = %e, "Failed to serialize event");
                            continue;
                        }
                    };
                    if let Err(e) = ws_sink.send(Message::Text(text.into())).await {
                        warn!(error = %e, "Relay write failed");
                        break;
                    }
                }
                Outgoing::Close => {
                    let _ = ws_sink.send(Message::Close(None)).await;
                    break;
                }
            }
        }
        let _ = ws_sink.close().await;
    });

    let pong_tx = out_tx.clone();
    let reader_roster = roster.clone();
    let reader = tokio::spawn(async move {
        while let Some(frame) = ws_stream.next().await {
            let text = match frame {
                Ok(Message::Text(text)) => text,
                Ok(Message::Close(_)) => break,
                Ok(_) => continue,
                Err(e) => {
                    debug!(error = %e, "Relay read failed");
                    break;
                }
            };

            let msg = match deserialize_outbound(text.as_str()) {
                Ok(msg) => msg,
                Err(e) => {
                    warn!(error = %e, "Ignoring malformed relay message");
                    continue;
                }
            };

            match msg {
                OutboundMessage::Ping { timestamp } => {
                    let _ = pong_tx
                        .send(Outgoing::Event(InboundMessage::Pong { timestamp }))
                        .await;
                }
                OutboundMessage::Roster { users } => {
                    match reader_roster.write() {
                        Ok(mut guard) => *guard = users.clone(),
                        Err(poisoned) => *poisoned.into_inner() = users.clone(),
                    }
                    if event_tx.send(OutboundMessage::Roster { users }).await.is_err() {
                        break;
                    }
                }
                other => {
                    if event_tx.send(other).await.is_err() {
                        break;
                    }
                }
            }
        }
        debug!("Relay reader stopped");
    });

    Ok(Connection {
        link: Arc::new(WsLink { tx: out_tx, roster }),
        events: Some(event_rx),
        writer,
        reader,
    })
}

impl Connection {
    /// The link used to emit events on this connection.
    pub fn link(&self) -> Arc<WsLink> {
        self.link.clone()
    }

    /// Take the stream of relayed events. Only available once.
    pub fn take_events(&mut self) -> Option<mpsc::Receiver<OutboundMessage>> {
        self.events.take()
    }

    /// Join as `user_id` and wait for the roster that lists us.
    pub async fn join(&mut self, user_id: &UserId) -> AppResult<Roster> {
        let events = self
            .events
            .as_mut()
            .ok_or_else(|| AppError::internal("Event stream already taken"))?;

        self.link
            .emit(InboundMessage::Join {
                user_id: user_id.clone(),
            })
            .await?;

        let wait = async {
            while let Some(msg) = events.recv().await {
                match msg {
                    OutboundMessage::Roster { users } if users.iter().any(|p| &p.id == user_id) => {
                        return Ok(users);
                    }
                    OutboundMessage::Error { code, message } => {
                        return Err(AppError::protocol(format!("{code}: {message}")));
                    }
                    _ => {}
                }
            }
            Err(AppError::transport("Connection closed before join completed"))
        };

        tokio::time::timeout(JOIN_TIMEOUT, wait)
            .await
            .map_err(|_| AppError::transport("Timed out waiting to join"))?
    }

    /// Flush queued events, send a close frame and stop the tasks.
    pub async fn close(self) {
        let _ = self.link.tx.send(Outgoing::Close).await;
        let mut writer = self.writer;
        if tokio::time::timeout(CLOSE_TIMEOUT, &mut writer).await.is_err() {
            writer.abort();
        }
        self.reader.abort();
    }
}

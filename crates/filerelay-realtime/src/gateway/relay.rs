//! Relay gateway: connection lifecycle, inbound dispatch and delivery to
//! logical users.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::{Mutex, mpsc};
use tracing::{debug, info, warn};

use filerelay_core::config::RealtimeConfig;
use filerelay_core::types::{ConnectionId, PublicProfile, UserId, VerifiedIdentity};

use crate::connection::handle::ConnectionHandle;
use crate::connection::heartbeat::HeartbeatConfig;
use crate::connection::pool::ConnectionPool;
use crate::message::serializer::deserialize_inbound;
use crate::message::types::{InboundMessage, OutboundMessage};
use crate::message::validator::validate_inbound;
use crate::metrics::RelayMetrics;
use crate::presence::registry::{PresenceRegistry, Roster};

use super::streams::ActiveStreams;

/// Reason sent to receivers whose sender went away mid-stream.
pub const SENDER_DISCONNECTED: &str = "sender disconnected";

/// Result of delivering an event to a logical user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// The event was queued on the recipient's connection.
    Delivered,
    /// The recipient was not online; the event was dropped.
    NoRecipient,
}

/// Accepts connections, dispatches their events and relays transfer events
/// to the connection currently bound to the addressed user.
#[derive(Debug)]
pub struct RelayGateway {
    /// Every live connection, joined or not.
    pool: ConnectionPool,
    /// Logical user → connection.
    registry: Arc<dyn PresenceRegistry>,
    /// Offered-but-unfinished streams.
    streams: ActiveStreams,
    /// Metrics.
    metrics: Arc<RelayMetrics>,
    /// Serializes each registry mutation with its roster broadcast so every
    /// connection observes rosters in mutation order. Never held across a
    /// wait on a connection queue.
    roster_lock: Mutex<()>,
    /// Version of the last roster snapshot taken.
    roster_version: AtomicU64,
    /// Configuration.
    config: RealtimeConfig,
}

impl RelayGateway {
    /// Creates a gateway over an injected registry.
    pub fn new(
        config: RealtimeConfig,
        registry: Arc<dyn PresenceRegistry>,
        metrics: Arc<RelayMetrics>,
    ) -> Self {
        Self {
            pool: ConnectionPool::new(),
            registry,
            streams: ActiveStreams::new(),
            metrics,
            roster_lock: Mutex::new(()),
            roster_version: AtomicU64::new(0),
            config,
        }
    }

    /// Registers a new connection.
    ///
    /// Returns the connection handle and a receiver for its outbound queue.
    pub fn register(
        &self,
        identity: Option<VerifiedIdentity>,
    ) -> (Arc<ConnectionHandle>, mpsc::Receiver<OutboundMessage>) {
        let (tx, rx) = mpsc::channel(self.config.channel_buffer_size.max(1));
        let handle = Arc::new(ConnectionHandle::new(identity, tx));

        self.pool.add(handle.clone());
        self.metrics.record_connect();

        info!(
            conn_id = %handle.id,
            user_id = handle.identity.as_ref().map(|i| i.user_id.as_str()).unwrap_or("-"),
            "Connection registered"
        );

        (handle, rx)
    }

    /// Unregisters a connection: leaves the registry, broadcasts the roster
    /// and aborts any stream the departing user had open.
    pub async fn unregister(&self, conn_id: &ConnectionId) {
        let Some(handle) = self.pool.remove(conn_id) else {
            return;
        };
        handle.mark_dead();
        self.metrics.record_disconnect();

        let departed = {
            let _guard = self.roster_lock.lock().await;
            let departed = self.registry.user_for(conn_id);
            let roster = self.registry.leave(conn_id);
            self.broadcast_roster_locked(roster);
            departed
        };

        if let Some(user_id) = departed {
            self.abort_streams_from(&user_id).await;
            self.streams.forget_receiver(&user_id);
            info!(conn_id = %conn_id, user_id = %user_id, "User left");
        }

        info!(conn_id = %conn_id, "Connection unregistered");
    }

    /// Processes a raw inbound frame from a client.
    pub async fn handle_inbound(&self, conn_id: &ConnectionId, raw: &str) {
        let Some(handle) = self.pool.get(conn_id) else {
            warn!(conn_id = %conn_id, "Message from unknown connection");
            return;
        };

        if let Err(e) = validate_inbound(raw, self.config.max_message_bytes) {
            handle
                .send(OutboundMessage::error("INVALID_MESSAGE", e.message))
                .await;
            return;
        }

        match deserialize_inbound(raw) {
            Ok(msg) => self.dispatch(&handle, msg).await,
            Err(e) => {
                debug!(conn_id = %conn_id, error = %e, "Unparseable message");
                handle
                    .send(OutboundMessage::error(
                        "INVALID_MESSAGE",
                        format!("Failed to parse message: {e}"),
                    ))
                    .await;
            }
        }
    }

    /// Processes an already-parsed inbound message.
    pub async fn handle_message(&self, conn_id: &ConnectionId, msg: InboundMessage) {
        match self.pool.get(conn_id) {
            Some(handle) => self.dispatch(&handle, msg).await,
            None => warn!(conn_id = %conn_id, "Message from unknown connection"),
        }
    }

    async fn dispatch(&self, handle: &Arc<ConnectionHandle>, msg: InboundMessage) {
        if let InboundMessage::Pong { .. } = msg {
            handle.record_pong();
            return;
        }

        self.metrics.inc_received();

        if let InboundMessage::Join { user_id } = msg {
            self.join(handle, user_id).await;
            return;
        }

        let Some(from) = self.registry.user_for(&handle.id) else {
            handle
                .send(OutboundMessage::error(
                    "NOT_JOINED",
                    format!("Join before sending '{}' events", msg.kind()),
                ))
                .await;
            return;
        };

        let kind = msg.kind();
        match msg {
            InboundMessage::Offer { to, meta } => {
                debug!(from = %from, to = %to, file = %meta.name, size = meta.size, "Offer");
                let outcome = self
                    .deliver_from(handle, &to, kind, OutboundMessage::Offer {
                        from: from.clone(),
                        meta,
                    })
                    .await;
                if outcome == DeliveryOutcome::Delivered {
                    self.streams.open(&from, &to);
                }
            }
            InboundMessage::Chunk { to, chunk } => {
                self.deliver_from(handle, &to, kind, OutboundMessage::Chunk { from, chunk })
                    .await;
            }
            InboundMessage::Complete { to } => {
                self.streams.close(&from, &to);
                self.deliver_from(handle, &to, kind, OutboundMessage::Complete {
                    from: from.clone(),
                })
                .await;
            }
            InboundMessage::Abort { to, reason } => {
                self.streams.close(&from, &to);
                let reason = reason.unwrap_or_else(|| "aborted by sender".to_string());
                self.deliver_from(handle, &to, kind, OutboundMessage::Abort {
                    from: from.clone(),
                    reason,
                })
                .await;
            }
            InboundMessage::Join { .. } | InboundMessage::Pong { .. } => {}
        }
    }

    async fn join(&self, handle: &Arc<ConnectionHandle>, user_id: UserId) {
        if user_id.is_empty() {
            handle
                .send(OutboundMessage::error("INVALID_USER_ID", "User id must not be empty"))
                .await;
            return;
        }

        let profile = match &handle.identity {
            Some(identity) if identity.user_id != user_id => {
                warn!(
                    conn_id = %handle.id,
                    authenticated = %identity.user_id,
                    requested = %user_id,
                    "Join refused: identity mismatch"
                );
                handle
                    .send(OutboundMessage::error(
                        "IDENTITY_MISMATCH",
                        format!("Connection is authenticated as '{}'", identity.user_id),
                    ))
                    .await;
                return;
            }
            Some(identity) => identity.profile.clone(),
            None => PublicProfile::anonymous(&user_id),
        };

        let _guard = self.roster_lock.lock().await;
        let roster = self.registry.join(user_id.clone(), handle.clone(), profile);
        info!(conn_id = %handle.id, user_id = %user_id, online = roster.len(), "User joined");
        self.broadcast_roster_locked(roster);
    }

    async fn deliver_from(
        &self,
        origin: &ConnectionHandle,
        to: &UserId,
        kind: &str,
        msg: OutboundMessage,
    ) -> DeliveryOutcome {
        let outcome = self.deliver(to, msg).await;
        if outcome == DeliveryOutcome::NoRecipient && self.config.nack_undeliverable {
            origin
                .send(OutboundMessage::Undeliverable {
                    to: to.clone(),
                    event: kind.to_string(),
                })
                .await;
        }
        outcome
    }

    /// Forwards `msg` to the connection currently bound to `to`, or drops it
    /// if `to` is not online.
    pub async fn deliver(&self, to: &UserId, msg: OutboundMessage) -> DeliveryOutcome {
        let delivered = match self.registry.lookup(to) {
            Ok(conn) => conn.send(msg).await,
            Err(_) => false,
        };

        if delivered {
            self.metrics.inc_relayed();
            DeliveryOutcome::Delivered
        } else {
            debug!(to = %to, "Recipient not online, event dropped");
            self.metrics.inc_dropped();
            DeliveryOutcome::NoRecipient
        }
    }

    async fn abort_streams_from(&self, from: &UserId) {
        for to in self.streams.take_sender(from) {
            info!(from = %from, to = %to, "Aborting stream of departed sender");
            self.deliver(&to, OutboundMessage::Abort {
                from: from.clone(),
                reason: SENDER_DISCONNECTED.to_string(),
            })
            .await;
        }
    }

    /// Sends the current roster to every connection.
    pub async fn broadcast_roster(&self) {
        let _guard = self.roster_lock.lock().await;
        let roster = self.registry.roster();
        self.broadcast_roster_locked(roster);
    }

    /// Caller holds `roster_lock`. Does not wait on any connection: a full
    /// queue gets the snapshot from a background task.
    fn broadcast_roster_locked(&self, roster: Roster) {
        let version = self.roster_version.fetch_add(1, Ordering::SeqCst) + 1;
        let msg = OutboundMessage::Roster { users: roster };
        for conn in self.pool.all_connections() {
            conn.push_roster(version, msg.clone());
        }
        self.metrics.inc_roster_broadcasts();
    }

    /// Closes every connection and clears the registry.
    pub async fn close_all(&self) {
        let _guard = self.roster_lock.lock().await;
        let all = self.pool.drain();
        for conn in &all {
            conn.mark_dead();
            self.metrics.record_disconnect();
        }
        self.registry.clear();
        self.streams.clear();
        info!(count = all.len(), "All connections closed");
    }

    /// Current roster.
    pub fn roster(&self) -> Roster {
        self.registry.roster()
    }

    /// Whether `user_id` is currently joined.
    pub fn is_online(&self, user_id: &UserId) -> bool {
        self.registry.lookup(user_id).is_ok()
    }

    /// Total connection count, joined or not.
    pub fn connection_count(&self) -> usize {
        self.pool.connection_count()
    }

    /// Number of joined users.
    pub fn online_count(&self) -> usize {
        self.registry.len()
    }

    /// Number of streams between offer and complete/abort.
    pub fn open_stream_count(&self) -> usize {
        self.streams.len()
    }

    /// Heartbeat settings for connection tasks.
    pub fn heartbeat_config(&self) -> HeartbeatConfig {
        HeartbeatConfig::from(&self.config)
    }
}

//! The sending half of a relay connection, as seen by a transfer session.

use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;

use filerelay_core::result::AppResult;
use filerelay_core::types::{ConnectionId, UserId};
use filerelay_realtime::{InboundMessage, RelayGateway};

/// Emits client events on a joined relay connection.
#[async_trait]
pub trait RelayLink: Send + Sync + Debug + 'static {
    /// Send one event to the relay. Events are delivered in call order.
    async fn emit(&self, msg: InboundMessage) -> AppResult<()>;

    /// Whether `user_id` is currently on the roster.
    async fn recipient_online(&self, user_id: &UserId) -> AppResult<bool>;
}

/// Link bound to a connection registered on an in-process gateway.
#[derive(Debug, Clone)]
pub struct GatewayLink {
    gateway: Arc<RelayGateway>,
    conn_id: ConnectionId,
}

impl GatewayLink {
    /// Wrap a connection already registered on `gateway`.
    pub fn new(gateway: Arc<RelayGateway>, conn_id: ConnectionId) -> Self {
        Self { gateway, conn_id }
    }
}

#[async_trait]
impl RelayLink for GatewayLink {
    async fn emit(&self, msg: InboundMessage) -> AppResult<()> {
        self.gateway.handle_message(&self.conn_id, msg).await;
        Ok(())
    }

    async fn recipient_online(&self, user_id: &UserId) -> AppResult<bool> {
        Ok(self.gateway.is_online(user_id))
    }
}

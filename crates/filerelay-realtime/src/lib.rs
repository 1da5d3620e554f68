//! # filerelay-realtime
//!
//! Real-time relay engine for FileRelay. Provides:
//!
//! - WebSocket connection handles with bounded FIFO outbound queues
//! - The presence registry mapping logical users to live connections
//! - The transport gateway that relays offer/chunk/complete/abort events
//!   between logical users and broadcasts the roster
//! - Ping/pong heartbeat and relay metrics

pub mod connection;
pub mod gateway;
pub mod message;
pub mod metrics;
pub mod presence;
pub mod server;

pub use connection::handle::ConnectionHandle;
pub use gateway::relay::{DeliveryOutcome, RelayGateway, SENDER_DISCONNECTED};
pub use metrics::{MetricsSnapshot, RelayMetrics};
pub use message::types::{InboundMessage, OutboundMessage};
pub use presence::registry::{MemoryPresenceRegistry, PresenceEntry, PresenceRegistry, Roster};
pub use server::RelayEngine;

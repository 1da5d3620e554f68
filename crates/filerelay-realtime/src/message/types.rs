//! Inbound and outbound WebSocket message type definitions.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use filerelay_core::types::{OfferMeta, PublicProfile, UserId};

use super::chunk_codec;

/// Messages sent by the client to the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InboundMessage {
    /// Bind this connection to a logical user.
    Join {
        /// Logical user id.
        #[serde(rename = "userId")]
        user_id: UserId,
    },
    /// Announce a file to another user.
    Offer {
        /// Recipient.
        to: UserId,
        /// File metadata.
        meta: OfferMeta,
    },
    /// One fragment of the announced file.
    Chunk {
        /// Recipient.
        to: UserId,
        /// Fragment bytes (base64 on the wire).
        #[serde(with = "chunk_codec")]
        chunk: Bytes,
    },
    /// All fragments were sent.
    Complete {
        /// Recipient.
        to: UserId,
    },
    /// The sender gave up on the current file.
    Abort {
        /// Recipient.
        to: UserId,
        /// Optional reason.
        #[serde(default)]
        reason: Option<String>,
    },
    /// Pong response to server ping.
    Pong {
        /// Echoed timestamp.
        timestamp: i64,
    },
}

impl InboundMessage {
    /// Wire name of the message, used for logging and NACKs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Join { .. } => "join",
            Self::Offer { .. } => "offer",
            Self::Chunk { .. } => "chunk",
            Self::Complete { .. } => "complete",
            Self::Abort { .. } => "abort",
            Self::Pong { .. } => "pong",
        }
    }
}

/// Messages sent by the server to the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundMessage {
    /// Current roster, broadcast on every registry change.
    Roster {
        /// Profiles of all joined users in join order.
        users: Vec<PublicProfile>,
    },
    /// Relayed offer.
    Offer {
        /// Sending user.
        from: UserId,
        /// File metadata as sent.
        meta: OfferMeta,
    },
    /// Relayed fragment.
    Chunk {
        /// Sending user.
        from: UserId,
        /// Fragment bytes (base64 on the wire).
        #[serde(with = "chunk_codec")]
        chunk: Bytes,
    },
    /// Relayed completion marker.
    Complete {
        /// Sending user.
        from: UserId,
    },
    /// The sender aborted the stream or disconnected mid-stream.
    Abort {
        /// Sending user.
        from: UserId,
        /// Reason.
        reason: String,
    },
    /// An event could not be delivered (only sent when NACKs are enabled).
    Undeliverable {
        /// Intended recipient.
        to: UserId,
        /// Wire name of the dropped event.
        event: String,
    },
    /// Ping (server keepalive).
    Ping {
        /// Server timestamp (ms since epoch).
        timestamp: i64,
    },
    /// Error message.
    Error {
        /// Error code.
        code: String,
        /// Error description.
        message: String,
    },
}

impl OutboundMessage {
    /// Shorthand for an error message.
    pub fn error(code: &str, message: impl Into<String>) -> Self {
        Self::Error {
            code: code.to_string(),
            message: message.into(),
        }
    }
}

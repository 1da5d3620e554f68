//! Transfer payload types shared by the relay and the transfer sessions.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::UserId;

/// Sender summary attached to an offer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SenderSummary {
    /// Logical user id of the sender.
    pub id: UserId,
    /// Display name.
    pub name: String,
    /// Human-facing user code.
    pub user_id: String,
}

/// File metadata announced by an offer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OfferMeta {
    /// File name as chosen by the sender.
    pub name: String,
    /// Declared size in bytes.
    pub size: u64,
    /// Declared MIME type; trusted as declared.
    pub mime_type: String,
    /// Optional sender profile summary.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender: Option<SenderSummary>,
}

/// An offer as seen by the receiving side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferOffer {
    /// Logical id of the connection that relayed the offer.
    pub from: UserId,
    /// Announced metadata.
    pub meta: OfferMeta,
}

/// A reassembled file ready for the persistence collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    /// Declared file name.
    pub file_name: String,
    /// Declared MIME type.
    pub mime_type: String,
    /// Sender of the artifact.
    pub from: UserId,
    /// Reassembled payload.
    pub data: Bytes,
}

impl Artifact {
    /// Length of the reassembled payload in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the payload is empty.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Final status of a logged transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferStatus {
    /// All chunks and the completion marker were emitted.
    Completed,
    /// The file could not be sent.
    Failed,
}

/// Record handed to the transfer-log collaborator for each file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferRecord {
    /// Sending user.
    pub sender: UserId,
    /// Receiving user.
    pub receiver: UserId,
    /// File name.
    pub file_name: String,
    /// File size in bytes.
    pub file_size: u64,
    /// MIME type (serialized as `fileType` for the history service).
    #[serde(rename = "fileType")]
    pub mime_type: String,
    /// Outcome.
    pub status: TransferStatus,
    /// When the outcome was reached.
    pub completed_at: DateTime<Utc>,
}

impl TransferRecord {
    /// Record for a file whose outcome was reached now.
    pub fn now(
        sender: UserId,
        receiver: UserId,
        file_name: impl Into<String>,
        file_size: u64,
        mime_type: impl Into<String>,
        status: TransferStatus,
    ) -> Self {
        Self {
            sender,
            receiver,
            file_name: file_name.into(),
            file_size,
            mime_type: mime_type.into(),
            status,
            completed_at: Utc::now(),
        }
    }
}

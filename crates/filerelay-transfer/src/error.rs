//! Transfer session errors.

use filerelay_core::error::{AppError, ErrorKind};
use filerelay_core::types::UserId;
use thiserror::Error;

/// Errors local to one transfer session. None of them is fatal to the
/// process; the session returns to idle.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransferError {
    /// The recipient was not online when the batch started.
    #[error("Recipient '{0}' is not online")]
    NoRecipient(UserId),

    /// An event arrived that the current state does not allow. The event is
    /// ignored and the state is left untouched.
    #[error("Unexpected '{event}' while {state}")]
    ProtocolViolation {
        /// State the session was in.
        state: &'static str,
        /// Event that was ignored.
        event: &'static str,
    },

    /// Completion arrived without any chunk.
    #[error("Transfer of '{file_name}' completed without data")]
    EmptyArtifact {
        /// Declared file name.
        file_name: String,
    },

    /// The sender streamed more bytes than its offer declared. The buffered
    /// data is discarded.
    #[error("Transfer of '{file_name}' exceeded its declared {declared} bytes")]
    Oversized {
        /// Declared file name.
        file_name: String,
        /// Size announced in the offer.
        declared: u64,
    },

    /// The session saw no activity for longer than the idle timeout.
    #[error("Transfer of '{file_name}' went stale after {idle_seconds}s")]
    StaleSession {
        /// Declared file name.
        file_name: String,
        /// Idle timeout that elapsed.
        idle_seconds: u64,
    },

    /// The sender aborted the stream.
    #[error("Transfer aborted: {0}")]
    Aborted(String),
}

impl From<TransferError> for AppError {
    fn from(err: TransferError) -> Self {
        let message = err.to_string();
        let kind = match err {
            TransferError::NoRecipient(_) => ErrorKind::NotFound,
            TransferError::ProtocolViolation { .. } => ErrorKind::Protocol,
            TransferError::EmptyArtifact { .. }
            | TransferError::Oversized { .. }
            | TransferError::StaleSession { .. }
            | TransferError::Aborted(_) => ErrorKind::Transfer,
        };
        AppError::with_source(kind, message, err)
    }
}

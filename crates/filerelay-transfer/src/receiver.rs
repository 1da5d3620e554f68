//! Receiver transfer session: the receiving state machine.
//!
//! ```text
//! Idle ──offer──▶ Offered ──accept──▶ Receiving ──complete──▶ Idle
//!                    │                    │
//!                    └──reject──▶ Idle    └──abort / stale──▶ Idle
//! ```
//!
//! A new offer in any state replaces the pending one and discards whatever
//! was buffered.

use std::time::Duration;

use bytes::{Bytes, BytesMut};
use tokio::time::Instant;
use tracing::{debug, warn};

use filerelay_core::types::{Artifact, TransferOffer, UserId};

use crate::error::TransferError;

/// Receiver state. Chunk data only exists while receiving.
#[derive(Debug, Clone, Default)]
pub enum ReceiverState {
    /// Nothing pending.
    #[default]
    Idle,
    /// An offer is waiting for a decision.
    Offered {
        /// The pending offer.
        offer: TransferOffer,
        /// Last event touching this session.
        last_activity: Instant,
    },
    /// The offer was accepted; chunks are being collected.
    Receiving {
        /// The accepted offer.
        offer: TransferOffer,
        /// Fragments in arrival order.
        buffer: Vec<Bytes>,
        /// Bytes collected so far.
        received: u64,
        /// Last event touching this session.
        last_activity: Instant,
    },
}

impl ReceiverState {
    /// Short state name for logs and errors.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Offered { .. } => "offered",
            Self::Receiving { .. } => "receiving",
        }
    }
}

/// Input to the state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReceiverEvent {
    /// A relayed offer.
    Offer(TransferOffer),
    /// Local decision to accept the pending offer.
    Accept,
    /// Local decision to reject the pending offer.
    Reject,
    /// A relayed fragment.
    Chunk {
        /// Sending user.
        from: UserId,
        /// Fragment bytes.
        data: Bytes,
    },
    /// The relayed completion marker.
    Complete {
        /// Sending user.
        from: UserId,
    },
    /// The sender aborted or disconnected.
    Abort {
        /// Sending user.
        from: UserId,
        /// Reason given by the relay.
        reason: String,
    },
}

impl ReceiverEvent {
    fn name(&self) -> &'static str {
        match self {
            Self::Offer(_) => "offer",
            Self::Accept => "accept",
            Self::Reject => "reject",
            Self::Chunk { .. } => "chunk",
            Self::Complete { .. } => "complete",
            Self::Abort { .. } => "abort",
        }
    }
}

/// Result of a successful transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReceiverOutcome {
    /// A new offer awaits a decision. `replaced` holds the offer it displaced.
    Offered {
        /// The new pending offer.
        offer: TransferOffer,
        /// Offer or transfer that was discarded in its favor.
        replaced: Option<TransferOffer>,
    },
    /// The pending offer was accepted.
    Accepted(TransferOffer),
    /// The pending offer was rejected.
    Rejected(TransferOffer),
    /// A fragment was appended.
    Appended {
        /// Bytes collected so far.
        received: u64,
        /// Declared size of the file.
        size: u64,
    },
    /// All fragments were joined into one artifact.
    Assembled(Artifact),
    /// The session was aborted by the sender.
    Aborted {
        /// Offer that was discarded.
        offer: TransferOffer,
        /// Reason given by the relay.
        reason: String,
    },
}

/// Per-connection receiving state machine.
#[derive(Debug, Default)]
pub struct ReceiverSession {
    state: ReceiverState,
}

impl ReceiverSession {
    /// Create an idle session.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state.
    pub fn state(&self) -> &ReceiverState {
        &self.state
    }

    /// Whether the session is idle.
    pub fn is_idle(&self) -> bool {
        matches!(self.state, ReceiverState::Idle)
    }

    /// Bytes buffered for the current transfer.
    pub fn buffered_bytes(&self) -> u64 {
        match &self.state {
            ReceiverState::Receiving { received, .. } => *received,
            ReceiverState::Idle | ReceiverState::Offered { .. } => 0,
        }
    }

    /// Advance the state machine.
    ///
    /// A [`TransferError::ProtocolViolation`] leaves the state untouched.
    /// [`TransferError::EmptyArtifact`] and [`TransferError::Oversized`]
    /// return the session to idle.
    pub fn apply(&mut self, event: ReceiverEvent, now: Instant) -> Result<ReceiverOutcome, TransferError> {
        let state = std::mem::take(&mut self.state);
        let state_name = state.name();
        let event_name = event.name();
        let violation = TransferError::ProtocolViolation {
            state: state_name,
            event: event_name,
        };

        let (next, result) = match (state, event) {
            (ReceiverState::Idle, ReceiverEvent::Offer(offer)) => (
                ReceiverState::Offered {
                    offer: offer.clone(),
                    last_activity: now,
                },
                Ok(ReceiverOutcome::Offered {
                    offer,
                    replaced: None,
                }),
            ),
            (
                ReceiverState::Offered { offer: previous, .. }
                | ReceiverState::Receiving { offer: previous, .. },
                ReceiverEvent::Offer(offer),
            ) => {
                warn!(
                    previous = %previous.meta.name,
                    file = %offer.meta.name,
                    "New offer replaces pending transfer"
                );
                (
                    ReceiverState::Offered {
                        offer: offer.clone(),
                        last_activity: now,
                    },
                    Ok(ReceiverOutcome::Offered {
                        offer,
                        replaced: Some(previous),
                    }),
                )
            }

            (ReceiverState::Offered { offer, .. }, ReceiverEvent::Accept) => (
                ReceiverState::Receiving {
                    offer: offer.clone(),
                    buffer: Vec::new(),
                    received: 0,
                    last_activity: now,
                },
                Ok(ReceiverOutcome::Accepted(offer)),
            ),
            (ReceiverState::Offered { offer, .. }, ReceiverEvent::Reject) => {
                (ReceiverState::Idle, Ok(ReceiverOutcome::Rejected(offer)))
            }

            (
                ReceiverState::Receiving {
                    offer,
                    mut buffer,
                    received,
                    last_activity,
                },
                ReceiverEvent::Chunk { from, data },
            ) => {
                if from != offer.from {
                    (
                        ReceiverState::Receiving {
                            offer,
                            buffer,
                            received,
                            last_activity,
                        },
                        Err(violation),
                    )
                } else if received + data.len() as u64 > offer.meta.size {
                    warn!(
                        from = %offer.from,
                        file = %offer.meta.name,
                        declared = offer.meta.size,
                        "Chunk overruns declared size, discarding transfer"
                    );
                    (
                        ReceiverState::Idle,
                        Err(TransferError::Oversized {
                            file_name: offer.meta.name,
                            declared: offer.meta.size,
                        }),
                    )
                } else {
                    let received = received + data.len() as u64;
                    buffer.push(data);
                    let size = offer.meta.size;
                    (
                        ReceiverState::Receiving {
                            offer,
                            buffer,
                            received,
                            last_activity: now,
                        },
                        Ok(ReceiverOutcome::Appended { received, size }),
                    )
                }
            }

            (
                ReceiverState::Receiving {
                    offer,
                    buffer,
                    received,
                    last_activity,
                },
                ReceiverEvent::Complete { from },
            ) => {
                if from != offer.from {
                    (
                        ReceiverState::Receiving {
                            offer,
                            buffer,
                            received,
                            last_activity,
                        },
                        Err(violation),
                    )
                } else if buffer.is_empty() {
                    (
                        ReceiverState::Idle,
                        Err(TransferError::EmptyArtifact {
                            file_name: offer.meta.name,
                        }),
                    )
                } else {
                    (ReceiverState::Idle, Ok(ReceiverOutcome::Assembled(assemble(offer, buffer, received))))
                }
            }

            (
                ReceiverState::Offered { offer, last_activity },
                ReceiverEvent::Abort { from, reason },
            ) => {
                if from == offer.from {
                    (ReceiverState::Idle, Ok(ReceiverOutcome::Aborted { offer, reason }))
                } else {
                    (ReceiverState::Offered { offer, last_activity }, Err(violation))
                }
            }
            (
                ReceiverState::Receiving {
                    offer,
                    buffer,
                    received,
                    last_activity,
                },
                ReceiverEvent::Abort { from, reason },
            ) => {
                if from == offer.from {
                    (ReceiverState::Idle, Ok(ReceiverOutcome::Aborted { offer, reason }))
                } else {
                    (
                        ReceiverState::Receiving {
                            offer,
                            buffer,
                            received,
                            last_activity,
                        },
                        Err(violation),
                    )
                }
            }

            // Everything else is ignored and leaves the state as it was.
            (
                state @ ReceiverState::Idle,
                ReceiverEvent::Accept
                | ReceiverEvent::Reject
                | ReceiverEvent::Chunk { .. }
                | ReceiverEvent::Complete { .. }
                | ReceiverEvent::Abort { .. },
            )
            | (
                state @ ReceiverState::Offered { .. },
                ReceiverEvent::Chunk { .. } | ReceiverEvent::Complete { .. },
            )
            | (
                state @ ReceiverState::Receiving { .. },
                ReceiverEvent::Accept | ReceiverEvent::Reject,
            ) => (state, Err(violation)),
        };

        if let Err(e) = &result {
            debug!(state = state_name, event = event_name, error = %e, "Receiver event not applied");
        }
        self.state = next;
        result
    }

    /// Discard a non-idle session that has seen no activity for
    /// `idle_timeout`. Returns the error describing what was dropped.
    pub fn expire_stale(&mut self, now: Instant, idle_timeout: Duration) -> Option<TransferError> {
        let last_activity = match &self.state {
            ReceiverState::Idle => return None,
            ReceiverState::Offered { last_activity, .. }
            | ReceiverState::Receiving { last_activity, .. } => *last_activity,
        };

        if now.saturating_duration_since(last_activity) < idle_timeout {
            return None;
        }

        let file_name = match std::mem::take(&mut self.state) {
            ReceiverState::Offered { offer, .. } | ReceiverState::Receiving { offer, .. } => {
                offer.meta.name
            }
            ReceiverState::Idle => String::new(),
        };
        Some(TransferError::StaleSession {
            file_name,
            idle_seconds: idle_timeout.as_secs(),
        })
    }
}

fn assemble(offer: TransferOffer, buffer: Vec<Bytes>, received: u64) -> Artifact {
    let mut data = BytesMut::with_capacity(received as usize);
    for part in buffer {
        data.extend_from_slice(&part);
    }
    Artifact {
        file_name: offer.meta.name,
        mime_type: offer.meta.mime_type,
        from: offer.from,
        data: data.freeze(),
    }
}

//! Feeds relayed events into a [`ReceiverSession`] and acts on the outcomes.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use filerelay_core::config::TransferConfig;
use filerelay_core::error::AppError;
use filerelay_core::traits::{ArtifactSink, Decision, OfferDecider};
use filerelay_core::types::{TransferOffer, UserId};
use filerelay_realtime::OutboundMessage;

use crate::error::TransferError;
use crate::receiver::{ReceiverEvent, ReceiverOutcome, ReceiverSession};

/// Something the receiving side should tell its user about.
#[derive(Debug, Clone)]
pub enum ReceiverNotice {
    /// An offer arrived and is being decided.
    Offered(TransferOffer),
    /// The offer was accepted.
    Accepted(TransferOffer),
    /// The offer was rejected.
    Rejected(TransferOffer),
    /// A chunk was buffered.
    Progress {
        /// File being received.
        file_name: String,
        /// Bytes collected so far.
        received: u64,
        /// Declared size.
        size: u64,
    },
    /// The artifact was handed to the sink.
    Saved {
        /// Declared file name.
        file_name: String,
        /// Sending user.
        from: UserId,
        /// Where the sink put it.
        location: String,
    },
    /// The sender aborted.
    Aborted {
        /// File that was being received.
        file_name: String,
        /// Reason given by the relay.
        reason: String,
    },
    /// A transfer failed (empty artifact, stale session, sink error).
    Failed(AppError),
}

/// Runs the receiving side of one connection.
///
/// Decisions are awaited inline, so relayed chunks stay queued on the
/// connection until the offer is accepted or rejected.
#[derive(Debug)]
pub struct ReceiverDriver {
    session: ReceiverSession,
    decider: Arc<dyn OfferDecider>,
    sink: Arc<dyn ArtifactSink>,
    idle_timeout: Duration,
    notices: Option<mpsc::UnboundedSender<ReceiverNotice>>,
}

impl ReceiverDriver {
    /// Create a driver with an idle session.
    pub fn new(
        decider: Arc<dyn OfferDecider>,
        sink: Arc<dyn ArtifactSink>,
        config: &TransferConfig,
    ) -> Self {
        Self {
            session: ReceiverSession::new(),
            decider,
            sink,
            idle_timeout: config.idle_timeout(),
            notices: None,
        }
    }

    /// Receive a [`ReceiverNotice`] for every user-visible outcome.
    pub fn with_notices(mut self, tx: mpsc::UnboundedSender<ReceiverNotice>) -> Self {
        self.notices = Some(tx);
        self
    }

    /// The underlying session.
    pub fn session(&self) -> &ReceiverSession {
        &self.session
    }

    /// Process relayed events until `inbound` closes, expiring stale
    /// sessions in between.
    pub async fn run(mut self, mut inbound: mpsc::Receiver<OutboundMessage>) -> ReceiverSession {
        let period = (self.idle_timeout / 4).max(Duration::from_secs(1));
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                msg = inbound.recv() => match msg {
                    Some(msg) => self.handle(msg).await,
                    None => break,
                },
                _ = ticker.tick() => self.expire(Instant::now()),
            }
        }

        debug!("Receiver driver stopped");
        self.session
    }

    /// Process one relayed event.
    pub async fn handle(&mut self, msg: OutboundMessage) {
        let event = match msg {
            OutboundMessage::Offer { from, meta } => ReceiverEvent::Offer(TransferOffer { from, meta }),
            OutboundMessage::Chunk { from, chunk } => ReceiverEvent::Chunk { from, data: chunk },
            OutboundMessage::Complete { from } => ReceiverEvent::Complete { from },
            OutboundMessage::Abort { from, reason } => ReceiverEvent::Abort { from, reason },
            OutboundMessage::Roster { .. }
            | OutboundMessage::Undeliverable { .. }
            | OutboundMessage::Ping { .. }
            | OutboundMessage::Error { .. } => return,
        };

        match self.session.apply(event, Instant::now()) {
            Ok(outcome) => self.on_outcome(outcome).await,
            Err(TransferError::ProtocolViolation { .. }) => {}
            Err(e) => {
                warn!(error = %e, "Transfer failed");
                self.notify(ReceiverNotice::Failed(e.into()));
            }
        }
    }

    async fn on_outcome(&mut self, outcome: ReceiverOutcome) {
        match outcome {
            ReceiverOutcome::Offered { offer, .. } => {
                info!(from = %offer.from, file = %offer.meta.name, size = offer.meta.size, "Incoming offer");
                self.notify(ReceiverNotice::Offered(offer.clone()));

                let decision = self.decider.decide(&offer).await;
                let event = match decision {
                    Decision::Accept => ReceiverEvent::Accept,
                    Decision::Reject => ReceiverEvent::Reject,
                };
                match self.session.apply(event, Instant::now()) {
                    Ok(ReceiverOutcome::Accepted(offer)) => {
                        self.notify(ReceiverNotice::Accepted(offer));
                    }
                    Ok(ReceiverOutcome::Rejected(offer)) => {
                        info!(from = %offer.from, file = %offer.meta.name, "Offer rejected");
                        self.notify(ReceiverNotice::Rejected(offer));
                    }
                    Ok(other) => debug!(outcome = ?other, "Unexpected decision outcome"),
                    Err(e) => debug!(error = %e, "Decision not applied"),
                }
            }
            ReceiverOutcome::Accepted(offer) => self.notify(ReceiverNotice::Accepted(offer)),
            ReceiverOutcome::Rejected(offer) => self.notify(ReceiverNotice::Rejected(offer)),
            ReceiverOutcome::Appended { received, size } => {
                let file_name = match self.session.state() {
                    crate::receiver::ReceiverState::Receiving { offer, .. } => offer.meta.name.clone(),
                    _ => String::new(),
                };
                self.notify(ReceiverNotice::Progress {
                    file_name,
                    received,
                    size,
                });
            }
            ReceiverOutcome::Assembled(artifact) => {
                let file_name = artifact.file_name.clone();
                let from = artifact.from.clone();
                let bytes = artifact.len();
                match self.sink.store(artifact).await {
                    Ok(location) => {
                        info!(from = %from, file = %file_name, bytes, location = %location, "File received");
                        self.notify(ReceiverNotice::Saved {
                            file_name,
                            from,
                            location,
                        });
                    }
                    Err(e) => {
                        warn!(file = %file_name, error = %e, "Failed to store received file");
                        self.notify(ReceiverNotice::Failed(e));
                    }
                }
            }
            ReceiverOutcome::Aborted { offer, reason } => {
                warn!(from = %offer.from, file = %offer.meta.name, reason = %reason, "Transfer aborted");
                self.notify(ReceiverNotice::Aborted {
                    file_name: offer.meta.name,
                    reason,
                });
            }
        }
    }

    /// Discard the session if it has been idle too long.
    pub fn expire(&mut self, now: Instant) {
        if self.idle_timeout.is_zero() {
            return;
        }
        if let Some(e) = self.session.expire_stale(now, self.idle_timeout) {
            warn!(error = %e, "Discarding stale transfer");
            self.notify(ReceiverNotice::Failed(e.into()));
        }
    }

    fn notify(&self, notice: ReceiverNotice) {
        if let Some(tx) = &self.notices {
            let _ = tx.send(notice);
        }
    }
}

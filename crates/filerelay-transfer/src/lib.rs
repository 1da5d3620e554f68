//! # filerelay-transfer
//!
//! The two ends of a relayed file transfer:
//!
//! - [`SenderSession`] walks a batch of files and emits offer, chunk and
//!   complete events with aggregate progress
//! - [`ReceiverSession`] is the receiving state machine; [`ReceiverDriver`]
//!   feeds it relayed events, asks an [`OfferDecider`] and hands finished
//!   artifacts to an [`ArtifactSink`]
//!
//! Collaborator implementations (sinks, transfer logs, deciders) live here
//! too.
//!
//! [`OfferDecider`]: filerelay_core::traits::OfferDecider
//! [`ArtifactSink`]: filerelay_core::traits::ArtifactSink

pub mod chunker;
pub mod decision;
pub mod driver;
pub mod error;
pub mod link;
pub mod log;
pub mod progress;
pub mod receiver;
pub mod sender;
pub mod sink;

pub use decision::{AutoAccept, AutoReject, PromptDecider};
pub use driver::{ReceiverDriver, ReceiverNotice};
pub use error::TransferError;
pub use link::{GatewayLink, RelayLink};
pub use log::{HttpTransferLog, NoopTransferLog};
pub use progress::ProgressCounter;
pub use receiver::{ReceiverEvent, ReceiverOutcome, ReceiverSession, ReceiverState};
pub use sender::{BatchReport, OutgoingFile, ProgressUpdate, SenderSession, SenderState};
pub use sink::{DirectorySink, MemorySink};

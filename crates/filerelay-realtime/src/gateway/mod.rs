//! Transport gateway: dispatches inbound events and relays them between
//! logical users.

pub mod relay;
pub mod streams;

pub use relay::{DeliveryOutcome, RelayGateway};
pub use streams::ActiveStreams;

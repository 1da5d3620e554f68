//! # filerelay-api
//!
//! HTTP layer for FileRelay built on Axum.
//!
//! Provides the WebSocket upgrade for the relay, health and presence
//! endpoints, the bearer-token extractor, CORS and request tracing, and
//! error mapping.

pub mod app;
pub mod dto;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod state;

pub use app::build_app;
pub use error::ApiError;
pub use state::AppState;

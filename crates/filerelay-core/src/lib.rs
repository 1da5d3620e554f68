//! # filerelay-core
//!
//! Core crate for FileRelay. Contains configuration schemas, typed
//! identifiers, public profile types, the collaborator traits consumed by
//! the relay and transfer crates, and the unified error system.
//!
//! This crate has **no** internal dependencies on other FileRelay crates.

pub mod config;
pub mod error;
pub mod result;
pub mod traits;
pub mod types;

pub use error::AppError;
pub use result::AppResult;

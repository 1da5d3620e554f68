//! Convenience result type alias for FileRelay.

use crate::error::AppError;

/// A specialized `Result` type for FileRelay operations.
pub type AppResult<T> = Result<T, AppError>;

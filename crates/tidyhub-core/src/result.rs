//! Convenience result type alias for TidyHub.

use crate::error::AppError;

/// A specialized `Result` type for TidyHub operations.
pub type AppResult<T> = Result<T, AppError>;

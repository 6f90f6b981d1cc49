//! Request and response DTOs.

pub mod request;
pub mod response;

use validator::Validate;

use tidyhub_core::error::AppError;

/// Run a DTO's declared validation rules.
pub fn validate<T: Validate>(request: &T) -> Result<(), AppError> {
    request
        .validate()
        .map_err(|e| AppError::validation(e.to_string()))
}

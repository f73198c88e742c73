//! # Cart Error Types
//!
//! The only errors a caller of the engine can see. Storage failures on the
//! ordinary write path never get here; they are logged and absorbed by the
//! persistence adapter.

use lucha_core::{CoreError, ValidationError};
use lucha_store::StorageError;
use thiserror::Error;

/// Result type alias for cart operations.
pub type CartResult<T> = Result<T, CartError>;

#[derive(Debug, Error)]
pub enum CartError {
    /// Bad input: blank id, negative price, unreadable summary, unknown mode.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A storage mode switch the caller asked for cannot happen.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl From<ValidationError> for CartError {
    fn from(err: ValidationError) -> Self {
        CartError::Core(CoreError::Validation(err))
    }
}

impl CartError {
    /// Returns true if the caller could have avoided this by checking its
    /// own input or configuration.
    pub fn is_caller_error(&self) -> bool {
        match self {
            CartError::Core(_) => true,
            CartError::Storage(e) => !e.is_environmental(),
        }
    }
}

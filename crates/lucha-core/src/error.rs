//! # Error Types
//!
//! Domain-specific error types for lucha-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  lucha-core errors (this file)                                         │
//! │  ├── CoreError        - Caller contract violations                     │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  lucha-store errors (separate crate)                                   │
//! │  └── StorageError     - Medium failures (always absorbed by the cart)  │
//! │                                                                         │
//! │  lucha-cart errors                                                     │
//! │  └── CartError        - What a caller of the engine can see            │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → CartError → caller                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Only conditions a caller could have avoided by checking its own input
//! become errors. Unknown ids on update/remove are routine races with UI
//! state and are not errors at all.

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core cart logic errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Storage mode string is not one of the known modes.
    #[error("Invalid storage mode '{0}'. Use \"local\" or \"session\".")]
    InvalidStorageMode(String),

    /// A caller-supplied summary could not be read.
    ///
    /// ## When This Occurs
    /// - `restore_from_json` with text that is not JSON
    /// - JSON without an `items` array
    #[error("Malformed cart summary: {0}")]
    MalformedSummary(String),

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Value must be zero or greater.
    #[error("{field} must not be negative (got {value})")]
    Negative { field: String, value: i64 },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

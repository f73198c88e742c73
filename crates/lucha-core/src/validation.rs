//! # Validation Module
//!
//! Caller contract checks for cart input.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      What Fails, What Doesn't                           │
//! │                                                                         │
//! │  FAILS FAST (programming error upstream)                               │
//! │  ├── add_item without an id                                            │
//! │  ├── id longer than MAX_ITEM_ID_LEN                                    │
//! │  └── explicit negative priceCents                                      │
//! │                                                                         │
//! │  NEVER FAILS (routine UI races, normalized instead)                    │
//! │  ├── update/remove of an unknown id                                    │
//! │  ├── qty <= 0 (deletes or no-ops)                                      │
//! │  └── unparsable textual price (becomes 0)                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::ValidationError;
use crate::types::ItemInput;
use crate::MAX_ITEM_ID_LEN;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Validates a line item id.
///
/// ## Rules
/// - Must not be empty or whitespace
/// - At most [`MAX_ITEM_ID_LEN`] characters
///
/// ## Example
/// ```rust
/// use lucha_core::validation::validate_item_id;
///
/// assert!(validate_item_id("t1").is_ok());
/// assert!(validate_item_id("  ").is_err());
/// ```
pub fn validate_item_id(id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "id".to_string(),
        });
    }

    if id.chars().count() > MAX_ITEM_ID_LEN {
        return Err(ValidationError::TooLong {
            field: "id".to_string(),
            max: MAX_ITEM_ID_LEN,
        });
    }

    Ok(())
}

/// Validates an explicitly supplied price in cents.
pub fn validate_price_cents(cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::Negative {
            field: "priceCents".to_string(),
            value: cents,
        });
    }
    Ok(())
}

/// Validates everything `add_item` requires of its input.
pub fn validate_item_input(item: &ItemInput) -> ValidationResult<()> {
    validate_item_id(&item.id)?;
    if let Some(cents) = item.price_cents {
        validate_price_cents(cents)?;
    }
    Ok(())
}

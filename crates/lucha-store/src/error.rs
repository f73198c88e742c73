//! # Storage Error Types
//!
//! ## Error Categories
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Storage Error Categories                           │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │   Environment   │  │  Caller         │  │  Configuration          │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  Unavailable    │  │  MediumNot-     │  │  InvalidConfig          │ │
//! │  │  ReadFailed     │  │   Configured    │  │  ConfigLoadFailed       │ │
//! │  │  WriteFailed    │  │  ModeNot-       │  │  ConfigSaveFailed       │ │
//! │  │                 │  │   Switchable    │  │                         │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! │   always absorbed      surfaced to the       surfaced at startup       │
//! │   by the adapter       caller                                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use lucha_core::StorageMode;
use thiserror::Error;

/// Result type alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

#[derive(Debug, Error)]
pub enum StorageError {
    // =========================================================================
    // Environment
    // =========================================================================
    /// The medium cannot be reached at all (blocked, missing, poisoned).
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    #[error("Failed to read '{key}': {reason}")]
    ReadFailed { key: String, reason: String },

    #[error("Failed to write '{key}': {reason}")]
    WriteFailed { key: String, reason: String },

    // =========================================================================
    // Caller
    // =========================================================================
    /// A switch asked for a mode with no medium behind it.
    #[error("No storage medium configured for mode '{0}'")]
    MediumNotConfigured(StorageMode),

    /// Only durable modes can be switched to at runtime.
    #[error("Storage mode '{0}' cannot be selected at runtime")]
    ModeNotSwitchable(StorageMode),

    // =========================================================================
    // Configuration
    // =========================================================================
    #[error("Invalid storage configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to load config: {0}")]
    ConfigLoadFailed(String),

    #[error("Failed to save config: {0}")]
    ConfigSaveFailed(String),
}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        StorageError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::de::Error> for StorageError {
    fn from(err: toml::de::Error) -> Self {
        StorageError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::ser::Error> for StorageError {
    fn from(err: toml::ser::Error) -> Self {
        StorageError::ConfigSaveFailed(err.to_string())
    }
}

impl StorageError {
    /// Returns true if this failure comes from the environment rather than
    /// from the caller. These are logged and absorbed, never surfaced.
    pub fn is_environmental(&self) -> bool {
        matches!(
            self,
            StorageError::Unavailable(_)
                | StorageError::ReadFailed { .. }
                | StorageError::WriteFailed { .. }
        )
    }

    /// Returns true if this error indicates a configuration problem.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            StorageError::InvalidConfig(_)
                | StorageError::ConfigLoadFailed(_)
                | StorageError::ConfigSaveFailed(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_environmental_errors() {
        assert!(StorageError::Unavailable("blocked".into()).is_environmental());
        assert!(StorageError::WriteFailed {
            key: "k".into(),
            reason: "quota".into()
        }
        .is_environmental());

        assert!(!StorageError::MediumNotConfigured(StorageMode::Session).is_environmental());
        assert!(!StorageError::InvalidConfig("x".into()).is_environmental());
    }

    #[test]
    fn test_error_display() {
        let err = StorageError::MediumNotConfigured(StorageMode::Session);
        assert_eq!(err.to_string(), "No storage medium configured for mode 'session'");
    }
}

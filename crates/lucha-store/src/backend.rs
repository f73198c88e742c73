//! # Storage Backends
//!
//! The capability every medium exposes, and the in-memory medium.
//!
//! ## Media
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        StorageBackend                                   │
//! │              get(key) / set(key, value) / remove(key)                   │
//! │                                                                         │
//! │   ┌────────────────┐  ┌────────────────┐  ┌────────────────────────┐   │
//! │   │ MemoryStorage  │  │  FileStorage   │  │ StorageContext         │   │
//! │   │ (backend.rs)   │  │  (file.rs)     │  │ (shared.rs)            │   │
//! │   │                │  │                │  │                        │   │
//! │   │ in-process,    │  │ durable,       │  │ durable + shared,      │   │
//! │   │ gone on exit   │  │ one file/key   │  │ broadcasts changes to  │   │
//! │   │                │  │                │  │ sibling contexts       │   │
//! │   └────────────────┘  └────────────────┘  └────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use uuid::Uuid;

use crate::error::{StorageError, StorageResult};
use crate::shared::StorageSubscription;

/// A string key/value medium.
///
/// Implementations must be safe to share across threads; the cart calls
/// them while holding its own lock, so they should not block for long.
pub trait StorageBackend: Send + Sync {
    /// Returns the stored value, or `None` when the key is absent.
    fn get(&self, key: &str) -> StorageResult<Option<String>>;

    fn set(&self, key: &str, value: &str) -> StorageResult<()>;

    /// Removing an absent key is not an error.
    fn remove(&self, key: &str) -> StorageResult<()>;

    /// Identifies the underlying medium. Two backends reporting the same id
    /// read and write the same data.
    fn medium_id(&self) -> String;

    /// Change feed for `key` written by *other* contexts, when the medium
    /// has one.
    fn subscribe(&self, _key: &str) -> Option<StorageSubscription> {
        None
    }
}

/// Shared handle to any medium.
pub type SharedBackend = Arc<dyn StorageBackend>;

// =============================================================================
// Memory Storage
// =============================================================================

/// In-process medium. Used for tests, for `StorageMode::Memory`, and as the
/// shim substituted when a durable medium fails.
#[derive(Debug)]
pub struct MemoryStorage {
    id: Uuid,
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        MemoryStorage {
            id: Uuid::new_v4(),
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Convenience for `Arc::new(MemoryStorage::new())`.
    pub fn shared() -> SharedBackend {
        Arc::new(Self::new())
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

fn poisoned() -> StorageError {
    StorageError::Unavailable("memory storage lock poisoned".into())
}

impl StorageBackend for MemoryStorage {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        let entries = self.entries.read().map_err(|_| poisoned())?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        let mut entries = self.entries.write().map_err(|_| poisoned())?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        let mut entries = self.entries.write().map_err(|_| poisoned())?;
        entries.remove(key);
        Ok(())
    }

    fn medium_id(&self) -> String {
        format!("memory:{}", self.id)
    }
}

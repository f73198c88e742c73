//! # Shared Medium
//!
//! A durable medium seen by several contexts at once (think browser tabs on
//! one origin, or several processes' carts in one app). Every write made
//! through one [`StorageContext`] is broadcast to the others so they can
//! reconcile.
//!
//! ## Change Flow
//! ```text
//! ┌──────────────┐   set(key, v)   ┌──────────────────┐
//! │ Context A    │ ───────────────►│   SharedMedium   │
//! └──────────────┘                 │  store + events  │
//!                                  └────────┬─────────┘
//!                     StorageEvent{origin: A}│ broadcast
//!                    ┌───────────────────────┴──────────────┐
//!                    ▼                                      ▼
//!          ┌──────────────────┐                  ┌──────────────────┐
//!          │ A's subscription │                  │ B's subscription │
//!          │ (own origin,     │                  │ → Changed(event) │
//!          │  filtered out)   │                  └──────────────────┘
//!          └──────────────────┘
//! ```

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};
use tracing::{debug, trace};
use uuid::Uuid;

use crate::backend::{MemoryStorage, SharedBackend, StorageBackend};
use crate::error::StorageResult;
use crate::file::FileStorage;

/// Buffered change events per subscriber before it starts lagging.
const EVENT_CAPACITY: usize = 64;

/// A write observed on a shared medium.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageEvent {
    pub key: String,
    /// `None` when the key was removed.
    pub new_value: Option<String>,
    /// Context that made the write.
    pub origin: Uuid,
    pub at: DateTime<Utc>,
}

/// What a subscription yields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageNotice {
    Changed(StorageEvent),
    /// The subscriber fell behind and `n` events were dropped. The current
    /// value must be re-read from the medium.
    Lagged(u64),
}

pub struct SharedMedium {
    id: Uuid,
    store: SharedBackend,
    events: broadcast::Sender<StorageEvent>,
}

impl SharedMedium {
    pub fn new(store: SharedBackend) -> Arc<Self> {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Arc::new(SharedMedium {
            id: Uuid::new_v4(),
            store,
            events,
        })
    }

    pub fn in_memory() -> Arc<Self> {
        Self::new(MemoryStorage::shared())
    }

    pub fn on_disk(dir: impl Into<PathBuf>) -> StorageResult<Arc<Self>> {
        Ok(Self::new(Arc::new(FileStorage::open(dir)?)))
    }

    /// Opens a new context on this medium. Each context has its own origin
    /// id and never hears about its own writes.
    pub fn context(self: &Arc<Self>) -> StorageContext {
        let context = StorageContext {
            id: Uuid::new_v4(),
            medium: Arc::clone(self),
        };
        debug!(medium = %self.id, context = %context.id, "Storage context opened");
        context
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    fn publish(&self, key: &str, new_value: Option<&str>, origin: Uuid) {
        let event = StorageEvent {
            key: key.to_string(),
            new_value: new_value.map(str::to_string),
            origin,
            at: Utc::now(),
        };
        // No receivers is fine.
        let _ = self.events.send(event);
    }
}

impl fmt::Debug for SharedMedium {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedMedium")
            .field("id", &self.id)
            .field("store", &self.store.medium_id())
            .field("receivers", &self.events.receiver_count())
            .finish()
    }
}

/// One participant's view of a [`SharedMedium`].
#[derive(Debug, Clone)]
pub struct StorageContext {
    id: Uuid,
    medium: Arc<SharedMedium>,
}

impl StorageContext {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn medium(&self) -> &Arc<SharedMedium> {
        &self.medium
    }
}

impl StorageBackend for StorageContext {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        self.medium.store.get(key)
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        self.medium.store.set(key, value)?;
        self.medium.publish(key, Some(value), self.id);
        Ok(())
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        self.medium.store.remove(key)?;
        self.medium.publish(key, None, self.id);
        Ok(())
    }

    fn medium_id(&self) -> String {
        format!("shared:{}", self.medium.id)
    }

    fn subscribe(&self, key: &str) -> Option<StorageSubscription> {
        Some(StorageSubscription {
            key: key.to_string(),
            context: self.id,
            rx: self.medium.events.subscribe(),
        })
    }
}

/// Changes to one key made by other contexts.
#[derive(Debug)]
pub struct StorageSubscription {
    key: String,
    context: Uuid,
    rx: broadcast::Receiver<StorageEvent>,
}

impl StorageSubscription {
    pub fn key(&self) -> &str {
        &self.key
    }

    fn wants(&self, event: &StorageEvent) -> bool {
        event.origin != self.context && event.key == self.key
    }

    /// Returns the next relevant notice without waiting, or `None` when
    /// nothing is queued or the medium is gone.
    pub fn try_next(&mut self) -> Option<StorageNotice> {
        loop {
            match self.rx.try_recv() {
                Ok(event) if self.wants(&event) => return Some(StorageNotice::Changed(event)),
                Ok(event) => trace!(key = %event.key, "Skipping storage event"),
                Err(TryRecvError::Lagged(n)) => return Some(StorageNotice::Lagged(n)),
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => return None,
            }
        }
    }

    /// Waits for the next relevant notice. `None` once the medium is gone.
    pub async fn next(&mut self) -> Option<StorageNotice> {
        loop {
            match self.rx.recv().await {
                Ok(event) if self.wants(&event) => return Some(StorageNotice::Changed(event)),
                Ok(event) => trace!(key = %event.key, "Skipping storage event"),
                Err(RecvError::Lagged(n)) => return Some(StorageNotice::Lagged(n)),
                Err(RecvError::Closed) => return None,
            }
        }
    }
}

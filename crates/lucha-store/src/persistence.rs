//! # Persistence Adapter
//!
//! Hides which medium the cart lives on behind one key and one blob.
//!
//! ## Write Path
//! ```text
//!   persist(raw)
//!        │
//!        ├── debounce == 0 or no runtime ──► backend.set(key, raw)
//!        │
//!        └── debounce > 0
//!              abort pending timer
//!              pending ← raw
//!              spawn: sleep(debounce) → take pending → backend.set
//! ```
//!
//! Failures on the write path are logged and absorbed. A medium that cannot
//! be read when the adapter opens is replaced by a [`MemoryStorage`] and the
//! mode reported as `Memory`, so the cart keeps working until exit.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use lucha_core::{StorageMode, STORAGE_KEY};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::backend::{MemoryStorage, SharedBackend, StorageBackend};
use crate::config::StoreConfig;
use crate::error::{StorageError, StorageResult};
use crate::file::FileStorage;
use crate::shared::{SharedMedium, StorageSubscription};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn write_now(backend: &dyn StorageBackend, key: &str, raw: &str) -> bool {
    match backend.set(key, raw) {
        Ok(()) => true,
        Err(e) => {
            warn!(key = %key, error = %e, "Unable to persist cart to storage");
            false
        }
    }
}

// =============================================================================
// Storage Media
// =============================================================================

/// The durable media available for the switchable modes.
#[derive(Clone, Default)]
pub struct StorageMedia {
    /// Durable and shared: backs `StorageMode::Local`.
    pub local: Option<Arc<SharedMedium>>,
    /// Durable and private: backs `StorageMode::Session`.
    pub session: Option<SharedBackend>,
}

impl StorageMedia {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn with_local(mut self, medium: Arc<SharedMedium>) -> Self {
        self.local = Some(medium);
        self
    }

    pub fn with_session(mut self, backend: SharedBackend) -> Self {
        self.session = Some(backend);
        self
    }

    /// Opens the file-backed media under the configured data dir.
    ///
    /// A medium that cannot be opened is left unset; the adapter falls back
    /// to memory if that mode is selected.
    pub fn from_config(config: &StoreConfig) -> Self {
        let Some(dir) = config.data_dir() else {
            warn!("No data directory available, durable storage disabled");
            return Self::none();
        };

        let local = match SharedMedium::on_disk(dir.join("local")) {
            Ok(medium) => Some(medium),
            Err(e) => {
                warn!(error = %e, "Shared storage unavailable");
                None
            }
        };

        let session = match FileStorage::session(&dir, &config.storage.session_id) {
            Ok(store) => Some(Arc::new(store) as SharedBackend),
            Err(e) => {
                warn!(error = %e, "Session storage unavailable");
                None
            }
        };

        StorageMedia { local, session }
    }

    fn resolve(&self, mode: StorageMode, injected: Option<&SharedBackend>) -> Option<SharedBackend> {
        match mode {
            StorageMode::Local => self
                .local
                .as_ref()
                .map(|medium| Arc::new(medium.context()) as SharedBackend),
            StorageMode::Session => self.session.clone(),
            StorageMode::Injected => injected.cloned(),
            StorageMode::Memory => Some(MemoryStorage::shared()),
        }
    }
}

impl fmt::Debug for StorageMedia {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageMedia")
            .field("local", &self.local)
            .field("session", &self.session.as_ref().map(|s| s.medium_id()))
            .finish()
    }
}

// =============================================================================
// Options
// =============================================================================

#[derive(Clone)]
pub struct PersistenceOptions {
    pub key: String,
    pub mode: StorageMode,
    /// Backend used for `StorageMode::Injected`.
    pub injected: Option<SharedBackend>,
    pub media: StorageMedia,
    /// Coalescing window. Zero writes on every call.
    pub debounce: Duration,
}

impl Default for PersistenceOptions {
    fn default() -> Self {
        PersistenceOptions {
            key: STORAGE_KEY.to_string(),
            mode: StorageMode::Memory,
            injected: None,
            media: StorageMedia::none(),
            debounce: Duration::ZERO,
        }
    }
}

impl PersistenceOptions {
    pub fn from_config(config: &StoreConfig) -> Self {
        PersistenceOptions {
            key: config.key().to_string(),
            mode: config.mode(),
            injected: None,
            media: StorageMedia::from_config(config),
            debounce: config.debounce(),
        }
    }
}

// =============================================================================
// Adapter
// =============================================================================

pub struct PersistenceAdapter {
    key: String,
    mode: StorageMode,
    backend: SharedBackend,
    injected: Option<SharedBackend>,
    media: StorageMedia,
    debounce: Duration,
    pending: Arc<Mutex<Option<String>>>,
    timer: Option<JoinHandle<()>>,
}

impl PersistenceAdapter {
    /// Opens the medium for `options.mode` and reads the stored blob once.
    ///
    /// Returns the adapter and whatever was stored under the key. Never
    /// fails: an absent or unreadable medium degrades to memory.
    pub fn open(options: PersistenceOptions) -> (Self, Option<String>) {
        let PersistenceOptions {
            key,
            mode,
            injected,
            media,
            debounce,
        } = options;

        let (mode, backend) = match media.resolve(mode, injected.as_ref()) {
            Some(backend) => (mode, backend),
            None => {
                warn!(mode = %mode, "No storage medium for mode, falling back to memory");
                (StorageMode::Memory, MemoryStorage::shared())
            }
        };

        let (mode, backend, restored) = match backend.get(&key) {
            Ok(raw) => (mode, backend, raw),
            Err(e) => {
                warn!(mode = %mode, error = %e, "Storage unavailable, falling back to memory");
                (StorageMode::Memory, MemoryStorage::shared(), None)
            }
        };

        debug!(key = %key, mode = %mode, restored = restored.is_some(), "Persistence opened");

        let adapter = PersistenceAdapter {
            key,
            mode,
            backend,
            injected,
            media,
            debounce,
            pending: Arc::new(Mutex::new(None)),
            timer: None,
        };
        (adapter, restored)
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn mode(&self) -> StorageMode {
        self.mode
    }

    pub fn debounce(&self) -> Duration {
        self.debounce
    }

    /// Current stored value. Read failures are logged and read as absent.
    pub fn read(&self) -> Option<String> {
        match self.backend.get(&self.key) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(key = %self.key, error = %e, "Unable to read cart from storage");
                None
            }
        }
    }

    /// External change feed for the current medium, if it has one.
    pub fn subscribe(&self) -> Option<StorageSubscription> {
        self.backend.subscribe(&self.key)
    }

    /// Writes `raw`, or schedules it when debouncing.
    ///
    /// Debouncing needs a tokio runtime; without one every call writes
    /// immediately.
    pub fn persist(&mut self, raw: String) {
        if self.debounce.is_zero() {
            write_now(self.backend.as_ref(), &self.key, &raw);
            return;
        }

        let handle = match Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                write_now(self.backend.as_ref(), &self.key, &raw);
                return;
            }
        };

        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
        *lock(&self.pending) = Some(raw);

        let pending = Arc::clone(&self.pending);
        let backend = Arc::clone(&self.backend);
        let key = self.key.clone();
        let delay = self.debounce;

        self.timer = Some(handle.spawn(async move {
            tokio::time::sleep(delay).await;
            let raw = lock(&pending).take();
            if let Some(raw) = raw {
                debug!(key = %key, "Debounced cart write");
                write_now(backend.as_ref(), &key, &raw);
            }
        }));
    }

    pub fn has_pending(&self) -> bool {
        lock(&self.pending).is_some()
    }

    /// Drops a scheduled write without performing it.
    ///
    /// A write whose timer has already fired is past cancelling and still
    /// lands.
    pub fn cancel_pending(&mut self) -> bool {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
        lock(&self.pending).take().is_some()
    }

    /// Performs a scheduled write now. Returns true if one was pending.
    pub fn flush(&mut self) -> bool {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
        let raw = lock(&self.pending).take();
        match raw {
            Some(raw) => {
                write_now(self.backend.as_ref(), &self.key, &raw);
                true
            }
            None => false,
        }
    }

    /// Moves `raw` onto the medium for `target` and makes it current.
    ///
    /// The previous copy is removed when the target is a different medium.
    /// If the target refuses the write the adapter drops to memory, keeps
    /// `raw` there and leaves the previous copy in place.
    ///
    /// ## Errors
    /// - `ModeNotSwitchable` for `Injected` and `Memory`
    /// - `MediumNotConfigured` when no medium backs `target`
    pub fn switch_mode(&mut self, target: StorageMode, raw: &str) -> StorageResult<StorageMode> {
        if !target.is_switchable() {
            return Err(StorageError::ModeNotSwitchable(target));
        }
        let next = self
            .media
            .resolve(target, self.injected.as_ref())
            .ok_or(StorageError::MediumNotConfigured(target))?;

        self.cancel_pending();

        if let Err(e) = next.set(&self.key, raw) {
            warn!(mode = %target, error = %e, "Unable to switch storage, falling back to memory");
            let shim = MemoryStorage::new();
            write_now(&shim, &self.key, raw);
            self.backend = Arc::new(shim);
            self.mode = StorageMode::Memory;
            return Ok(self.mode);
        }

        let previous = std::mem::replace(&mut self.backend, next);
        if previous.medium_id() != self.backend.medium_id() {
            if let Err(e) = previous.remove(&self.key) {
                debug!(error = %e, "Unable to remove stale cart copy");
            }
        }

        info!(from = %self.mode, to = %target, "Storage mode switched");
        self.mode = target;
        Ok(self.mode)
    }
}

impl fmt::Debug for PersistenceAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PersistenceAdapter")
            .field("key", &self.key)
            .field("mode", &self.mode)
            .field("backend", &self.backend.medium_id())
            .field("debounce", &self.debounce)
            .field("pending", &self.has_pending())
            .finish()
    }
}

impl Drop for PersistenceAdapter {
    fn drop(&mut self) {
        self.flush();
    }
}

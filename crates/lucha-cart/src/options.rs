//! # Cart Options
//!
//! Everything [`create_cart`](crate::create_cart) needs, with builders.
//!
//! ```rust
//! use lucha_cart::{create_cart, CartOptions};
//! use lucha_store::SharedMedium;
//!
//! let medium = SharedMedium::in_memory();
//! let cart = create_cart(CartOptions::new().shared(medium));
//! assert_eq!(cart.storage_mode(), lucha_core::StorageMode::Local);
//! ```

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use lucha_core::{LineItem, StorageMode, STORAGE_KEY};
use lucha_store::{PersistenceOptions, SharedBackend, SharedMedium, StorageMedia, StoreConfig};

use crate::events::CartEventListener;

#[derive(Clone)]
pub struct CartOptions {
    /// Persistence key for the cart blob.
    pub key: String,
    /// Starting storage mode. Defaults to `Memory`.
    pub mode: StorageMode,
    /// Backend for `StorageMode::Injected`.
    pub storage: Option<SharedBackend>,
    /// Durable media used by `Local` / `Session` and by mode switches.
    pub media: StorageMedia,
    /// Write coalescing window.
    pub debounce: Duration,
    /// Lines layered over whatever was restored.
    pub initial_items: Vec<LineItem>,
    /// Registered before construction so they also hear the restore.
    pub listeners: Vec<Arc<dyn CartEventListener>>,
    /// Start the background cross-context listener when a runtime exists.
    pub sync_listener: bool,
}

impl Default for CartOptions {
    fn default() -> Self {
        CartOptions {
            key: STORAGE_KEY.to_string(),
            mode: StorageMode::Memory,
            storage: None,
            media: StorageMedia::none(),
            debounce: Duration::ZERO,
            initial_items: Vec::new(),
            listeners: Vec::new(),
            sync_listener: true,
        }
    }
}

impl CartOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Options for the configured mode and file-backed media.
    pub fn from_config(config: &StoreConfig) -> Self {
        let persistence = PersistenceOptions::from_config(config);
        CartOptions {
            key: persistence.key,
            mode: persistence.mode,
            media: persistence.media,
            debounce: persistence.debounce,
            ..Default::default()
        }
    }

    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    pub fn mode(mut self, mode: StorageMode) -> Self {
        self.mode = mode;
        self
    }

    /// Persists to `backend` (mode `Injected`).
    pub fn storage(mut self, backend: SharedBackend) -> Self {
        self.storage = Some(backend);
        self.mode = StorageMode::Injected;
        self
    }

    /// Persists to a shared medium (mode `Local`).
    pub fn shared(mut self, medium: Arc<SharedMedium>) -> Self {
        self.media.local = Some(medium);
        self.mode = StorageMode::Local;
        self
    }

    /// Makes a private medium available for `Session`. Does not change the
    /// starting mode.
    pub fn session(mut self, backend: SharedBackend) -> Self {
        self.media.session = Some(backend);
        self
    }

    pub fn media(mut self, media: StorageMedia) -> Self {
        self.media = media;
        self
    }

    pub fn debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    pub fn initial_items(mut self, items: impl IntoIterator<Item = LineItem>) -> Self {
        self.initial_items = items.into_iter().collect();
        self
    }

    pub fn listener(mut self, listener: Arc<dyn CartEventListener>) -> Self {
        self.listeners.push(listener);
        self
    }

    pub fn sync_listener(mut self, enabled: bool) -> Self {
        self.sync_listener = enabled;
        self
    }

    pub(crate) fn persistence(&self) -> PersistenceOptions {
        PersistenceOptions {
            key: self.key.clone(),
            mode: self.mode,
            injected: self.storage.clone(),
            media: self.media.clone(),
            debounce: self.debounce,
        }
    }
}

impl fmt::Debug for CartOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CartOptions")
            .field("key", &self.key)
            .field("mode", &self.mode)
            .field("storage", &self.storage.as_ref().map(|s| s.medium_id()))
            .field("media", &self.media)
            .field("debounce", &self.debounce)
            .field("initial_items", &self.initial_items.len())
            .field("listeners", &self.listeners.len())
            .field("sync_listener", &self.sync_listener)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lucha_store::MemoryStorage;

    #[test]
    fn test_builders_set_mode() {
        assert_eq!(CartOptions::new().mode, StorageMode::Memory);
        assert_eq!(
            CartOptions::new().storage(MemoryStorage::shared()).mode,
            StorageMode::Injected
        );
        assert_eq!(
            CartOptions::new().shared(SharedMedium::in_memory()).mode,
            StorageMode::Local
        );

        let options = CartOptions::new().session(MemoryStorage::shared());
        assert_eq!(options.mode, StorageMode::Memory);
        assert!(options.media.session.is_some());
    }

    #[test]
    fn test_from_config() {
        let tmp = tempfile::tempdir().unwrap();
        let mut config = StoreConfig::default();
        config.storage.data_dir = Some(tmp.path().to_path_buf());
        config.storage.key = "cart_test".into();
        config.persistence.debounce_ms = 50;

        let options = CartOptions::from_config(&config);
        assert_eq!(options.key, "cart_test");
        assert_eq!(options.mode, StorageMode::Local);
        assert_eq!(options.debounce, Duration::from_millis(50));
        assert!(options.media.local.is_some());
        assert!(options.media.session.is_some());
    }
}

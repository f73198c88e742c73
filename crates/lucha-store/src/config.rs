//! # Storage Configuration
//!
//! Where the cart persists and how eagerly.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     LUCHA_CART_STORAGE_MODE=session                                    │
//! │     LUCHA_CART_DEBOUNCE_MS=250                                         │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/cart/cart.toml (Linux)                                   │
//! │     ~/Library/Application Support/com.lucha.cart/cart.toml (macOS)     │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     StorageMode::Local, key "lucha_cart_v1", no debounce               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! [storage]
//! mode = "local"        # local | session | memory
//! key = "lucha_cart_v1"
//! data_dir = "/var/lib/lucha"
//! session_id = "550e8400-e29b-41d4-a716-446655440000"
//!
//! [persistence]
//! debounce_ms = 0
//! ```

use std::path::PathBuf;
use std::time::Duration;

use lucha_core::{StorageMode, STORAGE_KEY};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{StorageError, StorageResult};

// =============================================================================
// Storage Settings
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageSettings {
    #[serde(default)]
    pub mode: StorageMode,

    /// Key the cart blob is stored under.
    #[serde(default = "default_key")]
    pub key: String,

    /// Root for file-backed media. Falls back to the platform data dir.
    #[serde(default)]
    pub data_dir: Option<PathBuf>,

    /// Names the private session medium. A fresh id means a fresh session.
    #[serde(default = "default_session_id")]
    pub session_id: String,
}

fn default_key() -> String {
    STORAGE_KEY.to_string()
}

fn default_session_id() -> String {
    Uuid::new_v4().to_string()
}

impl Default for StorageSettings {
    fn default() -> Self {
        StorageSettings {
            mode: StorageMode::default(),
            key: default_key(),
            data_dir: None,
            session_id: default_session_id(),
        }
    }
}

// =============================================================================
// Persistence Settings
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PersistenceSettings {
    /// Coalescing window for writes. 0 writes on every mutation.
    #[serde(default)]
    pub debounce_ms: u64,
}

// =============================================================================
// Main Configuration
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub storage: StorageSettings,

    #[serde(default)]
    pub persistence: PersistenceSettings,
}

impl StoreConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (cart.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> StorageResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading cart config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns default if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load cart config: {}. Using defaults.", e);
            Self::default()
        })
    }

    pub fn save(&self, config_path: Option<PathBuf>) -> StorageResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| StorageError::ConfigSaveFailed("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| StorageError::ConfigSaveFailed(e.to_string()))?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents).map_err(|e| StorageError::ConfigSaveFailed(e.to_string()))?;

        info!(?path, "Cart config saved");
        Ok(())
    }

    pub fn validate(&self) -> StorageResult<()> {
        if self.storage.key.trim().is_empty() {
            return Err(StorageError::InvalidConfig("storage key must not be empty".into()));
        }

        // An injected backend only exists in code.
        if self.storage.mode == StorageMode::Injected {
            return Err(StorageError::InvalidConfig(
                "mode 'injected' cannot be configured from a file; pass a backend in code".into(),
            ));
        }

        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(mode) = var("LUCHA_CART_STORAGE_MODE") {
            match mode.parse() {
                Ok(parsed) => {
                    debug!(mode = %mode, "Overriding storage mode from environment");
                    self.storage.mode = parsed;
                }
                Err(_) => warn!(mode = %mode, "Unknown storage mode in environment"),
            }
        }

        if let Some(key) = var("LUCHA_CART_KEY") {
            self.storage.key = key;
        }

        if let Some(dir) = var("LUCHA_CART_DATA_DIR") {
            debug!(dir = %dir, "Overriding data dir from environment");
            self.storage.data_dir = Some(PathBuf::from(dir));
        }

        if let Some(id) = var("LUCHA_CART_SESSION_ID") {
            self.storage.session_id = id;
        }

        if let Some(ms) = var("LUCHA_CART_DEBOUNCE_MS") {
            if let Ok(ms) = ms.parse::<u64>() {
                self.persistence.debounce_ms = ms;
            }
        }
    }

    pub fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "lucha", "cart")
            .map(|dirs| dirs.config_dir().join("cart.toml"))
    }

    // =========================================================================
    // Convenience Methods
    // =========================================================================

    pub fn mode(&self) -> StorageMode {
        self.storage.mode
    }

    pub fn key(&self) -> &str {
        &self.storage.key
    }

    /// Configured data dir, or the platform default.
    pub fn data_dir(&self) -> Option<PathBuf> {
        self.storage.data_dir.clone().or_else(|| {
            directories::ProjectDirs::from("com", "lucha", "cart")
                .map(|dirs| dirs.data_dir().to_path_buf())
        })
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.persistence.debounce_ms)
    }
}

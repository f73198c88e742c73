//! # lucha-store: Storage Layer for Lucha Cart
//!
//! Every medium the cart can persist to, and the adapter that keeps one
//! serialized cart blob on whichever medium is current.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Persistence Adapter                              │
//! │                                                                         │
//! │   open()  ──► resolve medium for mode ──► probe get(key) ──► restored   │
//! │                      │ missing / failing                               │
//! │                      └──────────────► MemoryStorage (mode = memory)    │
//! │                                                                         │
//! │   persist(raw) ──► immediate or debounced set(key, raw)                │
//! │   switch_mode(target, raw) ──► write target, remove stale copy         │
//! │                                                                         │
//! │  ┌────────────────┐  ┌────────────────┐  ┌────────────────────────┐    │
//! │  │ SharedMedium   │  │ FileStorage    │  │ MemoryStorage          │    │
//! │  │ → Local        │  │ (session dir)  │  │ → Memory / fallback    │    │
//! │  │ change feed    │  │ → Session      │  │                        │    │
//! │  └────────────────┘  └────────────────┘  └────────────────────────┘    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`backend`] - `StorageBackend` trait and `MemoryStorage`
//! - [`file`] - File-per-key durable storage
//! - [`shared`] - Shared medium with a cross-context change feed
//! - [`persistence`] - `PersistenceAdapter`, debounce, fallback, mode switch
//! - [`config`] - TOML + environment configuration
//! - [`error`] - Storage error types
//!
//! ## Usage
//!
//! ```rust
//! use lucha_core::StorageMode;
//! use lucha_store::{PersistenceAdapter, PersistenceOptions, SharedMedium, StorageMedia};
//!
//! let medium = SharedMedium::in_memory();
//! let options = PersistenceOptions {
//!     mode: StorageMode::Local,
//!     media: StorageMedia::none().with_local(medium),
//!     ..Default::default()
//! };
//!
//! let (mut adapter, restored) = PersistenceAdapter::open(options);
//! assert!(restored.is_none());
//!
//! adapter.persist(r#"{"items":[]}"#.to_string());
//! assert_eq!(adapter.read().as_deref(), Some(r#"{"items":[]}"#));
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod backend;
pub mod config;
pub mod error;
pub mod file;
pub mod persistence;
pub mod shared;

// =============================================================================
// Re-exports
// =============================================================================

pub use backend::{MemoryStorage, SharedBackend, StorageBackend};
pub use config::{PersistenceSettings, StorageSettings, StoreConfig};
pub use error::{StorageError, StorageResult};
pub use file::FileStorage;
pub use persistence::{PersistenceAdapter, PersistenceOptions, StorageMedia};
pub use shared::{SharedMedium, StorageContext, StorageEvent, StorageNotice, StorageSubscription};

//! # lucha-core: Pure Cart Logic for Lucha Cart
//!
//! This crate is the **heart** of the cart. It holds the order lines, their
//! derived totals and the price rules as pure functions with zero I/O.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Lucha Cart Architecture                          │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    Front End (menu, mini-cart, checkout)        │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ add_item / update_qty / cart changed   │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    lucha-cart (engine)                          │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ lucha-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   money   │  │ registry  │  │ validation│  │   │
//! │  │   │ LineItem  │  │   Money   │  │ LineItem  │  │   rules   │  │   │
//! │  │   │ Summary   │  │ to_cents  │  │ Registry  │  │  checks   │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO STORAGE • NO TIMERS • PURE FUNCTIONS             │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (LineItem, ItemInput, CartSummary, StorageMode)
//! - [`money`] - Money type and the price normalizer (integer cents only)
//! - [`registry`] - The keyed collection of order lines
//! - [`error`] - Domain error types
//! - [`validation`] - Caller contract checks
//!
//! ## Example Usage
//!
//! ```rust
//! use lucha_core::{ItemInput, LineItemRegistry, StorageMode};
//!
//! let mut registry = LineItemRegistry::new();
//! registry
//!     .add(&ItemInput::new("t1").name("California Taco").price_cents(500), 2)
//!     .unwrap();
//!
//! let summary = registry.summary(StorageMode::Memory);
//! assert_eq!(summary.total_qty, 2);
//! assert_eq!(summary.subtotal_cents, 1000);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod money;
pub mod registry;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use money::{to_cents, Money, PriceInput};
pub use registry::LineItemRegistry;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// The single persistence key holding the whole cart blob.
///
/// Versioned so a future layout change can live next to the old one.
pub const STORAGE_KEY: &str = "lucha_cart_v1";

/// Maximum length of a line item id.
pub const MAX_ITEM_ID_LEN: usize = 200;

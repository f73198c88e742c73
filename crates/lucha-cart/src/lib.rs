//! # lucha-cart: Cart Engine for Lucha Cart
//!
//! The cart instance UI collaborators talk to: the menu grid's "add", the
//! mini-cart stepper and checkout's "clear" all go through a [`Cart`], and
//! all of them re-render from the [`CartSummary`] it announces.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                              Cart                                       │
//! │                                                                         │
//! │  ┌───────────────────────────── Mutex ────────────────────────────┐    │
//! │  │  LineItemRegistry (lucha-core)   PersistenceAdapter (store)    │    │
//! │  └────────────────────────────────────────────────────────────────┘    │
//! │          │ summary                                 ▲ external change    │
//! │          ▼                                         │                    │
//! │  ┌────────────────┐                     ┌──────────┴───────────┐        │
//! │  │   ChangeBus    │◄── cart:changed ────│  Cross-context sync  │        │
//! │  │ listeners +    │                     │  pump / background   │        │
//! │  │ broadcast chan │                     │  listener            │        │
//! │  └────────────────┘                     └──────────────────────┘        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`cart`] - `Cart` and the `create_cart` factory
//! - [`options`] - `CartOptions` builders
//! - [`events`] - Change notification bus
//! - `sync` - Cross-context reconciliation
//! - [`error`] - Cart error types
//!
//! ## Usage
//!
//! ```rust
//! use lucha_cart::{create_cart, CartOptions};
//! use lucha_core::ItemInput;
//!
//! let cart = create_cart(CartOptions::new());
//! cart.on_change(|summary| println!("{} items", summary.total_qty));
//!
//! let summary = cart
//!     .add_item(&ItemInput::new("t1").name("California Taco").price_cents(500), 2)
//!     .unwrap();
//! assert_eq!(summary.subtotal_cents, 1000);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod cart;
pub mod error;
pub mod events;
pub mod options;
mod sync;

// =============================================================================
// Re-exports
// =============================================================================

pub use cart::{create_cart, Cart};
pub use error::{CartError, CartResult};
pub use events::{CartEvent, CartEventListener, ChangeBus, NoOpListener, SubscriptionId};
pub use options::CartOptions;

pub use lucha_core::{CartSummary, ItemInput, LineItem, PriceInput, StorageMode, StorageModeChanged};

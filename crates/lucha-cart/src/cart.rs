//! # Cart Engine
//!
//! The authoritative cart instance: registry, persistence and bus behind
//! one handle.
//!
//! ## Mutation Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         add_item / update_qty / ...                    │
//! │                                                                         │
//! │   1. lock state                                                         │
//! │   2. registry mutation            (caller errors returned here)         │
//! │   3. summary → JSON → persistence (failures logged, absorbed)           │
//! │   4. queue cart:changed           (exactly once per call)               │
//! │   5. unlock                                                             │
//! │   6. deliver queued events in mutation order                            │
//! │   7. return summary                                                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! `update_qty` and `remove_item` on an id that is not in the cart change
//! nothing, so they neither persist nor emit.
//!
//! ## Thread Safety
//! `Cart` is a cheap `Clone` handle (`Arc` inside). Every operation takes the
//! state mutex, so mutations from several UI entry points or threads never
//! interleave, and their events reach observers in the same order.
//! Separate `create_cart` calls share nothing unless they are
//! pointed at the same backend.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use lucha_core::{
    CartSummary, ItemInput, LineItem, LineItemRegistry, Money, StorageMode, StorageModeChanged,
};
use lucha_store::PersistenceAdapter;
use tokio::runtime::Handle;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::error::CartResult;
use crate::events::{CartEvent, CartEventListener, ChangeBus, SubscriptionId, Ticket};
use crate::options::CartOptions;
use crate::sync::SyncSlot;

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

pub(crate) struct CartState {
    pub(crate) registry: LineItemRegistry,
    pub(crate) persistence: PersistenceAdapter,
}

impl CartState {
    pub(crate) fn summary(&self) -> CartSummary {
        self.registry.summary(self.persistence.mode())
    }

    /// Persists the current summary and returns it.
    fn commit(&mut self) -> CartSummary {
        let summary = self.summary();
        self.persistence.persist(summary.to_json());
        summary
    }
}

pub(crate) struct CartShared {
    pub(crate) key: String,
    pub(crate) state: Mutex<CartState>,
    pub(crate) bus: ChangeBus,
    pub(crate) sync: Mutex<SyncSlot>,
}

/// Builds an independent cart.
///
/// Never fails: unreachable storage degrades to memory and an unreadable
/// stored blob is ignored.
pub fn create_cart(options: CartOptions) -> Cart {
    Cart::new(options)
}

#[derive(Clone)]
pub struct Cart {
    shared: Arc<CartShared>,
}

impl Cart {
    /// See [`create_cart`].
    ///
    /// ## Construction Order
    /// 1. Open the medium and read the stored blob once
    /// 2. Restore it (announced if present)
    /// 3. Layer `initial_items`, persist, announce
    /// 4. Take the medium's change feed and start the listener when a
    ///    runtime is available
    pub fn new(options: CartOptions) -> Self {
        let (persistence, restored) = PersistenceAdapter::open(options.persistence());

        let bus = ChangeBus::new();
        for listener in options.listeners {
            bus.subscribe(listener);
        }

        let mut state = CartState {
            registry: LineItemRegistry::new(),
            persistence,
        };
        let mut announcements = Vec::new();

        if let Some(raw) = restored {
            match CartSummary::from_json(&raw) {
                Ok(summary) => {
                    state.registry.replace_all(summary.items);
                    info!(lines = state.registry.len(), "Cart restored from storage");
                    announcements.push(state.summary());
                }
                Err(e) => warn!(error = %e, "Ignoring unreadable stored cart"),
            }
        }

        if !options.initial_items.is_empty() {
            state.registry.layer(options.initial_items);
            announcements.push(state.commit());
        }

        let subscription = state.persistence.subscribe();
        let shared = Arc::new(CartShared {
            key: options.key,
            state: Mutex::new(state),
            bus,
            sync: Mutex::new(SyncSlot::new(subscription)),
        });

        for summary in &announcements {
            shared.bus.emit_changed(summary);
        }

        if options.sync_listener && Handle::try_current().is_ok() {
            shared.start_listener();
        }

        Cart { shared }
    }

    fn state(&self) -> MutexGuard<'_, CartState> {
        lock(&self.shared.state)
    }

    /// Persists the current state and queues its announcement while the
    /// lock is still held.
    fn commit_and_queue(&self, state: &mut CartState) -> (CartSummary, Ticket) {
        let summary = state.commit();
        let ticket = self.shared.bus.queue(CartEvent::Changed(summary.clone()));
        (summary, ticket)
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Adds `qty` of an item, merging with an existing line by sum.
    ///
    /// Always persists and announces, including when nothing changed (a new
    /// id with `qty <= 0`).
    ///
    /// ## Errors
    /// `CartError::Core` for a blank id or a negative explicit price. The
    /// cart is untouched and nothing is announced.
    pub fn add_item(&self, item: &ItemInput, qty: i64) -> CartResult<CartSummary> {
        let (summary, ticket) = {
            let mut state = self.state();
            state.registry.add(item, qty)?;
            debug!(id = %item.id, qty, "Item added");
            self.commit_and_queue(&mut state)
        };
        self.shared.bus.deliver(ticket);
        Ok(summary)
    }

    /// Sets an absolute quantity; `qty <= 0` removes the line.
    pub fn update_qty(&self, id: &str, qty: i64) -> CartSummary {
        let (summary, ticket) = {
            let mut state = self.state();
            if !state.registry.update_qty(id, qty) {
                debug!(id = %id, "update_qty on absent id ignored");
                return state.summary();
            }
            debug!(id = %id, qty, "Quantity set");
            self.commit_and_queue(&mut state)
        };
        self.shared.bus.deliver(ticket);
        summary
    }

    pub fn remove_item(&self, id: &str) -> CartSummary {
        let (summary, ticket) = {
            let mut state = self.state();
            if !state.registry.remove(id) {
                debug!(id = %id, "remove_item on absent id ignored");
                return state.summary();
            }
            debug!(id = %id, "Item removed");
            self.commit_and_queue(&mut state)
        };
        self.shared.bus.deliver(ticket);
        summary
    }

    pub fn clear_cart(&self) -> CartSummary {
        let (summary, ticket) = {
            let mut state = self.state();
            state.registry.clear();
            debug!("Cart cleared");
            self.commit_and_queue(&mut state)
        };
        self.shared.bus.deliver(ticket);
        summary
    }

    /// Replaces every line with the lines of `summary` (never merges).
    ///
    /// Lines with `qty <= 0` or a blank id are dropped; negative prices
    /// become 0.
    pub fn restore_from_summary(&self, incoming: &CartSummary) -> CartSummary {
        let (summary, ticket) = {
            let mut state = self.state();
            state.registry.replace_all(incoming.items.iter().cloned());
            info!(lines = state.registry.len(), "Cart restored from summary");
            self.commit_and_queue(&mut state)
        };
        self.shared.bus.deliver(ticket);
        summary
    }

    /// [`restore_from_summary`](Self::restore_from_summary) from a snapshot.
    ///
    /// ## Errors
    /// `CoreError::MalformedSummary` if `raw` is not a summary (including a
    /// missing `items` array). The cart is untouched.
    pub fn restore_from_json(&self, raw: &str) -> CartResult<CartSummary> {
        let summary = CartSummary::from_json(raw)?;
        Ok(self.restore_from_summary(&summary))
    }

    /// Moves the cart to another durable medium.
    ///
    /// Announces `StorageModeChanged`, then `Changed`. If the target medium
    /// refuses the write the cart carries on in memory and the announced
    /// mode is `memory`.
    ///
    /// ## Errors
    /// `CartError::Storage` when `mode` cannot be selected at runtime or has
    /// no medium configured. Nothing changes and nothing is announced.
    pub fn set_storage_mode(&self, mode: StorageMode) -> CartResult<CartSummary> {
        let (summary, subscription, ticket) = {
            let mut state = self.state();
            let raw = state.registry.summary(mode).to_json();
            let actual = state.persistence.switch_mode(mode, &raw)?;
            let summary = if actual == mode {
                state.summary()
            } else {
                // The fallback shim was seeded with the target mode; rewrite it.
                state.commit()
            };
            let bus = &self.shared.bus;
            bus.queue(CartEvent::StorageModeChanged(StorageModeChanged {
                mode: summary.storage_mode,
            }));
            let ticket = bus.queue(CartEvent::Changed(summary.clone()));
            (summary, state.persistence.subscribe(), ticket)
        };

        self.shared.resubscribe(subscription);
        self.shared.bus.deliver(ticket);
        Ok(summary)
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Independent copies of every line.
    pub fn items(&self) -> Vec<LineItem> {
        self.state().registry.items()
    }

    pub fn total_qty(&self) -> i64 {
        self.state().registry.total_qty()
    }

    pub fn subtotal_cents(&self) -> i64 {
        self.state().registry.subtotal_cents()
    }

    /// Subtotal in currency units, for display only.
    pub fn subtotal(&self) -> f64 {
        self.subtotal_money().to_major_units()
    }

    pub fn subtotal_money(&self) -> Money {
        self.state().registry.subtotal()
    }

    pub fn summary(&self) -> CartSummary {
        self.state().summary()
    }

    /// The current summary as persisted JSON.
    pub fn snapshot(&self) -> String {
        self.summary().to_json()
    }

    pub fn storage_mode(&self) -> StorageMode {
        self.state().persistence.mode()
    }

    pub fn is_empty(&self) -> bool {
        self.state().registry.is_empty()
    }

    // =========================================================================
    // Notifications
    // =========================================================================

    pub fn subscribe(&self, listener: Arc<dyn CartEventListener>) -> SubscriptionId {
        self.shared.bus.subscribe(listener)
    }

    pub fn on_change<F>(&self, f: F) -> SubscriptionId
    where
        F: Fn(&CartSummary) + Send + Sync + 'static,
    {
        self.shared.bus.on_change(f)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.shared.bus.unsubscribe(id)
    }

    /// Channel of every event emitted from now on.
    pub fn events(&self) -> broadcast::Receiver<CartEvent> {
        self.shared.bus.receiver()
    }

    // =========================================================================
    // Sync & Persistence
    // =========================================================================

    /// Applies queued changes made by other contexts. Returns how many were
    /// applied. Does nothing while the background listener owns the feed.
    pub fn pump_external(&self) -> usize {
        self.shared.pump()
    }

    /// Starts the background listener. Returns false without a tokio
    /// runtime or when the medium has no change feed.
    pub fn start_sync(&self) -> bool {
        self.shared.start_listener()
    }

    pub fn stop_sync(&self) {
        self.shared.stop_listener()
    }

    pub fn is_syncing(&self) -> bool {
        self.shared.is_syncing()
    }

    /// Writes a pending debounced write now. Returns true if there was one.
    pub fn flush(&self) -> bool {
        self.state().persistence.flush()
    }
}

impl fmt::Debug for Cart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state();
        f.debug_struct("Cart")
            .field("key", &self.shared.key)
            .field("lines", &state.registry.len())
            .field("persistence", &state.persistence)
            .field("bus", &self.shared.bus)
            .finish()
    }
}

//! # Cross-Context Sync
//!
//! Reconciles this cart when another context rewrites the shared blob.
//!
//! ## Reconciliation
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     External Change Handling                            │
//! │                                                                         │
//! │  StorageNotice::Changed(Some(raw)) ──► parse summary ──┐               │
//! │  StorageNotice::Changed(None)      ──► empty cart    ──┤               │
//! │  StorageNotice::Lagged(_)          ──► re-read medium ─┤               │
//! │                                                         ▼               │
//! │                          cancel a not-yet-started local write           │
//! │                          registry.replace_all(items)   (never merge)   │
//! │                          emit cart:changed                              │
//! │                                                                         │
//! │  NOT DONE: persist. The change came from the medium; writing it back  │
//! │  would echo to every other context.                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Notices are delivered either by [`Cart::pump_external`](crate::Cart::pump_external)
//! (synchronous drain, no runtime needed) or by a background task started
//! with [`Cart::start_sync`](crate::Cart::start_sync).

use std::sync::{Arc, Weak};

use lucha_core::CartSummary;
use lucha_store::{StorageNotice, StorageSubscription};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cart::{lock, CartShared};
use crate::events::CartEvent;

/// Where the change feed currently lives: parked here for pumping, or moved
/// into the background task.
#[derive(Debug, Default)]
pub(crate) struct SyncSlot {
    subscription: Option<StorageSubscription>,
    task: Option<JoinHandle<()>>,
}

impl SyncSlot {
    pub(crate) fn new(subscription: Option<StorageSubscription>) -> Self {
        SyncSlot {
            subscription,
            task: None,
        }
    }

    fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for SyncSlot {
    fn drop(&mut self) {
        self.stop();
    }
}

impl CartShared {
    /// Applies one external notice. Returns false when it was ignored.
    pub(crate) fn apply_external(&self, notice: StorageNotice) -> bool {
        let (summary, ticket) = {
            let mut state = lock(&self.state);

            let raw = match notice {
                StorageNotice::Changed(event) => event.new_value,
                StorageNotice::Lagged(missed) => {
                    debug!(missed, "Sync lagged, re-reading storage");
                    state.persistence.read()
                }
            };

            let items = match raw {
                Some(raw) => match CartSummary::from_json(&raw) {
                    Ok(summary) => summary.items,
                    Err(e) => {
                        warn!(error = %e, "Ignoring unreadable external cart change");
                        return false;
                    }
                },
                None => Vec::new(),
            };

            // Drops a local burst still waiting for its timer. A write the
            // timer has already started lands anyway (last writer wins).
            state.persistence.cancel_pending();
            state.registry.replace_all(items);
            let summary = state.summary();
            let ticket = self.bus.queue(CartEvent::Changed(summary.clone()));
            (summary, ticket)
        };

        debug!(total_qty = summary.total_qty, "Cart reconciled from external change");
        self.bus.deliver(ticket);
        true
    }

    /// Drains whatever notices are queued. Returns how many were applied.
    pub(crate) fn pump(&self) -> usize {
        let mut applied = 0;
        loop {
            // Take one notice at a time so the slot lock is never held
            // while listeners run.
            let notice = {
                let mut slot = lock(&self.sync);
                match slot.subscription.as_mut() {
                    Some(subscription) => subscription.try_next(),
                    None => None,
                }
            };
            match notice {
                Some(notice) => {
                    if self.apply_external(notice) {
                        applied += 1;
                    }
                }
                None => return applied,
            }
        }
    }

    pub(crate) fn start_listener(self: &Arc<Self>) -> bool {
        let mut slot = lock(&self.sync);
        if slot.is_running() {
            return true;
        }

        let Ok(handle) = Handle::try_current() else {
            warn!("No async runtime, cross-context sync needs pump_external");
            return false;
        };
        let Some(mut subscription) = slot.subscription.take() else {
            debug!("Storage medium has no change feed");
            return false;
        };

        let weak: Weak<CartShared> = Arc::downgrade(self);
        slot.task = Some(handle.spawn(async move {
            while let Some(notice) = subscription.next().await {
                let Some(shared) = weak.upgrade() else {
                    break;
                };
                shared.apply_external(notice);
            }
            debug!("Cross-context listener stopped");
        }));

        info!(key = %self.key, "Cross-context sync started");
        true
    }

    /// Stops the background task. The feed it consumed is replaced with a
    /// fresh one so pumping keeps working.
    pub(crate) fn stop_listener(&self) {
        let fresh = lock(&self.state).persistence.subscribe();
        let mut slot = lock(&self.sync);
        if slot.task.is_some() {
            slot.stop();
            slot.subscription = fresh;
        }
    }

    pub(crate) fn is_syncing(&self) -> bool {
        lock(&self.sync).is_running()
    }

    /// Installs the change feed of a new medium, restarting the listener
    /// if one was running.
    pub(crate) fn resubscribe(self: &Arc<Self>, subscription: Option<StorageSubscription>) {
        let was_running = {
            let mut slot = lock(&self.sync);
            let was_running = slot.is_running();
            slot.stop();
            slot.subscription = subscription;
            was_running
        };
        if was_running {
            self.start_listener();
        }
    }
}

//! # Change Notification Bus
//!
//! Each cart owns one bus. Observers register explicitly; nothing is global.
//!
//! ## Delivery
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Change Notification Bus                              │
//! │                                                                         │
//! │  lock state ──► mutate ──► persist ──► queue event ──► unlock           │
//! │                                             │                           │
//! │                                             ▼                           │
//! │                      deliver: one thread drains the queue in order      │
//! │                         ┌────────────────────┴───────────────┐          │
//! │                         ▼                                    ▼          │
//! │              CartEventListener (sync)          broadcast::Receiver     │
//! │              called in registration order      (async consumers)       │
//! │                                                                         │
//! │  Mode switch: StorageModeChanged first, then Changed.                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Events are queued while the cart lock is still held, so observers see
//! them in the same order the mutations happened and the last summary an
//! observer receives is the cart's current state.
//!
//! Listeners run after the cart lock is released, so they may read the cart
//! (or even mutate it) from inside the callback. A mutation made from a
//! listener is delivered after that listener returns. A mutation on another
//! thread waits until its own event has been delivered, so listeners must
//! not block on such a thread.

use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::thread::{self, ThreadId};

use lucha_core::{CartSummary, StorageModeChanged};
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::trace;

use crate::cart::lock;

/// Buffered events per channel receiver before it starts lagging.
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Something the cart announces.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "detail")]
pub enum CartEvent {
    #[serde(rename = "cart:changed")]
    Changed(CartSummary),
    #[serde(rename = "cart:storageModeChanged")]
    StorageModeChanged(StorageModeChanged),
}

impl CartEvent {
    /// Event name as seen by UI bridges.
    pub fn name(&self) -> &'static str {
        match self {
            CartEvent::Changed(_) => "cart:changed",
            CartEvent::StorageModeChanged(_) => "cart:storageModeChanged",
        }
    }
}

/// Observer of one cart.
pub trait CartEventListener: Send + Sync {
    fn cart_changed(&self, summary: &CartSummary);

    fn storage_mode_changed(&self, _event: &StorageModeChanged) {}
}

/// Listener that ignores everything.
pub struct NoOpListener;

impl CartEventListener for NoOpListener {
    fn cart_changed(&self, _summary: &CartSummary) {}
}

struct FnListener<F>(F);

impl<F> CartEventListener for FnListener<F>
where
    F: Fn(&CartSummary) + Send + Sync,
{
    fn cart_changed(&self, summary: &CartSummary) {
        (self.0)(summary)
    }
}

/// Handle returned by registration, used to unregister.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Position of a queued event; delivery waits for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) struct Ticket(u64);

#[derive(Default)]
struct Delivery {
    queue: VecDeque<(Ticket, CartEvent)>,
    last_queued: u64,
    last_delivered: u64,
    draining: Option<ThreadId>,
}

/// Clears the draining mark even if a listener panics.
struct Draining<'a>(&'a ChangeBus);

impl Drop for Draining<'_> {
    fn drop(&mut self) {
        lock(&self.0.delivery).draining = None;
        self.0.delivered.notify_all();
    }
}

pub struct ChangeBus {
    next_id: AtomicU64,
    listeners: Mutex<Vec<(SubscriptionId, Arc<dyn CartEventListener>)>>,
    channel: broadcast::Sender<CartEvent>,
    delivery: Mutex<Delivery>,
    delivered: Condvar,
}

impl ChangeBus {
    pub fn new() -> Self {
        let (channel, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        ChangeBus {
            next_id: AtomicU64::new(1),
            listeners: Mutex::new(Vec::new()),
            channel,
            delivery: Mutex::new(Delivery::default()),
            delivered: Condvar::new(),
        }
    }

    pub fn subscribe(&self, listener: Arc<dyn CartEventListener>) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        lock(&self.listeners).push((id, listener));
        id
    }

    pub fn on_change<F>(&self, f: F) -> SubscriptionId
    where
        F: Fn(&CartSummary) + Send + Sync + 'static,
    {
        self.subscribe(Arc::new(FnListener(f)))
    }

    /// Returns false if `id` was not registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut listeners = lock(&self.listeners);
        let before = listeners.len();
        listeners.retain(|(existing, _)| *existing != id);
        listeners.len() != before
    }

    pub fn listener_count(&self) -> usize {
        lock(&self.listeners).len()
    }

    /// A receiver of every event emitted from now on.
    pub fn receiver(&self) -> broadcast::Receiver<CartEvent> {
        self.channel.subscribe()
    }

    // Copied out so a listener can (un)register while being called.
    fn listeners(&self) -> Vec<Arc<dyn CartEventListener>> {
        lock(&self.listeners)
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect()
    }

    /// Queues and delivers a change in one step. Cart mutations queue
    /// under the cart lock and deliver after releasing it instead.
    pub fn emit_changed(&self, summary: &CartSummary) {
        let ticket = self.queue(CartEvent::Changed(summary.clone()));
        self.deliver(ticket);
    }

    pub fn emit_mode_changed(&self, event: StorageModeChanged) {
        let ticket = self.queue(CartEvent::StorageModeChanged(event));
        self.deliver(ticket);
    }

    /// Fixes the delivery position of `event`. Call while the state the
    /// event describes is still locked.
    pub(crate) fn queue(&self, event: CartEvent) -> Ticket {
        let mut delivery = lock(&self.delivery);
        delivery.last_queued += 1;
        let ticket = Ticket(delivery.last_queued);
        delivery.queue.push_back((ticket, event));
        ticket
    }

    /// Returns once `ticket` has been delivered, draining the queue on this
    /// thread when no other thread is.
    ///
    /// Called from inside a listener it returns immediately; the outer drain
    /// delivers the event after the listener returns.
    pub(crate) fn deliver(&self, ticket: Ticket) {
        let me = thread::current().id();
        let mut delivery = lock(&self.delivery);
        loop {
            if delivery.last_delivered >= ticket.0 {
                return;
            }
            match delivery.draining {
                Some(owner) if owner == me => return,
                Some(_) => {
                    delivery = self
                        .delivered
                        .wait(delivery)
                        .unwrap_or_else(PoisonError::into_inner);
                }
                None => {
                    delivery.draining = Some(me);
                    drop(delivery);
                    let _draining = Draining(self);
                    self.drain();
                    return;
                }
            }
        }
    }

    fn drain(&self) {
        loop {
            let next = lock(&self.delivery).queue.pop_front();
            let Some((ticket, event)) = next else {
                return;
            };
            self.dispatch(&event);
            lock(&self.delivery).last_delivered = ticket.0;
            self.delivered.notify_all();
        }
    }

    fn dispatch(&self, event: &CartEvent) {
        match event {
            CartEvent::Changed(summary) => {
                trace!(total_qty = summary.total_qty, "cart:changed");
                for listener in self.listeners() {
                    listener.cart_changed(summary);
                }
            }
            CartEvent::StorageModeChanged(changed) => {
                trace!(mode = %changed.mode, "cart:storageModeChanged");
                for listener in self.listeners() {
                    listener.storage_mode_changed(changed);
                }
            }
        }
        let _ = self.channel.send(event.clone());
    }
}

impl Default for ChangeBus {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ChangeBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeBus")
            .field("listeners", &self.listener_count())
            .field("receivers", &self.channel.receiver_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lucha_core::StorageMode;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_listeners_receive_in_order() {
        let bus = ChangeBus::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let first = Arc::clone(&seen);
        bus.on_change(move |_| first.lock().unwrap().push("first"));
        let second = Arc::clone(&seen);
        bus.on_change(move |_| second.lock().unwrap().push("second"));

        bus.emit_changed(&CartSummary::empty(StorageMode::Memory));
        assert_eq!(*seen.lock().unwrap(), vec!["first", "second"]);
    }

    #[test]
    fn test_unsubscribe() {
        let bus = ChangeBus::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let id = bus.on_change(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        bus.emit_changed(&CartSummary::empty(StorageMode::Memory));
        assert!(bus.unsubscribe(id));
        assert!(!bus.unsubscribe(id));
        bus.emit_changed(&CartSummary::empty(StorageMode::Memory));

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(bus.listener_count(), 0);
    }

    #[test]
    fn test_channel_receives_events() {
        let bus = ChangeBus::new();
        let mut rx = bus.receiver();

        bus.emit_mode_changed(StorageModeChanged { mode: StorageMode::Session });
        bus.emit_changed(&CartSummary::empty(StorageMode::Session));

        assert_eq!(rx.try_recv().unwrap().name(), "cart:storageModeChanged");
        assert_eq!(rx.try_recv().unwrap().name(), "cart:changed");
    }

    #[test]
    fn test_emit_from_listener_runs_after_it() {
        let bus = Arc::new(ChangeBus::new());
        let seen = Arc::new(Mutex::new(Vec::new()));

        let weak = Arc::downgrade(&bus);
        let sink = Arc::clone(&seen);
        bus.on_change(move |summary| {
            sink.lock().unwrap().push(summary.storage_mode.to_string());
            if summary.storage_mode == StorageMode::Memory {
                if let Some(bus) = weak.upgrade() {
                    bus.emit_changed(&CartSummary::empty(StorageMode::Session));
                }
                sink.lock().unwrap().push("returned".to_string());
            }
        });

        bus.emit_changed(&CartSummary::empty(StorageMode::Memory));
        assert_eq!(*seen.lock().unwrap(), vec!["memory", "returned", "session"]);
    }

    #[test]
    fn test_delivery_recovers_from_panicking_listener() {
        let bus = ChangeBus::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        bus.on_change(move |_| {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                panic!("listener failure");
            }
        });

        let first = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            bus.emit_changed(&CartSummary::empty(StorageMode::Memory));
        }));
        assert!(first.is_err());

        bus.emit_changed(&CartSummary::empty(StorageMode::Memory));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_emit_without_observers() {
        ChangeBus::new().emit_changed(&CartSummary::empty(StorageMode::Memory));
    }

    #[test]
    fn test_event_json_shape() {
        let event = CartEvent::StorageModeChanged(StorageModeChanged { mode: StorageMode::Local });
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"type": "cart:storageModeChanged", "detail": {"mode": "local"}})
        );
    }
}

//! # Line Item Registry
//!
//! The keyed collection of order lines and every total derived from it.
//!
//! ## Registry Operations
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Registry Operations                                  │
//! │                                                                         │
//! │  Operation            Existing id               Unknown id              │
//! │  ─────────            ───────────               ──────────              │
//! │                                                                         │
//! │  add(item, q)         qty += q (merge by sum)   create if q > 0         │
//! │                       drop line if qty <= 0     else nothing            │
//! │                                                                         │
//! │  update_qty(id, q)    qty = q (overwrite)       nothing                 │
//! │                       drop line if q <= 0                               │
//! │                                                                         │
//! │  remove(id)           drop line                 nothing                 │
//! │                                                                         │
//! │  clear()              drop every line                                   │
//! │                                                                         │
//! │  replace_all(items)   full replace, never merge                         │
//! │                                                                         │
//! │  NOTE: No line ever exists with qty == 0. Totals are recomputed on     │
//! │        every read; nothing caches them.                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Lines keep insertion order, so summaries and snapshots are stable.

use tracing::{debug, warn};

use crate::error::CoreResult;
use crate::money::Money;
use crate::types::{CartSummary, ItemInput, LineItem, StorageMode};
use crate::validation::validate_item_input;

/// The authoritative in-memory store of order lines.
///
/// ## Invariants
/// - Lines are unique by `id` (adding the same id merges quantities)
/// - Every line has `qty > 0`
/// - Every line has `price_cents >= 0`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LineItemRegistry {
    items: Vec<LineItem>,
}

impl LineItemRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        LineItemRegistry { items: Vec::new() }
    }

    /// Creates a registry holding the given lines (normalized).
    pub fn from_items(items: impl IntoIterator<Item = LineItem>) -> Self {
        let mut registry = Self::new();
        registry.layer(items);
        registry
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.items.iter().position(|i| i.id == id)
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Adds `qty` of an item, merging with an existing line by sum.
    ///
    /// ## Behavior
    /// - Existing id: quantity is added; a result <= 0 deletes the line.
    ///   Name and price stay as they were when the line was created.
    /// - New id: created when `qty > 0`, otherwise nothing happens.
    ///
    /// ## Errors
    /// Blank id or explicit negative `priceCents`.
    pub fn add(&mut self, item: &ItemInput, qty: i64) -> CoreResult<()> {
        validate_item_input(item)?;

        if let Some(pos) = self.position(&item.id) {
            let new_qty = self.items[pos].qty.saturating_add(qty);
            if new_qty <= 0 {
                self.items.remove(pos);
                debug!(id = %item.id, "Line dropped by merge");
            } else {
                self.items[pos].qty = new_qty;
            }
            return Ok(());
        }

        if qty <= 0 {
            return Ok(());
        }

        let mut price_cents = item.resolve_price_cents();
        if price_cents < 0 {
            warn!(id = %item.id, price_cents, "Normalized price is negative, using 0");
            price_cents = 0;
        }

        self.items.push(LineItem {
            id: item.id.clone(),
            name: item.display_name().to_string(),
            price_cents,
            qty,
            meta: item.meta.clone(),
        });
        Ok(())
    }

    /// Sets an absolute quantity. Returns false when the id is unknown.
    ///
    /// `qty <= 0` deletes the line.
    pub fn update_qty(&mut self, id: &str, qty: i64) -> bool {
        let Some(pos) = self.position(id) else {
            return false;
        };

        if qty <= 0 {
            self.items.remove(pos);
        } else {
            self.items[pos].qty = qty;
        }
        true
    }

    /// Deletes a line. Returns false when the id is unknown.
    pub fn remove(&mut self, id: &str) -> bool {
        let initial_len = self.items.len();
        self.items.retain(|i| i.id != id);
        self.items.len() != initial_len
    }

    /// Drops every line.
    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Replaces the whole registry with `items` (never merges).
    pub fn replace_all(&mut self, items: impl IntoIterator<Item = LineItem>) {
        self.items.clear();
        self.layer(items);
    }

    /// Writes `items` over the current lines, one id at a time.
    ///
    /// An id already present is overwritten in place; lines with `qty <= 0`
    /// delete their id; blank ids are skipped; negative prices become 0.
    pub fn layer(&mut self, items: impl IntoIterator<Item = LineItem>) {
        for mut line in items {
            if line.id.trim().is_empty() {
                debug!("Skipping line without id");
                continue;
            }
            if line.qty <= 0 {
                self.remove(&line.id);
                continue;
            }
            if line.price_cents < 0 {
                line.price_cents = 0;
            }

            match self.position(&line.id) {
                Some(pos) => self.items[pos] = line,
                None => self.items.push(line),
            }
        }
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Independent copies of every line.
    pub fn items(&self) -> Vec<LineItem> {
        self.items.clone()
    }

    pub fn get(&self, id: &str) -> Option<&LineItem> {
        self.items.iter().find(|i| i.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.position(id).is_some()
    }

    /// Number of distinct lines.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Σ qty.
    pub fn total_qty(&self) -> i64 {
        self.items.iter().fold(0i64, |acc, i| acc.saturating_add(i.qty))
    }

    /// Σ price × qty, integer arithmetic.
    pub fn subtotal(&self) -> Money {
        self.items.iter().map(LineItem::line_total).sum()
    }

    pub fn subtotal_cents(&self) -> i64 {
        self.subtotal().cents()
    }

    /// Builds the read model.
    pub fn summary(&self, storage_mode: StorageMode) -> CartSummary {
        CartSummary::from_items(self.items(), storage_mode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{CoreError, ValidationError};

    fn taco(price_cents: i64) -> ItemInput {
        ItemInput::new("t1").name("California Taco").price_cents(price_cents)
    }

    fn assert_invariants(registry: &LineItemRegistry) {
        let items = registry.items();
        assert!(items.iter().all(|i| i.qty > 0));
        assert_eq!(registry.total_qty(), items.iter().map(|i| i.qty).sum::<i64>());
        assert_eq!(
            registry.subtotal_cents(),
            items.iter().map(|i| i.price_cents * i.qty).sum::<i64>()
        );
    }

    #[test]
    fn test_add_and_merge_scenario() {
        let mut registry = LineItemRegistry::new();

        registry.add(&taco(500), 2).unwrap();
        assert_eq!(registry.total_qty(), 2);
        assert_eq!(registry.subtotal_cents(), 1000);

        registry.add(&taco(500), 1).unwrap();
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.total_qty(), 3);
        assert_eq!(registry.subtotal_cents(), 1500);

        assert!(registry.update_qty("t1", 1));
        assert_eq!(registry.total_qty(), 1);
        assert_eq!(registry.subtotal_cents(), 500);

        assert!(registry.update_qty("t1", 0));
        assert_eq!(registry.total_qty(), 0);
        assert_eq!(registry.subtotal_cents(), 0);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_merge_law() {
        let mut split = LineItemRegistry::new();
        split.add(&taco(350), 2).unwrap();
        split.add(&taco(350), 5).unwrap();

        let mut once = LineItemRegistry::new();
        once.add(&taco(350), 7).unwrap();

        assert_eq!(split.summary(StorageMode::Memory), once.summary(StorageMode::Memory));
    }

    #[test]
    fn test_negative_merge_drops_line() {
        let mut registry = LineItemRegistry::new();
        registry.add(&taco(500), 2).unwrap();
        registry.add(&taco(500), -5).unwrap();
        assert!(!registry.contains("t1"));
        assert_invariants(&registry);
    }

    #[test]
    fn test_add_new_with_non_positive_qty_is_noop() {
        let mut registry = LineItemRegistry::new();
        registry.add(&taco(500), 0).unwrap();
        registry.add(&taco(500), -1).unwrap();
        assert!(registry.is_empty());
    }

    #[test]
    fn test_add_requires_id() {
        let mut registry = LineItemRegistry::new();
        let err = registry.add(&ItemInput::new("").price_cents(100), 1).unwrap_err();
        assert!(matches!(
            err,
            CoreError::Validation(ValidationError::Required { .. })
        ));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_decimal_price_scenario() {
        let mut registry = LineItemRegistry::new();
        registry.add(&ItemInput::new("a").price(9.99), 2).unwrap();
        let summary = registry.summary(StorageMode::Local);
        assert_eq!(summary.subtotal_cents, 1998);
        assert!((summary.subtotal - 19.98).abs() < 1e-9);
    }

    #[test]
    fn test_merge_keeps_original_price_and_name() {
        let mut registry = LineItemRegistry::new();
        registry.add(&taco(500), 1).unwrap();
        registry
            .add(&ItemInput::new("t1").name("Renamed").price_cents(900), 1)
            .unwrap();

        let line = registry.get("t1").unwrap();
        assert_eq!(line.price_cents, 500);
        assert_eq!(line.name, "California Taco");
        assert_eq!(line.qty, 2);
    }

    #[test]
    fn test_update_and_remove_unknown_are_noops() {
        let mut registry = LineItemRegistry::new();
        registry.add(&taco(500), 1).unwrap();

        assert!(!registry.update_qty("nope", 3));
        assert!(!registry.remove("nope"));
        assert_eq!(registry.total_qty(), 1);
    }

    #[test]
    fn test_zero_law() {
        let mut by_update = LineItemRegistry::new();
        by_update.add(&taco(500), 2).unwrap();
        by_update.add(&ItemInput::new("t2").price_cents(300), 1).unwrap();
        let mut by_remove = by_update.clone();

        by_update.update_qty("t1", 0);
        by_remove.remove("t1");

        assert_eq!(
            by_update.summary(StorageMode::Memory),
            by_remove.summary(StorageMode::Memory)
        );
    }

    #[test]
    fn test_clear() {
        let mut registry = LineItemRegistry::new();
        registry.add(&taco(500), 2).unwrap();
        registry.add(&ItemInput::new("t3").price_cents(400), 1).unwrap();

        registry.clear();
        assert!(registry.items().is_empty());
        assert_eq!(registry.subtotal_cents(), 0);
    }

    #[test]
    fn test_items_are_independent_copies() {
        let mut registry = LineItemRegistry::new();
        registry.add(&taco(500), 2).unwrap();

        let mut copy = registry.items();
        copy[0].qty = 99;
        assert_eq!(registry.get("t1").unwrap().qty, 2);
    }

    #[test]
    fn test_replace_all_is_full_replace() {
        let mut registry = LineItemRegistry::new();
        registry.add(&taco(500), 2).unwrap();

        registry.replace_all(vec![LineItem {
            id: "b".into(),
            name: "Burrito".into(),
            price_cents: 1200,
            qty: 1,
            meta: None,
        }]);

        assert!(!registry.contains("t1"));
        assert_eq!(registry.subtotal_cents(), 1200);
    }

    #[test]
    fn test_layer_normalizes_lines() {
        let line = |id: &str, price_cents: i64, qty: i64| LineItem {
            id: id.into(),
            name: id.into(),
            price_cents,
            qty,
            meta: None,
        };

        let mut registry = LineItemRegistry::new();
        registry.add(&taco(500), 2).unwrap();
        registry.layer(vec![
            line("t1", 500, 0),
            line("", 100, 1),
            line("neg", -50, 2),
            line("ok", 250, 1),
            line("ok", 250, 3),
        ]);

        assert!(!registry.contains("t1"));
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.get("neg").unwrap().price_cents, 0);
        assert_eq!(registry.get("ok").unwrap().qty, 3);
        assert_invariants(&registry);
    }

    #[test]
    fn test_many_decimal_items_stay_exact() {
        let mut registry = LineItemRegistry::new();
        for i in 0..1000 {
            registry
                .add(&ItemInput::new(format!("s{i}")).price(0.99), 1)
                .unwrap();
        }
        assert_eq!(registry.total_qty(), 1000);
        assert_eq!(registry.subtotal_cents(), 99_000);
        assert_invariants(&registry);
    }
}

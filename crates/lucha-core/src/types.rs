//! # Domain Types
//!
//! Core domain types shared by the engine, the storage layer and UI layers.
//!
//! ## Type Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │   ItemInput     │   │    LineItem     │   │  CartSummary    │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id             │──►│  id             │──►│  items[]        │       │
//! │  │  name / title   │   │  name           │   │  totalQty       │       │
//! │  │  priceCents?    │   │  priceCents     │   │  subtotalCents  │       │
//! │  │  price?         │   │  qty (> 0)      │   │  subtotal       │       │
//! │  │  meta           │   │  meta           │   │  storageMode    │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │   what callers send     what the registry     the only read shape      │
//! │                         owns                  anyone ever sees         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Field names on the wire are camelCase; the persisted blob and the change
//! event payload are the same `CartSummary` JSON.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::money::{to_cents, Money, PriceInput};

// =============================================================================
// Storage Mode
// =============================================================================

/// Which kind of medium the cart is persisting to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum StorageMode {
    /// Durable and visible to every other context on the same medium.
    #[default]
    Local,
    /// Durable, visible only to the current context (session).
    Session,
    /// A backend handed in by the caller (tests, embedding hosts).
    Injected,
    /// In-memory only. Either asked for, or the fallback when a durable
    /// medium could not be reached.
    Memory,
}

impl StorageMode {
    /// Returns true if this mode may be selected with a runtime switch.
    pub fn is_switchable(&self) -> bool {
        matches!(self, StorageMode::Local | StorageMode::Session)
    }

    /// Returns true if state in this mode outlives the process.
    pub fn is_durable(&self) -> bool {
        matches!(self, StorageMode::Local | StorageMode::Session)
    }
}

impl std::fmt::Display for StorageMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageMode::Local => write!(f, "local"),
            StorageMode::Session => write!(f, "session"),
            StorageMode::Injected => write!(f, "injected"),
            StorageMode::Memory => write!(f, "memory"),
        }
    }
}

impl std::str::FromStr for StorageMode {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "local" | "shared" => Ok(StorageMode::Local),
            "session" | "private" => Ok(StorageMode::Session),
            "injected" => Ok(StorageMode::Injected),
            "memory" => Ok(StorageMode::Memory),
            other => Err(CoreError::InvalidStorageMode(other.to_string())),
        }
    }
}

/// Payload of the "storage mode changed" signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct StorageModeChanged {
    pub mode: StorageMode,
}

// =============================================================================
// Line Item
// =============================================================================

/// One product id's aggregated quantity and price within the cart.
///
/// ## Invariants (while held by the registry)
/// - `qty > 0`: a line reaching zero is removed, never stored
/// - `price_cents >= 0`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct LineItem {
    /// Caller-supplied unique key.
    pub id: String,

    /// Display name (frozen at the time the line was created).
    #[serde(default)]
    pub name: String,

    /// Unit price in cents.
    #[serde(default)]
    #[ts(type = "number")]
    pub price_cents: i64,

    /// Quantity in cart.
    #[ts(type = "number")]
    pub qty: i64,

    /// Opaque caller data carried along untouched.
    #[serde(default)]
    #[ts(type = "unknown")]
    pub meta: Option<Value>,
}

impl LineItem {
    /// Unit price as Money.
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    /// Unit price × quantity.
    #[inline]
    pub fn line_total(&self) -> Money {
        self.price().multiply_quantity(self.qty)
    }
}

// =============================================================================
// Item Input
// =============================================================================

/// What a menu/catalog collaborator hands to `add_item`.
///
/// ## Example
/// ```rust
/// use lucha_core::ItemInput;
///
/// let taco = ItemInput::new("t1").name("California Taco").price_cents(500);
/// assert_eq!(taco.resolve_price_cents(), 500);
///
/// let from_menu: ItemInput =
///     serde_json::from_str(r#"{"id":"a","title":"Horchata","price":"$3.25"}"#).unwrap();
/// assert_eq!(from_menu.display_name(), "Horchata");
/// assert_eq!(from_menu.resolve_price_cents(), 325);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemInput {
    /// Required. A blank id is rejected by `add_item`.
    #[serde(default)]
    pub id: String,

    #[serde(default)]
    pub name: Option<String>,

    /// Some menu sources call it `title`.
    #[serde(default)]
    pub title: Option<String>,

    /// Explicit price in cents. Always wins over `price`.
    #[serde(default)]
    pub price_cents: Option<i64>,

    /// Price in currency units, normalized through [`to_cents`].
    #[serde(default)]
    pub price: Option<PriceInput>,

    #[serde(default)]
    pub meta: Option<Value>,
}

impl ItemInput {
    /// Creates an input with just an id.
    pub fn new(id: impl Into<String>) -> Self {
        ItemInput {
            id: id.into(),
            ..Default::default()
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn price_cents(mut self, cents: i64) -> Self {
        self.price_cents = Some(cents);
        self
    }

    pub fn price(mut self, price: impl Into<PriceInput>) -> Self {
        self.price = Some(price.into());
        self
    }

    pub fn meta(mut self, meta: Value) -> Self {
        self.meta = Some(meta);
        self
    }

    /// `priceCents` if present, else the normalized `price`, else 0.
    pub fn resolve_price_cents(&self) -> i64 {
        match (self.price_cents, &self.price) {
            (Some(cents), _) => cents,
            (None, Some(price)) => to_cents(price),
            (None, None) => 0,
        }
    }

    /// `name`, then `title`, then the id.
    pub fn display_name(&self) -> &str {
        [self.name.as_deref(), self.title.as_deref()]
            .into_iter()
            .flatten()
            .find(|s| !s.is_empty())
            .unwrap_or(self.id.as_str())
    }
}

// =============================================================================
// Cart Summary
// =============================================================================

/// The complete derived read model of the cart.
///
/// Returned by every query, carried by every "cart changed" signal and
/// persisted verbatim. The totals are recomputed from `items` every time a
/// summary is built; they are never stored independently.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CartSummary {
    pub items: Vec<LineItem>,

    #[serde(default)]
    #[ts(type = "number")]
    pub total_qty: i64,

    #[serde(default)]
    #[ts(type = "number")]
    pub subtotal_cents: i64,

    /// `subtotal_cents / 100`, for display.
    #[serde(default)]
    pub subtotal: f64,

    #[serde(default)]
    pub storage_mode: StorageMode,
}

impl CartSummary {
    /// Builds a summary, deriving every total from the items.
    pub fn from_items(items: Vec<LineItem>, storage_mode: StorageMode) -> Self {
        let total_qty = items.iter().fold(0i64, |acc, it| acc.saturating_add(it.qty));
        let subtotal: Money = items.iter().map(LineItem::line_total).sum();

        CartSummary {
            items,
            total_qty,
            subtotal_cents: subtotal.cents(),
            subtotal: subtotal.to_major_units(),
            storage_mode,
        }
    }

    /// An empty cart in the given mode.
    pub fn empty(storage_mode: StorageMode) -> Self {
        Self::from_items(Vec::new(), storage_mode)
    }

    /// Parses a serialized summary.
    ///
    /// Totals in the text are ignored and recomputed; only `items` matters.
    pub fn from_json(raw: &str) -> CoreResult<Self> {
        let parsed: CartSummary =
            serde_json::from_str(raw).map_err(|e| CoreError::MalformedSummary(e.to_string()))?;
        Ok(Self::from_items(parsed.items, parsed.storage_mode))
    }

    /// Serializes to the persisted JSON layout.
    pub fn to_json(&self) -> String {
        // A summary is plain data (strings, integers, finite floats, JSON
        // values); serialization cannot fail.
        serde_json::to_string(self).unwrap_or_else(|_| String::from("{\"items\":[]}"))
    }

    /// Number of distinct lines.
    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Subtotal as Money.
    pub fn subtotal_money(&self) -> Money {
        Money::from_cents(self.subtotal_cents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn line(id: &str, price_cents: i64, qty: i64) -> LineItem {
        LineItem {
            id: id.to_string(),
            name: id.to_string(),
            price_cents,
            qty,
            meta: None,
        }
    }

    #[test]
    fn test_storage_mode_parsing() {
        assert_eq!("local".parse::<StorageMode>().unwrap(), StorageMode::Local);
        assert_eq!("SESSION".parse::<StorageMode>().unwrap(), StorageMode::Session);
        assert_eq!("shared".parse::<StorageMode>().unwrap(), StorageMode::Local);
        assert_eq!("private".parse::<StorageMode>().unwrap(), StorageMode::Session);
        assert!("cookie".parse::<StorageMode>().is_err());
    }

    #[test]
    fn test_storage_mode_switchable() {
        assert!(StorageMode::Local.is_switchable());
        assert!(StorageMode::Session.is_switchable());
        assert!(!StorageMode::Injected.is_switchable());
        assert!(!StorageMode::Memory.is_switchable());
    }

    #[test]
    fn test_summary_totals_are_derived() {
        let summary =
            CartSummary::from_items(vec![line("a", 999, 2), line("b", 325, 1)], StorageMode::Local);
        assert_eq!(summary.total_qty, 3);
        assert_eq!(summary.subtotal_cents, 2323);
        assert!((summary.subtotal - 23.23).abs() < 1e-9);
        assert_eq!(summary.item_count(), 2);
    }

    #[test]
    fn test_summary_json_layout() {
        let summary = CartSummary::from_items(vec![line("t1", 500, 2)], StorageMode::Local);
        let value: Value = serde_json::from_str(&summary.to_json()).unwrap();

        assert_eq!(
            value,
            json!({
                "items": [{ "id": "t1", "name": "t1", "priceCents": 500, "qty": 2, "meta": null }],
                "totalQty": 2,
                "subtotalCents": 1000,
                "subtotal": 10.0,
                "storageMode": "local"
            })
        );
    }

    #[test]
    fn test_from_json_recomputes_totals() {
        let raw = r#"{"items":[{"id":"a","name":"A","priceCents":250,"qty":4,"meta":null}],
                      "totalQty":99,"subtotalCents":1,"subtotal":0.01,"storageMode":"session"}"#;
        let summary = CartSummary::from_json(raw).unwrap();
        assert_eq!(summary.total_qty, 4);
        assert_eq!(summary.subtotal_cents, 1000);
        assert_eq!(summary.storage_mode, StorageMode::Session);
    }

    #[test]
    fn test_from_json_requires_items() {
        assert!(CartSummary::from_json("{}").is_err());
        assert!(CartSummary::from_json("not json").is_err());
    }

    #[test]
    fn test_item_input_name_fallback() {
        assert_eq!(ItemInput::new("x").display_name(), "x");
        let mut titled = ItemInput::new("x");
        titled.title = Some("Elote".into());
        assert_eq!(titled.display_name(), "Elote");
        assert_eq!(titled.name("Street Corn").display_name(), "Street Corn");
    }

    #[test]
    fn test_item_input_price_resolution() {
        let explicit = ItemInput::new("a").price_cents(250).price(9.99);
        assert_eq!(explicit.resolve_price_cents(), 250);

        let normalized = ItemInput::new("a").price(9.99);
        assert_eq!(normalized.resolve_price_cents(), 999);

        assert_eq!(ItemInput::new("a").resolve_price_cents(), 0);
    }
}

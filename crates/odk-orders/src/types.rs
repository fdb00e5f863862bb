//! Entity and request/receipt types shared by every store backend.
//!
//! Identifiers are `i64` (BIGSERIAL in the Postgres backend). Prices are
//! integer micros; see [`crate::MICROS_SCALE`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Entities
// ---------------------------------------------------------------------------

/// A catalog product with its warehouse stock counter.
///
/// Invariant: `stock >= 0` at all times. The only code path that decrements
/// stock is the add-item operation, which checks availability first inside
/// the same transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: i64,
    /// Non-empty display name.
    pub name: String,
    /// Units available in the warehouse.
    pub stock: i64,
    /// Unit price in micros (1e-6 currency units).
    pub price_micros: i64,
    /// Owning category, if the product is filed anywhere.
    pub category_id: Option<i64>,
}

/// A client who owns orders. Never mutated by the core operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Client {
    pub id: i64,
    pub name: String,
    pub address: Option<String>,
}

/// Order header. Lines live in the association table, not embedded here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderSummary {
    pub id: i64,
    pub client_id: i64,
    pub created_at: DateTime<Utc>,
}

/// One `(order, product)` association with its cumulative quantity.
///
/// Invariants: at most one line per `(order_id, product_id)` pair (composite
/// key), and `quantity >= 1` — a line is created on the first add and only
/// ever incremented afterwards (removal is not part of this system).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub order_id: i64,
    pub product_id: i64,
    pub quantity: i64,
}

// ---------------------------------------------------------------------------
// Mutation request / receipt
// ---------------------------------------------------------------------------

/// Input to the add-item operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddItemRequest {
    pub order_id: i64,
    pub product_id: i64,
    /// Units to add. Must be strictly positive; the mutator rejects the
    /// request before any store access otherwise.
    pub quantity: i64,
}

/// Result of a committed add-item operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddItemReceipt {
    pub order_id: i64,
    pub product_id: i64,
    /// The line's cumulative quantity after this add.
    pub line_quantity: i64,
    /// Product stock remaining after the decrement.
    pub remaining_stock: i64,
}

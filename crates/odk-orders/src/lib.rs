//! odk-orders
//!
//! Domain core for OrderDesk:
//! - Entity types (product, client, order, order line) with integer-micros
//!   prices — no floats in money paths
//! - Category tree as an id-indexed arena
//! - The `OrderStore` backend contract
//! - The `OrderLineMutator` — the single choke-point for order mutation
//!
//! Pure domain logic plus the trait boundary; no SQL and no HTTP here.

pub mod catalog;
pub mod mutator;
pub mod store;

mod error;
mod types;

pub use catalog::{Category, CategoryArena};
pub use error::OrderError;
pub use mutator::OrderLineMutator;
pub use store::OrderStore;
pub use types::{AddItemReceipt, AddItemRequest, Client, OrderLine, OrderSummary, Product};

/// Price/cash scale: micros (1e-6 currency units).
pub const MICROS_SCALE: i64 = 1_000_000;

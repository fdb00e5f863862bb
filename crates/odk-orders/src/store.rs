//! Store backend contract.
//!
//! Backends (Postgres, in-memory) implement this trait; everything above it
//! — mutator, HTTP handlers, CLI — holds an `Arc<dyn OrderStore>` and never
//! knows the concrete type.
//!
//! # Atomicity contract
//!
//! `add_item` executes the full five-step mutation (load product, stock
//! check, load order, upsert line, decrement stock) as one atomic unit: on
//! any error the backend must leave every row unchanged. A partially
//! applied add (line updated but stock not decremented, or vice versa) must
//! never be observable, under any interleaving of concurrent calls.
//!
//! Backends acquire their own transaction per call and hold no locks
//! outside it. Concurrent adds against the same product must serialize so
//! that committed quantities never drive stock negative; adds against
//! different products or different orders must not block one another.

use async_trait::async_trait;

use crate::error::OrderError;
use crate::types::{AddItemReceipt, AddItemRequest, OrderLine, OrderSummary, Product};

/// Backend contract for the order/catalog store.
///
/// Implementations must be object-safe (`Arc<dyn OrderStore>`) and
/// `Send + Sync` so handlers can share one instance across tasks.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Short backend name for logs and the status endpoint
    /// (e.g. `"postgres"`, `"memory"`).
    fn name(&self) -> &'static str;

    /// Fetch a product by primary key.
    async fn product(&self, product_id: i64) -> Result<Product, OrderError>;

    /// Fetch an order header by primary key.
    async fn order(&self, order_id: i64) -> Result<OrderSummary, OrderError>;

    /// Look up the association row for `(order_id, product_id)`.
    /// `Ok(None)` when the order exists but has no such line.
    async fn find_line(
        &self,
        order_id: i64,
        product_id: i64,
    ) -> Result<Option<OrderLine>, OrderError>;

    /// All lines of an order, ordered by product id.
    async fn order_lines(&self, order_id: i64) -> Result<Vec<OrderLine>, OrderError>;

    /// Atomically add `req.quantity` units of a product to an order.
    ///
    /// The backend performs the full algorithm under one transaction and
    /// must report collisions with concurrent writers as
    /// [`OrderError::Conflict`]. The mutator rejects non-positive
    /// quantities before calling in, but backends refuse them too
    /// ([`OrderError::InvalidQuantity`]) so a direct store call can never
    /// inflate stock through a negative add.
    async fn add_item(&self, req: &AddItemRequest) -> Result<AddItemReceipt, OrderError>;
}

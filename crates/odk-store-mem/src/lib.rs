//! Deterministic in-memory `OrderStore` backend.
//!
//! Design decisions (kept intentionally simple/deterministic):
//! - All state lives in `BTreeMap`s behind one async mutex; each `add_item`
//!   runs its full read-check-write sequence inside a single critical
//!   section, which gives the same all-or-nothing observable behavior as
//!   the Postgres backend's transaction.
//! - Ids are assigned by the caller (fixtures) or by `next_*_id` counters
//!   in the seed helpers. No randomness, no wall-clock reads in `add_item`.
//! - Serializing every mutation through one mutex is acceptable at this
//!   backend's scale; it exists for router tests, unit tests, and demo
//!   mode, not production traffic.
//!
//! The memory backend never returns [`OrderError::Conflict`] — collisions
//! cannot happen under the mutex. The Postgres backend is where conflicts
//! are real.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use odk_orders::{
    AddItemReceipt, AddItemRequest, Category, CategoryArena, Client, OrderError, OrderLine,
    OrderStore, OrderSummary, Product, MICROS_SCALE,
};

#[derive(Debug, Default)]
struct Inner {
    categories: CategoryArena,
    clients: BTreeMap<i64, Client>,
    products: BTreeMap<i64, Product>,
    orders: BTreeMap<i64, OrderSummary>,
    /// (order_id, product_id) -> quantity. The composite key makes the
    /// at-most-one-line invariant structural.
    lines: BTreeMap<(i64, i64), i64>,
}

/// In-memory order/catalog store.
#[derive(Debug, Default)]
pub struct MemOrderStore {
    inner: Mutex<Inner>,
}

impl MemOrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store pre-loaded with the demo fixture: a two-level category tree,
    /// one client with an open order (id 1), and product 42 at stock 100,
    /// price 9.99.
    pub async fn with_demo_data() -> Self {
        let store = Self::new();
        store.seed_demo().await;
        store
    }

    // -- fixtures ----------------------------------------------------------

    pub async fn insert_category(&self, category: Category) -> Result<(), OrderError> {
        let mut inner = self.inner.lock().await;
        inner
            .categories
            .insert(category)
            .map_err(|detail| OrderError::Store { detail })
    }

    pub async fn insert_client(&self, client: Client) {
        let mut inner = self.inner.lock().await;
        inner.clients.insert(client.id, client);
    }

    pub async fn insert_product(&self, product: Product) {
        let mut inner = self.inner.lock().await;
        inner.products.insert(product.id, product);
    }

    pub async fn insert_order(&self, order: OrderSummary) {
        let mut inner = self.inner.lock().await;
        inner.orders.insert(order.id, order);
    }

    /// Idempotent: a second call on an already-seeded store is a no-op.
    pub async fn seed_demo(&self) {
        {
            let inner = self.inner.lock().await;
            if inner.categories.get(1).is_some() {
                return;
            }
        }

        let created_at: DateTime<Utc> = Utc::now();

        self.insert_category(Category {
            id: 1,
            name: "electronics".to_string(),
            parent_id: None,
        })
        .await
        .expect("demo category");
        self.insert_category(Category {
            id: 2,
            name: "accessories".to_string(),
            parent_id: Some(1),
        })
        .await
        .expect("demo category");

        self.insert_client(Client {
            id: 1,
            name: "Acme Retail".to_string(),
            address: Some("1 Warehouse Way".to_string()),
        })
        .await;

        self.insert_product(Product {
            id: 42,
            name: "USB-C cable".to_string(),
            stock: 100,
            price_micros: 9_990_000, // 9.99
            category_id: Some(2),
        })
        .await;
        self.insert_product(Product {
            id: 43,
            name: "Laptop stand".to_string(),
            stock: 25,
            price_micros: 49 * MICROS_SCALE,
            category_id: Some(2),
        })
        .await;

        self.insert_order(OrderSummary {
            id: 1,
            client_id: 1,
            created_at,
        })
        .await;
    }
}

#[async_trait]
impl OrderStore for MemOrderStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn product(&self, product_id: i64) -> Result<Product, OrderError> {
        let inner = self.inner.lock().await;
        inner
            .products
            .get(&product_id)
            .cloned()
            .ok_or(OrderError::ProductNotFound { product_id })
    }

    async fn order(&self, order_id: i64) -> Result<OrderSummary, OrderError> {
        let inner = self.inner.lock().await;
        inner
            .orders
            .get(&order_id)
            .cloned()
            .ok_or(OrderError::OrderNotFound { order_id })
    }

    async fn find_line(
        &self,
        order_id: i64,
        product_id: i64,
    ) -> Result<Option<OrderLine>, OrderError> {
        let inner = self.inner.lock().await;
        if !inner.orders.contains_key(&order_id) {
            return Err(OrderError::OrderNotFound { order_id });
        }
        Ok(inner
            .lines
            .get(&(order_id, product_id))
            .map(|&quantity| OrderLine {
                order_id,
                product_id,
                quantity,
            }))
    }

    async fn order_lines(&self, order_id: i64) -> Result<Vec<OrderLine>, OrderError> {
        let inner = self.inner.lock().await;
        if !inner.orders.contains_key(&order_id) {
            return Err(OrderError::OrderNotFound { order_id });
        }
        Ok(inner
            .lines
            .range((order_id, i64::MIN)..=(order_id, i64::MAX))
            .map(|(&(o, p), &quantity)| OrderLine {
                order_id: o,
                product_id: p,
                quantity,
            })
            .collect())
    }

    async fn add_item(&self, req: &AddItemRequest) -> Result<AddItemReceipt, OrderError> {
        // Backstop for callers that bypass the mutator; a negative quantity
        // must never inflate stock.
        if req.quantity <= 0 {
            return Err(OrderError::InvalidQuantity {
                quantity: req.quantity,
            });
        }

        let mut inner = self.inner.lock().await;

        // Same step order as the Postgres transaction: product, stock
        // check, order, upsert line, decrement stock. Nothing is written
        // until every check has passed, so an error leaves `inner` as it
        // was entered.
        let (available, remaining) = {
            let product =
                inner
                    .products
                    .get(&req.product_id)
                    .ok_or(OrderError::ProductNotFound {
                        product_id: req.product_id,
                    })?;
            (product.stock, product.stock - req.quantity)
        };
        if available < req.quantity {
            return Err(OrderError::InsufficientStock {
                product_id: req.product_id,
                available,
                requested: req.quantity,
            });
        }
        if !inner.orders.contains_key(&req.order_id) {
            return Err(OrderError::OrderNotFound {
                order_id: req.order_id,
            });
        }

        let line_quantity = {
            let entry = inner.lines.entry((req.order_id, req.product_id)).or_insert(0);
            *entry += req.quantity;
            *entry
        };
        if let Some(product) = inner.products.get_mut(&req.product_id) {
            product.stock = remaining;
        }

        Ok(AddItemReceipt {
            order_id: req.order_id,
            product_id: req.product_id,
            line_quantity,
            remaining_stock: remaining,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn add(order_id: i64, product_id: i64, quantity: i64) -> AddItemRequest {
        AddItemRequest {
            order_id,
            product_id,
            quantity,
        }
    }

    #[tokio::test]
    async fn example_scenario_accumulates_one_line() {
        let store = MemOrderStore::with_demo_data().await;

        let first = store.add_item(&add(1, 42, 3)).await.unwrap();
        assert_eq!(first.line_quantity, 3);
        assert_eq!(first.remaining_stock, 97);

        let second = store.add_item(&add(1, 42, 2)).await.unwrap();
        assert_eq!(second.line_quantity, 5);
        assert_eq!(second.remaining_stock, 95);

        let lines = store.order_lines(1).await.unwrap();
        assert_eq!(
            lines,
            vec![OrderLine {
                order_id: 1,
                product_id: 42,
                quantity: 5
            }]
        );
        assert_eq!(store.product(42).await.unwrap().stock, 95);
    }

    #[tokio::test]
    async fn seed_demo_twice_is_a_no_op() {
        let store = MemOrderStore::with_demo_data().await;
        store.add_item(&add(1, 42, 3)).await.unwrap();

        // Re-seeding must neither panic on duplicate ids nor reset state.
        store.seed_demo().await;

        assert_eq!(store.product(42).await.unwrap().stock, 97);
        assert_eq!(store.find_line(1, 42).await.unwrap().unwrap().quantity, 3);
    }

    #[tokio::test]
    async fn missing_order_or_product_mutates_nothing() {
        let store = MemOrderStore::with_demo_data().await;

        let err = store.add_item(&add(999, 42, 1)).await.unwrap_err();
        assert_eq!(err, OrderError::OrderNotFound { order_id: 999 });

        let err = store.add_item(&add(1, 999, 1)).await.unwrap_err();
        assert_eq!(err, OrderError::ProductNotFound { product_id: 999 });

        assert_eq!(store.product(42).await.unwrap().stock, 100);
        assert!(store.order_lines(1).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn insufficient_stock_is_rejected_without_mutation() {
        let store = MemOrderStore::new();
        store
            .insert_product(Product {
                id: 7,
                name: "scarce".to_string(),
                stock: 5,
                price_micros: MICROS_SCALE,
                category_id: None,
            })
            .await;
        store
            .insert_order(OrderSummary {
                id: 1,
                client_id: 1,
                created_at: Utc::now(),
            })
            .await;

        let err = store.add_item(&add(1, 7, 6)).await.unwrap_err();
        assert_eq!(
            err,
            OrderError::InsufficientStock {
                product_id: 7,
                available: 5,
                requested: 6
            }
        );
        assert_eq!(store.product(7).await.unwrap().stock, 5);
        assert!(store.find_line(1, 7).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn stock_decrements_by_exactly_the_sum_of_quantities() {
        let store = MemOrderStore::with_demo_data().await;

        for quantity in [1, 2, 3, 4] {
            store.add_item(&add(1, 42, quantity)).await.unwrap();
        }
        assert_eq!(store.product(42).await.unwrap().stock, 100 - 10);
        assert_eq!(store.find_line(1, 42).await.unwrap().unwrap().quantity, 10);
    }

    #[tokio::test]
    async fn concurrent_adds_never_oversell() {
        let store = Arc::new(MemOrderStore::new());
        store
            .insert_product(Product {
                id: 10,
                name: "limited".to_string(),
                stock: 10,
                price_micros: MICROS_SCALE,
                category_id: None,
            })
            .await;
        store
            .insert_order(OrderSummary {
                id: 1,
                client_id: 1,
                created_at: Utc::now(),
            })
            .await;
        store
            .insert_order(OrderSummary {
                id: 2,
                client_id: 1,
                created_at: Utc::now(),
            })
            .await;

        let a = {
            let store = store.clone();
            tokio::spawn(async move { store.add_item(&add(1, 10, 6)).await })
        };
        let b = {
            let store = store.clone();
            tokio::spawn(async move { store.add_item(&add(2, 10, 6)).await })
        };

        let results = [a.await.unwrap(), b.await.unwrap()];
        let successes = results.iter().filter(|r| r.is_ok()).count();
        let rejections = results
            .iter()
            .filter(|r| {
                matches!(
                    r,
                    Err(OrderError::InsufficientStock {
                        available: 4,
                        requested: 6,
                        ..
                    })
                )
            })
            .count();

        assert_eq!(successes, 1, "exactly one of the two adds may commit");
        assert_eq!(rejections, 1);
        assert_eq!(store.product(10).await.unwrap().stock, 4);
    }

    #[tokio::test]
    async fn lines_are_scoped_to_their_order() {
        let store = MemOrderStore::with_demo_data().await;
        store
            .insert_order(OrderSummary {
                id: 2,
                client_id: 1,
                created_at: Utc::now(),
            })
            .await;

        store.add_item(&add(1, 42, 3)).await.unwrap();
        store.add_item(&add(2, 42, 4)).await.unwrap();
        store.add_item(&add(2, 43, 1)).await.unwrap();

        assert_eq!(store.order_lines(1).await.unwrap().len(), 1);
        let order2: Vec<(i64, i64)> = store
            .order_lines(2)
            .await
            .unwrap()
            .iter()
            .map(|l| (l.product_id, l.quantity))
            .collect();
        assert_eq!(order2, vec![(42, 4), (43, 1)]);
    }
}

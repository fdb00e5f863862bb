//! Order Line Mutator — the single choke-point for order mutation.
//!
//! Every add-item request, whether it arrives over HTTP or from the CLI,
//! goes through [`OrderLineMutator::add_item`]. The mutator:
//!
//! 1. Validates the requested quantity (`> 0`) **before** the store is
//!    touched. The store never sees a non-positive quantity, so stock can
//!    never be inflated through a negative add.
//! 2. Applies a deadline around the store call. On elapse the in-flight
//!    transaction is dropped (backends roll back on drop) and the caller
//!    gets [`OrderError::Timeout`] — failure, never partial success.
//!
//! The mutator caches nothing across invocations; the store is the sole
//! shared mutable resource.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::error::OrderError;
use crate::store::OrderStore;
use crate::types::{AddItemReceipt, AddItemRequest};

/// Default per-request deadline when the caller supplies none.
pub const DEFAULT_DEADLINE: Duration = Duration::from_millis(5_000);

/// Validating, deadline-enforcing front of an [`OrderStore`] backend.
#[derive(Clone)]
pub struct OrderLineMutator {
    store: Arc<dyn OrderStore>,
    default_deadline: Duration,
}

impl OrderLineMutator {
    pub fn new(store: Arc<dyn OrderStore>) -> Self {
        Self {
            store,
            default_deadline: DEFAULT_DEADLINE,
        }
    }

    /// Override the default deadline (e.g. from `ODK_ADD_ITEM_TIMEOUT_MS`).
    pub fn with_default_deadline(mut self, deadline: Duration) -> Self {
        self.default_deadline = deadline;
        self
    }

    pub fn store(&self) -> &Arc<dyn OrderStore> {
        &self.store
    }

    /// Add `req.quantity` units of a product to an order.
    ///
    /// `deadline` bounds the whole store interaction; `None` falls back to
    /// the mutator's default.
    pub async fn add_item(
        &self,
        req: AddItemRequest,
        deadline: Option<Duration>,
    ) -> Result<AddItemReceipt, OrderError> {
        if req.quantity <= 0 {
            return Err(OrderError::InvalidQuantity {
                quantity: req.quantity,
            });
        }

        let deadline = deadline.unwrap_or(self.default_deadline);
        let result = tokio::time::timeout(deadline, self.store.add_item(&req)).await;

        match result {
            Ok(Ok(receipt)) => {
                info!(
                    order_id = req.order_id,
                    product_id = req.product_id,
                    quantity = req.quantity,
                    line_quantity = receipt.line_quantity,
                    remaining_stock = receipt.remaining_stock,
                    "order line added"
                );
                Ok(receipt)
            }
            Ok(Err(err)) => {
                warn!(
                    order_id = req.order_id,
                    product_id = req.product_id,
                    quantity = req.quantity,
                    error = %err,
                    "add item refused"
                );
                Err(err)
            }
            Err(_elapsed) => Err(OrderError::Timeout {
                elapsed_ms: deadline.as_millis() as u64,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{OrderLine, OrderSummary, Product};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU64, Ordering};

    /// Counts store calls so tests can assert the store was never reached.
    struct CountingStore {
        calls: AtomicU64,
        stall: Option<Duration>,
    }

    impl CountingStore {
        fn new() -> Self {
            Self {
                calls: AtomicU64::new(0),
                stall: None,
            }
        }

        fn stalled(stall: Duration) -> Self {
            Self {
                calls: AtomicU64::new(0),
                stall: Some(stall),
            }
        }
    }

    #[async_trait]
    impl OrderStore for CountingStore {
        fn name(&self) -> &'static str {
            "counting"
        }

        async fn product(&self, product_id: i64) -> Result<Product, OrderError> {
            Err(OrderError::ProductNotFound { product_id })
        }

        async fn order(&self, order_id: i64) -> Result<OrderSummary, OrderError> {
            Err(OrderError::OrderNotFound { order_id })
        }

        async fn find_line(
            &self,
            _order_id: i64,
            _product_id: i64,
        ) -> Result<Option<OrderLine>, OrderError> {
            Ok(None)
        }

        async fn order_lines(&self, _order_id: i64) -> Result<Vec<OrderLine>, OrderError> {
            Ok(Vec::new())
        }

        async fn add_item(&self, req: &AddItemRequest) -> Result<AddItemReceipt, OrderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(stall) = self.stall {
                tokio::time::sleep(stall).await;
            }
            Ok(AddItemReceipt {
                order_id: req.order_id,
                product_id: req.product_id,
                line_quantity: req.quantity,
                remaining_stock: 0,
            })
        }
    }

    fn req(quantity: i64) -> AddItemRequest {
        AddItemRequest {
            order_id: 1,
            product_id: 42,
            quantity,
        }
    }

    #[tokio::test]
    async fn zero_and_negative_quantity_never_reach_the_store() {
        let store = Arc::new(CountingStore::new());
        let mutator = OrderLineMutator::new(store.clone());

        for quantity in [0, -1, -100] {
            let err = mutator.add_item(req(quantity), None).await.unwrap_err();
            assert_eq!(err, OrderError::InvalidQuantity { quantity });
        }
        assert_eq!(store.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn positive_quantity_passes_through() {
        let store = Arc::new(CountingStore::new());
        let mutator = OrderLineMutator::new(store.clone());

        let receipt = mutator.add_item(req(3), None).await.unwrap();
        assert_eq!(receipt.line_quantity, 3);
        assert_eq!(store.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_elapse_surfaces_timeout() {
        let store = Arc::new(CountingStore::stalled(Duration::from_secs(60)));
        let mutator = OrderLineMutator::new(store);

        let err = mutator
            .add_item(req(1), Some(Duration::from_millis(50)))
            .await
            .unwrap_err();
        assert_eq!(err, OrderError::Timeout { elapsed_ms: 50 });
        assert!(err.is_retryable());
    }
}

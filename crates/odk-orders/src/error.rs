//! The add-item error taxonomy.
//!
//! Every variant is a recoverable caller-facing condition; none are fatal to
//! the serving process. The HTTP layer maps each variant to a distinct
//! status, so a generic "something failed" is never reported for a condition
//! named here.

use std::fmt;

/// All failure modes the add-item operation can surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderError {
    /// `order_id` does not reference an existing order. Permanent; the
    /// caller must correct the identifier.
    OrderNotFound { order_id: i64 },
    /// `product_id` does not reference an existing product. Permanent.
    ProductNotFound { product_id: i64 },
    /// Warehouse stock is below the requested quantity. No mutation
    /// occurred. Permanent for the current stock level.
    InsufficientStock {
        product_id: i64,
        available: i64,
        requested: i64,
    },
    /// Requested quantity was zero or negative. Rejected before any store
    /// access — a negative quantity must never inflate stock.
    InvalidQuantity { quantity: i64 },
    /// The store detected a write collision with a concurrent transaction
    /// (serialization failure or deadlock). Safe to retry immediately.
    Conflict { detail: String },
    /// The caller-supplied deadline elapsed before commit. The transaction
    /// rolled back; no partial state is observable.
    Timeout { elapsed_ms: u64 },
    /// Backend failure unrelated to the taxonomy above (connectivity,
    /// unexpected row shape). Not a business-rule condition.
    Store { detail: String },
}

impl OrderError {
    /// True for conditions a caller may retry without changing the request.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Conflict { .. } | Self::Timeout { .. })
    }

    /// Stable machine-readable kind tag, used in API error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::OrderNotFound { .. } => "order_not_found",
            Self::ProductNotFound { .. } => "product_not_found",
            Self::InsufficientStock { .. } => "insufficient_stock",
            Self::InvalidQuantity { .. } => "invalid_quantity",
            Self::Conflict { .. } => "conflict",
            Self::Timeout { .. } => "timeout",
            Self::Store { .. } => "store_error",
        }
    }
}

impl fmt::Display for OrderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OrderNotFound { order_id } => {
                write!(f, "order {order_id} not found")
            }
            Self::ProductNotFound { product_id } => {
                write!(f, "product {product_id} not found")
            }
            Self::InsufficientStock {
                product_id,
                available,
                requested,
            } => write!(
                f,
                "insufficient stock for product {product_id}: available {available}, requested {requested}"
            ),
            Self::InvalidQuantity { quantity } => {
                write!(f, "quantity must be > 0, got {quantity}")
            }
            Self::Conflict { detail } => write!(f, "transaction conflict: {detail}"),
            Self::Timeout { elapsed_ms } => {
                write!(f, "deadline elapsed after {elapsed_ms}ms; transaction rolled back")
            }
            Self::Store { detail } => write!(f, "store error: {detail}"),
        }
    }
}

impl std::error::Error for OrderError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_split_matches_taxonomy() {
        assert!(OrderError::Conflict { detail: "40001".into() }.is_retryable());
        assert!(OrderError::Timeout { elapsed_ms: 5000 }.is_retryable());
        assert!(!OrderError::OrderNotFound { order_id: 1 }.is_retryable());
        assert!(!OrderError::InsufficientStock {
            product_id: 1,
            available: 5,
            requested: 6
        }
        .is_retryable());
        assert!(!OrderError::InvalidQuantity { quantity: 0 }.is_retryable());
    }

    #[test]
    fn kinds_are_distinct() {
        let kinds = [
            OrderError::OrderNotFound { order_id: 1 }.kind(),
            OrderError::ProductNotFound { product_id: 1 }.kind(),
            OrderError::InsufficientStock {
                product_id: 1,
                available: 0,
                requested: 1,
            }
            .kind(),
            OrderError::InvalidQuantity { quantity: 0 }.kind(),
            OrderError::Conflict { detail: String::new() }.kind(),
            OrderError::Timeout { elapsed_ms: 0 }.kind(),
            OrderError::Store { detail: String::new() }.kind(),
        ];
        let unique: std::collections::BTreeSet<_> = kinds.iter().collect();
        assert_eq!(unique.len(), kinds.len());
    }
}

//! Axum router and all HTTP handlers for odk-daemon.
//!
//! `build_router` is the single entry point; `main.rs` calls it and attaches
//! middleware layers. All handlers are `pub(crate)` so the scenario tests in
//! `tests/` can compose the router directly.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};

use odk_orders::{AddItemRequest, OrderError};

use crate::{
    api_types::{AddItemBody, AddItemResponse, ErrorResponse, HealthResponse, StatusResponse},
    state::{uptime_secs, AppState},
};

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Build the complete application router wired to the given shared state.
///
/// Middleware layers (CORS, tracing) are **not** applied here; `main.rs`
/// attaches them after this call so tests can use the bare router.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/v1/health", get(health))
        .route("/v1/status", get(status_handler))
        .route("/v1/products/:product_id", get(get_product))
        .route(
            "/v1/orders/:order_id/items",
            get(get_order_items).post(add_item),
        )
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Error mapping
// ---------------------------------------------------------------------------

/// Map each taxonomy variant to its own status category. A condition named
/// in the taxonomy is never reported as a generic failure.
fn status_for(err: &OrderError) -> StatusCode {
    match err {
        OrderError::OrderNotFound { .. } | OrderError::ProductNotFound { .. } => {
            StatusCode::NOT_FOUND
        }
        OrderError::InsufficientStock { .. } | OrderError::InvalidQuantity { .. } => {
            StatusCode::BAD_REQUEST
        }
        OrderError::Conflict { .. } => StatusCode::CONFLICT,
        OrderError::Timeout { .. } => StatusCode::SERVICE_UNAVAILABLE,
        OrderError::Store { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_response(err: OrderError) -> Response {
    let status = status_for(&err);
    let body = ErrorResponse {
        error: err.to_string(),
        kind: err.kind().to_string(),
        retryable: err.is_retryable(),
    };
    (status, Json(body)).into_response()
}

// ---------------------------------------------------------------------------
// GET /v1/health
// ---------------------------------------------------------------------------

pub(crate) async fn health(State(st): State<Arc<AppState>>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            ok: true,
            service: st.build.service,
            version: st.build.version,
        }),
    )
}

// ---------------------------------------------------------------------------
// GET /v1/status
// ---------------------------------------------------------------------------

pub(crate) async fn status_handler(State(st): State<Arc<AppState>>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(StatusResponse {
            daemon_uptime_secs: uptime_secs(),
            store_backend: st.store().name().to_string(),
            version: st.build.version.to_string(),
        }),
    )
}

// ---------------------------------------------------------------------------
// POST /v1/orders/{order_id}/items
// ---------------------------------------------------------------------------

/// Add a line item to an existing order.
///
/// The mutator validates the quantity and bounds the store transaction with
/// a deadline; every refusal maps to a distinct status:
/// 404 unknown order/product, 400 insufficient stock / bad quantity,
/// 409 write conflict (retryable), 503 deadline elapsed (retryable).
pub(crate) async fn add_item(
    State(st): State<Arc<AppState>>,
    Path(order_id): Path<i64>,
    Json(body): Json<AddItemBody>,
) -> Response {
    let req = AddItemRequest {
        order_id,
        product_id: body.product_id,
        quantity: body.quantity,
    };
    let deadline = body.deadline_ms.map(Duration::from_millis);

    match st.mutator.add_item(req, deadline).await {
        Ok(receipt) => (
            StatusCode::OK,
            Json(AddItemResponse {
                order_id: receipt.order_id,
                product_id: receipt.product_id,
                line_quantity: receipt.line_quantity,
                remaining_stock: receipt.remaining_stock,
            }),
        )
            .into_response(),
        Err(err) => error_response(err),
    }
}

// ---------------------------------------------------------------------------
// GET /v1/orders/{order_id}/items
// ---------------------------------------------------------------------------

pub(crate) async fn get_order_items(
    State(st): State<Arc<AppState>>,
    Path(order_id): Path<i64>,
) -> Response {
    match st.store().order_lines(order_id).await {
        Ok(lines) => (StatusCode::OK, Json(lines)).into_response(),
        Err(err) => error_response(err),
    }
}

// ---------------------------------------------------------------------------
// GET /v1/products/{product_id}
// ---------------------------------------------------------------------------

pub(crate) async fn get_product(
    State(st): State<Arc<AppState>>,
    Path(product_id): Path<i64>,
) -> Response {
    match st.store().product(product_id).await {
        Ok(product) => (StatusCode::OK, Json(product)).into_response(),
        Err(err) => error_response(err),
    }
}

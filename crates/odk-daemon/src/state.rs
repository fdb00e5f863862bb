//! Shared runtime state for odk-daemon.
//!
//! Handlers receive `State<Arc<AppState>>` from Axum. The store backend is
//! injected once at startup behind the mutator; nothing reads ambient
//! global connection state.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use odk_orders::{OrderLineMutator, OrderStore};

/// Static build metadata included in health / status responses.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BuildInfo {
    pub service: &'static str,
    pub version: &'static str,
}

/// Cloneable (Arc) handle shared across all Axum handlers.
#[derive(Clone)]
pub struct AppState {
    /// The single mutation choke-point; owns the store handle.
    pub mutator: OrderLineMutator,
    pub build: BuildInfo,
}

impl AppState {
    pub fn new(store: Arc<dyn OrderStore>, default_deadline: Duration) -> Self {
        Self {
            mutator: OrderLineMutator::new(store).with_default_deadline(default_deadline),
            build: BuildInfo {
                service: "odk-daemon",
                version: env!("CARGO_PKG_VERSION"),
            },
        }
    }

    pub fn store(&self) -> &Arc<dyn OrderStore> {
        self.mutator.store()
    }
}

/// Monotonically increasing uptime since first call (process lifetime).
pub fn uptime_secs() -> u64 {
    static START: std::sync::OnceLock<std::time::Instant> = std::sync::OnceLock::new();
    START
        .get_or_init(std::time::Instant::now)
        .elapsed()
        .as_secs()
}

use std::sync::Arc;

use boundary_api::store::BoundaryStore;

/// Shared application state / 应用共享状态
///
/// Read-only after startup; the store owns the connection pool.
pub struct AppState {
    pub store: Arc<dyn BoundaryStore>,
}

impl AppState {
    pub fn new(store: Arc<dyn BoundaryStore>) -> Self {
        Self { store }
    }
}

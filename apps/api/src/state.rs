use std::sync::Arc;

use crate::store::MirrorStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Mirror store. `PgStore` in production; swapped for an in-memory store in tests.
    pub store: Arc<dyn MirrorStore>,
}

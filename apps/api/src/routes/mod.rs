pub mod health;

use axum::{
    routing::{delete, get, post, put, MethodRouter},
    Router,
};

use crate::analytics::handlers as analytics;
use crate::state::AppState;
use crate::sync::handlers as sync;

/// Registers `path` both with and without its trailing slash.
fn both_slashes(
    router: Router<AppState>,
    path: &str,
    route: MethodRouter<AppState>,
) -> Router<AppState> {
    let trimmed = path.trim_end_matches('/');
    router
        .route(trimmed, route.clone())
        .route(&format!("{trimmed}/"), route)
}

pub fn build_router(state: AppState) -> Router {
    let router = Router::new().route("/health", get(health::health_handler));

    // Sync API (primary system -> mirror)
    let router = both_slashes(router, "/sync/jobs/", post(sync::handle_create_job));
    let router = both_slashes(router, "/sync/jobs/:id", put(sync::handle_update_job));
    let router = both_slashes(router, "/sync/users/", post(sync::handle_create_user));
    let router = both_slashes(router, "/sync/users/:uid", put(sync::handle_update_user));
    let router = both_slashes(router, "/sync/reviews/", post(sync::handle_create_review));
    let router = both_slashes(router, "/sync/reviews/:id", delete(sync::handle_delete_review));

    // Analytics API
    let router = both_slashes(router, "/analytics/users/", get(analytics::handle_user_stats));
    let router = both_slashes(router, "/analytics/workers/", get(analytics::handle_worker_stats));
    let router = both_slashes(router, "/analytics/reviews/", get(analytics::handle_review_stats));

    router.with_state(state)
}

//! V1 API routes.

use axum::{
    routing::{get, patch},
    Router,
};

use crate::api::{handlers, AppState};
use crate::rbac::{AccessPolicy, Capability, RequireCapabilityLayer};

/// V1 API prefix.
pub const V1_PREFIX: &str = "/api/v1";

/// Build the V1 API router.
///
/// # Endpoints
///
/// ## Loops
/// - `GET /api/v1/loops` - List loops (filters, sort, pagination)
/// - `POST /api/v1/loops` - Create a loop
/// - `GET /api/v1/loops/stats` - Dashboard counters, needs `canViewAnalytics`
/// - `GET /api/v1/loops/:id` - Get a loop
/// - `PATCH /api/v1/loops/:id` - Partial update
/// - `DELETE /api/v1/loops/:id` - Delete a loop
/// - `PATCH /api/v1/loops/:id/progress` - Set progress (0-100)
///
/// ## Access
/// - `GET /api/v1/access` - Role, tier and navigation for the caller
pub fn v1_router(policy: AccessPolicy) -> Router<AppState> {
    Router::new()
        .route(
            "/loops",
            get(handlers::list_loops).post(handlers::create_loop),
        )
        .route(
            "/loops/stats",
            get(handlers::loop_stats)
                .route_layer(RequireCapabilityLayer::new(policy, Capability::ViewAnalytics)),
        )
        .route(
            "/loops/:id",
            get(handlers::get_loop)
                .patch(handlers::update_loop)
                .delete(handlers::delete_loop),
        )
        .route("/loops/:id/progress", patch(handlers::update_loop_progress))
        .route("/access", get(handlers::access_summary))
}

/// V1 API route constants for use in clients and documentation.
pub mod paths {
    pub const LOOPS: &str = "/api/v1/loops";
    pub const LOOP_STATS: &str = "/api/v1/loops/stats";
    pub const LOOP: &str = "/api/v1/loops/:id";
    pub const LOOP_PROGRESS: &str = "/api/v1/loops/:id/progress";
    pub const ACCESS: &str = "/api/v1/access";
}

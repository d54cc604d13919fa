//! API routes

use axum::{
    http::HeaderValue,
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::handlers::{analytics, campaigns, dispatch, health, schedules};
use crate::state::AppState;

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    let health_routes = Router::new()
        .route("/", get(health::health))
        .route("/ready", get(health::readiness));

    let dispatch_routes = Router::new()
        .route("/", post(dispatch::start_dispatch))
        .route("/stop", post(dispatch::stop_dispatch))
        .route("/progress", get(dispatch::get_progress))
        .route("/logs", get(dispatch::get_logs));

    let schedule_routes = Router::new()
        .route(
            "/",
            get(schedules::list_schedules).post(schedules::create_schedule),
        )
        .route("/stale", get(schedules::get_stale))
        .route("/:batch_id", delete(schedules::cancel_schedule))
        .route("/:batch_id/reschedule", post(schedules::reschedule))
        .route("/:batch_id/resolve", post(schedules::resolve_stale));

    let campaign_routes = Router::new()
        .route("/", get(campaigns::list_campaigns))
        .route("/:campaign_id", get(campaigns::get_campaign));

    let analytics_routes = Router::new()
        .route("/", get(analytics::get_summary))
        .route("/reads", post(analytics::record_reads))
        .route("/:phone", get(analytics::get_contact_engagement));

    let api_v1 = Router::new()
        .nest("/dispatch", dispatch_routes)
        .nest("/schedules", schedule_routes)
        .nest("/campaigns", campaign_routes)
        .nest("/analytics", analytics_routes);

    Router::new()
        .nest("/health", health_routes)
        .nest("/api/v1", api_v1)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Build a CORS layer for the configured origins.
///
/// `*` allows any origin; an empty list disables CORS.
pub fn cors_layer(origins: &[String]) -> Option<CorsLayer> {
    if origins.is_empty() {
        return None;
    }

    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.iter().any(|o| o == "*") {
        return Some(layer.allow_origin(Any));
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match o.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin: {}", o);
                None
            }
        })
        .collect();

    Some(layer.allow_origin(AllowOrigin::list(allowed)))
}

//! Route configuration.

use crate::auth::auth_middleware;
use crate::handlers;
use crate::metrics::metrics_handler;
use crate::state::AppState;
use axum::Router;
use axum::middleware;
use axum::routing::{delete, get, post, put};
use tower_http::trace::TraceLayer;

/// Create the application router.
pub fn create_router(state: AppState) -> Router {
    let api_routes = Router::new()
        // Health check (unauthenticated for probes)
        .route("/v1/health", get(handlers::health_check))
        // Conferences
        .route(
            "/v1/admin/conferences",
            post(handlers::create_conference).get(handlers::list_conferences),
        )
        .route(
            "/v1/admin/conferences/{conference_id}",
            get(handlers::get_conference).delete(handlers::delete_conference),
        )
        // Content reconciliation
        .route(
            "/v1/admin/conferences/{conference_id}/content",
            get(handlers::get_content).put(handlers::put_content),
        )
        .route(
            "/v1/admin/conferences/{conference_id}/taxonomies",
            put(handlers::put_taxonomies),
        )
        .route(
            "/v1/admin/conferences/{conference_id}/schedule",
            put(handlers::put_schedule),
        )
        // Tokens
        .route(
            "/v1/admin/tokens",
            post(handlers::create_token).get(handlers::list_tokens),
        )
        .route(
            "/v1/admin/tokens/{token_id}",
            delete(handlers::revoke_token),
        );

    let legacy_routes =
        Router::new().route("/legacy/{conference_id}/schedule", get(handlers::get_schedule));

    let mut router = Router::new().merge(api_routes).merge(legacy_routes);

    // Network-restrict /metrics when enabled; see crate::metrics.
    if state.config.server.metrics_enabled {
        router = router.route("/metrics", get(metrics_handler));
    }

    // Order of execution: TraceLayer -> Auth -> Handler
    router
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

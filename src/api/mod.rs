mod handlers;
pub mod middleware;

use axum::{
    http::HeaderValue,
    routing::{delete, get, post},
    Router,
};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

use crate::db::Database;
use middleware::SecurityConfig;

/// Build the application router.
///
/// Everything except the health probe sits behind the auth middleware,
/// which resolves the caller identity used for `created_by` and the
/// creator-only agent deletion rule.
pub fn create_router(db: Database, security: SecurityConfig) -> Router {
    let cors = match &security.cors_origins {
        Some(origins) => {
            let origins: Vec<HeaderValue> =
                origins.iter().filter_map(|o| o.parse().ok()).collect();
            CorsLayer::new()
                .allow_origin(AllowOrigin::list(origins))
                .allow_methods(Any)
                .allow_headers(Any)
        }
        None => CorsLayer::permissive(),
    };

    let protected = Router::new()
        // Agents (roster changes trigger redistribution)
        .route("/agents", get(handlers::list_agents))
        .route("/agents", post(handlers::create_agent))
        .route("/agents/{id}", delete(handlers::delete_agent))
        // Leads
        .route("/leads", get(handlers::list_leads))
        .route("/leads", post(handlers::create_lead))
        .route("/leads/{id}", delete(handlers::delete_lead))
        // Bulk import
        .route("/upload", post(handlers::upload_leads))
        .route_layer(axum::middleware::from_fn_with_state(
            security.clone(),
            middleware::auth_middleware,
        ));

    let api = protected.route("/health", get(handlers::health));

    Router::new()
        .nest("/api/v1", api)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(db)
}

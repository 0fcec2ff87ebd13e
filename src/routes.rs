use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};

use crate::handlers::{self, AppState};

/// Request bodies larger than this are rejected.
const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Builds every route with tracing, CORS and body limits applied.
///
/// Rate limiting is added by the binary, since it needs the peer address.
pub fn build_router(state: Arc<AppState>) -> Router {
    let staff_routes = Router::new()
        .route(
            "/api/v1/leads",
            get(handlers::list_leads).post(handlers::create_lead),
        )
        .route("/api/v1/leads/export", get(handlers::export_csv))
        .route(
            "/api/v1/leads/:id",
            get(handlers::get_lead)
                .put(handlers::update_lead)
                .delete(handlers::delete_lead),
        )
        .route("/api/v1/leads/:id/status", post(handlers::update_status))
        .route("/api/v1/dashboard", get(handlers::dashboard))
        .route("/api/v1/analytics", get(handlers::analytics))
        .route(
            "/api/v1/counsellors",
            get(handlers::list_counsellors).post(handlers::create_counsellor),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            handlers::require_staff,
        ));

    let public_routes = Router::new()
        .route("/", get(handlers::landing))
        .route("/chat", get(handlers::chat_page))
        .route("/api/v1/intake", post(handlers::intake));

    Router::new()
        .route("/health", get(handlers::health))
        .merge(public_routes)
        .merge(staff_routes)
        .with_state(state)
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

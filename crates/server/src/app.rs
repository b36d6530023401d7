use axum::extract::DefaultBodyLimit;
use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::auth;
use crate::routes;
use crate::state::AppState;

/// Build the Axum application router: an unauthenticated health check,
/// authenticated ingestion/approval/rejection endpoints, and
/// authenticated query endpoints.
pub fn create_app(state: Arc<AppState>) -> Router {
    let authenticated = Router::new()
        .route("/parse", post(routes::parse::parse))
        .route("/save", post(routes::save::save))
        .route("/reject", post(routes::reject::reject))
        .route("/api/search/documents", get(routes::search::search_documents))
        .route("/api/documents/{id}", get(routes::documents::get_document))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth::require_bearer));

    Router::new()
        .route("/api/health", get(routes::health::health_check))
        .merge(authenticated)
        .layer(CorsLayer::permissive())
        .layer(DefaultBodyLimit::max(50 * 1024 * 1024))
        .with_state(state)
}

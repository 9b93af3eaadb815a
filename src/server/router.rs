//! REST router for expandable resources

use super::handlers::{AppState, create_resource, get_resource, list_resources};
use axum::{Json, Router, routing::get};
use serde_json::{Value, json};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Build the REST router
///
/// Routes:
/// - GET /health, GET /healthz - Health check
/// - GET /{resource} - List a resource
/// - POST /{resource} - Create a record
/// - GET /{resource}/{id} - Get a record
///
/// Custom routes are merged before the generic resource routes.
pub fn build_router(state: AppState, custom_routes: Vec<Router>) -> Router {
    let mut app = health_routes();

    for custom_router in custom_routes {
        app = app.merge(custom_router);
    }

    app.merge(resource_routes(state))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Generic resource routes
pub fn resource_routes(state: AppState) -> Router {
    Router::new()
        .route("/{resource}", get(list_resources).post(create_resource))
        .route("/{resource}/{id}", get(get_resource))
        .with_state(state)
}

fn health_routes() -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/healthz", get(health_check))
}

async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "unfold-rs"
    }))
}

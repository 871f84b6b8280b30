//! API module for handling HTTP requests and responses

#[cfg(feature = "web")]
pub(crate) mod handlers;
#[cfg(feature = "web")]
pub(crate) mod responses;

#[cfg(feature = "web")]
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Json, Router,
};
#[cfg(feature = "web")]
use std::sync::Arc;
#[cfg(feature = "web")]
use tower_http::{
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    trace::TraceLayer,
};
#[cfg(feature = "web")]
use crate::state::AppState;

#[cfg(feature = "web")]
pub use handlers::AnalyzeRequest;
#[cfg(feature = "web")]
pub(crate) use handlers::*;

#[cfg(feature = "web")]
/// Create the application router with all routes
pub fn create_router(state: Arc<AppState>) -> Router {
    // Configure CORS
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Base64 bodies are a third larger than the image itself
    let body_limit = state.config.max_upload_size / 3 * 4 + 64 * 1024;

    Router::new()
        .route("/api/health", get(health_check))
        .route("/api/catalog", get(list_catalog))
        .route("/api/analyze", post(analyze_upload))
        .route("/api/analyze/base64", post(analyze_base64))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

#[cfg(feature = "web")]
/// Health check endpoint
pub async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": crate::built_info::PKG_VERSION,
    }))
}

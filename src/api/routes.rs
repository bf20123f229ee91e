//! Admin API routes

use std::time::Duration;

use axum::http::{header, HeaderName, HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use super::handlers;
use super::AppState;

/// Create the admin API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/channels/list", get(handlers::list_channels))
        .route("/channels/send", post(handlers::send_file))
        .route("/stats", get(handlers::stats))
        .layer(build_cors_layer())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Any http(s) origin, with credentials
fn build_cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::predicate(|origin: &HeaderValue, _| {
            let origin = origin.as_bytes();
            origin.starts_with(b"https://") || origin.starts_with(b"http://")
        }))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::ACCEPT,
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            HeaderName::from_static("x-csrf-token"),
        ])
        .expose_headers([header::LINK])
        .allow_credentials(true)
        .max_age(Duration::from_secs(300))
}

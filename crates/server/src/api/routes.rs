use axum::{
    extract::DefaultBodyLimit,
    http::{header::HeaderName, HeaderValue},
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{set_header::SetResponseHeaderLayer, trace::TraceLayer};

use super::{handlers, jobs, middleware::metrics_middleware, ws};
use crate::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    // API routes
    let api_routes = Router::new()
        // Health, config and engine
        .route("/health", get(handlers::health))
        .route("/config", get(handlers::get_config))
        .route("/engine", get(handlers::get_engine))
        // Jobs; uploads are capped per file by the queue, not by body size
        .route(
            "/jobs",
            post(jobs::submit_jobs).layer(DefaultBodyLimit::disable()),
        )
        .route("/jobs", get(jobs::list_jobs))
        .route("/jobs/{id}", get(jobs::get_job).delete(jobs::dismiss_job))
        .route("/jobs/{id}/download", get(jobs::download_job))
        // Live events
        .route("/ws", get(ws::ws_handler));

    Router::new()
        .nest("/api/v1", api_routes)
        .route("/metrics", get(handlers::metrics))
        .layer(
            ServiceBuilder::new()
                // Cross-origin isolation on every response
                .layer(SetResponseHeaderLayer::overriding(
                    HeaderName::from_static("cross-origin-opener-policy"),
                    HeaderValue::from_static("same-origin"),
                ))
                .layer(SetResponseHeaderLayer::overriding(
                    HeaderName::from_static("cross-origin-embedder-policy"),
                    HeaderValue::from_static("require-corp"),
                ))
                .layer(TraceLayer::new_for_http())
                .layer(middleware::from_fn(metrics_middleware)),
        )
        .with_state(state)
}

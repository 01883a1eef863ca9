use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use remuxq_core::{Config, EngineStatus};
use serde::Serialize;
use std::sync::Arc;

use crate::metrics::{collect_dynamic_metrics, encode_metrics};
use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

pub async fn get_config(State(state): State<Arc<AppState>>) -> Json<Config> {
    Json(state.config().clone())
}

/// Engine readiness plus the implementation name.
#[derive(Debug, Serialize)]
pub struct EngineResponse {
    pub name: String,
    #[serde(flatten)]
    pub status: EngineStatus,
}

pub async fn get_engine(State(state): State<Arc<AppState>>) -> Json<EngineResponse> {
    Json(EngineResponse {
        name: state.queue().engine_name().to_string(),
        status: state.queue().engine_status(),
    })
}

/// Prometheus scrape endpoint.
pub async fn metrics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    collect_dynamic_metrics(&state);
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        encode_metrics(),
    )
}

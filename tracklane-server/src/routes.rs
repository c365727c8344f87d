//! HTTP routes of the tracking service.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::info;
use tracklane_core::model::{BatchReport, ProviderStatusReport, TrackingQuery, TrackingResult};
use tracklane_core::service::TrackingService;

use crate::error::ApiError;

/// Limits applied to batch requests.
#[derive(Debug, Clone, Copy)]
pub struct BatchLimits {
    /// Lookups in flight per request.
    pub concurrency: usize,
    /// Largest accepted batch.
    pub max_size: usize,
}

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    /// Aggregator facade.
    pub service: Arc<TrackingService>,
    /// Batch request limits.
    pub batch: BatchLimits,
}

/// Body of `POST /api/tracking/batch`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BatchRequest {
    shipments: Vec<TrackingQuery>,
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/tracking", post(track))
        .route("/api/tracking/status", get(status))
        .route("/api/tracking/batch", post(track_batch))
        .route("/health", get(health))
        .with_state(state)
}

async fn track(
    State(state): State<AppState>,
    payload: Result<Json<TrackingQuery>, JsonRejection>,
) -> Result<Json<TrackingResult>, ApiError> {
    let Json(query) = payload?;
    let result = state.service.track(&query).await?;
    Ok(Json(result))
}

async fn status(State(state): State<AppState>) -> Json<ProviderStatusReport> {
    Json(state.service.status())
}

async fn track_batch(
    State(state): State<AppState>,
    payload: Result<Json<BatchRequest>, JsonRejection>,
) -> Result<Json<BatchReport>, ApiError> {
    let Json(request) = payload?;
    let size = request.shipments.len();
    if size == 0 {
        return Err(ApiError::InvalidQuery("shipments must not be empty".to_owned()));
    }
    if size > state.batch.max_size {
        return Err(ApiError::InvalidQuery(format!(
            "batch of {size} exceeds the limit of {}",
            state.batch.max_size
        )));
    }

    info!(size, concurrency = state.batch.concurrency, "batch lookup requested");
    let report = state
        .service
        .track_batch(request.shipments, state.batch.concurrency)
        .await;
    Ok(Json(report))
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

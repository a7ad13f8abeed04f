//! Request handlers

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use chrono::Utc;
use tracing::{debug, info};

use crate::error::Error;

use super::error::ApiError;
use super::types::{HealthResponse, IngestRequest, IngestResponse, StatusResponse};
use super::AppState;

pub(super) async fn ingest(
    State(state): State<AppState>,
    payload: Result<Json<IngestRequest>, JsonRejection>,
) -> Result<Json<IngestResponse>, ApiError> {
    let Json(request) = payload?;
    debug!(count = request.ids.len(), priority = ?request.priority, "ingest: called");

    let (ids, priority) = request.validate(state.ingest.max_id)?;
    let ingestion_id = state.store.create_ingestion(ids, priority).await?;

    info!(%ingestion_id, %priority, "Ingestion accepted");
    Ok(Json(IngestResponse { ingestion_id }))
}

pub(super) async fn status(
    State(state): State<AppState>,
    Path(ingestion_id): Path<String>,
) -> Result<Json<StatusResponse>, ApiError> {
    debug!(%ingestion_id, "status: called");
    let snapshot = state
        .store
        .get_ingestion(&ingestion_id)
        .await
        .ok_or(Error::NotFound(ingestion_id))?;

    Ok(Json(snapshot.into()))
}

pub(super) async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: Utc::now(),
        queue_size: state.store.queue_depth().await,
        processor: state.processor.state().to_string(),
    })
}

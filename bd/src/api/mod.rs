//! HTTP surface
//!
//! Thin layer over the store and processor: accepts ingestions, serves status
//! and health. All state is passed in through [`AppState`].

mod error;
mod routes;
mod types;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};

use crate::config::IngestConfig;
use crate::processor::Processor;
use crate::store::Store;

pub use error::ApiError;
pub use types::{BatchStatusResponse, HealthResponse, IngestRequest, IngestResponse, StatusResponse};

/// Shared state for request handlers
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<Store>,
    pub processor: Arc<Processor>,
    pub ingest: IngestConfig,
}

impl AppState {
    pub fn new(store: Arc<Store>, processor: Arc<Processor>, ingest: IngestConfig) -> Self {
        Self {
            store,
            processor,
            ingest,
        }
    }
}

/// Build the API router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/ingest", post(routes::ingest))
        .route("/status/{ingestion_id}", get(routes::status))
        .route("/health", get(routes::health))
        .with_state(state)
}

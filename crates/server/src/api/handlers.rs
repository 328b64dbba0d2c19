use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::sync::Arc;
use steward_core::{CatalogueStatus, ReconcilerStatus, SanitizedConfig, SnapshotStatus};
use tracing::error;

use crate::metrics::{collect_dynamic_metrics, encode_metrics};
use crate::state::AppState;

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub catalogue: CatalogueStatus,
    /// Absent when no torrent client is configured.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reconciler: Option<ReconcilerStatus>,
    /// Transfer stats caches of the torrent client, when one is configured.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snapshot: Option<SnapshotStatus>,
}

pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let (reconciler, snapshot) = match state.reconciler() {
        Some(reconciler) => (
            Some(reconciler.status().await),
            Some(reconciler.snapshot().status().await),
        ),
        None => (None, None),
    };

    Json(HealthResponse {
        status: "ok".to_string(),
        version: VERSION.to_string(),
        catalogue: state.catalogue().status().await,
        reconciler,
        snapshot,
    })
}

pub async fn get_config(State(state): State<Arc<AppState>>) -> Json<SanitizedConfig> {
    Json(state.sanitized_config())
}

pub async fn metrics(State(state): State<Arc<AppState>>) -> Response {
    collect_dynamic_metrics(&state).await;

    match encode_metrics() {
        Ok(body) => (
            [(header::CONTENT_TYPE, prometheus::TEXT_FORMAT)],
            body,
        )
            .into_response(),
        Err(e) => {
            error!("Failed to render metrics: {:#}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

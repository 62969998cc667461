//! HTTP surface: `/records`, `/health` and `/metrics`.

use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Serialize;
use serde_json::json;
use spendlog_core::{Record, RecordPayload, RecordQueryParams, StorageError};
use tokio::task::JoinError;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::service::{RecordService, ServiceError};

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<RecordService>,
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    pub fn new(service: Arc<RecordService>) -> Self {
        Self {
            service,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}

/// Error body shared by every failing endpoint: `{"error": "..."}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

impl From<ServiceError> for ApiError {
    fn from(e: ServiceError) -> Self {
        match e {
            ServiceError::Validation(e) => ApiError::bad_request(e.to_string()),
            ServiceError::Storage(e) => ApiError::internal(e.to_string()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::bad_request(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::bad_request(rejection.body_text())
    }
}

impl From<JoinError> for ApiError {
    fn from(e: JoinError) -> Self {
        tracing::error!(error = %e, "Blocking task failed");
        ApiError::internal("internal error")
    }
}

#[derive(Debug, Serialize)]
pub struct CreatedRecord {
    pub message: &'static str,
    pub record: Record,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/records", get(list_records).post(create_record))
        .route("/health", get(health))
        .route("/metrics", get(render_metrics))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn create_record(
    State(state): State<AppState>,
    payload: Result<Json<RecordPayload>, JsonRejection>,
) -> Result<(StatusCode, Json<CreatedRecord>), ApiError> {
    let Json(payload) = payload?;
    let service = state.service.clone();
    let record = tokio::task::spawn_blocking(move || service.create(payload)).await??;

    Ok((
        StatusCode::CREATED,
        Json(CreatedRecord {
            message: "Record added",
            record,
        }),
    ))
}

async fn list_records(
    State(state): State<AppState>,
    params: Result<Query<RecordQueryParams>, QueryRejection>,
) -> Result<Json<Vec<Record>>, ApiError> {
    let Query(params) = params?;
    let service = state.service.clone();
    let records = tokio::task::spawn_blocking(move || service.query(&params)).await??;
    Ok(Json(records))
}

async fn health(State(state): State<AppState>) -> Result<Json<serde_json::Value>, ApiError> {
    let service = state.service.clone();
    tokio::task::spawn_blocking(move || service.store().health_check())
        .await?
        .map_err(|e: StorageError| ApiError::new(StatusCode::SERVICE_UNAVAILABLE, e.to_string()))?;
    Ok(Json(json!({ "status": "ok" })))
}

async fn render_metrics(State(state): State<AppState>) -> Result<String, ApiError> {
    state
        .metrics
        .as_ref()
        .map(PrometheusHandle::render)
        .ok_or_else(|| ApiError::new(StatusCode::NOT_FOUND, "metrics are not enabled"))
}

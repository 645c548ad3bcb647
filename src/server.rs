//! Web server module for isstrack.
//!
//! Exposes the query surface and the manual cleanup trigger as a JSON API.

use axum::{
    Json, Router,
    extract::{Query, State, rejection::QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, TraceLayer},
};

use crate::engine::{Sampler, SamplerStatus, TrimReport};
use crate::query::{DEFAULT_RECENT_LIMIT, QueryService};
use crate::storage::Reading;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub query: QueryService,
    pub sampler: Arc<Sampler>,
}

/// Liveness/status response.
#[derive(Serialize)]
struct StatusResponse {
    status: &'static str,
    service: &'static str,
    max_records: u64,
    sampler: SamplerStatus,
}

/// Readiness response.
#[derive(Serialize)]
struct HealthResponse {
    status: String,
    db: String,
}

/// Body of every failed query-surface response.
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

/// Envelope for stored-reading responses.
#[derive(Serialize)]
struct DataResponse<T> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T: Serialize> DataResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    fn failed(error: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error),
        }
    }
}

/// Manual cleanup response.
#[derive(Debug, Serialize)]
struct CleanupResponse {
    message: String,
    deleted: u64,
    requested: u64,
    failed_ids: Vec<String>,
}

impl From<TrimReport> for CleanupResponse {
    fn from(report: TrimReport) -> Self {
        let message = report.message();
        match report {
            TrimReport::Trimmed {
                requested,
                deleted,
                failed_ids,
            } => Self {
                message,
                deleted,
                requested,
                failed_ids,
            },
            TrimReport::NotNeeded { .. } | TrimReport::Busy => Self {
                message,
                deleted: 0,
                requested: 0,
                failed_ids: Vec::new(),
            },
        }
    }
}

/// Query parameters for the recent-readings API.
#[derive(Debug, Deserialize)]
pub struct RecentQueryParams {
    pub limit: Option<u32>,
}

/// Create the Axum router with all routes.
pub fn create_router(state: AppState) -> Router {
    let app_state = Arc::new(state);

    Router::new()
        .route("/", get(status_handler))
        .route("/health", get(status_handler))
        .route("/readyz", get(readyz_handler))
        .route("/api/iss-location", get(live_location_handler))
        .route("/api/iss-data", get(recent_readings_handler))
        .route("/api/iss-data/latest", get(latest_reading_handler))
        .route("/cleanup-now", post(cleanup_now_handler))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::default().include_headers(true)),
        )
        .layer(CorsLayer::permissive())
        .with_state(app_state)
}

/// Liveness check with sampler status.
async fn status_handler(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    Json(StatusResponse {
        status: "ok",
        service: "isstrack",
        max_records: state.query.max_records(),
        sampler: state.sampler.status().await,
    })
}

/// Readiness check that checks store availability.
async fn readyz_handler(State(state): State<Arc<AppState>>) -> Response {
    match state.query.check_ready().await {
        Ok(_) => Json(HealthResponse {
            status: "ok".to_string(),
            db: "ready".to_string(),
        })
        .into_response(),
        Err(err) => {
            tracing::error!(error = %err, "Readiness check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthResponse {
                    status: "not_ready".to_string(),
                    db: err.to_string(),
                }),
            )
                .into_response()
        }
    }
}

/// Live upstream snapshot, passed through unchanged.
async fn live_location_handler(State(state): State<Arc<AppState>>) -> Response {
    match state.query.get_live_snapshot().await {
        Ok(snapshot) => Json(snapshot).into_response(),
        Err(e) => {
            tracing::warn!(error = %e, "Live snapshot request failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: e.to_string(),
                }),
            )
                .into_response()
        }
    }
}

/// Most recent stored readings, newest first.
async fn recent_readings_handler(
    State(state): State<Arc<AppState>>,
    params: Result<Query<RecentQueryParams>, QueryRejection>,
) -> Response {
    let Query(params) = match params {
        Ok(params) => params,
        Err(rejection) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(DataResponse::<Vec<Reading>>::failed(rejection.body_text())),
            )
                .into_response();
        }
    };
    let limit = params.limit.unwrap_or(DEFAULT_RECENT_LIMIT);
    match state.query.get_recent_readings(limit).await {
        Ok(readings) => Json(DataResponse::ok(readings)).into_response(),
        Err(e) => {
            tracing::warn!(error = %e, limit, "Recent readings request failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(DataResponse::<Vec<Reading>>::failed(e.to_string())),
            )
                .into_response()
        }
    }
}

/// Most recent stored reading; `data` is null on an empty Series.
async fn latest_reading_handler(State(state): State<Arc<AppState>>) -> Response {
    match state.query.get_latest_reading().await {
        Ok(reading) => Json(serde_json::json!({
            "success": true,
            "data": reading,
        }))
        .into_response(),
        Err(e) => {
            tracing::warn!(error = %e, "Latest reading request failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(DataResponse::<Reading>::failed(e.to_string())),
            )
                .into_response()
        }
    }
}

/// Manual retention trigger. Always answers 200; the message carries the outcome.
async fn cleanup_now_handler(State(state): State<Arc<AppState>>) -> Json<CleanupResponse> {
    match state.query.trigger_cleanup_now().await {
        Ok(report) => Json(report.into()),
        Err(e) => {
            tracing::error!(error = %e, "Manual cleanup failed");
            Json(CleanupResponse {
                message: format!("Cleanup failed: {e}"),
                deleted: 0,
                requested: 0,
                failed_ids: Vec::new(),
            })
        }
    }
}

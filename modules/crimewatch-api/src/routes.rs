use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::response::Json;
use axum::routing::{get, post};
use axum::Router;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;

use crimewatch_common::{RefreshJob, RefreshOutcome};
use crimewatch_engine::views::{incident_views, GraphView, IncidentView, MapMarker};
use crimewatch_engine::RefreshEngine;

use crate::error::ApiError;

pub const SERVICE_NAME: &str = "crimewatch-api";

const DEFAULT_LIMIT: u32 = 100;
const MAX_LIMIT: u32 = 500;

pub struct AppState {
    pub engine: Arc<RefreshEngine>,
}

/// Assemble the router. Debug routes are mounted only for dev environments.
pub fn build_router(state: Arc<AppState>, dev: bool) -> Router {
    let mut router = Router::new()
        .route("/", get(health))
        .route("/api/refresh", post(refresh))
        .route("/api/refresh-async", post(refresh_async))
        .route("/api/refresh-status/{job_id}", get(refresh_status))
        .route("/api/incidents", get(incidents))
        .route("/api/graph", get(graph))
        .route("/api/map", get(map));

    if dev {
        router = router
            .route("/api/debug/candidates", get(debug_candidates))
            .route("/api/debug/enrichment-check", get(debug_enrichment_check));
    }

    router.layer(CorsLayer::permissive()).with_state(state)
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct HealthResponse {
    service: &'static str,
    version: &'static str,
    status: &'static str,
}

#[derive(Deserialize)]
struct RefreshRequest {
    region: String,
}

#[derive(Serialize)]
struct RefreshAsyncResponse {
    job_id: String,
    region: String,
    status: String,
    message: String,
}

/// Full job projection for polling clients.
#[derive(Serialize)]
struct JobView {
    job_id: String,
    region: String,
    status: String,
    new_articles: Option<i64>,
    total_incidents: Option<i64>,
    error_message: Option<String>,
    created_at: DateTime<Utc>,
    started_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
}

impl From<RefreshJob> for JobView {
    fn from(job: RefreshJob) -> Self {
        Self {
            job_id: job.job_id,
            region: job.region,
            status: job.status.to_string(),
            new_articles: job.new_articles,
            total_incidents: job.total_incidents,
            error_message: job.error_message,
            created_at: job.created_at,
            started_at: job.started_at,
            completed_at: job.completed_at,
        }
    }
}

#[derive(Deserialize)]
struct RegionParams {
    region: String,
}

#[derive(Deserialize)]
struct IncidentsParams {
    region: String,
    limit: Option<u32>,
}

#[derive(Serialize)]
struct IncidentsResponse {
    region: String,
    incidents: Vec<IncidentView>,
}

#[derive(Serialize)]
struct MapResponse {
    region: String,
    markers: Vec<MapMarker>,
}

#[derive(Deserialize)]
struct CandidatesParams {
    source_id: i64,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        service: SERVICE_NAME,
        version: env!("CARGO_PKG_VERSION"),
        status: "operational",
    })
}

async fn refresh(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<RefreshRequest>, JsonRejection>,
) -> Result<Json<RefreshOutcome>, ApiError> {
    let Json(request) = payload.map_err(|e| ApiError::unprocessable(e.body_text()))?;
    let outcome = state.engine.refresh(&request.region).await?;
    Ok(Json(outcome))
}

async fn refresh_async(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<RefreshRequest>, JsonRejection>,
) -> Result<Json<RefreshAsyncResponse>, ApiError> {
    let Json(request) = payload.map_err(|e| ApiError::unprocessable(e.body_text()))?;
    let job = state.engine.clone().start_async(&request.region).await?;
    Ok(Json(RefreshAsyncResponse {
        job_id: job.job_id,
        region: job.region,
        status: job.status.to_string(),
        message: "Refresh started; poll /api/refresh-status/{job_id}".to_string(),
    }))
}

async fn refresh_status(
    State(state): State<Arc<AppState>>,
    Path(job_id): Path<String>,
) -> Result<Json<JobView>, ApiError> {
    let job = state.engine.job(&job_id).await?;
    Ok(Json(job.into()))
}

async fn incidents(
    State(state): State<Arc<AppState>>,
    params: Result<Query<IncidentsParams>, QueryRejection>,
) -> Result<Json<IncidentsResponse>, ApiError> {
    let Query(params) = params.map_err(|e| ApiError::unprocessable(e.body_text()))?;
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);

    let records = state.engine.incidents(&params.region, limit).await?;
    Ok(Json(IncidentsResponse {
        region: params.region,
        incidents: incident_views(&records),
    }))
}

async fn graph(
    State(state): State<Arc<AppState>>,
    params: Result<Query<RegionParams>, QueryRejection>,
) -> Result<Json<GraphView>, ApiError> {
    let Query(params) = params.map_err(|e| ApiError::unprocessable(e.body_text()))?;
    let view = state.engine.graph(&params.region).await?;
    Ok(Json(view))
}

async fn map(
    State(state): State<Arc<AppState>>,
    params: Result<Query<RegionParams>, QueryRejection>,
) -> Result<Json<MapResponse>, ApiError> {
    let Query(params) = params.map_err(|e| ApiError::unprocessable(e.body_text()))?;
    let markers = state.engine.map(&params.region).await?;
    Ok(Json(MapResponse {
        region: params.region,
        markers,
    }))
}

async fn debug_candidates(
    State(state): State<Arc<AppState>>,
    params: Result<Query<CandidatesParams>, QueryRejection>,
) -> Result<Json<Vec<String>>, ApiError> {
    let Query(params) = params.map_err(|e| ApiError::unprocessable(e.body_text()))?;
    let urls = state
        .engine
        .candidate_urls(params.source_id)
        .await
        .map_err(|e| match e {
            crimewatch_common::CrimewatchError::Store(msg) => ApiError::not_found(msg),
            other => other.into(),
        })?;
    Ok(Json(urls))
}

async fn debug_enrichment_check(
    State(state): State<Arc<AppState>>,
) -> Json<crimewatch_engine::EnrichmentCheck> {
    Json(state.engine.enrichment_check().await)
}

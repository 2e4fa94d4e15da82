//! HTTP routes.

use super::{handler::JobService, ws::ws_handler};
use crate::server::{error::Result, jobs::registry::Job};
use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use guessgen_core::{JobId, JobResult};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

/// Body of `POST /jobs`.
#[derive(Debug, Deserialize)]
pub struct SubmitRequest {
    #[serde(default, alias = "combinacoes")]
    pub combinations: Vec<String>,
    #[serde(alias = "quantidade")]
    pub count: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SubmitResponse {
    pub job_id: JobId,
}

/// Create all routes.
pub fn router(service: Arc<JobService>) -> Router {
    Router::new()
        .route("/healthz", get(health))
        .route("/jobs", post(submit_job))
        .route("/jobs/{id}", get(get_job))
        .route("/jobs/{id}/result", get(get_result))
        .route("/ws", get(ws_handler))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(service)
}

async fn health(State(service): State<Arc<JobService>>) -> impl IntoResponse {
    if service.is_accepting() {
        (StatusCode::OK, "ok")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "shutting down")
    }
}

async fn submit_job(
    State(service): State<Arc<JobService>>,
    Json(body): Json<SubmitRequest>,
) -> Result<(StatusCode, Json<SubmitResponse>)> {
    let job_id = service.submit(&body.combinations, body.count)?;
    Ok((StatusCode::ACCEPTED, Json(SubmitResponse { job_id })))
}

async fn get_job(
    State(service): State<Arc<JobService>>,
    Path(id): Path<JobId>,
) -> Result<Json<Job>> {
    service.job(id).map(Json)
}

async fn get_result(
    State(service): State<Arc<JobService>>,
    Path(id): Path<JobId>,
) -> Result<Json<JobResult>> {
    service.result(id).map(Json)
}

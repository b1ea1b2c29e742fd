use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use drover_prometheus::{Encoder, PrometheusMetrics, TextEncoder};
use drover_rpc::{DispatchManager, RunnerClient, RunnerStatus};

/// Read-only status API over a [`DispatchManager`].
pub struct StatusApi<C> {
    manager: Arc<DispatchManager<C>>,
    metrics: PrometheusMetrics,
}

struct ApiState<C> {
    manager: Arc<DispatchManager<C>>,
    metrics: PrometheusMetrics,
}

type Shared<C> = Arc<ApiState<C>>;

impl<C: RunnerClient> StatusApi<C> {
    pub fn new(manager: Arc<DispatchManager<C>>, metrics: PrometheusMetrics) -> Self {
        Self { manager, metrics }
    }

    /// Build axum router with mounted endpoints.
    ///
    /// Routes:
    /// - GET /api/v1/runners - Runner readiness and assigned jobs
    /// - GET /api/v1/jobs - Job placement and orphans
    /// - GET /metrics - Prometheus text format
    pub fn router(self) -> Router {
        let state = Arc::new(ApiState {
            manager: self.manager,
            metrics: self.metrics,
        });
        Router::new()
            .route("/api/v1/runners", get(list_runners::<C>))
            .route("/api/v1/jobs", get(list_jobs::<C>))
            .route("/metrics", get(metrics::<C>))
            .with_state(state)
    }
}

#[derive(Debug, Error)]
enum ApiError {
    #[error("failed to encode metrics: {0}")]
    Metrics(#[from] prometheus::Error),
}

#[derive(Debug, Serialize)]
struct ErrorResponseBody {
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        error!(error = %self, "request failed");
        let body = Json(ErrorResponseBody {
            message: self.to_string(),
        });
        (StatusCode::INTERNAL_SERVER_ERROR, body).into_response()
    }
}

#[derive(Debug, Serialize)]
struct ListRunnersResponse {
    runners: Vec<RunnerStatus>,
}

#[derive(Debug, PartialEq, Eq, Serialize)]
struct JobPlacement {
    name: String,
    endpoint: String,
}

#[derive(Debug, Serialize)]
struct ListJobsResponse {
    assigned: Vec<JobPlacement>,
    orphans: Vec<String>,
}

/// GET /api/v1/runners
async fn list_runners<C: RunnerClient>(State(state): State<Shared<C>>) -> Json<ListRunnersResponse> {
    Json(ListRunnersResponse {
        runners: state.manager.snapshot(),
    })
}

/// GET /api/v1/jobs
async fn list_jobs<C: RunnerClient>(State(state): State<Shared<C>>) -> Json<ListJobsResponse> {
    let assigned = state
        .manager
        .snapshot()
        .into_iter()
        .flat_map(|runner| {
            let endpoint = runner.endpoint;
            runner.jobs.into_iter().map(move |name| JobPlacement {
                name,
                endpoint: endpoint.clone(),
            })
        })
        .collect();

    Json(ListJobsResponse {
        assigned,
        orphans: state.manager.orphans(),
    })
}

/// GET /metrics
async fn metrics<C: RunnerClient>(State(state): State<Shared<C>>) -> Result<Response, ApiError> {
    let body = state.metrics.encode()?;
    Ok((
        [(header::CONTENT_TYPE, TextEncoder::new().format_type().to_string())],
        body,
    )
        .into_response())
}

//! HTTP API of the execution service.
//!
//! All routes live under [`API_PREFIX`]. Execution is asynchronous: `execute`
//! answers 202 with the location of a result that completes later.

pub mod types;

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State, rejection::JsonRejection},
    http::{HeaderValue, Method, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use futures::FutureExt;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::context::ServiceContext;
use crate::error::ApiError;

use types::*;

pub const API_PREFIX: &str = "/braket-service/api/v1.0";

/// Reported by GET /version.
pub const API_VERSION: &str = "1.0";

const TRANSPILE_FAILED: &str = "transpilation failed";

// ── Router construction ───────────────────────────────────────────────────

/// Build the router; CORS origins come from the server configuration.
pub fn router(ctx: Arc<ServiceContext>) -> Router {
    let cors = build_cors_layer(&ctx.config.server.cors_origins);

    let api = Router::new()
        .route("/execute", post(execute_handler))
        .route("/results/{id}", get(result_handler))
        .route("/transpile", post(transpile_handler))
        .route("/version", get(version_handler))
        .route(
            "/calculate-calibration-matrix",
            post(calibration_matrix_handler),
        );

    Router::new()
        .nest(API_PREFIX, api)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(ctx)
}

fn build_cors_layer(origins: &str) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .expose_headers([header::LOCATION]);

    if origins == "*" {
        layer.allow_origin(tower_http::cors::Any)
    } else {
        let allowed: Vec<HeaderValue> = origins
            .split(',')
            .filter_map(|o| o.trim().parse().ok())
            .collect();
        layer.allow_origin(allowed)
    }
}

fn result_location(id: &str) -> String {
    format!("{API_PREFIX}/results/{id}")
}

// ── Handlers ──────────────────────────────────────────────────────────────

async fn execute_handler(
    State(ctx): State<Arc<ServiceContext>>,
    body: Result<Json<ExecuteRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(req) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    let backend = req
        .backend()
        .ok_or_else(|| ApiError::BadRequest("qpu-name is required".to_string()))?
        .to_string();
    if req.shots == 0 {
        return Err(ApiError::BadRequest("shots must be at least 1".to_string()));
    }
    let params = req.into_params(&backend);

    // The row exists before any worker can see the job.
    let reservation = ctx.queue.reserve().await?;
    ctx.store
        .create(reservation.id(), &backend, params.shots)
        .await?;
    let shots = params.shots;
    let id = reservation.send(params);
    info!(job_id = %id, backend = %backend, shots, "job accepted");

    let location = result_location(&id);
    Ok((
        StatusCode::ACCEPTED,
        [(header::LOCATION, location.clone())],
        Json(ExecuteResponse { location }),
    )
        .into_response())
}

async fn result_handler(
    State(ctx): State<Arc<ServiceContext>>,
    Path(id): Path<String>,
) -> Result<Json<ResultResponse>, ApiError> {
    let id = id.trim();
    let record = ctx
        .store
        .get(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Result not found: {id}")))?;
    Ok(Json(record.into()))
}

async fn transpile_handler(
    State(ctx): State<Arc<ServiceContext>>,
    body: Result<Json<TranspileRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(req) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let params = req.into_params();

    let outcome = AssertUnwindSafe(ctx.pipeline().transpile(&params))
        .catch_unwind()
        .await;
    let response = match outcome {
        Ok(Ok((metrics, transpiled_braket_ir))) => Json(TranspileResponse {
            metrics,
            transpiled_braket_ir,
        })
        .into_response(),
        Ok(Err(e)) => {
            warn!(backend = %params.backend, cause = e.cause(), error = %e, "transpilation failed");
            Json(TranspileFailure {
                error: TRANSPILE_FAILED,
            })
            .into_response()
        }
        Err(_) => {
            warn!(backend = %params.backend, "transpilation panicked");
            Json(TranspileFailure {
                error: TRANSPILE_FAILED,
            })
            .into_response()
        }
    };
    Ok(response)
}

async fn version_handler() -> Json<VersionResponse> {
    Json(VersionResponse {
        version: API_VERSION,
    })
}

async fn calibration_matrix_handler() -> ApiError {
    ApiError::NotFound("calibration matrix calculation is not supported".to_string())
}

//! API request handlers

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;

use super::routes::AppState;
use crate::error::Error;
use crate::flatten;
use crate::types::{CmdParams, CmdResponse};

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Service status
    pub status: String,
    /// API version
    pub version: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Error message
    pub error: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(err: Error) -> ApiError {
    let status = match err {
        Error::MissingCommand => StatusCode::BAD_REQUEST,
        Error::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
        _ => StatusCode::BAD_GATEWAY,
    };
    (
        status,
        Json(ErrorResponse {
            error: err.to_string(),
        }),
    )
}

/// Health check endpoint
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse)
    ),
    tag = "health"
)]
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".into(),
        version: env!("CARGO_PKG_VERSION").into(),
    })
}

/// Run an xCAT command and return its output as JSON
#[utoipa::path(
    get,
    path = "/api/cmd",
    params(CmdParams),
    responses(
        (status = 200, description = "Command output", body = CmdResponse),
        (status = 400, description = "No command given", body = ErrorResponse),
        (status = 502, description = "Dispatcher failed", body = ErrorResponse),
        (status = 504, description = "Dispatcher timed out", body = ErrorResponse)
    ),
    tag = "commands"
)]
pub async fn run_command(
    State(state): State<AppState>,
    Query(params): Query<CmdParams>,
) -> Result<Json<CmdResponse>, ApiError> {
    flatten::run(state.dispatcher.as_ref(), &params)
        .await
        .map(Json)
        .map_err(api_error)
}

//! API route definitions

use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use super::handlers::{self, ErrorResponse, HealthResponse};
use crate::dispatch::Dispatcher;
use crate::types::CmdResponse;

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "xcat-web API",
        version = "0.1.0",
        description = "Runs xCAT commands and returns their output as JSON"
    ),
    tags(
        (name = "commands", description = "xCAT command execution"),
        (name = "health", description = "Health checks")
    ),
    paths(handlers::health, handlers::run_command),
    components(schemas(CmdResponse, HealthResponse, ErrorResponse))
)]
pub struct ApiDoc;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<dyn Dispatcher>,
}

impl AppState {
    pub fn new(dispatcher: Arc<dyn Dispatcher>) -> Self {
        Self { dispatcher }
    }
}

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let openapi = ApiDoc::openapi();

    Router::new()
        // Commands
        .route("/api/cmd", get(handlers::run_command))
        // Path requested by the existing web UI
        .route("/lib/cmd.php", get(handlers::run_command))

        // Health
        .route("/health", get(handlers::health))

        // OpenAPI spec and Swagger UI
        .merge(SwaggerUi::new("/api/docs").url("/api/openapi.json", openapi))

        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

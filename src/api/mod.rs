//! HTTP API layer

mod handlers;
mod routes;

pub use handlers::{ErrorResponse, HealthResponse};
pub use routes::{create_router, ApiDoc, AppState};

use crate::state::AppState;
use axum::{http::StatusCode, routing::get, Json, Router};
use utoipa::ToSchema;

/// Create a router to serve health checks.
pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/", get(is_alive))
        .route("/info", get(build_info))
}

/// Simple `is_alive` endpoint that will always return a 200 OK.
/// Used to indicate when the webserver is up and running.
#[tracing::instrument]
#[utoipa::path(
    get,
    path = "/health",
    responses((status = OK, description = "Check if service is alive"))
)]
pub async fn is_alive() -> StatusCode {
    tracing::debug!("Service is alive");
    StatusCode::OK
}

#[derive(Debug, serde::Serialize, ToSchema)]
pub struct BuildInfo {
    name: &'static str,
    version: &'static str,
}

/// Endpoint to get current information about the server's version.
#[tracing::instrument]
#[utoipa::path(
    get,
    path = "/health/info",
    responses(
        (status = OK, description = "Build info for this service", body = BuildInfo)
    )
)]
pub async fn build_info() -> Json<BuildInfo> {
    Json(BuildInfo {
        name: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
    })
}

use crate::routes::*;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use http::{
    header::{self, ACCEPT},
    HeaderMap,
};
use utoipa::OpenApi;

/// Documentation for the service. Can be converted into JSON or YAML.
#[derive(OpenApi)]
#[openapi(
    paths(
        status::home,
        status::hello,
        status::database_probe,
        contact::submit_contact,
        contact::contact_health,
        health::is_alive,
        health::build_info,
        crate::metrics::metrics_endpoint,
    ),
    components(schemas(
        status::Greeting,
        status::DatabaseReport,
        contact::ContactPayload,
        contact::ContactOutcome,
        contact::ChannelStatus,
        crate::email_client::TransportMode,
        health::BuildInfo,
    ))
)]
struct ApiDoc;

pub fn create_router() -> Router {
    Router::new()
        .route("/openapi", get(serve_openapi_docs))
        .route("/openapi.json", get(serve_openapi_docs_as_json))
        .route("/openapi.yaml", get(serve_openapi_docs_as_yaml))
}

/// Serve OpenApi docs based on the `Accept` header.
#[tracing::instrument(skip(headers))]
pub async fn serve_openapi_docs(headers: HeaderMap) -> Response {
    match headers.get(ACCEPT).and_then(|x| x.to_str().ok()) {
        Some("application/yaml") => serve_openapi_docs_as_yaml().await,
        _ => serve_openapi_docs_as_json().await,
    }
}

/// Endpoint to serve OpenApi docs as JSON.
#[tracing::instrument]
pub async fn serve_openapi_docs_as_json() -> Response {
    match ApiDoc::openapi().to_json() {
        Ok(docs) => ([(header::CONTENT_TYPE, "application/json")], docs).into_response(),
        Err(e) => render_error(e),
    }
}

/// Endpoint to serve OpenApi docs as YAML.
#[tracing::instrument]
pub async fn serve_openapi_docs_as_yaml() -> Response {
    match ApiDoc::openapi().to_yaml() {
        Ok(docs) => ([(header::CONTENT_TYPE, "application/yaml")], docs).into_response(),
        Err(e) => render_error(e),
    }
}

fn render_error(e: impl std::fmt::Display) -> Response {
    tracing::error!(error.message = %e, "Failed to render OpenApi docs");
    StatusCode::INTERNAL_SERVER_ERROR.into_response()
}

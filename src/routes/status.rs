use crate::{configuration::Settings, state::{AppState, StoreHandle}};
use axum::{extract::State, routing::get, Json, Router};
use std::sync::Arc;
use utoipa::ToSchema;

/// Number of collection names included in the database report.
const MAX_REPORTED_COLLECTIONS: usize = 10;
/// Errors are cut to this many characters before being reported.
const MAX_ERROR_CHARS: usize = 50;

pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/", get(home))
        .route("/api/hello", get(hello))
        .route("/test", get(database_probe))
}

#[derive(Debug, serde::Serialize, ToSchema)]
pub struct Greeting {
    message: &'static str,
}

/// Liveness message for the root of the service.
#[tracing::instrument]
#[utoipa::path(
    get,
    path = "/",
    responses((status = OK, description = "The backend is running", body = Greeting))
)]
pub async fn home() -> Json<Greeting> {
    Json(Greeting {
        message: "Hello from the portfolio backend!",
    })
}

#[tracing::instrument]
#[utoipa::path(
    get,
    path = "/api/hello",
    responses((status = OK, description = "Greeting from the API", body = Greeting))
)]
pub async fn hello() -> Json<Greeting> {
    Json(Greeting {
        message: "Hello from the backend API!",
    })
}

/// Best-effort view of the database connectivity.
#[derive(Debug, serde::Serialize, ToSchema)]
pub struct DatabaseReport {
    backend: String,
    database: String,
    database_url: String,
    database_name: String,
    connection_status: String,
    collections: Vec<String>,
}

/// Report whether the database is reachable and which collections it holds.
/// Every failure ends up as text in the report, this endpoint never fails.
#[tracing::instrument(skip(settings, store))]
#[utoipa::path(
    get,
    path = "/test",
    responses(
        (status = OK, description = "Status of the backend and its database", body = DatabaseReport)
    )
)]
pub async fn database_probe(
    State(settings): State<Arc<Settings>>,
    State(store): State<StoreHandle>,
) -> Json<DatabaseReport> {
    let mut report = DatabaseReport {
        backend: "✅ Running".to_string(),
        database: "❌ Not Available".to_string(),
        database_url: set_or_not(settings.database().url().is_some()),
        database_name: set_or_not(settings.database().name().is_some()),
        connection_status: "Not Connected".to_string(),
        collections: vec![],
    };

    match store.0 {
        None => {
            report.database =
                "❌ Database handle not initialized (set DATABASE_URL and DATABASE_NAME)"
                    .to_string();
        }
        Some(store) => {
            report.connection_status = "Connected".to_string();
            match store.list_collection_names().await {
                Ok(names) => {
                    report.collections = names.into_iter().take(MAX_REPORTED_COLLECTIONS).collect();
                    report.database = "✅ Connected & Working".to_string();
                }
                Err(e) => {
                    tracing::warn!(error.cause_chain = ?e, "Failed to list collections");
                    report.database = format!(
                        "⚠️  Connected but Error: {}",
                        truncate_chars(&e.to_string(), MAX_ERROR_CHARS)
                    );
                }
            }
        }
    }

    tracing::info!("Database report: {:?}", report);
    Json(report)
}

fn set_or_not(is_set: bool) -> String {
    if is_set { "✅ Set" } else { "❌ Not Set" }.to_string()
}

fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

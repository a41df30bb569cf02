use crate::{metrics, state::AppState};
use axum::Router;

pub mod contact;
pub mod docs;
pub mod health;
pub mod status;

/// Build the router serving every endpoint of the service.
pub fn build_router(app_state: &AppState) -> Router {
    Router::new()
        .merge(status::create_router())
        .nest("/api/contact", contact::create_router())
        .nest("/health", health::create_router())
        .nest("/metrics", metrics::create_router())
        .with_state(app_state.clone())
        .nest("/docs", docs::create_router())
}

use crate::{email_client::DispatchOutcome, state::AppState};
use anyhow::Context;
use axum::{
    extract::State,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use http::StatusCode;
use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};
use std::sync::Arc;

/// Counters describing what happened to contact submissions.
#[derive(Clone)]
pub struct ContactMetrics {
    registry: Registry,
    submissions: IntCounter,
    persist_failures: IntCounter,
    dispatches: IntCounterVec,
}

impl ContactMetrics {
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let submissions = IntCounter::new(
            "contact_submissions_total",
            "Number of accepted contact submissions",
        )
        .context("Failed to create `contact_submissions_total` counter")?;
        registry
            .register(Box::new(submissions.clone()))
            .context("Failed to register `contact_submissions_total` metric")?;

        let persist_failures = IntCounter::new(
            "contact_persist_failures_total",
            "Number of contact submissions that could not be stored",
        )
        .context("Failed to create `contact_persist_failures_total` counter")?;
        registry
            .register(Box::new(persist_failures.clone()))
            .context("Failed to register `contact_persist_failures_total` metric")?;

        let dispatches = IntCounterVec::new(
            Opts::new(
                "contact_email_dispatch_total",
                "Outcomes of contact notification attempts",
            ),
            &["outcome"],
        )
        .context("Failed to create `contact_email_dispatch_total` counter")?;
        registry
            .register(Box::new(dispatches.clone()))
            .context("Failed to register `contact_email_dispatch_total` metric")?;

        Ok(Self {
            registry,
            submissions,
            persist_failures,
            dispatches,
        })
    }

    pub fn record_submission(&self) {
        self.submissions.inc();
    }

    pub fn record_persist_failure(&self) {
        self.persist_failures.inc();
    }

    pub fn record_dispatch(&self, outcome: &DispatchOutcome) {
        self.dispatches.with_label_values(&[outcome.label()]).inc();
    }

    /// Render all metrics in the Prometheus text format.
    pub fn render(&self) -> Result<String, MetricsError> {
        let mut buffer = vec![];
        let encoder = TextEncoder::new();
        encoder
            .encode(&self.registry.gather(), &mut buffer)
            .context("Failed to encode metrics")
            .map_err(MetricsError::UnexpectedError)?;

        String::from_utf8(buffer)
            .context("Failed to convert metrics to a valid string")
            .map_err(MetricsError::UnexpectedError)
    }
}

impl std::fmt::Debug for ContactMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContactMetrics")
            .field("submissions", &self.submissions.get())
            .field("persist_failures", &self.persist_failures.get())
            .finish_non_exhaustive()
    }
}

pub fn create_router() -> Router<AppState> {
    Router::new().route("/", get(metrics_endpoint))
}

/// Endpoint exposing metrics to be scraped by Prometheus.
#[tracing::instrument(skip(metrics))]
#[utoipa::path(
    get,
    path = "/metrics",
    responses((status = OK, description = "Metrics in the Prometheus text format", body = String))
)]
pub async fn metrics_endpoint(
    State(metrics): State<Arc<ContactMetrics>>,
) -> Result<String, MetricsError> {
    metrics.render()
}

#[derive(thiserror::Error)]
pub enum MetricsError {
    #[error("Unexpected error when generating metrics")]
    UnexpectedError(#[source] anyhow::Error),
}

impl IntoResponse for MetricsError {
    fn into_response(self) -> Response {
        tracing::error!(error.cause_chain = ?self, "Failed to render metrics");
        (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()).into_response()
    }
}

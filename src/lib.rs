pub mod configuration;
pub mod domain;
pub mod email_client;
mod error;
mod metrics;
mod routes;
mod state;
pub mod store;
pub mod telemetry;

use axum::{Router, Server};
use configuration::Settings;
use email_client::EmailClient;
use metrics::ContactMetrics;
use state::AppState;
use std::{net::TcpListener, sync::Arc};
use store::DocumentStore;

/// The service, bound to its listener and ready to be run.
#[derive(Debug)]
pub struct App {
    port: u16,
    listener: TcpListener,
    router: Router,
}

impl App {
    /// Build the app with the collaborators described by `settings`: a MongoDB
    /// store when a database is configured and an SMTP email client.
    pub async fn build(settings: Settings) -> anyhow::Result<Self> {
        let store = store::connect_store(settings.database()).await;
        let email_client = EmailClient::new(settings.smtp().clone());

        Self::build_with(settings, store, email_client)
    }

    /// Build the app with explicitly provided collaborators.
    pub fn build_with(
        settings: Settings,
        store: Option<Arc<dyn DocumentStore>>,
        email_client: EmailClient,
    ) -> anyhow::Result<Self> {
        let listener = TcpListener::bind(settings.application().address())?;
        let port = listener.local_addr()?.port();

        let app_state = AppState::create(settings, store, email_client, ContactMetrics::new()?);
        let router = Self::build_router(&app_state);

        Ok(Self {
            port,
            listener,
            router,
        })
    }

    /// The port the app is listening on.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Serve requests until the server is stopped.
    pub async fn run_until_stopped(self) -> anyhow::Result<()> {
        tracing::info!("Server running at {}", self.listener.local_addr()?);
        Server::from_tcp(self.listener)?
            .serve(self.router.into_make_service())
            .await?;
        Ok(())
    }

    /// Builder the router for the application.
    fn build_router(app_state: &AppState) -> Router {
        use tower::ServiceBuilder;
        use tower_http::{
            cors::CorsLayer,
            request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
            trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
        };
        use tracing::Level;

        routes::build_router(app_state).layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                        .on_request(DefaultOnRequest::new().level(Level::INFO))
                        .on_response(DefaultOnResponse::new().level(Level::INFO)),
                )
                .layer(PropagateRequestIdLayer::x_request_id())
                .layer(CorsLayer::very_permissive()),
        )
    }
}

use crate::{
    configuration::Settings, email_client::EmailClient, metrics::ContactMetrics,
    store::DocumentStore,
};
use axum::extract::FromRef;
use derive_getters::Getters;
use duplicate::duplicate_item;
use std::sync::Arc;

/// Handle to the document store, empty when no database could be set up.
#[derive(Debug, Clone)]
pub struct StoreHandle(pub Option<Arc<dyn DocumentStore>>);

#[derive(Debug, Clone, Getters)]
pub struct AppState {
    settings: Arc<Settings>,
    store: StoreHandle,
    email_client: Arc<EmailClient>,
    metrics: Arc<ContactMetrics>,
}

impl AppState {
    pub fn create(
        settings: Settings,
        store: Option<Arc<dyn DocumentStore>>,
        email_client: EmailClient,
        metrics: ContactMetrics,
    ) -> Self {
        Self {
            settings: Arc::new(settings),
            store: StoreHandle(store),
            email_client: Arc::new(email_client),
            metrics: Arc::new(metrics),
        }
    }
}

#[duplicate_item(
    service_type       field;
    [ Settings ]       [ settings ];
    [ EmailClient ]    [ email_client ];
    [ ContactMetrics ] [ metrics ];
)]
impl FromRef<AppState> for Arc<service_type> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.field.clone()
    }
}

impl FromRef<AppState> for StoreHandle {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.store.clone()
    }
}

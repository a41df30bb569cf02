use crate::{
    configuration::Settings,
    domain::{ContactEmail, ContactName, ContactSubmission},
    email_client::{DispatchOutcome, EmailClient, TransportMode},
    metrics::ContactMetrics,
    state::{AppState, StoreHandle},
    store::{StoreError, CONTACT_COLLECTION},
};
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use mongodb::bson::{doc, Document};
use std::sync::Arc;
use utoipa::ToSchema;

/// Create a router to serve the contact form endpoints.
pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/", post(submit_contact))
        .route("/health", get(contact_health))
}

/// Body of a contact form submission as received on the wire.
#[derive(Debug, serde::Deserialize, ToSchema)]
pub struct ContactPayload {
    name: String,
    email: String,
    message: String,
}

impl TryFrom<ContactPayload> for ContactSubmission {
    type Error = String;

    fn try_from(value: ContactPayload) -> Result<Self, Self::Error> {
        let name = ContactName::parse(value.name)?;
        let email = ContactEmail::parse(value.email)?;

        Ok(Self {
            name,
            email,
            message: value.message,
        })
    }
}

/// Merged result of storing the submission and notifying about it.
#[derive(Debug, serde::Serialize, ToSchema)]
pub struct ContactOutcome {
    ok: bool,
    email_dispatched: bool,
    target: String,
    note: String,
    error: Option<String>,
    smtp_mode: TransportMode,
    from_email: Option<String>,
}

impl ContactOutcome {
    fn new(dispatch: &DispatchOutcome, settings: &Settings) -> Self {
        let note = match dispatch {
            DispatchOutcome::Sent => "Stored in DB; email sent.",
            DispatchOutcome::NotConfigured => {
                "Stored in DB; email not sent (SMTP not configured)."
            }
            DispatchOutcome::Failed(_) => "Stored in DB; email attempt failed.",
        };

        Self {
            ok: true,
            email_dispatched: dispatch.sent(),
            target: settings.smtp().target_email().clone(),
            note: note.to_string(),
            error: dispatch.error(),
            smtp_mode: settings.smtp().mode(),
            from_email: dispatch
                .sent()
                .then(|| settings.smtp().from_email().clone()),
        }
    }
}

#[derive(thiserror::Error)]
pub enum ContactError {
    #[error("{0}")]
    ValidationError(String),
}

impl IntoResponse for ContactError {
    fn into_response(self) -> Response {
        match self {
            Self::ValidationError(_) => {
                (StatusCode::UNPROCESSABLE_ENTITY, self.to_string()).into_response()
            }
        }
    }
}

/// Accept a contact form submission.
///
/// The submission is stored first and a notification email is attempted
/// afterwards. Neither step can prevent the other, and the caller gets a
/// successful answer for every valid submission.
#[tracing::instrument(
    name = "Handle contact submission",
    skip(settings, store, email_client, metrics, payload),
    fields(
        sender_email = %payload.email,
        sender_name = %payload.name,
    )
)]
#[utoipa::path(
    post,
    path = "/api/contact",
    request_body = ContactPayload,
    responses(
        (status = OK, description = "Submission accepted", body = ContactOutcome),
        (status = UNPROCESSABLE_ENTITY, description = "Name or email is invalid"),
    )
)]
pub async fn submit_contact(
    State(settings): State<Arc<Settings>>,
    State(store): State<StoreHandle>,
    State(email_client): State<Arc<EmailClient>>,
    State(metrics): State<Arc<ContactMetrics>>,
    Json(payload): Json<ContactPayload>,
) -> Result<Json<ContactOutcome>, ContactError> {
    let submission =
        ContactSubmission::try_from(payload).map_err(ContactError::ValidationError)?;
    metrics.record_submission();

    if let Err(e) = persist_submission(&store, &submission).await {
        metrics.record_persist_failure();
        tracing::error!(
            error.cause_chain = ?e,
            error.message = %e,
            "Failed to store contact submission, continuing with notification"
        );
    }

    let dispatch = email_client.send_contact_notification(&submission).await;
    metrics.record_dispatch(&dispatch);

    Ok(Json(ContactOutcome::new(&dispatch, &settings)))
}

/// Store the submission in the contact collection.
#[tracing::instrument(name = "Saving contact submission in database", skip(store, submission))]
async fn persist_submission(
    store: &StoreHandle,
    submission: &ContactSubmission,
) -> Result<String, StoreError> {
    let store = store.0.as_ref().ok_or(StoreError::NotConfigured)?;
    let id = store
        .create_document(CONTACT_COLLECTION, contact_record(submission))
        .await?;
    tracing::info!(document_id = %id, "Contact submission has been saved");

    Ok(id)
}

/// The stored document holds exactly the validated submission fields.
fn contact_record(submission: &ContactSubmission) -> Document {
    doc! {
        "name": submission.name.as_ref(),
        "email": submission.email.as_ref(),
        "message": submission.message.as_str(),
    }
}

/// Whether notifications can be sent and how.
#[derive(Debug, serde::Serialize, ToSchema)]
pub struct ChannelStatus {
    smtp_configured: bool,
    host: Option<String>,
    port: u16,
    from_email: Option<String>,
    target_email: String,
    mode: TransportMode,
}

impl From<&Settings> for ChannelStatus {
    fn from(settings: &Settings) -> Self {
        let smtp = settings.smtp();
        let configured = smtp.is_configured();

        Self {
            smtp_configured: configured,
            host: smtp.host().as_ref().map(|_| "set".to_string()),
            port: *smtp.port(),
            from_email: configured.then(|| smtp.from_email().clone()),
            target_email: smtp.target_email().clone(),
            mode: smtp.mode(),
        }
    }
}

/// Report the state of the notification channel without contacting it.
#[tracing::instrument(skip(settings))]
#[utoipa::path(
    get,
    path = "/api/contact/health",
    responses((status = OK, description = "Notification channel status", body = ChannelStatus))
)]
pub async fn contact_health(State(settings): State<Arc<Settings>>) -> Json<ChannelStatus> {
    Json(ChannelStatus::from(settings.as_ref()))
}

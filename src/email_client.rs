//! Delivery of contact notifications over SMTP.
//!
//! Every notification opens its own SMTP session which is closed again once the
//! message has been handed over, whether the send succeeded or not.

use crate::{configuration::SmtpSettings, domain::ContactSubmission};
use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::{authentication::Credentials, AsyncSmtpTransportBuilder},
    Address, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use std::{sync::Arc, time::Duration};
use utoipa::ToSchema;

/// Port on which SMTP servers expect TLS from the first byte.
pub const IMPLICIT_TLS_PORT: u16 = 465;

const NOT_CONFIGURED: &str = "SMTP not configured";

/// How the SMTP session is secured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, ToSchema)]
pub enum TransportMode {
    /// Implicit TLS, the connection is encrypted before the greeting.
    #[serde(rename = "SSL")]
    Ssl,
    /// Plain connection upgraded with `STARTTLS` after the greeting.
    #[serde(rename = "STARTTLS")]
    StartTls,
}

impl TransportMode {
    pub fn from_port(port: u16) -> Self {
        if port == IMPLICIT_TLS_PORT {
            Self::Ssl
        } else {
            Self::StartTls
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ssl => "SSL",
            Self::StartTls => "STARTTLS",
        }
    }
}

/// Outcome of a single attempt to notify about a contact submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    Sent,
    NotConfigured,
    Failed(String),
}

impl DispatchOutcome {
    pub fn sent(&self) -> bool {
        matches!(self, Self::Sent)
    }

    pub fn error(&self) -> Option<String> {
        match self {
            Self::Sent => None,
            Self::NotConfigured => Some(NOT_CONFIGURED.to_string()),
            Self::Failed(reason) => Some(reason.clone()),
        }
    }

    /// Label used when counting outcomes.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Sent => "sent",
            Self::NotConfigured => "not_configured",
            Self::Failed(_) => "failed",
        }
    }
}

#[derive(thiserror::Error)]
pub enum MailError {
    #[error("SMTP is not configured")]
    NotConfigured,
    #[error("Invalid email address: {0}")]
    InvalidAddress(#[from] lettre::address::AddressError),
    #[error("Failed to build the notification message: {0}")]
    Message(#[from] lettre::error::Error),
    #[error(transparent)]
    Smtp(#[from] lettre::transport::smtp::Error),
    #[error("SMTP session timed out after {0:?}")]
    Timeout(Duration),
}

/// A way of handing a finished message over for delivery.
#[async_trait]
pub trait MailTransport: Send + Sync + std::fmt::Debug {
    async fn send(&self, message: Message) -> Result<(), MailError>;
}

/// Sends the notification through the configured SMTP server.
#[derive(Debug)]
pub struct SmtpMailTransport {
    settings: SmtpSettings,
}

impl SmtpMailTransport {
    pub fn new(settings: SmtpSettings) -> Self {
        Self { settings }
    }

    fn build_transport(&self) -> Result<AsyncSmtpTransport<Tokio1Executor>, MailError> {
        self.build_transport_for(self.settings.mode())
    }

    /// Build a transport for a single session secured as `mode` says.
    /// `Ssl` wraps the connection in TLS before the greeting, `StartTls`
    /// connects in plain text and refuses to continue without an upgrade.
    fn build_transport_for(
        &self,
        mode: TransportMode,
    ) -> Result<AsyncSmtpTransport<Tokio1Executor>, MailError> {
        let host = self.settings.host().as_deref().ok_or(MailError::NotConfigured)?;
        let builder = match mode {
            TransportMode::Ssl => AsyncSmtpTransport::<Tokio1Executor>::relay(host)?,
            TransportMode::StartTls => {
                AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)?
            }
        };

        self.configure(builder)
    }

    /// Apply port, credentials and socket timeout from the settings.
    fn configure(
        &self,
        builder: AsyncSmtpTransportBuilder,
    ) -> Result<AsyncSmtpTransport<Tokio1Executor>, MailError> {
        let (user, password) = self.settings.credentials().ok_or(MailError::NotConfigured)?;

        Ok(builder
            .port(*self.settings.port())
            .credentials(Credentials::new(user, password))
            .timeout(Some(*self.settings.timeout()))
            .build())
    }

    /// Hand `message` to `transport`, giving up once the whole session took
    /// longer than the configured timeout.
    async fn deliver(
        &self,
        transport: AsyncSmtpTransport<Tokio1Executor>,
        message: Message,
    ) -> Result<(), MailError> {
        let timeout = *self.settings.timeout();

        let response = tokio::time::timeout(timeout, transport.send(message))
            .await
            .map_err(|_| MailError::Timeout(timeout))??;
        tracing::debug!(code = %response.code(), "SMTP server accepted the message");

        Ok(())
    }
}

#[async_trait]
impl MailTransport for SmtpMailTransport {
    #[tracing::instrument(
        name = "Deliver message over SMTP",
        skip(self, message),
        fields(smtp_host = ?self.settings.host(), smtp_port = *self.settings.port(), smtp_mode = self.settings.mode().as_str())
    )]
    async fn send(&self, message: Message) -> Result<(), MailError> {
        let transport = self.build_transport()?;
        self.deliver(transport, message).await
    }
}

/// Client used to notify the site owner about new contact submissions.
#[derive(Debug)]
pub struct EmailClient {
    settings: SmtpSettings,
    transport: Arc<dyn MailTransport>,
}

impl EmailClient {
    /// Create a new email client delivering through SMTP.
    pub fn new(settings: SmtpSettings) -> Self {
        let transport = Arc::new(SmtpMailTransport::new(settings.clone()));
        Self::with_transport(settings, transport)
    }

    /// Create an email client handing messages to the given transport.
    pub fn with_transport(settings: SmtpSettings, transport: Arc<dyn MailTransport>) -> Self {
        Self {
            settings,
            transport,
        }
    }

    pub fn settings(&self) -> &SmtpSettings {
        &self.settings
    }

    /// Try once to notify the target address about a new submission.
    /// Failures are reported in the returned outcome and never retried.
    #[tracing::instrument(
        name = "Send contact notification",
        skip(self, submission),
        fields(sender_email = %submission.email)
    )]
    pub async fn send_contact_notification(
        &self,
        submission: &ContactSubmission,
    ) -> DispatchOutcome {
        if !self.settings.is_configured() {
            tracing::info!("SMTP is not configured, skipping notification");
            return DispatchOutcome::NotConfigured;
        }

        let result = match self.build_message(submission) {
            Ok(message) => self.transport.send(message).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(()) => {
                tracing::info!(target_email = %self.settings.target_email(), "Notification sent");
                DispatchOutcome::Sent
            }
            Err(e) => {
                tracing::error!(
                    error.cause_chain = ?e,
                    error.message = %e,
                    "Failed to send contact notification"
                );
                DispatchOutcome::Failed(e.to_string())
            }
        }
    }

    fn build_message(&self, submission: &ContactSubmission) -> Result<Message, MailError> {
        let from = Mailbox::new(
            Some("Portfolio".to_string()),
            self.settings.from_email().parse::<Address>()?,
        );
        let to: Mailbox = self.settings.target_email().parse()?;
        let reply_to: Mailbox = submission.email.as_ref().parse()?;

        let name = submission.name.as_ref();
        let body = format!(
            "New collaboration request from {name} <{}>\n\nMessage:\n{}\n",
            submission.email, submission.message
        );

        Ok(Message::builder()
            .from(from)
            .to(to)
            .reply_to(reply_to)
            .subject(format!("Portfolio Collaboration: {name}"))
            .header(ContentType::TEXT_PLAIN)
            .body(body)?)
    }
}

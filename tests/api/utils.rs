use async_trait::async_trait;
use derive_getters::Getters;
use lettre::Message;
use mongodb::bson::Document;
use once_cell::sync::Lazy;
use portfolio_backend::{
    configuration::settings_from,
    email_client::{EmailClient, MailError, MailTransport},
    store::{DocumentStore, StoreError},
    telemetry::{get_subscriber, init_subscriber},
    App,
};
use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

static TRACING: Lazy<()> = Lazy::new(|| {
    if std::env::var("TEST_LOG").is_ok() {
        let subscriber = get_subscriber("test".into(), std::io::stdout);
        init_subscriber(subscriber).expect("Failed to init tracing");
    } else {
        let subscriber = get_subscriber("test".into(), std::io::sink);
        init_subscriber(subscriber).expect("Failed to init tracing");
    };
});

/// In-memory document store remembering everything written to it.
#[derive(Debug, Default)]
pub struct RecordingStore {
    documents: Mutex<Vec<(String, Document)>>,
    collections: Vec<String>,
    fail: bool,
}

impl RecordingStore {
    pub fn with_collections(count: usize) -> Self {
        Self {
            collections: (0..count).map(|i| format!("collection_{i}")).collect(),
            ..Default::default()
        }
    }

    /// A store on which every operation fails as if the server was unreachable.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn documents(&self) -> Vec<(String, Document)> {
        self.documents.lock().unwrap().clone()
    }

    fn unreachable() -> StoreError {
        StoreError::Mongo(
            std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "Server selection timeout: No available servers. Topology: Unknown",
            )
            .into(),
        )
    }
}

#[async_trait]
impl DocumentStore for RecordingStore {
    async fn create_document(
        &self,
        collection: &str,
        record: Document,
    ) -> Result<String, StoreError> {
        if self.fail {
            return Err(Self::unreachable());
        }

        let mut documents = self.documents.lock().unwrap();
        documents.push((collection.to_string(), record));
        Ok(documents.len().to_string())
    }

    async fn list_collection_names(&self) -> Result<Vec<String>, StoreError> {
        if self.fail {
            return Err(Self::unreachable());
        }

        Ok(self.collections.clone())
    }
}

/// Mail transport keeping every message instead of sending it.
#[derive(Debug, Default)]
pub struct RecordingTransport {
    messages: Mutex<Vec<Message>>,
    fail: bool,
}

impl RecordingTransport {
    /// A transport that receives the message but fails to deliver it.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn messages(&self) -> Vec<Message> {
        self.messages.lock().unwrap().clone()
    }
}

#[async_trait]
impl MailTransport for RecordingTransport {
    async fn send(&self, message: Message) -> Result<(), MailError> {
        self.messages.lock().unwrap().push(message);
        if self.fail {
            Err(MailError::Timeout(Duration::from_secs(10)))
        } else {
            Ok(())
        }
    }
}

/// How the mail side of the app under test is wired.
pub enum Mailer {
    Recording(RecordingTransport),
    /// The real SMTP transport, talking to whatever the settings point at.
    Smtp,
}

#[derive(Debug, Getters)]
pub struct TestApp {
    address: String,
    store: Option<Arc<RecordingStore>>,
    transport: Option<Arc<RecordingTransport>>,
    api_client: reqwest::Client,
}

impl TestApp {
    pub fn at_url(&self, path: &str) -> String {
        format!("{}{path}", self.address)
    }

    pub async fn get(&self, path: &str) -> reqwest::Response {
        self.api_client
            .get(self.at_url(path))
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn post_contact(&self, body: &serde_json::Value) -> reqwest::Response {
        self.api_client
            .post(self.at_url("/api/contact"))
            .json(body)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub fn stored_documents(&self) -> Vec<(String, Document)> {
        self.store
            .as_ref()
            .map(|store| store.documents())
            .unwrap_or_default()
    }

    pub fn sent_messages(&self) -> Vec<Message> {
        self.transport
            .as_ref()
            .map(|transport| transport.messages())
            .unwrap_or_default()
    }
}

/// Configuration keys for a complete SMTP setup on the given port.
pub fn smtp_settings(port: u16) -> Vec<(&'static str, String)> {
    vec![
        ("smtp_host", "127.0.0.1".to_string()),
        ("smtp_port", port.to_string()),
        ("smtp_user", "mailer@example.com".to_string()),
        ("smtp_pass", "hunter2".to_string()),
        ("from_email", "hello@example.com".to_string()),
        ("smtp_timeout_secs", "2".to_string()),
    ]
}

/// Spawn an instance of the app without SMTP configured and with an empty
/// in-memory store.
pub async fn spawn_app() -> TestApp {
    spawn_app_with(
        vec![],
        Some(RecordingStore::default()),
        Mailer::Recording(RecordingTransport::default()),
    )
    .await
}

/// Spawn an instance of the app on a random port with the given configuration
/// keys and collaborators.
pub async fn spawn_app_with(
    mut overrides: Vec<(&'static str, String)>,
    store: Option<RecordingStore>,
    mailer: Mailer,
) -> TestApp {
    Lazy::force(&TRACING);

    // Make OS choose random port
    overrides.push(("host", "127.0.0.1".to_string()));
    overrides.push(("port", "0".to_string()));
    let settings = settings_from(overrides).expect("Failed to build settings");

    let store = store.map(Arc::new);
    let (email_client, transport) = match mailer {
        Mailer::Recording(transport) => {
            let transport = Arc::new(transport);
            (
                EmailClient::with_transport(settings.smtp().clone(), transport.clone()),
                Some(transport),
            )
        }
        Mailer::Smtp => (EmailClient::new(settings.smtp().clone()), None),
    };

    let app = App::build_with(
        settings,
        store.clone().map(|s| s as Arc<dyn DocumentStore>),
        email_client,
    )
    .expect("Failed to build app");
    let address = format!("http://127.0.0.1:{}", app.port());

    // Start server
    let _ = tokio::spawn(app.run_until_stopped());

    TestApp {
        address,
        store,
        transport,
        api_client: reqwest::Client::new(),
    }
}

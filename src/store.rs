use crate::configuration::DatabaseSettings;
use async_trait::async_trait;
use mongodb::{bson::Document, options::ClientOptions, Client, Database};
use std::{sync::Arc, time::Duration};

/// Collection holding one document per accepted contact submission.
pub const CONTACT_COLLECTION: &str = "contact";

#[derive(thiserror::Error)]
pub enum StoreError {
    #[error("No database is configured")]
    NotConfigured,
    #[error(transparent)]
    Mongo(#[from] mongodb::error::Error),
}

/// The operations needed from the document database.
#[async_trait]
pub trait DocumentStore: Send + Sync + std::fmt::Debug {
    /// Insert `record` into `collection`, returning the id of the new document.
    async fn create_document(&self, collection: &str, record: Document)
        -> Result<String, StoreError>;

    async fn list_collection_names(&self) -> Result<Vec<String>, StoreError>;
}

/// Document store backed by MongoDB.
#[derive(Debug, Clone)]
pub struct MongoStore {
    db: Database,
}

impl MongoStore {
    /// Create a client for the database at `url`. The driver connects lazily,
    /// so this only fails on an invalid connection string.
    #[tracing::instrument(name = "Create MongoDB client", skip(url))]
    pub async fn connect(url: &str, database: &str) -> Result<Self, StoreError> {
        let mut options = ClientOptions::parse(url).await?;
        options.app_name = Some(env!("CARGO_PKG_NAME").to_string());
        options.server_selection_timeout = Some(Duration::from_secs(5));

        let client = Client::with_options(options)?;
        tracing::info!(database = %database, "MongoDB client created");

        Ok(Self {
            db: client.database(database),
        })
    }
}

#[async_trait]
impl DocumentStore for MongoStore {
    #[tracing::instrument(name = "Insert document", skip(self, record))]
    async fn create_document(
        &self,
        collection: &str,
        record: Document,
    ) -> Result<String, StoreError> {
        let result = self
            .db
            .collection::<Document>(collection)
            .insert_one(record, None)
            .await?;

        let id = match result.inserted_id.as_object_id() {
            Some(oid) => oid.to_hex(),
            None => result.inserted_id.to_string(),
        };
        Ok(id)
    }

    #[tracing::instrument(name = "List collections", skip(self))]
    async fn list_collection_names(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.db.list_collection_names(None).await?)
    }
}

/// Build the store from the settings, if a database is configured at all.
/// A store that cannot be created is logged and left out, the service keeps
/// running without persistence.
pub async fn connect_store(settings: &DatabaseSettings) -> Option<Arc<dyn DocumentStore>> {
    let (Some(url), Some(name)) = (settings.url().as_deref(), settings.name().as_deref()) else {
        tracing::warn!("DATABASE_URL or DATABASE_NAME not set, running without a database");
        return None;
    };

    match MongoStore::connect(url, name).await {
        Ok(store) => Some(Arc::new(store)),
        Err(e) => {
            tracing::error!(
                error.cause_chain = ?e,
                error.message = %e,
                "Failed to create the database client"
            );
            None
        }
    }
}

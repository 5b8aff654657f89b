//! MongoDB sink for export operations
//!
//! Every document is inserted on its own into the target collection. Single
//! values become BSON strings and repeated values become arrays of strings.

use async_trait::async_trait;
use bson::Document;
use mongodb::options::{ClientOptions, Credential};
use mongodb::{Client, Collection};
use tracing::{debug, info};

use crate::config::MongoConfig;
use crate::document::IntermediateDocument;
use crate::error::mongo::extract_failure;
use crate::error::{Result, SinkError};

use super::RecordSink;

/// Default MongoDB port
pub const DEFAULT_PORT: u16 = 27017;

/// Connection and target parameters of a [`MongoSink`]
#[derive(Debug, Clone)]
pub struct MongoSinkOptions {
    /// Hostname, `host:port`, or a full `mongodb://` / `mongodb+srv://` URI
    pub host: String,
    pub port: Option<u16>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub database: String,
    pub collection: String,
    /// Keep existing documents instead of dropping the collection
    pub append: bool,
}

impl MongoSinkOptions {
    pub fn new(
        host: impl Into<String>,
        database: impl Into<String>,
        collection: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            port: None,
            user: None,
            password: None,
            database: database.into(),
            collection: collection.into(),
            append: false,
        }
    }

    /// Build the connection URI
    ///
    /// Credentials are never placed in the URI; see [`Self::credential`].
    pub fn connection_uri(&self) -> String {
        if self.host.contains("://") {
            return self.host.clone();
        }

        // an explicit port wins over one written as `host:port`
        let (host, embedded_port) = match self.host.rsplit_once(':') {
            Some((host, port)) if port.parse::<u16>().is_ok() => (host, Some(port)),
            _ => (self.host.as_str(), None),
        };
        let port = match (self.port, embedded_port) {
            (Some(port), _) => port.to_string(),
            (None, Some(port)) => port.to_string(),
            (None, None) => DEFAULT_PORT.to_string(),
        };

        format!("mongodb://{host}:{port}")
    }

    /// Credential for the configured user, if any
    pub fn credential(&self) -> Option<Credential> {
        let user = self.user.as_ref()?;
        let mut credential = Credential::default();
        credential.username = Some(user.clone());
        credential.password = self.password.clone();
        Some(credential)
    }

    /// `database.collection`, for messages
    pub fn namespace(&self) -> String {
        format!("{}.{}", self.database, self.collection)
    }

    fn validate(&self) -> Result<()> {
        if self.database.is_empty() || self.collection.is_empty() {
            return Err(SinkError::InvalidOptions(
                "database and collection names must not be empty".to_string(),
            )
            .into());
        }
        if self.password.is_some() && self.user.is_none() {
            return Err(
                SinkError::InvalidOptions("a password requires a user".to_string()).into(),
            );
        }
        Ok(())
    }
}

/// Writer for a MongoDB collection
pub struct MongoSink {
    /// Pooled client, `None` once closed
    client: Option<Client>,
    collection: Collection<Document>,
    namespace: String,
    written: u64,
}

impl MongoSink {
    /// Connect, and drop the target collection unless appending
    pub async fn connect(options: MongoSinkOptions, config: &MongoConfig) -> Result<Self> {
        options.validate()?;

        let mut client_options = ClientOptions::parse(options.connection_uri()).await?;
        client_options.app_name = Some(config.app_name.clone());
        client_options.connect_timeout = Some(config.connect_timeout());
        client_options.server_selection_timeout = Some(config.connect_timeout());
        if let Some(credential) = options.credential() {
            client_options.credential = Some(credential);
        }

        let client = Client::with_options(client_options)
            .map_err(|e| SinkError::Open(extract_failure(&e).to_string()))?;
        let collection = client
            .database(&options.database)
            .collection::<Document>(&options.collection);
        let namespace = options.namespace();

        if options.append {
            debug!("Appending to {}", namespace);
        } else {
            collection
                .drop()
                .await
                .map_err(|e| SinkError::Open(format!("{}: {}", namespace, extract_failure(&e))))?;
            info!("Dropped collection {}", namespace);
        }

        Ok(Self {
            client: Some(client),
            collection,
            namespace,
            written: 0,
        })
    }
}

#[async_trait]
impl RecordSink for MongoSink {
    async fn write(&mut self, doc: &IntermediateDocument) -> Result<()> {
        if self.client.is_none() {
            return Err(SinkError::Write(format!("{} is closed", self.namespace)).into());
        }

        self.collection
            .insert_one(doc.to_bson())
            .await
            .map_err(|e| {
                let failure = extract_failure(&e);
                debug!(
                    failure = %failure.to_json().unwrap_or_else(|err| err.to_string()),
                    "Insert into {} failed after {} documents",
                    self.namespace,
                    self.written
                );
                SinkError::Write(format!("{}: {}", self.namespace, failure))
            })?;
        self.written += 1;
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        if let Some(client) = self.client.take() {
            client.shutdown().await;
            debug!(
                "Closed connection to {} ({} documents)",
                self.namespace, self.written
            );
        }
        Ok(())
    }

    fn written(&self) -> u64 {
        self.written
    }
}

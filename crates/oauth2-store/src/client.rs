//! OAuth client storage.
//!
//! Append-only store of client registrations keyed by client id. Structured
//! like the token store, without keyed deletes or an expiry sweep.

use std::sync::Arc;

use tracing::{debug, info, instrument};

use crate::StorageResult;
use crate::codec;
use crate::config::ClientStoreConfig;
use crate::database::{Database, Executor, Row, Value};
use crate::logger::{Logger, TracingLogger};
use crate::types::Client;

// =============================================================================
// Types
// =============================================================================

/// Client record as stored in the database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientRow {
    /// Client id (primary key)
    pub id: String,
    pub secret: String,
    pub domain: String,
    /// Encoded [`Client`]
    pub data: Vec<u8>,
}

impl ClientRow {
    /// Build the record to insert for a client.
    ///
    /// # Errors
    ///
    /// Returns `Serialization` if the client cannot be encoded.
    pub fn from_client(client: &Client) -> StorageResult<Self> {
        Ok(Self {
            id: client.id.clone(),
            secret: client.secret.clone(),
            domain: client.domain.clone(),
            data: codec::encode(client)?,
        })
    }

    /// Decode a database row.
    ///
    /// # Errors
    ///
    /// Returns `InvalidRow` if a column is missing or has the wrong kind.
    pub fn from_row(row: &Row) -> StorageResult<Self> {
        Ok(Self {
            id: row.text("id")?,
            secret: row.text("secret")?,
            domain: row.text("domain")?,
            data: row.blob("data")?,
        })
    }

    /// Decode the stored client.
    ///
    /// # Errors
    ///
    /// Returns `Serialization` if the blob is not a valid client.
    pub fn client(&self) -> StorageResult<Client> {
        codec::decode(&self.data)
    }
}

// =============================================================================
// Builder
// =============================================================================

/// Builder for [`ClientStore`].
pub struct ClientStoreBuilder {
    db: Arc<dyn Database>,
    config: ClientStoreConfig,
    logger: Arc<dyn Logger>,
}

impl ClientStoreBuilder {
    /// Replace the whole configuration.
    #[must_use]
    pub fn config(mut self, config: ClientStoreConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the logger handed to the store.
    #[must_use]
    pub fn logger(mut self, logger: Arc<dyn Logger>) -> Self {
        self.logger = logger;
        self
    }

    /// Construct the store, ensuring its table exists unless disabled.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` for a rejected configuration, or the
    /// database error of the table bootstrap.
    pub async fn build(self) -> StorageResult<ClientStore> {
        let Self { db, config, logger } = self;
        config.validate()?;

        let executor = Executor::new(db, config.statement_timeout);
        let table = config.table_name;

        if !config.init_table_disabled {
            executor.execute(&init_table_sql(&table), &[]).await?;
            info!(table = %table, "Client table ensured");
        }

        Ok(ClientStore {
            executor,
            table,
            logger,
        })
    }
}

// =============================================================================
// Client Store
// =============================================================================

/// Client record store.
pub struct ClientStore {
    executor: Executor,
    table: String,
    logger: Arc<dyn Logger>,
}

impl ClientStore {
    /// Start building a store over a shared database capability.
    #[must_use]
    pub fn builder(db: Arc<dyn Database>) -> ClientStoreBuilder {
        ClientStoreBuilder {
            db,
            config: ClientStoreConfig::default(),
            logger: Arc::new(TracingLogger),
        }
    }

    /// Construct a store with the default logger.
    ///
    /// # Errors
    ///
    /// See [`ClientStoreBuilder::build`].
    pub async fn new(db: Arc<dyn Database>, config: ClientStoreConfig) -> StorageResult<Self> {
        Self::builder(db).config(config).build().await
    }

    /// Logger configured for this store.
    ///
    /// The store itself never writes to it: client operations have no
    /// background work, and their errors go to the caller.
    #[must_use]
    pub fn logger(&self) -> &dyn Logger {
        self.logger.as_ref()
    }

    /// Table this store writes to.
    #[must_use]
    pub fn table_name(&self) -> &str {
        &self.table
    }

    /// Store a new client registration.
    ///
    /// # Errors
    ///
    /// Returns `Serialization` before touching the database if the client
    /// cannot be encoded, otherwise the database error verbatim (including
    /// duplicate ids).
    #[instrument(skip_all, fields(table = %self.table, client_id = %client.id))]
    pub async fn create(&self, client: &Client) -> StorageResult<()> {
        let row = ClientRow::from_client(client)?;

        self.executor
            .execute(
                &format!(
                    "INSERT INTO {} (id, secret, domain, data) VALUES ($1, $2, $3, $4)",
                    self.table
                ),
                &[
                    Value::Text(row.id),
                    Value::Text(row.secret),
                    Value::Text(row.domain),
                    Value::Blob(row.data),
                ],
            )
            .await?;

        debug!("Client stored");
        Ok(())
    }

    /// Find a client by id.
    ///
    /// An empty id returns `Ok(None)` without querying.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::NoRows`](crate::StorageError::NoRows) when no
    /// client matches, a decoding error for a malformed record, and the
    /// database error verbatim otherwise.
    #[instrument(skip(self), fields(table = %self.table))]
    pub async fn get_by_id(&self, id: &str) -> StorageResult<Option<Client>> {
        if id.is_empty() {
            return Ok(None);
        }

        let row = self
            .executor
            .select_one(
                &format!(
                    "SELECT id, secret, domain, data FROM {} WHERE id = $1",
                    self.table
                ),
                &[Value::from(id)],
            )
            .await?;

        ClientRow::from_row(&row)?.client().map(Some)
    }
}

fn init_table_sql(table: &str) -> String {
    format!(
        r#"
CREATE TABLE IF NOT EXISTS {table} (
  id     TEXT  NOT NULL,
  secret TEXT  NOT NULL,
  domain TEXT  NOT NULL,
  data   JSONB NOT NULL,
  CONSTRAINT {table}_pkey PRIMARY KEY (id)
);
"#
    )
}

// =============================================================================
// Tests
// =============================================================================

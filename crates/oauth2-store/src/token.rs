//! Token record store.
//!
//! Persists [`Token`] grants in a single table with three independent
//! lookup keys (authorization code, access token, refresh token) and runs
//! the background sweep that deletes records past their `expires_at`.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use oauth2_store::{TokenStore, TokenStoreConfig};
//!
//! let store = TokenStore::builder(db)
//!     .config(TokenStoreConfig::default().with_table_name("tokens"))
//!     .build()
//!     .await?;
//!
//! store.create(&token).await?;
//! let found = store.get_by_access("at-123").await?;
//! store.close();
//! ```

use std::fmt;
use std::sync::Arc;

use time::OffsetDateTime;
use tracing::{debug, info, instrument};

use crate::{StorageError, StorageResult};
use crate::codec;
use crate::config::TokenStoreConfig;
use crate::database::{Database, Executor, Row, Value};
use crate::logger::{Logger, TracingLogger};
use crate::sweep::Sweeper;
use crate::types::Token;

// =============================================================================
// Types
// =============================================================================

/// Token record as stored in the database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenRow {
    /// Database-assigned surrogate key
    pub id: i64,
    /// Insert time
    pub created_at: OffsetDateTime,
    /// Retention deadline, see [`Token::retention_deadline`]
    pub expires_at: OffsetDateTime,
    pub code: String,
    pub access: String,
    pub refresh: String,
    /// Encoded [`Token`]
    pub data: Vec<u8>,
}

impl TokenRow {
    /// Build the record to insert for a grant.
    ///
    /// A code grant stores only its code; an access grant stores its access
    /// token and, when present, its refresh token.
    ///
    /// # Errors
    ///
    /// Returns `InvalidGrant` if the retention deadline overflows, and
    /// `Serialization` if the grant cannot be encoded.
    pub fn from_token(token: &Token, created_at: OffsetDateTime) -> StorageResult<Self> {
        let expires_at = token.retention_deadline()?;
        let data = codec::encode(token)?;
        let mut row = Self {
            id: 0,
            created_at,
            expires_at,
            code: String::new(),
            access: String::new(),
            refresh: String::new(),
            data,
        };

        if token.is_code_grant() {
            row.code = token.code.clone();
        } else {
            row.access = token.access.clone();
            row.refresh = token.refresh.clone();
        }

        Ok(row)
    }

    /// Decode a database row.
    ///
    /// # Errors
    ///
    /// Returns `InvalidRow` if a column is missing or has the wrong kind.
    pub fn from_row(row: &Row) -> StorageResult<Self> {
        Ok(Self {
            id: row.big_int("id")?,
            created_at: row.timestamp("created_at")?,
            expires_at: row.timestamp("expires_at")?,
            code: row.text("code")?,
            access: row.text("access")?,
            refresh: row.text("refresh")?,
            data: row.blob("data")?,
        })
    }

    /// Decode the stored grant.
    ///
    /// # Errors
    ///
    /// Returns `Serialization` if the blob is not a valid grant.
    pub fn token(&self) -> StorageResult<Token> {
        codec::decode(&self.data)
    }
}

/// Column used to look up or delete a token record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKey {
    Code,
    Access,
    Refresh,
}

impl TokenKey {
    /// Column name in the token table.
    #[must_use]
    pub fn column(self) -> &'static str {
        match self {
            Self::Code => "code",
            Self::Access => "access",
            Self::Refresh => "refresh",
        }
    }
}

impl fmt::Display for TokenKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

// =============================================================================
// Builder
// =============================================================================

/// Builder for [`TokenStore`].
pub struct TokenStoreBuilder {
    db: Arc<dyn Database>,
    config: TokenStoreConfig,
    logger: Arc<dyn Logger>,
}

impl TokenStoreBuilder {
    /// Replace the whole configuration.
    #[must_use]
    pub fn config(mut self, config: TokenStoreConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the logger receiving sweep failures.
    #[must_use]
    pub fn logger(mut self, logger: Arc<dyn Logger>) -> Self {
        self.logger = logger;
        self
    }

    /// Construct the store.
    ///
    /// Unless disabled, this first ensures the table and its indexes exist,
    /// then spawns the expiry sweep on the current tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` for a rejected configuration, or the
    /// database error of the table bootstrap. The sweep is not started in
    /// either case.
    pub async fn build(self) -> StorageResult<TokenStore> {
        let Self { db, config, logger } = self;
        config.validate()?;

        let executor = Executor::new(db, config.statement_timeout);
        let table = config.table_name.clone();

        if !config.init_table_disabled {
            executor.execute(&init_table_sql(&table), &[]).await?;
            info!(table = %table, "Token table ensured");
        }

        let sweeper = (!config.gc_disabled).then(|| {
            Sweeper::spawn(
                executor.clone(),
                format!("DELETE FROM {table} WHERE expires_at <= $1"),
                config.gc_interval,
                logger,
            )
        });

        Ok(TokenStore {
            executor,
            table,
            sweeper,
        })
    }
}

// =============================================================================
// Token Store
// =============================================================================

/// Token record store.
///
/// Records are immutable once inserted: they are removed explicitly by key
/// or by the expiry sweep. The store performs no locking of its own; the
/// sweep and foreground calls share the [`Database`] concurrently.
pub struct TokenStore {
    executor: Executor,
    table: String,
    sweeper: Option<Sweeper>,
}

impl TokenStore {
    /// Start building a store over a shared database capability.
    #[must_use]
    pub fn builder(db: Arc<dyn Database>) -> TokenStoreBuilder {
        TokenStoreBuilder {
            db,
            config: TokenStoreConfig::default(),
            logger: Arc::new(TracingLogger),
        }
    }

    /// Construct a store with the default logger.
    ///
    /// # Errors
    ///
    /// See [`TokenStoreBuilder::build`].
    pub async fn new(db: Arc<dyn Database>, config: TokenStoreConfig) -> StorageResult<Self> {
        Self::builder(db).config(config).build().await
    }

    /// Table this store writes to.
    #[must_use]
    pub fn table_name(&self) -> &str {
        &self.table
    }

    /// Returns `true` while the expiry sweep task is running.
    #[must_use]
    pub fn is_gc_running(&self) -> bool {
        self.sweeper.as_ref().is_some_and(|s| !s.is_finished())
    }

    /// Stop the expiry sweep.
    ///
    /// Takes effect before the next tick; a sweep delete already in flight
    /// and concurrent foreground calls are not interrupted. The database
    /// capability is left untouched and the store stays usable for reads
    /// and writes.
    pub fn close(&self) {
        if let Some(sweeper) = &self.sweeper {
            sweeper.stop();
        }
    }

    /// Store a new grant.
    ///
    /// # Errors
    ///
    /// Returns `InvalidGrant` or `Serialization` before touching the
    /// database if the grant cannot be stored, otherwise the database error
    /// verbatim.
    #[instrument(skip_all, fields(table = %self.table))]
    pub async fn create(&self, token: &Token) -> StorageResult<()> {
        let row = TokenRow::from_token(token, OffsetDateTime::now_utc())?;

        self.executor
            .execute(
                &format!(
                    "INSERT INTO {} (created_at, expires_at, code, access, refresh, data) \
                     VALUES ($1, $2, $3, $4, $5, $6)",
                    self.table
                ),
                &[
                    Value::Timestamp(row.created_at),
                    Value::Timestamp(row.expires_at),
                    Value::Text(row.code),
                    Value::Text(row.access),
                    Value::Text(row.refresh),
                    Value::Blob(row.data),
                ],
            )
            .await?;

        debug!(expires_at = %row.expires_at, "Token stored");
        Ok(())
    }

    /// Find a grant by authorization code.
    ///
    /// # Errors
    ///
    /// See [`TokenStore::get_by`].
    pub async fn get_by_code(&self, code: &str) -> StorageResult<Option<Token>> {
        self.get_by(TokenKey::Code, code).await
    }

    /// Find a grant by access token.
    ///
    /// # Errors
    ///
    /// See [`TokenStore::get_by`].
    pub async fn get_by_access(&self, access: &str) -> StorageResult<Option<Token>> {
        self.get_by(TokenKey::Access, access).await
    }

    /// Find a grant by refresh token.
    ///
    /// # Errors
    ///
    /// See [`TokenStore::get_by`].
    pub async fn get_by_refresh(&self, refresh: &str) -> StorageResult<Option<Token>> {
        self.get_by(TokenKey::Refresh, refresh).await
    }

    /// Find a grant by one of its keys.
    ///
    /// An empty key returns `Ok(None)` without querying: "nothing asked" is
    /// not "not found".
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::NoRows`] when no record matches, `InvalidRow`
    /// or `Serialization` when the stored record cannot be decoded, and the
    /// database error verbatim otherwise.
    #[instrument(skip(self, value), fields(table = %self.table))]
    pub async fn get_by(&self, key: TokenKey, value: &str) -> StorageResult<Option<Token>> {
        if value.is_empty() {
            return Ok(None);
        }

        let row = self
            .executor
            .select_one(
                &format!(
                    "SELECT id, created_at, expires_at, code, access, refresh, data \
                     FROM {} WHERE {} = $1",
                    self.table,
                    key.column()
                ),
                &[Value::from(value)],
            )
            .await?;

        TokenRow::from_row(&row)?.token().map(Some)
    }

    /// Delete the grant holding an authorization code.
    ///
    /// # Errors
    ///
    /// See [`TokenStore::remove_by`].
    pub async fn remove_by_code(&self, code: &str) -> StorageResult<()> {
        self.remove_by(TokenKey::Code, code).await
    }

    /// Delete the grant holding an access token.
    ///
    /// # Errors
    ///
    /// See [`TokenStore::remove_by`].
    pub async fn remove_by_access(&self, access: &str) -> StorageResult<()> {
        self.remove_by(TokenKey::Access, access).await
    }

    /// Delete the grant holding a refresh token.
    ///
    /// # Errors
    ///
    /// See [`TokenStore::remove_by`].
    pub async fn remove_by_refresh(&self, refresh: &str) -> StorageResult<()> {
        self.remove_by(TokenKey::Refresh, refresh).await
    }

    /// Delete grants by one of their keys.
    ///
    /// An empty key returns `Ok(())` without issuing a statement: empty
    /// marks an absent key, so matching on it would hit unrelated grants.
    /// Deleting nothing is success. Drivers that can only report an empty
    /// delete through [`StorageError::NoRows`] are covered too: that
    /// sentinel is treated as success here.
    ///
    /// # Errors
    ///
    /// Returns any other database error verbatim.
    #[instrument(skip(self, value), fields(table = %self.table))]
    pub async fn remove_by(&self, key: TokenKey, value: &str) -> StorageResult<()> {
        if value.is_empty() {
            return Ok(());
        }

        let result = self
            .executor
            .execute(
                &format!("DELETE FROM {} WHERE {} = $1", self.table, key.column()),
                &[Value::from(value)],
            )
            .await;

        match result {
            Ok(()) | Err(StorageError::NoRows) => Ok(()),
            Err(e) => Err(e),
        }
    }
}

fn init_table_sql(table: &str) -> String {
    format!(
        r#"
CREATE TABLE IF NOT EXISTS {table} (
  id         BIGSERIAL   NOT NULL,
  created_at TIMESTAMPTZ NOT NULL,
  expires_at TIMESTAMPTZ NOT NULL,
  code       TEXT        NOT NULL,
  access     TEXT        NOT NULL,
  refresh    TEXT        NOT NULL,
  data       JSONB       NOT NULL,
  CONSTRAINT {table}_pkey PRIMARY KEY (id)
);

CREATE INDEX IF NOT EXISTS idx_{table}_expires_at ON {table} (expires_at);
CREATE INDEX IF NOT EXISTS idx_{table}_code ON {table} (code);
CREATE INDEX IF NOT EXISTS idx_{table}_access ON {table} (access);
CREATE INDEX IF NOT EXISTS idx_{table}_refresh ON {table} (refresh);
"#
    )
}

// =============================================================================
// Tests
// =============================================================================

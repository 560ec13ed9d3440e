//! PostgreSQL implementation of the database capability.

use std::sync::Arc;

use async_trait::async_trait;
use sqlx_core::query::query;
use sqlx_core::raw_sql::raw_sql;
use sqlx_postgres::Postgres;
use tracing::{debug, instrument};

use oauth2_store::{Database, Row, StorageResult, Value};

use crate::PgPool;
use crate::values::{PgQuery, bind, decode_row, storage_error};

/// PostgreSQL database capability.
///
/// Holds a shared connection pool; the pool is safe for concurrent use, so
/// one instance can back a token store, its sweep and a client store at the
/// same time. The stores never close it.
#[derive(Debug, Clone)]
pub struct PgDatabase {
    pool: Arc<PgPool>,
}

impl PgDatabase {
    /// Create a capability over an existing connection pool.
    #[must_use]
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    /// Create a capability by connecting to the database.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection fails.
    pub async fn connect(database_url: &str) -> StorageResult<Self> {
        use sqlx_core::pool::PoolOptions;
        let pool = PoolOptions::<Postgres>::new()
            .connect(database_url)
            .await
            .map_err(storage_error)?;
        debug!("Connected PostgreSQL pool");
        Ok(Self::new(Arc::new(pool)))
    }

    /// Get a reference to the connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Get a reference to the Arc-wrapped pool.
    #[must_use]
    pub fn pool_arc(&self) -> Arc<PgPool> {
        Arc::clone(&self.pool)
    }

    fn prepare<'q>(statement: &'q str, params: &[Value]) -> StorageResult<PgQuery<'q>> {
        params
            .iter()
            .try_fold(query::<Postgres>(statement), |q, value| bind(q, value))
    }
}

#[async_trait]
impl Database for PgDatabase {
    #[instrument(skip_all, fields(params = params.len()))]
    async fn execute(&self, statement: &str, params: &[Value]) -> StorageResult<()> {
        // Parameterless statements go through the simple query protocol so
        // multi-statement DDL (table plus indexes) runs in one call.
        let result = if params.is_empty() {
            raw_sql(statement).execute(self.pool.as_ref()).await
        } else {
            Self::prepare(statement, params)?
                .execute(self.pool.as_ref())
                .await
        };

        let done = result.map_err(storage_error)?;
        debug!(rows_affected = done.rows_affected(), "Statement executed");
        Ok(())
    }

    #[instrument(skip_all, fields(params = params.len()))]
    async fn select_one(&self, statement: &str, params: &[Value]) -> StorageResult<Row> {
        let row = Self::prepare(statement, params)?
            .fetch_one(self.pool.as_ref())
            .await
            .map_err(storage_error)?;

        decode_row(&row)
    }
}

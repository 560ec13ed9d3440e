//! Database capability consumed by the stores.
//!
//! Stores never talk to a driver directly. They issue fixed SQL through the
//! two-method [`Database`] trait, binding [`Value`]s and reading back a
//! [`Row`]. Driver crates (see `oauth2-store-postgres`) implement the trait
//! on their own pool type.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use time::OffsetDateTime;

use crate::{StorageError, StorageResult};

// =============================================================================
// Values and Rows
// =============================================================================

/// A bindable statement parameter or a decoded column value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// 64-bit integer (`BIGINT`, `BIGSERIAL`).
    BigInt(i64),
    /// Text (`TEXT`).
    Text(String),
    /// Timestamp with time zone (`TIMESTAMPTZ`).
    Timestamp(OffsetDateTime),
    /// Opaque serialized payload (`JSONB` in the default schema).
    Blob(Vec<u8>),
}

impl Value {
    /// Short name of the value kind, used in row decoding errors.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::BigInt(_) => "bigint",
            Self::Text(_) => "text",
            Self::Timestamp(_) => "timestamp",
            Self::Blob(_) => "blob",
        }
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::BigInt(value)
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<OffsetDateTime> for Value {
    fn from(value: OffsetDateTime) -> Self {
        Self::Timestamp(value)
    }
}

impl From<Vec<u8>> for Value {
    fn from(value: Vec<u8>) -> Self {
        Self::Blob(value)
    }
}

/// A single result row: column names paired with decoded values, in
/// select order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Row {
    columns: Vec<(String, Value)>,
}

impl Row {
    /// Create an empty row.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a column, builder style.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.push(name, value);
        self
    }

    /// Append a column.
    pub fn push(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.columns.push((name.into(), value.into()));
    }

    /// Look up a column by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.columns
            .iter()
            .find(|(column, _)| column == name)
            .map(|(_, value)| value)
    }

    /// Number of columns in the row.
    #[must_use]
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Returns `true` if the row has no columns.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Iterate over `(column, value)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.columns.iter().map(|(name, value)| (name.as_str(), value))
    }

    fn require(&self, name: &str) -> StorageResult<&Value> {
        self.get(name)
            .ok_or_else(|| StorageError::invalid_row(format!("missing column '{name}'")))
    }

    fn mismatch(name: &str, expected: &str, got: &Value) -> StorageError {
        StorageError::invalid_row(format!(
            "column '{name}' expected {expected}, got {}",
            got.kind()
        ))
    }

    /// Read a `BIGINT` column.
    ///
    /// # Errors
    ///
    /// Returns `InvalidRow` if the column is missing or has another kind.
    pub fn big_int(&self, name: &str) -> StorageResult<i64> {
        match self.require(name)? {
            Value::BigInt(v) => Ok(*v),
            other => Err(Self::mismatch(name, "bigint", other)),
        }
    }

    /// Read a `TEXT` column.
    ///
    /// # Errors
    ///
    /// Returns `InvalidRow` if the column is missing or has another kind.
    pub fn text(&self, name: &str) -> StorageResult<String> {
        match self.require(name)? {
            Value::Text(v) => Ok(v.clone()),
            other => Err(Self::mismatch(name, "text", other)),
        }
    }

    /// Read a `TIMESTAMPTZ` column.
    ///
    /// # Errors
    ///
    /// Returns `InvalidRow` if the column is missing or has another kind.
    pub fn timestamp(&self, name: &str) -> StorageResult<OffsetDateTime> {
        match self.require(name)? {
            Value::Timestamp(v) => Ok(*v),
            other => Err(Self::mismatch(name, "timestamp", other)),
        }
    }

    /// Read a blob column.
    ///
    /// # Errors
    ///
    /// Returns `InvalidRow` if the column is missing or has another kind.
    pub fn blob(&self, name: &str) -> StorageResult<Vec<u8>> {
        match self.require(name)? {
            Value::Blob(v) => Ok(v.clone()),
            other => Err(Self::mismatch(name, "blob", other)),
        }
    }
}

// =============================================================================
// Database Capability
// =============================================================================

/// The two operations a store needs from a database.
///
/// Implementations must be safe for concurrent use: the token store's sweep
/// task and foreground calls share one instance without extra locking.
///
/// # Example Implementation
///
/// ```ignore
/// use oauth2_store::{Database, Row, StorageError, StorageResult, Value};
///
/// struct NullDatabase;
///
/// #[async_trait::async_trait]
/// impl Database for NullDatabase {
///     async fn execute(&self, _statement: &str, _params: &[Value]) -> StorageResult<()> {
///         Ok(())
///     }
///
///     async fn select_one(&self, _statement: &str, _params: &[Value]) -> StorageResult<Row> {
///         Err(StorageError::NoRows)
///     }
/// }
/// ```
#[async_trait]
pub trait Database: Send + Sync {
    /// Execute a statement that returns no rows.
    ///
    /// Affecting zero rows is success.
    ///
    /// # Errors
    ///
    /// Returns the driver's failure as a `StorageError`.
    async fn execute(&self, statement: &str, params: &[Value]) -> StorageResult<()>;

    /// Execute a statement expected to return exactly one row.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::NoRows`] when the result set is empty, and the
    /// driver's failure otherwise.
    async fn select_one(&self, statement: &str, params: &[Value]) -> StorageResult<Row>;
}

#[async_trait]
impl<D: Database + ?Sized> Database for Arc<D> {
    async fn execute(&self, statement: &str, params: &[Value]) -> StorageResult<()> {
        (**self).execute(statement, params).await
    }

    async fn select_one(&self, statement: &str, params: &[Value]) -> StorageResult<Row> {
        (**self).select_one(statement, params).await
    }
}

#[async_trait]
impl<D: Database + ?Sized> Database for &D {
    async fn execute(&self, statement: &str, params: &[Value]) -> StorageResult<()> {
        (**self).execute(statement, params).await
    }

    async fn select_one(&self, statement: &str, params: &[Value]) -> StorageResult<Row> {
        (**self).select_one(statement, params).await
    }
}

// =============================================================================
// Executor
// =============================================================================

/// Capability handle shared by a store and its sweep task, applying the
/// optional statement timeout to every call.
#[derive(Clone)]
pub(crate) struct Executor {
    db: Arc<dyn Database>,
    timeout: Option<Duration>,
}

impl Executor {
    pub(crate) fn new(db: Arc<dyn Database>, timeout: Option<Duration>) -> Self {
        Self { db, timeout }
    }

    pub(crate) async fn execute(&self, statement: &str, params: &[Value]) -> StorageResult<()> {
        bounded(self.timeout, self.db.execute(statement, params)).await
    }

    pub(crate) async fn select_one(&self, statement: &str, params: &[Value]) -> StorageResult<Row> {
        bounded(self.timeout, self.db.select_one(statement, params)).await
    }
}

async fn bounded<T, F>(timeout: Option<Duration>, fut: F) -> StorageResult<T>
where
    F: Future<Output = StorageResult<T>>,
{
    match timeout {
        Some(limit) => tokio::time::timeout(limit, fut)
            .await
            .map_err(|_| StorageError::Timeout(limit))?,
        None => fut.await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_typed_getters() {
        let now = OffsetDateTime::now_utc();
        let row = Row::new()
            .with("id", 7_i64)
            .with("code", "abc")
            .with("created_at", now)
            .with("data", b"{}".to_vec());

        assert_eq!(row.len(), 4);
        assert_eq!(row.big_int("id").unwrap(), 7);
        assert_eq!(row.text("code").unwrap(), "abc");
        assert_eq!(row.timestamp("created_at").unwrap(), now);
        assert_eq!(row.blob("data").unwrap(), b"{}".to_vec());
    }

    #[test]
    fn test_row_missing_column() {
        let err = Row::new().text("code").unwrap_err();
        assert!(matches!(err, StorageError::InvalidRow(_)));
        assert!(err.to_string().contains("missing column 'code'"));
    }

    #[test]
    fn test_row_kind_mismatch() {
        let row = Row::new().with("code", 1_i64);
        let err = row.text("code").unwrap_err();
        assert!(err.to_string().contains("expected text, got bigint"));
    }

    struct SlowDatabase;

    #[async_trait]
    impl Database for SlowDatabase {
        async fn execute(&self, _statement: &str, _params: &[Value]) -> StorageResult<()> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(())
        }

        async fn select_one(&self, _statement: &str, _params: &[Value]) -> StorageResult<Row> {
            Err(StorageError::NoRows)
        }
    }

    struct EchoDatabase;

    #[async_trait]
    impl Database for EchoDatabase {
        async fn execute(&self, statement: &str, _params: &[Value]) -> StorageResult<()> {
            if statement.is_empty() {
                return Err(StorageError::database("empty statement"));
            }
            Ok(())
        }

        async fn select_one(&self, statement: &str, params: &[Value]) -> StorageResult<Row> {
            let mut row = Row::new().with("statement", statement);
            if let Some(value) = params.first() {
                row.push("param", value.clone());
            }
            Ok(row)
        }
    }

    async fn echo_through<D: Database>(db: D) {
        assert!(db.execute("SELECT 1", &[]).await.is_ok());
        assert!(db.execute("", &[]).await.unwrap_err().is_database_error());

        let row = db.select_one("SELECT $1", &[Value::from("abc")]).await.unwrap();
        assert_eq!(row.text("statement").unwrap(), "SELECT $1");
        assert_eq!(row.text("param").unwrap(), "abc");
    }

    #[tokio::test]
    async fn test_shared_handles_forward_to_database() {
        let db = EchoDatabase;
        echo_through(&db).await;

        let shared = Arc::new(EchoDatabase);
        echo_through(Arc::clone(&shared)).await;

        let erased: Arc<dyn Database> = shared;
        echo_through(erased.clone()).await;
        echo_through(&*erased).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_executor_timeout() {
        let executor = Executor::new(Arc::new(SlowDatabase), Some(Duration::from_secs(1)));
        let err = executor.execute("SELECT 1", &[]).await.unwrap_err();
        assert!(err.is_timeout());
    }

    #[tokio::test]
    async fn test_executor_passes_sentinel_through() {
        let executor = Executor::new(Arc::new(SlowDatabase), None);
        let err = executor.select_one("SELECT 1", &[]).await.unwrap_err();
        assert!(err.is_no_rows());
    }
}

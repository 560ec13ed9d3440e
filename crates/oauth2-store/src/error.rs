//! Storage error types.
//!
//! Every store operation returns [`StorageResult`]. Callers tell a missing
//! record apart from a failing database only through [`StorageError::NoRows`].

use std::time::Duration;

/// Errors that can occur during grant and client storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The statement matched no row.
    ///
    /// This is the single not-found sentinel shared by every store and every
    /// [`Database`](crate::Database) implementation. Test for it with
    /// [`StorageError::is_no_rows`], never by message.
    #[error("no rows in result set")]
    NoRows,

    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(String),

    /// Serialization/deserialization of a grant or client blob failed.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Store configuration was rejected at construction time.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A row returned by the database does not have the expected shape.
    #[error("Invalid row: {0}")]
    InvalidRow(String),

    /// A grant cannot be stored as given.
    #[error("Invalid grant: {0}")]
    InvalidGrant(String),

    /// The statement did not complete within the configured timeout.
    #[error("Statement timed out after {0:?}")]
    Timeout(Duration),
}

impl StorageError {
    // -------------------------------------------------------------------------
    // Constructor Methods
    // -------------------------------------------------------------------------

    /// Create a `Database` error.
    #[must_use]
    pub fn database(message: impl Into<String>) -> Self {
        Self::Database(message.into())
    }

    /// Create an `InvalidConfig` error.
    #[must_use]
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig(message.into())
    }

    /// Create an `InvalidRow` error.
    #[must_use]
    pub fn invalid_row(message: impl Into<String>) -> Self {
        Self::InvalidRow(message.into())
    }

    /// Create an `InvalidGrant` error.
    #[must_use]
    pub fn invalid_grant(message: impl Into<String>) -> Self {
        Self::InvalidGrant(message.into())
    }

    // -------------------------------------------------------------------------
    // Predicate Methods
    // -------------------------------------------------------------------------

    /// Returns `true` if this is the not-found sentinel.
    #[must_use]
    pub fn is_no_rows(&self) -> bool {
        matches!(self, Self::NoRows)
    }

    /// Returns `true` if this is a database error.
    #[must_use]
    pub fn is_database_error(&self) -> bool {
        matches!(self, Self::Database(_))
    }

    /// Returns `true` if this is a serialization error.
    #[must_use]
    pub fn is_serialization_error(&self) -> bool {
        matches!(self, Self::Serialization(_))
    }

    /// Returns `true` if this is a configuration error.
    #[must_use]
    pub fn is_invalid_config(&self) -> bool {
        matches!(self, Self::InvalidConfig(_))
    }

    /// Returns `true` if a grant was rejected before storage.
    #[must_use]
    pub fn is_invalid_grant(&self) -> bool {
        matches!(self, Self::InvalidGrant(_))
    }

    /// Returns `true` if the statement timed out.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

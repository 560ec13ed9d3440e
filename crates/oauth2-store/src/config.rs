//! Store configuration.
//!
//! Both stores are configured once at construction. Every field has a
//! default, so configuration files only need to name what they override:
//!
//! ```toml
//! table_name = "oauth2_tokens"
//! gc_interval = "10m"
//! gc_disabled = false
//! init_table_disabled = false
//! statement_timeout = "5s"
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{StorageError, StorageResult};

/// Default token table name.
pub const DEFAULT_TOKEN_TABLE: &str = "oauth2_tokens";

/// Default client table name.
pub const DEFAULT_CLIENT_TABLE: &str = "oauth2_clients";

/// Default interval between expiry sweeps.
pub const DEFAULT_GC_INTERVAL: Duration = Duration::from_secs(10 * 60);

/// PostgreSQL truncates identifiers longer than this.
const MAX_IDENTIFIER_LEN: usize = 63;

// =============================================================================
// Token Store Configuration
// =============================================================================

/// Token store configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct TokenStoreConfig {
    /// Table holding token records.
    pub table_name: String,

    /// Interval between expiry sweeps.
    #[serde(with = "humantime_serde")]
    pub gc_interval: Duration,

    /// Do not start the background expiry sweep.
    pub gc_disabled: bool,

    /// Do not issue the table bootstrap statement on construction.
    /// Use when the schema is managed externally.
    pub init_table_disabled: bool,

    /// Upper bound for every statement issued by the store.
    #[serde(with = "humantime_serde")]
    pub statement_timeout: Option<Duration>,
}

impl Default for TokenStoreConfig {
    fn default() -> Self {
        Self {
            table_name: DEFAULT_TOKEN_TABLE.to_string(),
            gc_interval: DEFAULT_GC_INTERVAL,
            gc_disabled: false,
            init_table_disabled: false,
            statement_timeout: None,
        }
    }
}

impl TokenStoreConfig {
    /// Set the table name.
    #[must_use]
    pub fn with_table_name(mut self, table_name: impl Into<String>) -> Self {
        self.table_name = table_name.into();
        self
    }

    /// Set the interval between expiry sweeps.
    #[must_use]
    pub fn with_gc_interval(mut self, interval: Duration) -> Self {
        self.gc_interval = interval;
        self
    }

    /// Disable the background expiry sweep.
    #[must_use]
    pub fn with_gc_disabled(mut self) -> Self {
        self.gc_disabled = true;
        self
    }

    /// Skip the table bootstrap statement on construction.
    #[must_use]
    pub fn with_init_table_disabled(mut self) -> Self {
        self.init_table_disabled = true;
        self
    }

    /// Bound every statement issued by the store.
    #[must_use]
    pub fn with_statement_timeout(mut self, timeout: Duration) -> Self {
        self.statement_timeout = Some(timeout);
        self
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if the table name is not a plain identifier,
    /// or if the sweep is enabled with a zero interval.
    pub fn validate(&self) -> StorageResult<()> {
        validate_table_name(&self.table_name)?;
        if !self.gc_disabled && self.gc_interval.is_zero() {
            return Err(StorageError::invalid_config(
                "gc_interval must be greater than zero",
            ));
        }
        validate_timeout(self.statement_timeout)
    }
}

// =============================================================================
// Client Store Configuration
// =============================================================================

/// Client store configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ClientStoreConfig {
    /// Table holding client records.
    pub table_name: String,

    /// Do not issue the table bootstrap statement on construction.
    pub init_table_disabled: bool,

    /// Upper bound for every statement issued by the store.
    #[serde(with = "humantime_serde")]
    pub statement_timeout: Option<Duration>,
}

impl Default for ClientStoreConfig {
    fn default() -> Self {
        Self {
            table_name: DEFAULT_CLIENT_TABLE.to_string(),
            init_table_disabled: false,
            statement_timeout: None,
        }
    }
}

impl ClientStoreConfig {
    /// Set the table name.
    #[must_use]
    pub fn with_table_name(mut self, table_name: impl Into<String>) -> Self {
        self.table_name = table_name.into();
        self
    }

    /// Skip the table bootstrap statement on construction.
    #[must_use]
    pub fn with_init_table_disabled(mut self) -> Self {
        self.init_table_disabled = true;
        self
    }

    /// Bound every statement issued by the store.
    #[must_use]
    pub fn with_statement_timeout(mut self, timeout: Duration) -> Self {
        self.statement_timeout = Some(timeout);
        self
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if the table name is not a plain identifier.
    pub fn validate(&self) -> StorageResult<()> {
        validate_table_name(&self.table_name)?;
        validate_timeout(self.statement_timeout)
    }
}

// =============================================================================
// Validation
// =============================================================================

/// Table names are interpolated into fixed SQL text, so only plain
/// identifiers are accepted.
fn validate_table_name(name: &str) -> StorageResult<()> {
    let mut chars = name.chars();
    let valid_start = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    let valid_rest = chars.all(|c| c.is_ascii_alphanumeric() || c == '_');

    if !valid_start || !valid_rest {
        return Err(StorageError::invalid_config(format!(
            "table name '{name}' is not a plain SQL identifier"
        )));
    }
    if name.len() > MAX_IDENTIFIER_LEN {
        return Err(StorageError::invalid_config(format!(
            "table name '{name}' exceeds {MAX_IDENTIFIER_LEN} bytes"
        )));
    }
    Ok(())
}

fn validate_timeout(timeout: Option<Duration>) -> StorageResult<()> {
    if timeout.is_some_and(|t| t.is_zero()) {
        return Err(StorageError::invalid_config(
            "statement_timeout must be greater than zero",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_config_defaults() {
        let config = TokenStoreConfig::default();
        assert_eq!(config.table_name, "oauth2_tokens");
        assert_eq!(config.gc_interval, Duration::from_secs(600));
        assert!(!config.gc_disabled);
        assert!(!config.init_table_disabled);
        assert_eq!(config.statement_timeout, None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_client_config_defaults() {
        let config = ClientStoreConfig::default();
        assert_eq!(config.table_name, "oauth2_clients");
        assert!(!config.init_table_disabled);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_overrides() {
        let config = TokenStoreConfig::default()
            .with_table_name("tokens_test")
            .with_gc_interval(Duration::from_secs(1))
            .with_gc_disabled()
            .with_init_table_disabled()
            .with_statement_timeout(Duration::from_secs(3));

        assert_eq!(config.table_name, "tokens_test");
        assert_eq!(config.gc_interval, Duration::from_secs(1));
        assert!(config.gc_disabled);
        assert!(config.init_table_disabled);
        assert_eq!(config.statement_timeout, Some(Duration::from_secs(3)));
    }

    #[test]
    fn test_rejects_injected_table_name() {
        let config = TokenStoreConfig::default().with_table_name("tokens; DROP TABLE users");
        let err = config.validate().unwrap_err();
        assert!(err.is_invalid_config());
        assert!(err.to_string().contains("plain SQL identifier"));
    }

    #[test]
    fn test_rejects_empty_and_numeric_table_names() {
        assert!(validate_table_name("").is_err());
        assert!(validate_table_name("1tokens").is_err());
        assert!(validate_table_name("_tokens_2").is_ok());
    }

    #[test]
    fn test_rejects_long_table_name() {
        let name = "t".repeat(64);
        let err = validate_table_name(&name).unwrap_err();
        assert!(err.to_string().contains("exceeds 63 bytes"));
    }

    #[test]
    fn test_zero_gc_interval_only_matters_when_enabled() {
        let enabled = TokenStoreConfig::default().with_gc_interval(Duration::ZERO);
        assert!(enabled.validate().is_err());

        let disabled = enabled.with_gc_disabled();
        assert!(disabled.validate().is_ok());
    }

    #[test]
    fn test_zero_statement_timeout_fails_validation() {
        let config = ClientStoreConfig::default().with_statement_timeout(Duration::ZERO);
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("statement_timeout"));
    }

    #[test]
    fn test_deserialize_partial_config() {
        let config: TokenStoreConfig =
            serde_json::from_str(r#"{"gc_interval":"30s","statement_timeout":"2s"}"#).unwrap();
        assert_eq!(config.table_name, DEFAULT_TOKEN_TABLE);
        assert_eq!(config.gc_interval, Duration::from_secs(30));
        assert_eq!(config.statement_timeout, Some(Duration::from_secs(2)));
    }
}

//! Relational storage for OAuth2 grants and client registrations.
//!
//! Provides:
//!
//! - [`TokenStore`] - authorization codes, access tokens and refresh tokens
//!   in one table, looked up by any of the three keys, with a background
//!   sweep that deletes expired records
//! - [`ClientStore`] - client registrations keyed by client id
//!
//! Both stores issue fixed SQL through the [`Database`] capability, so any
//! driver that can execute a statement and select one row can back them.
//! The PostgreSQL implementation lives in `oauth2-store-postgres`.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use oauth2_store::{ClientStore, ClientStoreConfig, TokenStore, TokenStoreConfig};
//!
//! let db: Arc<dyn oauth2_store::Database> = Arc::new(pg_database);
//!
//! let tokens = TokenStore::new(db.clone(), TokenStoreConfig::default()).await?;
//! let clients = ClientStore::new(db, ClientStoreConfig::default()).await?;
//!
//! match tokens.get_by_code("abc").await {
//!     Ok(Some(token)) => println!("client {}", token.client_id),
//!     Ok(None) => println!("no code given"),
//!     Err(e) if e.is_no_rows() => println!("unknown code"),
//!     Err(e) => return Err(e.into()),
//! }
//! ```

pub mod client;
pub mod codec;
pub mod config;
pub mod database;
pub mod error;
pub mod logger;
mod sweep;
pub mod token;
pub mod types;

pub use client::{ClientRow, ClientStore, ClientStoreBuilder};
pub use config::{ClientStoreConfig, TokenStoreConfig};
pub use database::{Database, Row, Value};
pub use error::{StorageError, StorageResult};
pub use logger::{Logger, TracingLogger};
pub use token::{TokenKey, TokenRow, TokenStore, TokenStoreBuilder};
pub use types::{Client, Token};

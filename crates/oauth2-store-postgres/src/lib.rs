//! PostgreSQL database capability for `oauth2-store`.
//!
//! [`PgDatabase`] implements [`oauth2_store::Database`] directly on a sqlx
//! connection pool, so both stores can share one pool with the rest of the
//! application.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use oauth2_store::{TokenStore, TokenStoreConfig};
//! use oauth2_store_postgres::PgDatabase;
//!
//! let db = Arc::new(PgDatabase::connect("postgres://localhost/oauth").await?);
//! let tokens = TokenStore::new(db, TokenStoreConfig::default()).await?;
//! ```

pub mod database;
mod values;

use sqlx_core::pool::Pool;
use sqlx_postgres::Postgres;

/// PostgreSQL connection pool type alias.
pub type PgPool = Pool<Postgres>;

pub use database::PgDatabase;

//! Typed record mapping and a whole-table cache on top of SQLite.
//!
//! # Intention
//!
//! - Map table rows onto plain Rust structs through per-field column
//!   annotations (`#[derive(Record)]`), with no runtime reflection.
//! - Offer generic CRUD helpers over any record type, passing every value as a
//!   bound parameter.
//! - Keep a read-only snapshot of registered tables for lookups without a
//!   round trip.
//!
//! # Architectural Boundaries
//!
//! - Single-table equality and range filters only; no joins, migrations or
//!   transactions.
//! - No connection pooling: each operation opens and drops its own connection.
//! - The cache is rebuilt wholesale on request and never follows writes.

extern crate self as rust_records;

pub mod cache;
pub mod config;
pub mod error;
pub mod query;
pub mod record;
pub mod row;
pub mod sqlite;
pub mod value;

use std::sync::Arc;

use tracing::info;

pub use cache::{TableCache, TableRegistry};
pub use config::{DbConfig, CONNECTION_TEMPLATE};
pub use error::{ConversionError, DbError, Result};
pub use query::{quote_identifier, sanitize, Filter, SqlQuery};
pub use record::{resolve, FieldBinding, FieldValue, Record};
pub use row::{materialize, materialize_with};
pub use rust_records_macros::Record;
pub use sqlite::{ConnectionProvider, Executor};
pub use value::Value;

/// An initialized data-access context: the executor plus the populated cache.
pub struct Database {
    config: Arc<DbConfig>,
    executor: Executor,
    cache: TableCache,
}

impl Database {
    /// Builds the executor for `config` and populates the cache with every
    /// type in `registry`.
    pub fn initialize(config: DbConfig, registry: TableRegistry) -> Result<Self> {
        info!(server = %config.server, port = config.port, "initializing database");

        let config = Arc::new(config);
        let executor = Executor::new(config.clone());
        let cache = TableCache::new(registry);
        cache.populate(&executor)?;

        info!(database = %config.database, "connected");
        Ok(Self {
            config,
            executor,
            cache,
        })
    }

    pub fn config(&self) -> &DbConfig {
        &self.config
    }

    pub fn executor(&self) -> &Executor {
        &self.executor
    }

    pub fn cache(&self) -> &TableCache {
        &self.cache
    }

    pub fn refresh_cache(&self) -> Result<()> {
        self.cache.refresh(&self.executor)
    }

    pub fn get_cache<T: Record>(&self, table: &str) -> Result<Option<Arc<Vec<T>>>> {
        self.cache.get(table)
    }
}

/// Assembles a [`DbConfig`] from its parts and initializes a [`Database`].
pub fn initialize(
    server: &str,
    port: u16,
    database: &str,
    username: &str,
    password: &str,
    registry: TableRegistry,
) -> Result<Database> {
    Database::initialize(
        DbConfig::new(server, port, database, username, password),
        registry,
    )
}

use std::sync::Arc;

use rusqlite::config::DbConfig as SqliteConfigFlag;
use rusqlite::{params_from_iter, Connection};
use tracing::debug;

use crate::config::DbConfig;
use crate::error::Result;
use crate::query::{Filter, SqlQuery};
use crate::record::{field_values, resolve, Record};
use crate::row::materialize_with;
use crate::value::Value;

/// Source of fresh database connections.
pub trait ConnectionProvider: Send + Sync {
    fn connect(&self) -> Result<Connection>;
}

impl ConnectionProvider for DbConfig {
    fn connect(&self) -> Result<Connection> {
        let connection = Connection::open(&self.database)?;
        connection.busy_timeout(self.busy_timeout())?;
        // unknown "quoted" names must fail instead of becoming string literals
        connection.set_db_config(SqliteConfigFlag::SQLITE_DBCONFIG_DQS_DML, false)?;
        connection.set_db_config(SqliteConfigFlag::SQLITE_DBCONFIG_DQS_DDL, false)?;
        Ok(connection)
    }
}

/// Typed CRUD operations over any [`Record`] type.
///
/// Every call opens its own connection, runs a single statement and drops
/// the connection before returning, whether it succeeded or not. Driver
/// failures are returned as-is; nothing is retried.
#[derive(Clone)]
pub struct Executor {
    provider: Arc<dyn ConnectionProvider>,
}

impl Executor {
    pub fn new(provider: Arc<dyn ConnectionProvider>) -> Self {
        Self { provider }
    }

    /// A fresh connection owned by the caller.
    pub fn connection(&self) -> Result<Connection> {
        self.provider.connect()
    }

    /// Runs `query` and materializes every returned row as `T`.
    pub fn query<T: Record>(&self, query: &SqlQuery) -> Result<Vec<T>> {
        debug!(statement = %query.statement, params = query.params.len(), "query");
        let connection = self.connection()?;
        let mut statement = connection.prepare(&query.statement)?;
        let mut rows = statement.query(params_from_iter(query.params.iter()))?;

        let bindings = resolve::<T>();
        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            records.push(materialize_with(row, &bindings)?);
        }
        Ok(records)
    }

    /// Runs `query` and materializes only the first row, if any.
    pub fn query_first<T: Record>(&self, query: &SqlQuery) -> Result<Option<T>> {
        debug!(statement = %query.statement, params = query.params.len(), "query first");
        let connection = self.connection()?;
        let mut statement = connection.prepare(&query.statement)?;
        let mut rows = statement.query(params_from_iter(query.params.iter()))?;

        let record = match rows.next()? {
            Some(row) => Some(materialize_with(row, &resolve::<T>())?),
            None => None,
        };
        Ok(record)
    }

    /// Executes a statement that returns no rows, yielding the affected row count.
    pub fn execute_query(&self, query: &SqlQuery) -> Result<usize> {
        debug!(statement = %query.statement, params = query.params.len(), "execute");
        let connection = self.connection()?;
        let affected = connection.execute(&query.statement, params_from_iter(query.params.iter()))?;
        Ok(affected)
    }

    /// First row where `column` equals `value`, or `None` when nothing matches.
    ///
    /// When several rows match, which one is returned is up to SQLite's
    /// natural scan order and is not guaranteed.
    pub fn get_one<T: Record>(
        &self,
        table: &str,
        column: &str,
        value: impl Into<Value>,
    ) -> Result<Option<T>> {
        self.query_first(&SqlQuery::select(table, &[Filter::eq(column, value)]))
    }

    pub fn get_list<T: Record>(
        &self,
        table: &str,
        column: &str,
        value: impl Into<Value>,
    ) -> Result<Vec<T>> {
        self.query(&SqlQuery::select(table, &[Filter::eq(column, value)]))
    }

    /// Rows matching both equality predicates.
    pub fn get_list_and<T: Record>(
        &self,
        table: &str,
        column: &str,
        value: impl Into<Value>,
        column1: &str,
        value1: impl Into<Value>,
    ) -> Result<Vec<T>> {
        self.query(&SqlQuery::select(
            table,
            &[Filter::eq(column, value), Filter::eq(column1, value1)],
        ))
    }

    /// Rows with `low <= column <= high`.
    pub fn get_range<T: Record>(
        &self,
        table: &str,
        column: &str,
        low: impl Into<Value>,
        high: impl Into<Value>,
    ) -> Result<Vec<T>> {
        self.query(&SqlQuery::select(table, &[Filter::range(column, low, high)]))
    }

    pub fn get_where<T: Record>(&self, table: &str, filters: &[Filter]) -> Result<Vec<T>> {
        self.query(&SqlQuery::select(table, filters))
    }

    pub fn get_all<T: Record>(&self, table: &str) -> Result<Vec<T>> {
        self.query(&SqlQuery::select(table, &[]))
    }

    /// Inserts `record` using every bound field, identity included.
    pub fn insert<T: Record>(&self, record: &T, table: &str) -> Result<()> {
        self.execute_query(&SqlQuery::insert(table, field_values(record)))?;
        Ok(())
    }

    /// Writes every bound field of `record` to the row with its identity.
    /// Returns whether any row was affected.
    pub fn update<T: Record>(&self, record: &T, table: &str) -> Result<bool> {
        let query = SqlQuery::update(table, field_values(record), T::ID_COLUMN, record.id());
        Ok(self.execute_query(&query)? > 0)
    }

    pub fn delete_by_id<T: Record>(&self, record: &T, table: &str) -> Result<()> {
        self.execute_query(&SqlQuery::delete_by_id(table, T::ID_COLUMN, record.id()))?;
        Ok(())
    }
}

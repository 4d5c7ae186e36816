//! SQL text construction for the supported query shapes.
//!
//! Identifiers cannot be bound as parameters, so table and column names are
//! escaped and interpolated into the statement text. Every value travels as a
//! positional bound parameter. Escaping only keeps a name from terminating its
//! quoting early; it does not make untrusted names safe to accept.
//!
//! Connections from [`DbConfig`](crate::DbConfig) disable SQLite's
//! double-quoted string fallback, so a quoted name that matches no column is
//! an error rather than a text literal.

use crate::value::Value;

/// Doubles embedded single quotes, for text placed inside `'...'`.
pub fn sanitize(input: &str) -> String {
    input.replace('\'', "''")
}

/// Wraps `name` in double quotes, doubling embedded double quotes.
///
/// Single quotes are ordinary characters inside a quoted identifier and are
/// left alone, so a column named `o'k` is addressed as `"o'k"`.
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Single-column predicate; several filters are ANDed.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Eq { column: String, value: Value },
    /// Inclusive on both ends.
    Range { column: String, low: Value, high: Value },
}

impl Filter {
    pub fn eq(column: &str, value: impl Into<Value>) -> Self {
        Filter::Eq {
            column: column.to_string(),
            value: value.into(),
        }
    }

    pub fn range(column: &str, low: impl Into<Value>, high: impl Into<Value>) -> Self {
        Filter::Range {
            column: column.to_string(),
            low: low.into(),
            high: high.into(),
        }
    }
}

/// SQL statement with its positional parameters (`?1`, `?2`, ...).
#[derive(Debug, Clone, PartialEq)]
pub struct SqlQuery {
    pub statement: String,
    pub params: Vec<Value>,
}

impl SqlQuery {
    pub fn new(statement: &str) -> Self {
        Self {
            statement: statement.to_string(),
            params: Vec::new(),
        }
    }

    pub fn with_params(mut self, params: Vec<Value>) -> Self {
        self.params = params;
        self
    }

    /// Appends `value` and returns its placeholder.
    fn bind(&mut self, value: Value) -> String {
        self.params.push(value);
        format!("?{}", self.params.len())
    }

    /// `SELECT *` from `table`, restricted by every filter.
    pub fn select(table: &str, filters: &[Filter]) -> Self {
        let mut query = Self::new(&format!("SELECT * FROM {}", quote_identifier(table)));
        let mut predicates = Vec::with_capacity(filters.len());

        for filter in filters {
            match filter {
                Filter::Eq { column, value } => {
                    let slot = query.bind(value.clone());
                    predicates.push(format!("{} = {slot}", quote_identifier(column)));
                }
                Filter::Range { column, low, high } => {
                    let column = quote_identifier(column);
                    let low = query.bind(low.clone());
                    let high = query.bind(high.clone());
                    predicates.push(format!("{column} >= {low} AND {column} <= {high}"));
                }
            }
        }

        if !predicates.is_empty() {
            query.statement.push_str(" WHERE ");
            query.statement.push_str(&predicates.join(" AND "));
        }
        query
    }

    pub fn insert(table: &str, columns: Vec<(&str, Value)>) -> Self {
        let mut query = Self::new("");
        let mut names = Vec::with_capacity(columns.len());
        let mut slots = Vec::with_capacity(columns.len());

        for (column, value) in columns {
            names.push(quote_identifier(column));
            slots.push(query.bind(value));
        }

        query.statement = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            quote_identifier(table),
            names.join(", "),
            slots.join(", ")
        );
        query
    }

    /// Sets every given column on rows whose `id_column` equals `id`.
    pub fn update(table: &str, columns: Vec<(&str, Value)>, id_column: &str, id: i64) -> Self {
        let mut query = Self::new("");
        let mut assignments = Vec::with_capacity(columns.len());

        for (column, value) in columns {
            let slot = query.bind(value);
            assignments.push(format!("{} = {slot}", quote_identifier(column)));
        }
        let id_slot = query.bind(Value::Integer(id));

        query.statement = format!(
            "UPDATE {} SET {} WHERE {} = {id_slot}",
            quote_identifier(table),
            assignments.join(", "),
            quote_identifier(id_column)
        );
        query
    }

    pub fn delete_by_id(table: &str, id_column: &str, id: i64) -> Self {
        Self::new(&format!(
            "DELETE FROM {} WHERE {} = ?1",
            quote_identifier(table),
            quote_identifier(id_column)
        ))
        .with_params(vec![Value::Integer(id)])
    }
}

//! Error types for record mapping, query execution and caching.

use thiserror::Error;

use crate::value::Value;

/// A stored value could not be converted into the Rust type of a bound field.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("expected {expected}, found {found:?}")]
pub struct ConversionError {
    pub expected: &'static str,
    pub found: Value,
}

impl ConversionError {
    pub fn new(expected: &'static str, found: Value) -> Self {
        Self { expected, found }
    }
}

#[derive(Debug, Error)]
pub enum DbError {
    /// A column declared by the record type is absent from the result set.
    #[error("column `{column}` bound by `{table}` is missing from the result set")]
    SchemaMismatch { table: String, column: String },

    #[error("cannot convert column `{column}`: {source}")]
    Conversion {
        column: String,
        #[source]
        source: ConversionError,
    },

    /// Connection or execution failure reported by SQLite.
    #[error("driver error: {0}")]
    Driver(#[from] rusqlite::Error),

    /// The cached table holds records of a different type than requested.
    #[error("table `{table}` is not cached as `{expected}`")]
    CacheTypeMismatch { table: String, expected: &'static str },

    #[error("configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, DbError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_offending_column() {
        let err = DbError::SchemaMismatch {
            table: "users".into(),
            column: "email".into(),
        };
        assert_eq!(
            err.to_string(),
            "column `email` bound by `users` is missing from the result set"
        );

        let err = DbError::Conversion {
            column: "age".into(),
            source: ConversionError::new("i64", Value::Text("old".into())),
        };
        assert!(err.to_string().contains("`age`"));
        assert!(err.to_string().contains("expected i64"));
    }

    #[test]
    fn driver_errors_convert() {
        let err: DbError = rusqlite::Error::QueryReturnedNoRows.into();
        assert!(matches!(err, DbError::Driver(_)));
    }
}

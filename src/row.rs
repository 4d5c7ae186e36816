use rusqlite::{Row, Statement};

use crate::error::{DbError, Result};
use crate::record::{resolve, FieldBinding, Record};
use crate::value::Value;

/// Builds a `T` from the current row.
///
/// Starts from `T::default()` and sets every bound field from the column of
/// the same name. SQL NULL takes the field's [`FieldValue`](crate::FieldValue)
/// NULL conversion. A bound column missing from the result set is reported as
/// [`DbError::SchemaMismatch`].
pub fn materialize<T: Record>(row: &Row<'_>) -> Result<T> {
    materialize_with(row, &resolve::<T>())
}

/// [`materialize`] with bindings resolved once by the caller, for reading
/// many rows of the same query.
pub fn materialize_with<T: Record>(
    row: &Row<'_>,
    bindings: &[FieldBinding<T>],
) -> Result<T> {
    let statement: &Statement<'_> = row.as_ref();
    let mut record = T::default();

    for binding in bindings {
        let index = statement
            .column_index(binding.column)
            .map_err(|_| DbError::SchemaMismatch {
                table: T::TABLE_NAME.to_string(),
                column: binding.column.to_string(),
            })?;
        let value = Value::from(row.get_ref(index)?);

        binding
            .set(&mut record, value)
            .map_err(|source| DbError::Conversion {
                column: binding.column.to_string(),
                source,
            })?;
    }

    Ok(record)
}

//! Record types and their field-binding tables.
//!
//! A record type maps one table row onto a Rust struct. Which fields take
//! part in the mapping is decided by the binding table the type publishes,
//! normally generated by `#[derive(Record)]` from `#[column("...")]`
//! annotations. Fields without an annotation never appear in a binding table
//! and are left at their default value when a row is materialized.

use std::fmt;

use crate::error::ConversionError;
use crate::value::Value;

/// Conversion between a field's Rust type and a stored [`Value`].
///
/// SQL NULL converts to `Default::default()` for plain types and to `None`
/// for `Option<T>`, so NULL-ness only survives a round trip through
/// optional fields.
pub trait FieldValue: Sized {
    /// Name reported in conversion errors and binding metadata.
    const TYPE_NAME: &'static str;

    fn to_value(&self) -> Value;

    fn from_value(value: Value) -> Result<Self, ConversionError>;
}

impl FieldValue for i64 {
    const TYPE_NAME: &'static str = "i64";

    fn to_value(&self) -> Value {
        Value::Integer(*self)
    }

    fn from_value(value: Value) -> Result<Self, ConversionError> {
        match value {
            Value::Null => Ok(0),
            Value::Integer(v) => Ok(v),
            Value::Boolean(v) => Ok(i64::from(v)),
            other => Err(ConversionError::new(Self::TYPE_NAME, other)),
        }
    }
}

impl FieldValue for i32 {
    const TYPE_NAME: &'static str = "i32";

    fn to_value(&self) -> Value {
        Value::Integer(i64::from(*self))
    }

    fn from_value(value: Value) -> Result<Self, ConversionError> {
        match value {
            Value::Null => Ok(0),
            Value::Integer(v) => {
                i32::try_from(v).map_err(|_| ConversionError::new(Self::TYPE_NAME, value))
            }
            Value::Boolean(v) => Ok(i32::from(v)),
            other => Err(ConversionError::new(Self::TYPE_NAME, other)),
        }
    }
}

impl FieldValue for u32 {
    const TYPE_NAME: &'static str = "u32";

    fn to_value(&self) -> Value {
        Value::Integer(i64::from(*self))
    }

    fn from_value(value: Value) -> Result<Self, ConversionError> {
        match value {
            Value::Null => Ok(0),
            Value::Integer(v) => {
                u32::try_from(v).map_err(|_| ConversionError::new(Self::TYPE_NAME, value))
            }
            Value::Boolean(v) => Ok(u32::from(v)),
            other => Err(ConversionError::new(Self::TYPE_NAME, other)),
        }
    }
}

impl FieldValue for f64 {
    const TYPE_NAME: &'static str = "f64";

    fn to_value(&self) -> Value {
        Value::Real(*self)
    }

    fn from_value(value: Value) -> Result<Self, ConversionError> {
        match value {
            Value::Null => Ok(0.0),
            Value::Real(v) => Ok(v),
            // column affinity may hand back whole numbers as integers
            Value::Integer(v) => Ok(v as f64),
            other => Err(ConversionError::new(Self::TYPE_NAME, other)),
        }
    }
}

impl FieldValue for bool {
    const TYPE_NAME: &'static str = "bool";

    fn to_value(&self) -> Value {
        Value::Boolean(*self)
    }

    fn from_value(value: Value) -> Result<Self, ConversionError> {
        match value {
            Value::Null => Ok(false),
            Value::Boolean(v) => Ok(v),
            Value::Integer(v) => Ok(v != 0),
            other => Err(ConversionError::new(Self::TYPE_NAME, other)),
        }
    }
}

impl FieldValue for String {
    const TYPE_NAME: &'static str = "String";

    fn to_value(&self) -> Value {
        Value::Text(self.clone())
    }

    fn from_value(value: Value) -> Result<Self, ConversionError> {
        match value {
            Value::Null => Ok(String::new()),
            Value::Text(v) => Ok(v),
            other => Err(ConversionError::new(Self::TYPE_NAME, other)),
        }
    }
}

impl FieldValue for Vec<u8> {
    const TYPE_NAME: &'static str = "Vec<u8>";

    fn to_value(&self) -> Value {
        Value::Blob(self.clone())
    }

    fn from_value(value: Value) -> Result<Self, ConversionError> {
        match value {
            Value::Null => Ok(Vec::new()),
            Value::Blob(v) => Ok(v),
            Value::Text(v) => Ok(v.into_bytes()),
            other => Err(ConversionError::new(Self::TYPE_NAME, other)),
        }
    }
}

impl<T: FieldValue> FieldValue for Option<T> {
    const TYPE_NAME: &'static str = T::TYPE_NAME;

    fn to_value(&self) -> Value {
        self.as_ref().map_or(Value::Null, FieldValue::to_value)
    }

    fn from_value(value: Value) -> Result<Self, ConversionError> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

/// Binding between one record field and the column it is stored in.
pub struct FieldBinding<T> {
    /// Logical column name from the field annotation.
    pub column: &'static str,
    /// Declared Rust type of the field.
    pub value_type: &'static str,
    pub get: fn(&T) -> Value,
    pub set: fn(&mut T, Value) -> Result<(), ConversionError>,
}

impl<T> FieldBinding<T> {
    pub const fn new(
        column: &'static str,
        value_type: &'static str,
        get: fn(&T) -> Value,
        set: fn(&mut T, Value) -> Result<(), ConversionError>,
    ) -> Self {
        Self {
            column,
            value_type,
            get,
            set,
        }
    }

    pub fn get(&self, record: &T) -> Value {
        (self.get)(record)
    }

    pub fn set(&self, record: &mut T, value: Value) -> Result<(), ConversionError> {
        (self.set)(record, value)
    }
}

// fn pointers are Copy for any T, so avoid the derive's `T: Clone` bound
impl<T> Clone for FieldBinding<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for FieldBinding<T> {}

impl<T> fmt::Debug for FieldBinding<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldBinding")
            .field("column", &self.column)
            .field("value_type", &self.value_type)
            .finish()
    }
}

/// A statically declared row shape for one table.
///
/// Implemented by `#[derive(Record)]`; manual implementations must keep
/// column names unique within [`Record::bindings`] and list them in
/// declaration order.
pub trait Record: Default + Send + Sync + 'static {
    /// Logical table name. Types with an empty name are never cached.
    const TABLE_NAME: &'static str;

    /// Column holding the integer primary key.
    const ID_COLUMN: &'static str = "id";

    /// Primary key value used to target updates and deletes.
    fn id(&self) -> i64;

    fn bindings() -> Vec<FieldBinding<Self>>;
}

/// Returns the ordered field bindings of `T`.
///
/// A type with no annotated fields yields an empty list; inserting or
/// updating such a type produces a statement SQLite rejects.
pub fn resolve<T: Record>() -> Vec<FieldBinding<T>> {
    T::bindings()
}

/// Column/value pairs for every bound field of `record`, in binding order.
pub(crate) fn field_values<T: Record>(record: &T) -> Vec<(&'static str, Value)> {
    resolve::<T>()
        .iter()
        .map(|binding| (binding.column, binding.get(record)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Record;

    #[derive(Debug, Default, PartialEq, Record)]
    #[record(table = "accounts")]
    struct Account {
        #[column("id")]
        id: i64,
        #[column("owner")]
        owner: String,
        #[column("balance")]
        balance: Option<f64>,
        scratch: u32,
    }

    #[derive(Debug, Default)]
    struct Unmapped {
        note: String,
    }

    impl Record for Unmapped {
        const TABLE_NAME: &'static str = "unmapped";

        fn id(&self) -> i64 {
            0
        }

        fn bindings() -> Vec<FieldBinding<Self>> {
            Vec::new()
        }
    }

    #[test]
    fn type_without_annotations_resolves_to_nothing() {
        assert!(resolve::<Unmapped>().is_empty());
        assert!(field_values(&Unmapped { note: "x".into() }).is_empty());
        assert_eq!(Unmapped::ID_COLUMN, "id");
    }

    #[test]
    fn resolve_skips_unannotated_fields_and_keeps_order() {
        let columns: Vec<_> = resolve::<Account>().iter().map(|b| b.column).collect();
        assert_eq!(columns, ["id", "owner", "balance"]);
    }

    #[test]
    fn bindings_record_declared_types() {
        let types: Vec<_> = resolve::<Account>().iter().map(|b| b.value_type).collect();
        assert_eq!(types, ["i64", "String", "f64"]);
    }

    #[test]
    fn bindings_read_and_write_fields() {
        let mut account = Account::default();
        let bindings = resolve::<Account>();

        bindings[1].set(&mut account, Value::Text("ada".into())).unwrap();
        bindings[2].set(&mut account, Value::Real(1.5)).unwrap();

        assert_eq!(account.owner, "ada");
        assert_eq!(bindings[2].get(&account), Value::Real(1.5));
        assert_eq!(account.scratch, 0);
    }

    #[test]
    fn null_becomes_default_or_none() {
        assert_eq!(i64::from_value(Value::Null).unwrap(), 0);
        assert_eq!(String::from_value(Value::Null).unwrap(), "");
        assert_eq!(Option::<i64>::from_value(Value::Null).unwrap(), None);
        assert!(Option::<i64>::None.to_value().is_null());
    }

    #[test]
    fn mismatched_values_are_rejected() {
        let err = i64::from_value(Value::Text("x".into())).unwrap_err();
        assert_eq!(err.expected, "i64");

        let err = i32::from_value(Value::Integer(i64::MAX)).unwrap_err();
        assert_eq!(err.found, Value::Integer(i64::MAX));
    }

    #[test]
    fn field_values_follow_bindings() {
        let account = Account {
            id: 7,
            owner: "bob".into(),
            balance: None,
            scratch: 3,
        };
        assert_eq!(
            field_values(&account),
            vec![
                ("id", Value::Integer(7)),
                ("owner", Value::Text("bob".into())),
                ("balance", Value::Null),
            ]
        );
        assert_eq!(account.id(), 7);
    }
}

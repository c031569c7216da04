//! SQL value types exchanged with live connections.
//!
//! Values flow in both directions: as bound parameters for prepared
//! statements and as decoded row cells coming back from result cursors.

use std::borrow::Cow;
use std::hash::{Hash, Hasher};

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use super::canonical::{ColumnType, LogicalType, PrimitiveKind};

/// Type hint for NULL values so drivers can bind a typed NULL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SqlNullType {
    Bool,
    I8,
    I16,
    I32,
    I64,
    F32,
    F64,
    String,
    Bytes,
    Decimal,
    DateTime,
    Date,
    Time,
}

impl SqlNullType {
    /// NULL type matching a canonical column type.
    pub fn for_column_type(ty: &ColumnType) -> Self {
        match &ty.logical {
            Some(LogicalType::Decimal { .. }) => return SqlNullType::Decimal,
            Some(LogicalType::Date) => return SqlNullType::Date,
            Some(LogicalType::Time) => return SqlNullType::Time,
            Some(LogicalType::Timestamp) => return SqlNullType::DateTime,
            Some(LogicalType::Other(_)) | None => {}
        }
        match ty.kind {
            PrimitiveKind::Int8 => SqlNullType::I8,
            PrimitiveKind::Int16 => SqlNullType::I16,
            PrimitiveKind::Int32 => SqlNullType::I32,
            PrimitiveKind::Int64 => SqlNullType::I64,
            PrimitiveKind::Float32 => SqlNullType::F32,
            PrimitiveKind::Float64 => SqlNullType::F64,
            PrimitiveKind::Boolean => SqlNullType::Bool,
            PrimitiveKind::String => SqlNullType::String,
            PrimitiveKind::Bytes => SqlNullType::Bytes,
        }
    }
}

/// SQL value enum for type-safe row handling.
///
/// Uses `Cow` for string and byte data so decoders can borrow from driver
/// buffers; records handed to callers are always `'static`.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue<'a> {
    /// NULL with type hint.
    Null(SqlNullType),
    Bool(bool),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
    Text(Cow<'a, str>),
    Bytes(Cow<'a, [u8]>),
    Decimal(Decimal),
    /// Timestamp without timezone (UTC when the source had one).
    DateTime(NaiveDateTime),
    Date(NaiveDate),
    Time(NaiveTime),
}

impl<'a> SqlValue<'a> {
    /// Convert to a fully owned value with `'static` lifetime.
    #[must_use]
    pub fn into_owned(self) -> SqlValue<'static> {
        match self {
            SqlValue::Null(t) => SqlValue::Null(t),
            SqlValue::Bool(v) => SqlValue::Bool(v),
            SqlValue::I8(v) => SqlValue::I8(v),
            SqlValue::I16(v) => SqlValue::I16(v),
            SqlValue::I32(v) => SqlValue::I32(v),
            SqlValue::I64(v) => SqlValue::I64(v),
            SqlValue::F32(v) => SqlValue::F32(v),
            SqlValue::F64(v) => SqlValue::F64(v),
            SqlValue::Text(v) => SqlValue::Text(Cow::Owned(v.into_owned())),
            SqlValue::Bytes(v) => SqlValue::Bytes(Cow::Owned(v.into_owned())),
            SqlValue::Decimal(v) => SqlValue::Decimal(v),
            SqlValue::DateTime(v) => SqlValue::DateTime(v),
            SqlValue::Date(v) => SqlValue::Date(v),
            SqlValue::Time(v) => SqlValue::Time(v),
        }
    }

    /// Check if this value is NULL.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null(_))
    }

    /// Get the SqlNullType for this value.
    #[must_use]
    pub fn null_type(&self) -> SqlNullType {
        match self {
            SqlValue::Null(t) => *t,
            SqlValue::Bool(_) => SqlNullType::Bool,
            SqlValue::I8(_) => SqlNullType::I8,
            SqlValue::I16(_) => SqlNullType::I16,
            SqlValue::I32(_) => SqlNullType::I32,
            SqlValue::I64(_) => SqlNullType::I64,
            SqlValue::F32(_) => SqlNullType::F32,
            SqlValue::F64(_) => SqlNullType::F64,
            SqlValue::Text(_) => SqlNullType::String,
            SqlValue::Bytes(_) => SqlNullType::Bytes,
            SqlValue::Decimal(_) => SqlNullType::Decimal,
            SqlValue::DateTime(_) => SqlNullType::DateTime,
            SqlValue::Date(_) => SqlNullType::Date,
            SqlValue::Time(_) => SqlNullType::Time,
        }
    }

    /// Integer view used for incrementing offsets.
    ///
    /// Decimals convert only when they carry no fractional part.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            SqlValue::I8(v) => Some(i64::from(*v)),
            SqlValue::I16(v) => Some(i64::from(*v)),
            SqlValue::I32(v) => Some(i64::from(*v)),
            SqlValue::I64(v) => Some(*v),
            SqlValue::Decimal(d) if d.fract().is_zero() => d.to_i64(),
            _ => None,
        }
    }

    /// Timestamp view used for timestamp offsets.
    pub fn as_datetime(&self) -> Option<NaiveDateTime> {
        match self {
            SqlValue::DateTime(v) => Some(*v),
            SqlValue::Date(d) => d.and_hms_opt(0, 0, 0),
            _ => None,
        }
    }

    /// JSON rendering for record output.
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value;
        match self {
            SqlValue::Null(_) => Value::Null,
            SqlValue::Bool(v) => Value::Bool(*v),
            SqlValue::I8(v) => Value::from(*v),
            SqlValue::I16(v) => Value::from(*v),
            SqlValue::I32(v) => Value::from(*v),
            SqlValue::I64(v) => Value::from(*v),
            SqlValue::F32(v) => Value::from(*v),
            SqlValue::F64(v) => Value::from(*v),
            SqlValue::Text(v) => Value::String(v.to_string()),
            SqlValue::Bytes(v) => Value::String(hex_upper(v)),
            SqlValue::Decimal(v) => Value::String(v.to_string()),
            SqlValue::DateTime(v) => Value::String(v.format("%Y-%m-%dT%H:%M:%S%.f").to_string()),
            SqlValue::Date(v) => Value::String(v.to_string()),
            SqlValue::Time(v) => Value::String(v.to_string()),
        }
    }
}

/// Upper-case hex encoding, no prefix.
pub(crate) fn hex_upper(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02X}", b)).collect()
}

// Convenience constructors for common cases
impl<'a> SqlValue<'a> {
    /// Create a text value from a borrowed string slice.
    #[must_use]
    pub fn text_borrowed(s: &'a str) -> Self {
        SqlValue::Text(Cow::Borrowed(s))
    }

    /// Create a text value from an owned String.
    #[must_use]
    pub fn text_owned(s: String) -> SqlValue<'static> {
        SqlValue::Text(Cow::Owned(s))
    }

    /// Create a bytes value from an owned Vec<u8>.
    #[must_use]
    pub fn bytes_owned(b: Vec<u8>) -> SqlValue<'static> {
        SqlValue::Bytes(Cow::Owned(b))
    }
}

/// Consistent with `PartialEq`: floats hash by bit pattern with both zeros
/// folded together.
impl Hash for SqlValue<'_> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            SqlValue::Null(t) => t.hash(state),
            SqlValue::Bool(v) => v.hash(state),
            SqlValue::I8(v) => v.hash(state),
            SqlValue::I16(v) => v.hash(state),
            SqlValue::I32(v) => v.hash(state),
            SqlValue::I64(v) => v.hash(state),
            SqlValue::F32(v) => (if *v == 0.0 { 0 } else { v.to_bits() }).hash(state),
            SqlValue::F64(v) => (if *v == 0.0 { 0 } else { v.to_bits() }).hash(state),
            SqlValue::Text(v) => v.hash(state),
            SqlValue::Bytes(v) => v.hash(state),
            SqlValue::Decimal(v) => v.hash(state),
            SqlValue::DateTime(v) => v.hash(state),
            SqlValue::Date(v) => v.hash(state),
            SqlValue::Time(v) => v.hash(state),
        }
    }
}

impl From<bool> for SqlValue<'static> {
    fn from(v: bool) -> Self {
        SqlValue::Bool(v)
    }
}

impl From<i8> for SqlValue<'static> {
    fn from(v: i8) -> Self {
        SqlValue::I8(v)
    }
}

impl From<i16> for SqlValue<'static> {
    fn from(v: i16) -> Self {
        SqlValue::I16(v)
    }
}

impl From<i32> for SqlValue<'static> {
    fn from(v: i32) -> Self {
        SqlValue::I32(v)
    }
}

impl From<i64> for SqlValue<'static> {
    fn from(v: i64) -> Self {
        SqlValue::I64(v)
    }
}

impl From<f32> for SqlValue<'static> {
    fn from(v: f32) -> Self {
        SqlValue::F32(v)
    }
}

impl From<f64> for SqlValue<'static> {
    fn from(v: f64) -> Self {
        SqlValue::F64(v)
    }
}

impl From<String> for SqlValue<'static> {
    fn from(v: String) -> Self {
        SqlValue::Text(Cow::Owned(v))
    }
}

impl<'a> From<&'a str> for SqlValue<'a> {
    fn from(v: &'a str) -> Self {
        SqlValue::Text(Cow::Borrowed(v))
    }
}

impl From<Vec<u8>> for SqlValue<'static> {
    fn from(v: Vec<u8>) -> Self {
        SqlValue::Bytes(Cow::Owned(v))
    }
}

impl From<Decimal> for SqlValue<'static> {
    fn from(v: Decimal) -> Self {
        SqlValue::Decimal(v)
    }
}

impl From<NaiveDateTime> for SqlValue<'static> {
    fn from(v: NaiveDateTime) -> Self {
        SqlValue::DateTime(v)
    }
}

impl From<NaiveDate> for SqlValue<'static> {
    fn from(v: NaiveDate) -> Self {
        SqlValue::Date(v)
    }
}

impl From<NaiveTime> for SqlValue<'static> {
    fn from(v: NaiveTime) -> Self {
        SqlValue::Time(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sql_value_into_owned() {
        let borrowed: SqlValue<'_> = SqlValue::Text(Cow::Borrowed("hello"));
        let owned: SqlValue<'static> = borrowed.into_owned();
        assert_eq!(owned, SqlValue::Text(Cow::Owned("hello".to_string())));
    }

    #[test]
    fn test_null_type_follows_logical_type() {
        assert_eq!(
            SqlNullType::for_column_type(&ColumnType::decimal(None, Some(2))),
            SqlNullType::Decimal
        );
        assert_eq!(
            SqlNullType::for_column_type(&ColumnType::primitive(PrimitiveKind::Int8)),
            SqlNullType::I8
        );
        assert!(SqlValue::<'static>::Null(SqlNullType::String).is_null());
    }

    #[test]
    fn test_offset_views() {
        assert_eq!(SqlValue::I16(7).as_i64(), Some(7));
        assert_eq!(SqlValue::Decimal(Decimal::new(4200, 2)).as_i64(), Some(42));
        assert_eq!(SqlValue::Decimal(Decimal::new(4250, 2)).as_i64(), None);
        assert_eq!(SqlValue::text_borrowed("x").as_i64(), None);

        let d = NaiveDate::from_ymd_opt(2001, 3, 15).unwrap();
        assert_eq!(
            SqlValue::Date(d).as_datetime(),
            d.and_hms_opt(0, 0, 0)
        );
    }

    #[test]
    fn test_equal_values_hash_equal() {
        use std::collections::hash_map::DefaultHasher;

        fn hash_of(v: &SqlValue<'_>) -> u64 {
            let mut h = DefaultHasher::new();
            v.hash(&mut h);
            h.finish()
        }

        assert_eq!(hash_of(&SqlValue::F64(0.0)), hash_of(&SqlValue::F64(-0.0)));
        assert_eq!(
            hash_of(&SqlValue::text_borrowed("k")),
            hash_of(&SqlValue::text_owned("k".to_string()))
        );
        assert_eq!(
            hash_of(&SqlValue::Decimal(Decimal::new(10, 1))),
            hash_of(&SqlValue::Decimal(Decimal::new(100, 2)))
        );
        assert_ne!(hash_of(&SqlValue::I32(1)), hash_of(&SqlValue::I64(1)));
    }

    #[test]
    fn test_to_json() {
        assert_eq!(SqlValue::I32(5).to_json(), serde_json::json!(5));
        assert_eq!(
            SqlValue::bytes_owned(vec![0xde, 0xad]).to_json(),
            serde_json::json!("DEAD")
        );
        assert_eq!(
            SqlValue::Null(SqlNullType::I32).to_json(),
            serde_json::Value::Null
        );
    }
}

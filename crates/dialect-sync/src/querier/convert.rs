//! Result metadata to canonical schema, and rows to records.

use std::sync::Arc;

use serde::Serialize;

use crate::core::canonical::{ColumnType, PrimitiveKind};
use crate::core::query::SourceOffset;
use crate::core::schema::{ColumnMetadata, FieldSchema, Nullability, Record, RecordSchema, SqlTypeCode};
use crate::core::traits::Dialect;
use crate::core::value::SqlValue;
use crate::error::{Result, SyncError};

/// A record emitted by a querier, with the offset reached after it.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceRecord {
    /// Table or query the record came from.
    pub source: String,
    pub record: Record,
    pub offset: SourceOffset,
}

#[derive(Serialize)]
struct SourceRecordJson<'a> {
    source: &'a str,
    offset: &'a SourceOffset,
    value: serde_json::Value,
}

impl SourceRecord {
    /// `{"source": .., "offset": {..}, "value": {column: value}}`.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(SourceRecordJson {
            source: &self.source,
            offset: &self.offset,
            value: self.record.to_json(),
        })
        .unwrap_or(serde_json::Value::Null)
    }
}

/// Canonical type for one result column.
///
/// # Errors
///
/// Returns `SyncError::UnsupportedType` for a type code with no canonical
/// counterpart. Such columns are never mapped to a fallback type.
pub fn column_type<D: Dialect + ?Sized>(dialect: &D, column: &ColumnMetadata) -> Result<ColumnType> {
    Ok(match &column.type_code {
        SqlTypeCode::Boolean => ColumnType::primitive(PrimitiveKind::Boolean),
        SqlTypeCode::TinyInt => ColumnType::primitive(PrimitiveKind::Int8),
        SqlTypeCode::SmallInt => ColumnType::primitive(PrimitiveKind::Int16),
        SqlTypeCode::Integer => ColumnType::primitive(PrimitiveKind::Int32),
        SqlTypeCode::BigInt => ColumnType::primitive(PrimitiveKind::Int64),
        SqlTypeCode::Real => ColumnType::primitive(PrimitiveKind::Float32),
        SqlTypeCode::Double => ColumnType::primitive(PrimitiveKind::Float64),
        SqlTypeCode::Numeric => {
            let precision = u32::try_from(column.precision).ok().filter(|p| *p > 0);
            let scale = dialect.decimal_scale(column.precision, column.scale);
            ColumnType::decimal(precision, Some(scale))
        }
        SqlTypeCode::Char => ColumnType::primitive(PrimitiveKind::String),
        SqlTypeCode::Binary => ColumnType::primitive(PrimitiveKind::Bytes),
        SqlTypeCode::Date => ColumnType::date(),
        SqlTypeCode::Time => ColumnType::time(),
        SqlTypeCode::Timestamp | SqlTypeCode::TimestampTz => ColumnType::timestamp(),
        SqlTypeCode::Other(type_name) => {
            return Err(SyncError::unsupported(&column.name, type_name));
        }
    })
}

/// Derive the record schema for an open cursor.
///
/// # Errors
///
/// Returns `SyncError::UnsupportedType` if any column cannot be mapped.
pub fn schema_from_metadata<D: Dialect + ?Sized>(
    dialect: &D,
    name: &str,
    columns: &[ColumnMetadata],
) -> Result<RecordSchema> {
    let fields = columns
        .iter()
        .map(|c| {
            let ty = column_type(dialect, c)?;
            Ok(FieldSchema::new(
                c.name.clone(),
                ty,
                c.nullability != Nullability::NoNulls,
            ))
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(RecordSchema::new(Some(name.to_string()), fields))
}

/// Pair a decoded row with its schema.
///
/// # Errors
///
/// Returns `SyncError::Precondition` if the row width does not match the
/// schema or a NULL arrives in a column declared not-null.
pub fn row_to_record(schema: &Arc<RecordSchema>, values: Vec<SqlValue<'static>>) -> Result<Record> {
    if values.len() != schema.fields.len() {
        return Err(SyncError::precondition(format!(
            "Row has {} values but the schema has {} columns",
            values.len(),
            schema.fields.len()
        )));
    }
    if let Some(field) = schema
        .fields
        .iter()
        .zip(values.iter())
        .find(|(f, v)| !f.optional && v.is_null())
        .map(|(f, _)| f)
    {
        return Err(SyncError::precondition(format!(
            "NULL in non-nullable column '{}'",
            field.name
        )));
    }
    Ok(Record {
        schema: Arc::clone(schema),
        values,
    })
}

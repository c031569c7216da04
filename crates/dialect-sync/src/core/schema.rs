//! Column, record and result-metadata types.
//!
//! A [`RecordSchema`] is the ordered field list that comes from the record
//! side. Combined with a set of key field names it becomes the ordered
//! [`ColumnSpec`] list that DDL and DML generation work from. On the read
//! side, [`ColumnMetadata`] is what a live cursor reports for each result
//! column.

use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::canonical::{ColumnType, LogicalType, PrimitiveKind};
use super::value::SqlValue;
use crate::error::{Result, SyncError};

/// One column of a target table, derived from a record schema snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnSpec {
    pub name: String,
    pub column_type: ColumnType,
    pub is_primary_key: bool,
    pub is_optional: bool,
    pub default_value: Option<SqlValue<'static>>,
}

impl ColumnSpec {
    /// Required, non-key column without a default.
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
            is_primary_key: false,
            is_optional: false,
            default_value: None,
        }
    }

    pub fn optional(mut self) -> Self {
        self.is_optional = true;
        self
    }

    pub fn primary_key(mut self) -> Self {
        self.is_primary_key = true;
        self
    }

    pub fn with_default(mut self, value: impl Into<SqlValue<'static>>) -> Self {
        self.default_value = Some(value.into());
        self
    }
}

/// Split columns into key and non-key lists, each in declaration order.
pub fn partition_columns(columns: &[ColumnSpec]) -> (Vec<&ColumnSpec>, Vec<&ColumnSpec>) {
    columns.iter().partition(|c| c.is_primary_key)
}

/// A field of a record schema.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSchema {
    pub name: String,
    pub column_type: ColumnType,
    pub optional: bool,
    pub default_value: Option<SqlValue<'static>>,
}

impl FieldSchema {
    pub fn new(name: impl Into<String>, column_type: ColumnType, optional: bool) -> Self {
        Self {
            name: name.into(),
            column_type,
            optional,
            default_value: None,
        }
    }
}

/// Ordered field list describing one kind of record.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RecordSchema {
    /// Table or query name the schema was derived from.
    pub name: Option<String>,
    pub fields: Vec<FieldSchema>,
}

impl RecordSchema {
    pub fn new(name: Option<String>, fields: Vec<FieldSchema>) -> Self {
        Self { name, fields }
    }

    pub fn field(&self, name: &str) -> Option<&FieldSchema> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    /// Derive the ordered column list for a table.
    ///
    /// Column order is field declaration order; `key_fields` only marks
    /// which columns are part of the primary key.
    ///
    /// # Errors
    ///
    /// Returns `SyncError::Config` if a key field is not in the schema.
    pub fn column_specs(&self, key_fields: &[String]) -> Result<Vec<ColumnSpec>> {
        if let Some(missing) = key_fields.iter().find(|k| self.field(k).is_none()) {
            return Err(SyncError::Config(format!(
                "Key field '{}' is not part of the record schema",
                missing
            )));
        }

        Ok(self
            .fields
            .iter()
            .map(|f| ColumnSpec {
                name: f.name.clone(),
                column_type: f.column_type.clone(),
                is_primary_key: key_fields.contains(&f.name),
                is_optional: f.optional,
                default_value: f.default_value.clone(),
            })
            .collect())
    }
}

/// A row paired with the schema snapshot active when it was read.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub schema: Arc<RecordSchema>,
    pub values: Vec<SqlValue<'static>>,
}

impl Record {
    /// Value of a named column.
    pub fn get(&self, name: &str) -> Option<&SqlValue<'static>> {
        self.schema.index_of(name).and_then(|i| self.values.get(i))
    }

    /// Column-name to value mapping as a JSON object.
    pub fn to_json(&self) -> serde_json::Value {
        let map = self
            .schema
            .fields
            .iter()
            .zip(self.values.iter())
            .map(|(f, v)| (f.name.clone(), v.to_json()))
            .collect();
        serde_json::Value::Object(map)
    }
}

/// SQL type family reported by a result cursor.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SqlTypeCode {
    Boolean,
    TinyInt,
    SmallInt,
    Integer,
    BigInt,
    Real,
    Double,
    Numeric,
    Char,
    Binary,
    Date,
    Time,
    Timestamp,
    TimestampTz,
    /// Driver type name with no canonical counterpart.
    Other(String),
}

/// Whether a result column can hold NULL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Nullability {
    NoNulls,
    Nullable,
    #[default]
    Unknown,
}

/// Result metadata for one column of an open cursor.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ColumnMetadata {
    pub name: String,
    pub type_code: SqlTypeCode,
    pub nullability: Nullability,
    /// Declared precision, 0 when the driver reports none.
    pub precision: i32,
    /// Declared scale, `None` when unset.
    pub scale: Option<i32>,
}

impl ColumnMetadata {
    pub fn new(name: impl Into<String>, type_code: SqlTypeCode, nullability: Nullability) -> Self {
        Self {
            name: name.into(),
            type_code,
            nullability,
            precision: 0,
            scale: None,
        }
    }

    pub fn numeric(name: impl Into<String>, precision: i32, scale: Option<i32>) -> Self {
        Self {
            precision,
            scale,
            ..Self::new(name, SqlTypeCode::Numeric, Nullability::Unknown)
        }
    }
}

/// Parse a textual default into a value of the column's type.
///
/// Dates use `YYYY-MM-DD`, times `HH:MM:SS[.fff]` and timestamps
/// `YYYY-MM-DD HH:MM:SS[.fff]`. Bytes are hex.
///
/// # Errors
///
/// Returns `SyncError::Config` if the text does not parse as the column type.
pub fn parse_default_literal(
    column: &str,
    column_type: &ColumnType,
    text: &str,
) -> Result<SqlValue<'static>> {
    let bad = |what: &str| {
        SyncError::Config(format!(
            "Default {:?} for column '{}' is not a valid {}",
            text, column, what
        ))
    };
    let text = text.trim();

    match &column_type.logical {
        Some(LogicalType::Decimal { .. }) => {
            return text
                .parse::<Decimal>()
                .map(SqlValue::Decimal)
                .map_err(|_| bad("decimal"));
        }
        Some(LogicalType::Date) => {
            return NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .map(SqlValue::Date)
                .map_err(|_| bad("date"));
        }
        Some(LogicalType::Time) => {
            return NaiveTime::parse_from_str(text, "%H:%M:%S%.f")
                .map(SqlValue::Time)
                .map_err(|_| bad("time"));
        }
        Some(LogicalType::Timestamp) => {
            return NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f")
                .or_else(|_| NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f"))
                .map(SqlValue::DateTime)
                .map_err(|_| bad("timestamp"));
        }
        Some(LogicalType::Other(_)) | None => {}
    }

    match column_type.kind {
        PrimitiveKind::Int8 => text.parse().map(SqlValue::I8).map_err(|_| bad("INT8")),
        PrimitiveKind::Int16 => text.parse().map(SqlValue::I16).map_err(|_| bad("INT16")),
        PrimitiveKind::Int32 => text.parse().map(SqlValue::I32).map_err(|_| bad("INT32")),
        PrimitiveKind::Int64 => text.parse().map(SqlValue::I64).map_err(|_| bad("INT64")),
        PrimitiveKind::Float32 => text.parse().map(SqlValue::F32).map_err(|_| bad("FLOAT32")),
        PrimitiveKind::Float64 => text.parse().map(SqlValue::F64).map_err(|_| bad("FLOAT64")),
        PrimitiveKind::Boolean => match text.to_ascii_lowercase().as_str() {
            "true" | "1" => Ok(SqlValue::Bool(true)),
            "false" | "0" => Ok(SqlValue::Bool(false)),
            _ => Err(bad("boolean")),
        },
        PrimitiveKind::String => Ok(SqlValue::text_owned(text.to_string())),
        PrimitiveKind::Bytes => decode_hex(text)
            .map(SqlValue::bytes_owned)
            .ok_or_else(|| bad("hex byte string")),
    }
}

fn decode_hex(text: &str) -> Option<Vec<u8>> {
    if text.len() % 2 != 0 {
        return None;
    }
    (0..text.len())
        .step_by(2)
        .map(|i| text.get(i..i + 2).and_then(|h| u8::from_str_radix(h, 16).ok()))
        .collect()
}

//! Type-mapping policy shared by all dialects.
//!
//! The per-dialect type names live with each driver; this module holds the
//! rules every dialect applies the same way: the numeric scale fallback and
//! literal formatting for column defaults.

use crate::core::value::{hex_upper, SqlValue};

use super::BooleanLiteral;

/// Scale for a numeric column discovered on a live result.
///
/// Drivers report an unset scale, or `0/0`, for unconstrained numerics.
/// Both fall back to `high` so values are never truncated; any other scale
/// is used verbatim.
pub fn decimal_scale(precision: i32, scale: Option<i32>, high: i32) -> i32 {
    match scale {
        None => high,
        Some(0) if precision == 0 => high,
        Some(s) => s,
    }
}

/// Render a value as a SQL literal.
pub fn format_literal(value: &SqlValue<'_>, booleans: BooleanLiteral) -> String {
    match value {
        SqlValue::Null(_) => "NULL".to_string(),
        SqlValue::Bool(b) => match (booleans, b) {
            (BooleanLiteral::Keyword, true) => "TRUE".to_string(),
            (BooleanLiteral::Keyword, false) => "FALSE".to_string(),
            (BooleanLiteral::Numeric, true) => "1".to_string(),
            (BooleanLiteral::Numeric, false) => "0".to_string(),
        },
        SqlValue::I8(v) => v.to_string(),
        SqlValue::I16(v) => v.to_string(),
        SqlValue::I32(v) => v.to_string(),
        SqlValue::I64(v) => v.to_string(),
        SqlValue::F32(v) => v.to_string(),
        SqlValue::F64(v) => v.to_string(),
        SqlValue::Text(s) => format!("'{}'", s.replace('\'', "''")),
        SqlValue::Bytes(b) => format!("X'{}'", hex_upper(b)),
        SqlValue::Decimal(d) => d.to_string(),
        SqlValue::DateTime(dt) => format!("'{}'", dt.format("%Y-%m-%d %H:%M:%S%.3f")),
        SqlValue::Date(d) => format!("'{}'", d.format("%Y-%m-%d")),
        SqlValue::Time(t) => format!("'{}'", t.format("%H:%M:%S%.3f")),
    }
}

/// Type name without its length or precision arguments (`VARCHAR(1024)` → `VARCHAR`).
pub fn base_type_name(sql_type: &str) -> &str {
    sql_type.split('(').next().unwrap_or(sql_type).trim_end()
}

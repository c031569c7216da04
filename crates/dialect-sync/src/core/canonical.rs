//! Canonical (database-independent) type model.
//!
//! Every column is described by a [`PrimitiveKind`] plus an optional
//! [`LogicalType`] overlay. Dialects turn this pair into a native SQL type;
//! the logical type always wins when the dialect recognizes it.
//!
//! ```text
//! record schema  →  ColumnType { kind, logical }  →  dialect SQL type
//!   id: INT32    →  Int32 / None                  →  INT
//!   price        →  Bytes / Decimal(scale 2)      →  DECIMAL
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{Result, SyncError};

/// Scale value some drivers report when a numeric column has no declared scale.
pub const NUMERIC_TYPE_SCALE_UNSET: i32 = -127;

/// Scale used when the discovered scale is unset or ambiguous.
pub const NUMERIC_TYPE_SCALE_HIGH: i32 = 127;

/// Primitive value kinds. Every dialect maps all nine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PrimitiveKind {
    Int8,
    Int16,
    Int32,
    Int64,
    Float32,
    Float64,
    Boolean,
    String,
    Bytes,
}

impl PrimitiveKind {
    /// All primitive kinds, in declaration order.
    pub const ALL: [PrimitiveKind; 9] = [
        PrimitiveKind::Int8,
        PrimitiveKind::Int16,
        PrimitiveKind::Int32,
        PrimitiveKind::Int64,
        PrimitiveKind::Float32,
        PrimitiveKind::Float64,
        PrimitiveKind::Boolean,
        PrimitiveKind::String,
        PrimitiveKind::Bytes,
    ];

    /// Upper-case kind name, e.g. `INT32`.
    pub fn name(&self) -> &'static str {
        match self {
            PrimitiveKind::Int8 => "INT8",
            PrimitiveKind::Int16 => "INT16",
            PrimitiveKind::Int32 => "INT32",
            PrimitiveKind::Int64 => "INT64",
            PrimitiveKind::Float32 => "FLOAT32",
            PrimitiveKind::Float64 => "FLOAT64",
            PrimitiveKind::Boolean => "BOOLEAN",
            PrimitiveKind::String => "STRING",
            PrimitiveKind::Bytes => "BYTES",
        }
    }

    /// Parse a kind name (case-insensitive).
    pub fn parse(name: &str) -> Option<Self> {
        PrimitiveKind::ALL
            .into_iter()
            .find(|k| k.name().eq_ignore_ascii_case(name.trim()))
    }
}

impl std::fmt::Display for PrimitiveKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Semantic overlay on top of a primitive kind.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LogicalType {
    /// Exact numeric. `None` means the value was never declared, which is
    /// distinct from an explicit zero.
    Decimal {
        precision: Option<u32>,
        scale: Option<i32>,
    },
    Date,
    Time,
    Timestamp,
    /// A logical name this crate does not know. Dialects fall through to the
    /// primitive kind for these.
    Other(String),
}

impl LogicalType {
    pub const DECIMAL: &'static str = "Decimal";
    pub const DATE: &'static str = "Date";
    pub const TIME: &'static str = "Time";
    pub const TIMESTAMP: &'static str = "Timestamp";

    /// Decimal with a declared scale and no declared precision.
    pub fn decimal(scale: i32) -> Self {
        LogicalType::Decimal {
            precision: None,
            scale: Some(scale),
        }
    }

    /// Name used for dialect dispatch.
    pub fn name(&self) -> &str {
        match self {
            LogicalType::Decimal { .. } => Self::DECIMAL,
            LogicalType::Date => Self::DATE,
            LogicalType::Time => Self::TIME,
            LogicalType::Timestamp => Self::TIMESTAMP,
            LogicalType::Other(name) => name,
        }
    }

    /// Build from a logical name plus optional decimal parameters.
    ///
    /// Matching accepts both short names (`Decimal`) and fully qualified
    /// names ending in the short name (`org.apache.kafka.connect.data.Decimal`).
    pub fn from_name(name: &str, precision: Option<u32>, scale: Option<i32>) -> Self {
        let short = name.rsplit('.').next().unwrap_or(name);
        match short.to_ascii_lowercase().as_str() {
            "decimal" => LogicalType::Decimal { precision, scale },
            "date" => LogicalType::Date,
            "time" => LogicalType::Time,
            "timestamp" => LogicalType::Timestamp,
            _ => LogicalType::Other(name.to_string()),
        }
    }
}

impl std::fmt::Display for LogicalType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogicalType::Decimal { precision, scale } => {
                let p = precision.map_or("unset".to_string(), |p| p.to_string());
                let s = scale.map_or("unset".to_string(), |s| s.to_string());
                write!(f, "Decimal({},{})", p, s)
            }
            other => f.write_str(other.name()),
        }
    }
}

/// Full canonical type of a column.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColumnType {
    pub kind: PrimitiveKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logical: Option<LogicalType>,
}

impl ColumnType {
    pub fn primitive(kind: PrimitiveKind) -> Self {
        Self {
            kind,
            logical: None,
        }
    }

    pub fn logical(kind: PrimitiveKind, logical: LogicalType) -> Self {
        Self {
            kind,
            logical: Some(logical),
        }
    }

    /// Decimals travel as bytes.
    pub fn decimal(precision: Option<u32>, scale: Option<i32>) -> Self {
        Self::logical(PrimitiveKind::Bytes, LogicalType::Decimal { precision, scale })
    }

    /// Days since epoch.
    pub fn date() -> Self {
        Self::logical(PrimitiveKind::Int32, LogicalType::Date)
    }

    /// Milliseconds since midnight.
    pub fn time() -> Self {
        Self::logical(PrimitiveKind::Int32, LogicalType::Time)
    }

    /// Milliseconds since epoch.
    pub fn timestamp() -> Self {
        Self::logical(PrimitiveKind::Int64, LogicalType::Timestamp)
    }

    /// Build from external type names.
    ///
    /// # Errors
    ///
    /// Returns `SyncError::UnsupportedType` if the primitive kind name is not
    /// one of the nine canonical kinds. Unknown logical names are kept as
    /// [`LogicalType::Other`].
    pub fn from_names(
        column: &str,
        kind_name: &str,
        logical_name: Option<&str>,
        precision: Option<u32>,
        scale: Option<i32>,
    ) -> Result<Self> {
        let kind = PrimitiveKind::parse(kind_name)
            .ok_or_else(|| SyncError::unsupported(column, kind_name))?;
        let logical = logical_name.map(|n| LogicalType::from_name(n, precision, scale));
        Ok(Self { kind, logical })
    }
}

impl std::fmt::Display for ColumnType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.logical {
            Some(l) => write!(f, "{}/{}", self.kind, l),
            None => write!(f, "{}", self.kind),
        }
    }
}

/// Convert a driver-reported scale to the canonical form.
///
/// Drivers that cannot express "no scale" report [`NUMERIC_TYPE_SCALE_UNSET`].
pub fn scale_from_driver(scale: i32) -> Option<i32> {
    if scale == NUMERIC_TYPE_SCALE_UNSET {
        None
    } else {
        Some(scale)
    }
}

//! PostgreSQL SQL dialect (Strategy pattern).
//!
//! Double-quoted identifiers, `$n` placeholders, `INSERT ... ON CONFLICT`
//! upserts and a server-side probe for the identifier length limit.

use crate::core::canonical::{LogicalType, PrimitiveKind};
use crate::core::identifier::QuoteChars;
use crate::core::traits::Dialect;
use crate::dialect::{
    AlterStyle, BooleanLiteral, DialectDescriptor, DialectSettings, PlaceholderStyle,
    UpsertStrategy,
};

pub(crate) static DESCRIPTOR: DialectDescriptor = DialectDescriptor {
    name: "postgres",
    display_name: "PostgreSQL",
    aliases: &["postgresql", "pg"],
    quote: QuoteChars::DOUBLE_QUOTE,
    product_names: &["PostgreSQL"],
    url_schemes: &["postgres", "postgresql"],
    priority: 10,
    upsert: UpsertStrategy::OnConflict,
    alter: AlterStyle::MultiAdd,
    boolean_literal: BooleanLiteral::Keyword,
    placeholder: PlaceholderStyle::Dollar,
    create_table_keyword: None,
    // The cast to NAME truncates to NAMEDATALEN - 1.
    max_identifier_probe: Some("SELECT length(repeat('1234567890', 1000)::NAME);"),
    known_max_identifier_length: Some(63),
    stale_statement_signature: Some("cached plan must not change result type"),
};

/// PostgreSQL dialect implementation.
#[derive(Debug, Clone, Default)]
pub struct PostgresDialect {
    settings: DialectSettings,
}

impl PostgresDialect {
    /// Create a new PostgreSQL dialect instance.
    pub fn new(settings: DialectSettings) -> Self {
        Self { settings }
    }
}

impl Dialect for PostgresDialect {
    fn descriptor(&self) -> &'static DialectDescriptor {
        &DESCRIPTOR
    }

    fn settings(&self) -> &DialectSettings {
        &self.settings
    }

    fn map_logical(&self, logical: &LogicalType) -> Option<String> {
        match logical {
            LogicalType::Decimal { .. } => Some("DECIMAL".into()),
            LogicalType::Date => Some("DATE".into()),
            LogicalType::Time => Some("TIME".into()),
            LogicalType::Timestamp => Some("TIMESTAMP".into()),
            LogicalType::Other(_) => None,
        }
    }

    fn map_primitive(&self, kind: PrimitiveKind) -> String {
        match kind {
            // No single-byte integer type
            PrimitiveKind::Int8 | PrimitiveKind::Int16 => "SMALLINT",
            PrimitiveKind::Int32 => "INT",
            PrimitiveKind::Int64 => "BIGINT",
            PrimitiveKind::Float32 => "REAL",
            PrimitiveKind::Float64 => "DOUBLE PRECISION",
            PrimitiveKind::Boolean => "BOOLEAN",
            PrimitiveKind::String => "TEXT",
            PrimitiveKind::Bytes => "BYTEA",
        }
        .to_string()
    }
}

//! Generic ANSI SQL dialect.

use crate::core::canonical::{LogicalType, PrimitiveKind};
use crate::core::identifier::QuoteChars;
use crate::core::traits::Dialect;
use crate::dialect::{
    AlterStyle, BooleanLiteral, DialectDescriptor, DialectSettings, MergeFlavor,
    PlaceholderStyle, UpsertStrategy,
};

pub(crate) static DESCRIPTOR: DialectDescriptor = DialectDescriptor {
    name: "generic",
    display_name: "Generic ANSI SQL",
    aliases: &["ansi"],
    quote: QuoteChars::DOUBLE_QUOTE,
    product_names: &[],
    url_schemes: &[],
    priority: 0,
    upsert: UpsertStrategy::Merge(MergeFlavor::Ansi),
    alter: AlterStyle::MultiAdd,
    boolean_literal: BooleanLiteral::Keyword,
    placeholder: PlaceholderStyle::Question,
    create_table_keyword: None,
    max_identifier_probe: None,
    known_max_identifier_length: None,
    stale_statement_signature: None,
};

/// Dialect for databases nothing more specific matches.
#[derive(Debug, Clone, Default)]
pub struct GenericDialect {
    settings: DialectSettings,
}

impl GenericDialect {
    pub fn new(settings: DialectSettings) -> Self {
        Self { settings }
    }
}

impl Dialect for GenericDialect {
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
            PrimitiveKind::Int8 => "TINYINT",
            PrimitiveKind::Int16 => "SMALLINT",
            PrimitiveKind::Int32 => "INT",
            PrimitiveKind::Int64 => "BIGINT",
            PrimitiveKind::Float32 => "REAL",
            PrimitiveKind::Float64 => "DOUBLE",
            PrimitiveKind::Boolean => "BOOLEAN",
            PrimitiveKind::String => "STRING",
            PrimitiveKind::Bytes => "BLOB",
        }
        .to_string()
    }
}

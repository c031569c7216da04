//! SAP HANA SQL dialect.
//!
//! Tables are created in the column store, new columns go in a single
//! `ADD(...)` list and upserts use the native `UPSERT ... WITH PRIMARY KEY`.

use crate::core::canonical::{LogicalType, PrimitiveKind};
use crate::core::identifier::QuoteChars;
use crate::core::traits::Dialect;
use crate::dialect::{
    AlterStyle, BooleanLiteral, DialectDescriptor, DialectSettings, PlaceholderStyle,
    UpsertStrategy,
};

pub(crate) static DESCRIPTOR: DialectDescriptor = DialectDescriptor {
    name: "hana",
    display_name: "SAP HANA",
    aliases: &["sap"],
    quote: QuoteChars::DOUBLE_QUOTE,
    product_names: &["HDB", "SAP HANA"],
    url_schemes: &["sap", "hana"],
    priority: 10,
    upsert: UpsertStrategy::NativeUpsert,
    alter: AlterStyle::AddList,
    boolean_literal: BooleanLiteral::Keyword,
    placeholder: PlaceholderStyle::Question,
    create_table_keyword: Some("CREATE COLUMN TABLE"),
    max_identifier_probe: None,
    known_max_identifier_length: Some(127),
    stale_statement_signature: None,
};

const DEFAULT_VARCHAR_LENGTH: u32 = 1000;

/// SAP HANA dialect implementation.
#[derive(Debug, Clone, Default)]
pub struct HanaDialect {
    settings: DialectSettings,
}

impl HanaDialect {
    pub fn new(settings: DialectSettings) -> Self {
        Self { settings }
    }
}

impl Dialect for HanaDialect {
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
            // HANA has a real TIME type; DATE would drop the time of day.
            LogicalType::Time => Some("TIME".into()),
            LogicalType::Timestamp => Some("TIMESTAMP".into()),
            LogicalType::Other(_) => None,
        }
    }

    fn map_primitive(&self, kind: PrimitiveKind) -> String {
        match kind {
            PrimitiveKind::Int8 => "TINYINT".to_string(),
            PrimitiveKind::Int16 => "SMALLINT".to_string(),
            PrimitiveKind::Int32 => "INTEGER".to_string(),
            PrimitiveKind::Int64 => "BIGINT".to_string(),
            PrimitiveKind::Float32 => "REAL".to_string(),
            PrimitiveKind::Float64 => "DOUBLE".to_string(),
            PrimitiveKind::Boolean => "BOOLEAN".to_string(),
            PrimitiveKind::String => format!(
                "VARCHAR({})",
                self.settings.string_length.unwrap_or(DEFAULT_VARCHAR_LENGTH)
            ),
            PrimitiveKind::Bytes => "BLOB".to_string(),
        }
    }
}

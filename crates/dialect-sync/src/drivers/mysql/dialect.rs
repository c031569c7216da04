//! MySQL/MariaDB SQL dialect.
//!
//! Backtick-quoted identifiers and `INSERT ... ON DUPLICATE KEY UPDATE`.

use crate::core::canonical::{LogicalType, PrimitiveKind};
use crate::core::identifier::QuoteChars;
use crate::core::traits::Dialect;
use crate::dialect::{
    AlterStyle, BooleanLiteral, DialectDescriptor, DialectSettings, PlaceholderStyle,
    UpsertStrategy,
};

pub(crate) static DESCRIPTOR: DialectDescriptor = DialectDescriptor {
    name: "mysql",
    display_name: "MySQL",
    aliases: &["mariadb"],
    quote: QuoteChars::BACKTICK,
    product_names: &["MySQL", "MariaDB"],
    url_schemes: &["mysql", "mariadb"],
    priority: 10,
    upsert: UpsertStrategy::OnDuplicateKey,
    alter: AlterStyle::StatementPerColumn,
    boolean_literal: BooleanLiteral::Numeric,
    placeholder: PlaceholderStyle::Question,
    create_table_keyword: None,
    max_identifier_probe: None,
    known_max_identifier_length: Some(64),
    stale_statement_signature: None,
};

/// MySQL dialect implementation.
#[derive(Debug, Clone, Default)]
pub struct MysqlDialect {
    settings: DialectSettings,
}

impl MysqlDialect {
    /// Create a new MySQL dialect instance.
    pub fn new(settings: DialectSettings) -> Self {
        Self { settings }
    }
}

impl Dialect for MysqlDialect {
    fn descriptor(&self) -> &'static DialectDescriptor {
        &DESCRIPTOR
    }

    fn settings(&self) -> &DialectSettings {
        &self.settings
    }

    fn map_logical(&self, logical: &LogicalType) -> Option<String> {
        match logical {
            LogicalType::Decimal { scale, .. } => {
                Some(format!("DECIMAL(65,{})", scale.unwrap_or(0).clamp(0, 30)))
            }
            LogicalType::Date => Some("DATE".into()),
            LogicalType::Time => Some("TIME(3)".into()),
            LogicalType::Timestamp => Some("DATETIME(3)".into()),
            LogicalType::Other(_) => None,
        }
    }

    fn map_primitive(&self, kind: PrimitiveKind) -> String {
        match kind {
            PrimitiveKind::Int8 => "TINYINT".to_string(),
            PrimitiveKind::Int16 => "SMALLINT".to_string(),
            PrimitiveKind::Int32 => "INT".to_string(),
            PrimitiveKind::Int64 => "BIGINT".to_string(),
            PrimitiveKind::Float32 => "FLOAT".to_string(),
            PrimitiveKind::Float64 => "DOUBLE".to_string(),
            PrimitiveKind::Boolean => "TINYINT".to_string(),
            PrimitiveKind::String => match self.settings.string_length {
                Some(n) => format!("VARCHAR({})", n),
                None => "TEXT".to_string(),
            },
            PrimitiveKind::Bytes => "VARBINARY(1024)".to_string(),
        }
    }
}

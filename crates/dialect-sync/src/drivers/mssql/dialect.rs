//! MSSQL SQL dialect (Strategy pattern).
//!
//! Bracket-quoted identifiers, `@Pn` placeholders and `MERGE ... WITH
//! (HOLDLOCK)` upserts.

use crate::core::canonical::{LogicalType, PrimitiveKind};
use crate::core::identifier::QuoteChars;
use crate::core::traits::Dialect;
use crate::dialect::{
    AlterStyle, BooleanLiteral, DialectDescriptor, DialectSettings, MergeFlavor,
    PlaceholderStyle, UpsertStrategy,
};

pub(crate) static DESCRIPTOR: DialectDescriptor = DialectDescriptor {
    name: "mssql",
    display_name: "Microsoft SQL Server",
    aliases: &["sqlserver", "sql_server"],
    quote: QuoteChars::BRACKETS,
    product_names: &["Microsoft SQL Server"],
    url_schemes: &["sqlserver", "mssql"],
    priority: 10,
    upsert: UpsertStrategy::Merge(MergeFlavor::SqlServer),
    alter: AlterStyle::StatementPerColumn,
    boolean_literal: BooleanLiteral::Numeric,
    placeholder: PlaceholderStyle::AtP,
    create_table_keyword: None,
    max_identifier_probe: None,
    known_max_identifier_length: Some(128),
    stale_statement_signature: None,
};

/// Largest DECIMAL precision SQL Server accepts.
const MAX_PRECISION: u32 = 38;

/// Microsoft SQL Server dialect implementation.
#[derive(Debug, Clone, Default)]
pub struct MssqlDialect {
    settings: DialectSettings,
}

impl MssqlDialect {
    /// Create a new MSSQL dialect instance.
    pub fn new(settings: DialectSettings) -> Self {
        Self { settings }
    }
}

impl Dialect for MssqlDialect {
    fn descriptor(&self) -> &'static DialectDescriptor {
        &DESCRIPTOR
    }

    fn settings(&self) -> &DialectSettings {
        &self.settings
    }

    fn map_logical(&self, logical: &LogicalType) -> Option<String> {
        match logical {
            LogicalType::Decimal { scale, .. } => {
                let scale = scale.unwrap_or(0).clamp(0, MAX_PRECISION as i32);
                Some(format!("DECIMAL({},{})", MAX_PRECISION, scale))
            }
            LogicalType::Date => Some("DATE".into()),
            LogicalType::Time => Some("TIME".into()),
            LogicalType::Timestamp => Some("DATETIME2".into()),
            LogicalType::Other(_) => None,
        }
    }

    fn map_primitive(&self, kind: PrimitiveKind) -> String {
        match kind {
            PrimitiveKind::Int8 => "TINYINT".to_string(),
            PrimitiveKind::Int16 => "SMALLINT".to_string(),
            PrimitiveKind::Int32 => "INT".to_string(),
            PrimitiveKind::Int64 => "BIGINT".to_string(),
            PrimitiveKind::Float32 => "REAL".to_string(),
            PrimitiveKind::Float64 => "FLOAT".to_string(),
            PrimitiveKind::Boolean => "BIT".to_string(),
            PrimitiveKind::String => match self.settings.string_length {
                Some(n) => format!("NVARCHAR({})", n),
                None => "NVARCHAR(MAX)".to_string(),
            },
            PrimitiveKind::Bytes => "VARBINARY(MAX)".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::canonical::ColumnType;
    use crate::core::identifier::{MaxIdentifierLength, TableId};
    use crate::core::schema::ColumnSpec;

    fn dialect() -> MssqlDialect {
        MssqlDialect::new(DialectSettings::default())
    }

    #[test]
    fn test_quote_and_placeholders() {
        let d = dialect();
        assert_eq!(d.name(), "mssql");
        assert_eq!(d.quote_identifier("table"), "[table]");
        assert_eq!(d.quote_identifier("we]ird"), "[we]]ird]");
        assert_eq!(d.param_placeholder(1), "@P1");
        assert_eq!(
            d.quote_table(&TableId::new(None, Some("dbo".into()), "Users")),
            "[dbo].[Users]"
        );
    }

    #[test]
    fn test_type_mapping() {
        let d = dialect();
        assert_eq!(d.sql_type(&ColumnType::decimal(None, Some(4))), "DECIMAL(38,4)");
        assert_eq!(d.sql_type(&ColumnType::timestamp()), "DATETIME2");
        assert_eq!(d.sql_type(&ColumnType::primitive(PrimitiveKind::Boolean)), "BIT");
        assert_eq!(
            d.sql_type(&ColumnType::primitive(PrimitiveKind::String)),
            "NVARCHAR(MAX)"
        );

        let bounded = MssqlDialect::new(DialectSettings {
            string_length: Some(255),
            ..Default::default()
        });
        assert_eq!(
            bounded.sql_type(&ColumnType::primitive(PrimitiveKind::String)),
            "NVARCHAR(255)"
        );
    }

    #[test]
    fn test_boolean_default_is_numeric() {
        let col = ColumnSpec::new("active", ColumnType::primitive(PrimitiveKind::Boolean))
            .with_default(true);
        assert_eq!(dialect().column_definition(&col), "[active] BIT DEFAULT 1");
    }

    #[test]
    fn test_merge_upsert() {
        let id = ColumnSpec::new("Id", ColumnType::primitive(PrimitiveKind::Int32)).primary_key();
        let name = ColumnSpec::new("Name", ColumnType::primitive(PrimitiveKind::String));
        let stmt = dialect()
            .build_upsert(&TableId::new(None, Some("dbo".into()), "Users"), &[&id], &[&name])
            .unwrap();
        assert_eq!(
            stmt.sql,
            "MERGE INTO [dbo].[Users] WITH (HOLDLOCK) AS target USING \
             (SELECT @P1 AS [Id], @P2 AS [Name]) AS incoming ON (target.[Id]=incoming.[Id]) \
             WHEN MATCHED THEN UPDATE SET [Id]=incoming.[Id],[Name]=incoming.[Name] \
             WHEN NOT MATCHED THEN INSERT ([Id], [Name]) VALUES (incoming.[Id],incoming.[Name]);"
        );
    }

    #[test]
    fn test_alter_per_column_and_known_limit() {
        let d = dialect();
        let cols = vec![
            ColumnSpec::new("a", ColumnType::primitive(PrimitiveKind::Int32)).optional(),
            ColumnSpec::new("b", ColumnType::primitive(PrimitiveKind::Int32)).optional(),
        ];
        let statements = d.build_alter_table(&TableId::table("t"), &cols).unwrap();
        assert_eq!(
            statements,
            vec!["ALTER TABLE [t] ADD [a] INT NULL", "ALTER TABLE [t] ADD [b] INT NULL"]
        );
        assert_eq!(
            d.interpret_max_identifier_length(None),
            MaxIdentifierLength::Limit(128)
        );
    }
}

//! Vertica SQL dialect.
//!
//! Vertica has no ON CONFLICT form, so upserts are a MERGE whose source row
//! casts each placeholder to the column type. Columns are added one ALTER
//! statement at a time.

use crate::core::canonical::{LogicalType, PrimitiveKind};
use crate::core::identifier::QuoteChars;
use crate::core::traits::Dialect;
use crate::dialect::{
    AlterStyle, BooleanLiteral, DialectDescriptor, DialectSettings, MergeFlavor,
    PlaceholderStyle, UpsertStrategy,
};

pub(crate) static DESCRIPTOR: DialectDescriptor = DialectDescriptor {
    name: "vertica",
    display_name: "Vertica",
    aliases: &[],
    quote: QuoteChars::DOUBLE_QUOTE,
    product_names: &["Vertica", "Vertica Database"],
    url_schemes: &["vertica"],
    priority: 10,
    upsert: UpsertStrategy::Merge(MergeFlavor::TypedCasts),
    alter: AlterStyle::StatementPerColumn,
    boolean_literal: BooleanLiteral::Keyword,
    placeholder: PlaceholderStyle::Question,
    create_table_keyword: None,
    max_identifier_probe: None,
    known_max_identifier_length: Some(128),
    stale_statement_signature: None,
};

const DEFAULT_VARCHAR_LENGTH: u32 = 1024;

/// Vertica dialect implementation.
#[derive(Debug, Clone, Default)]
pub struct VerticaDialect {
    settings: DialectSettings,
}

impl VerticaDialect {
    pub fn new(settings: DialectSettings) -> Self {
        Self { settings }
    }

    fn varying_length(&self) -> u32 {
        self.settings.string_length.unwrap_or(DEFAULT_VARCHAR_LENGTH)
    }
}

impl Dialect for VerticaDialect {
    fn descriptor(&self) -> &'static DialectDescriptor {
        &DESCRIPTOR
    }

    fn settings(&self) -> &DialectSettings {
        &self.settings
    }

    fn map_logical(&self, logical: &LogicalType) -> Option<String> {
        match logical {
            LogicalType::Decimal { scale, .. } => {
                Some(format!("DECIMAL(18,{})", scale.unwrap_or(0).clamp(0, 18)))
            }
            LogicalType::Date => Some("DATE".into()),
            LogicalType::Time => Some("TIME".into()),
            LogicalType::Timestamp => Some("TIMESTAMP".into()),
            LogicalType::Other(_) => None,
        }
    }

    fn map_primitive(&self, kind: PrimitiveKind) -> String {
        match kind {
            PrimitiveKind::Int8
            | PrimitiveKind::Int16
            | PrimitiveKind::Int32
            | PrimitiveKind::Int64 => "INT".to_string(),
            PrimitiveKind::Float32 | PrimitiveKind::Float64 => "FLOAT".to_string(),
            PrimitiveKind::Boolean => "BOOLEAN".to_string(),
            PrimitiveKind::String => format!("VARCHAR({})", self.varying_length()),
            PrimitiveKind::Bytes => format!("VARBINARY({})", self.varying_length()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::canonical::ColumnType;
    use crate::core::identifier::TableId;
    use crate::core::schema::ColumnSpec;

    fn dialect() -> VerticaDialect {
        VerticaDialect::default()
    }

    fn p(kind: PrimitiveKind) -> ColumnType {
        ColumnType::primitive(kind)
    }

    #[test]
    fn test_data_type_mappings() {
        let d = dialect();
        assert_eq!(d.sql_type(&p(PrimitiveKind::Int8)), "INT");
        assert_eq!(d.sql_type(&p(PrimitiveKind::Int64)), "INT");
        assert_eq!(d.sql_type(&p(PrimitiveKind::Float32)), "FLOAT");
        assert_eq!(d.sql_type(&p(PrimitiveKind::String)), "VARCHAR(1024)");
        assert_eq!(d.sql_type(&p(PrimitiveKind::Bytes)), "VARBINARY(1024)");
        assert_eq!(d.sql_type(&ColumnType::decimal(None, Some(0))), "DECIMAL(18,0)");
        assert_eq!(d.sql_type(&ColumnType::decimal(None, Some(4))), "DECIMAL(18,4)");
        assert_eq!(d.sql_type(&ColumnType::time()), "TIME");
    }

    #[test]
    fn test_create_three_col_two_pk() {
        let cols = vec![
            ColumnSpec::new("pk1", p(PrimitiveKind::Int32)).primary_key(),
            ColumnSpec::new("pk2", p(PrimitiveKind::Int32)).primary_key(),
            ColumnSpec::new("col1", p(PrimitiveKind::Int32)),
        ];
        assert_eq!(
            dialect()
                .build_create_table(&TableId::table("test"), &cols)
                .unwrap(),
            "CREATE TABLE \"test\" (\n\"pk1\" INT NOT NULL,\n\"pk2\" INT NOT NULL,\n\
             \"col1\" INT NOT NULL,\nPRIMARY KEY(\"pk1\",\"pk2\"))"
        );
    }

    #[test]
    fn test_alter_add_two_cols() {
        let cols = vec![
            ColumnSpec::new("newcol1", p(PrimitiveKind::Int32)).optional(),
            ColumnSpec::new("newcol2", p(PrimitiveKind::Int32))
                .optional()
                .with_default(42),
        ];
        assert_eq!(
            dialect()
                .build_alter_table(&TableId::table("test"), &cols)
                .unwrap(),
            vec![
                "ALTER TABLE \"test\" ADD \"newcol1\" INT NULL",
                "ALTER TABLE \"test\" ADD \"newcol2\" INT DEFAULT 42"
            ]
        );
    }

    #[test]
    fn test_merge_upsert_with_casts() {
        let author = ColumnSpec::new("author", p(PrimitiveKind::String)).primary_key();
        let title = ColumnSpec::new("title", p(PrimitiveKind::String)).primary_key();
        let isbn = ColumnSpec::new("ISBN", p(PrimitiveKind::String));
        let year = ColumnSpec::new("year", p(PrimitiveKind::Int32));
        let pages = ColumnSpec::new("pages", p(PrimitiveKind::Int32));

        let stmt = dialect()
            .build_upsert(
                &TableId::table("Book"),
                &[&author, &title],
                &[&isbn, &year, &pages],
            )
            .unwrap();
        assert_eq!(stmt.param_count, 5);
        assert_eq!(
            stmt.sql,
            "MERGE INTO \"Book\" AS target USING (\
             SELECT ?::VARCHAR AS \"author\", ?::VARCHAR AS \"title\", ?::VARCHAR AS \"ISBN\", \
             ?::INT AS \"year\", ?::INT AS \"pages\"\
             ) AS incoming ON (target.\"author\"=incoming.\"author\" AND target.\"title\"=incoming.\"title\") \
             WHEN MATCHED THEN UPDATE SET \"ISBN\"=incoming.\"ISBN\",\"year\"=incoming.\"year\",\
             \"pages\"=incoming.\"pages\",\"author\"=incoming.\"author\",\"title\"=incoming.\"title\" \
             WHEN NOT MATCHED THEN INSERT (\"ISBN\", \"year\", \"pages\", \"author\", \"title\") VALUES (\
             incoming.\"ISBN\",incoming.\"year\",incoming.\"pages\",incoming.\"author\",incoming.\"title\");"
        );
    }
}

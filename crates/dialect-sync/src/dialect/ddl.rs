//! CREATE TABLE and ALTER TABLE generation.

use crate::core::identifier::TableId;
use crate::core::schema::ColumnSpec;
use crate::core::traits::Dialect;
use crate::error::{Result, SyncError};

use super::AlterStyle;

/// `"name" TYPE` followed by the default, `NULL` or `NOT NULL`.
pub fn column_definition<D: Dialect + ?Sized>(dialect: &D, column: &ColumnSpec) -> String {
    let mut sql = format!(
        "{} {}",
        dialect.quote_identifier(&column.name),
        dialect.sql_type(&column.column_type)
    );
    match &column.default_value {
        Some(value) => {
            sql.push_str(" DEFAULT ");
            sql.push_str(&dialect.format_literal(value));
        }
        None if column.is_optional => sql.push_str(" NULL"),
        None => sql.push_str(" NOT NULL"),
    }
    sql
}

/// Generic CREATE TABLE.
///
/// Column clauses follow input order. The PRIMARY KEY clause lists key
/// columns in that same order and is omitted when there are none.
pub fn create_table<D: Dialect + ?Sized>(
    dialect: &D,
    table: &TableId,
    columns: &[ColumnSpec],
) -> Result<String> {
    if columns.is_empty() {
        return Err(SyncError::precondition(format!(
            "CREATE TABLE {} needs at least one column",
            table
        )));
    }

    let mut clauses: Vec<String> = columns
        .iter()
        .map(|c| column_definition(dialect, c))
        .collect();

    let keys: Vec<String> = columns
        .iter()
        .filter(|c| c.is_primary_key)
        .map(|c| dialect.quote_identifier(&c.name))
        .collect();
    if !keys.is_empty() {
        clauses.push(format!("PRIMARY KEY({})", keys.join(",")));
    }

    Ok(format!(
        "CREATE TABLE {} (\n{})",
        dialect.quote_table(table),
        clauses.join(",\n")
    ))
}

/// ALTER TABLE ... ADD for each new column, in the dialect's style.
pub fn alter_table<D: Dialect + ?Sized>(
    dialect: &D,
    table: &TableId,
    columns: &[ColumnSpec],
    style: AlterStyle,
) -> Result<Vec<String>> {
    if columns.is_empty() {
        return Err(SyncError::precondition(format!(
            "ALTER TABLE {} needs at least one new column",
            table
        )));
    }

    let table = dialect.quote_table(table);
    let definitions: Vec<String> = columns
        .iter()
        .map(|c| column_definition(dialect, c))
        .collect();

    Ok(match style {
        AlterStyle::StatementPerColumn => definitions
            .iter()
            .map(|d| format!("ALTER TABLE {} ADD {}", table, d))
            .collect(),
        AlterStyle::MultiAdd if definitions.len() == 1 => {
            vec![format!("ALTER TABLE {} ADD {}", table, definitions[0])]
        }
        AlterStyle::MultiAdd => {
            let adds: Vec<String> = definitions.iter().map(|d| format!("ADD {}", d)).collect();
            vec![format!("ALTER TABLE {} \n{}", table, adds.join(",\n"))]
        }
        AlterStyle::AddList => {
            vec![format!("ALTER TABLE {} ADD({})", table, definitions.join(","))]
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::canonical::{ColumnType, PrimitiveKind};
    use crate::core::identifier::QuoteMethod;
    use crate::dialect::DialectSettings;
    use crate::drivers::GenericDialect;

    fn int() -> ColumnType {
        ColumnType::primitive(PrimitiveKind::Int32)
    }

    #[test]
    fn test_create_table_generic() {
        let dialect = GenericDialect::new(DialectSettings::default());
        let columns = vec![
            ColumnSpec::new("id", int()).primary_key(),
            ColumnSpec::new("name", ColumnType::primitive(PrimitiveKind::String)).optional(),
        ];
        let sql = create_table(&dialect, &TableId::table("t"), &columns).unwrap();
        assert_eq!(
            sql,
            "CREATE TABLE \"t\" (\n\"id\" INT NOT NULL,\n\"name\" STRING NULL,\nPRIMARY KEY(\"id\"))"
        );
    }

    #[test]
    fn test_primary_key_follows_declaration_order() {
        let dialect = GenericDialect::new(DialectSettings::default());
        let columns = vec![
            ColumnSpec::new("z", int()).primary_key(),
            ColumnSpec::new("m", int()),
            ColumnSpec::new("a", int()).primary_key(),
        ];
        let sql = create_table(&dialect, &TableId::table("t"), &columns).unwrap();
        assert!(sql.ends_with("PRIMARY KEY(\"z\",\"a\"))"));
    }

    #[test]
    fn test_no_keys_no_primary_key_clause() {
        let dialect = GenericDialect::new(DialectSettings::default());
        let sql = create_table(
            &dialect,
            &TableId::table("test"),
            &[ColumnSpec::new("col1", int())],
        )
        .unwrap();
        assert_eq!(sql, "CREATE TABLE \"test\" (\n\"col1\" INT NOT NULL)");
    }

    #[test]
    fn test_default_replaces_nullability() {
        let dialect = GenericDialect::new(DialectSettings::default());
        let col = ColumnSpec::new("n", int()).optional().with_default(42);
        assert_eq!(column_definition(&dialect, &col), "\"n\" INT DEFAULT 42");
    }

    #[test]
    fn test_unquoted_create() {
        let dialect = GenericDialect::new(DialectSettings {
            quote_identifiers: QuoteMethod::Never,
            ..Default::default()
        });
        let sql = create_table(
            &dialect,
            &TableId::new(None, Some("s".into()), "t"),
            &[ColumnSpec::new("c", int()).primary_key()],
        )
        .unwrap();
        assert_eq!(sql, "CREATE TABLE s.t (\nc INT NOT NULL,\nPRIMARY KEY(c))");
    }

    #[test]
    fn test_alter_styles() {
        let dialect = GenericDialect::new(DialectSettings::default());
        let table = TableId::table("t");
        let cols = vec![
            ColumnSpec::new("a", int()).optional(),
            ColumnSpec::new("b", int()).with_default(42),
        ];

        assert_eq!(
            alter_table(&dialect, &table, &cols, AlterStyle::StatementPerColumn).unwrap(),
            vec![
                "ALTER TABLE \"t\" ADD \"a\" INT NULL".to_string(),
                "ALTER TABLE \"t\" ADD \"b\" INT DEFAULT 42".to_string(),
            ]
        );
        assert_eq!(
            alter_table(&dialect, &table, &cols, AlterStyle::MultiAdd).unwrap(),
            vec!["ALTER TABLE \"t\" \nADD \"a\" INT NULL,\nADD \"b\" INT DEFAULT 42".to_string()]
        );
        assert_eq!(
            alter_table(&dialect, &table, &cols[..1], AlterStyle::MultiAdd).unwrap(),
            vec!["ALTER TABLE \"t\" ADD \"a\" INT NULL".to_string()]
        );
        assert_eq!(
            alter_table(&dialect, &table, &cols, AlterStyle::AddList).unwrap(),
            vec!["ALTER TABLE \"t\" ADD(\"a\" INT NULL,\"b\" INT DEFAULT 42)".to_string()]
        );
    }

    #[test]
    fn test_empty_column_lists_rejected() {
        let dialect = GenericDialect::new(DialectSettings::default());
        let table = TableId::table("t");
        assert!(matches!(
            create_table(&dialect, &table, &[]),
            Err(SyncError::Precondition(_))
        ));
        assert!(alter_table(&dialect, &table, &[], AlterStyle::AddList).is_err());
    }
}

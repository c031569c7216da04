//! Identifier validation, quoting and length truncation.
//!
//! SQL identifiers (table names, column names, schema names) cannot be bound
//! as statement parameters, so every identifier that ends up in generated SQL
//! passes through this module:
//!
//! 1. Validate identifiers for suspicious content (empty, null bytes)
//! 2. Apply the dialect's quote characters according to the [`QuoteMethod`]
//! 3. Escape the closing quote character by doubling it
//!
//! Table names may also be truncated to the maximum identifier length a live
//! database reports. Truncation touches only the table segment of a dotted
//! name and is idempotent.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SyncError};

/// When identifiers are wrapped in the dialect's quote characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuoteMethod {
    /// Quote every identifier.
    #[default]
    Always,
    /// Emit identifiers verbatim.
    Never,
    /// Quote only where required. Treated as `Always`.
    Context,
}

impl QuoteMethod {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "always" => Some(QuoteMethod::Always),
            "never" => Some(QuoteMethod::Never),
            "context" => Some(QuoteMethod::Context),
            _ => None,
        }
    }

    fn quotes(&self) -> bool {
        !matches!(self, QuoteMethod::Never)
    }
}

/// Opening and closing quote characters of a dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuoteChars {
    pub open: char,
    pub close: char,
}

impl QuoteChars {
    pub const DOUBLE_QUOTE: QuoteChars = QuoteChars {
        open: '"',
        close: '"',
    };
    pub const BACKTICK: QuoteChars = QuoteChars {
        open: '`',
        close: '`',
    };
    pub const BRACKETS: QuoteChars = QuoteChars {
        open: '[',
        close: ']',
    };
}

/// Maximum identifier length discovered from a live database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MaxIdentifierLength {
    /// Nothing was discovered; never truncate.
    #[default]
    Unbounded,
    Limit(usize),
}

impl MaxIdentifierLength {
    /// Interpret a probe result.
    ///
    /// Zero, negative and `i32::MAX`-or-larger values mean no usable limit
    /// was discovered.
    pub fn from_probe(value: i64) -> Self {
        if value <= 0 || value >= i64::from(i32::MAX) {
            MaxIdentifierLength::Unbounded
        } else {
            MaxIdentifierLength::Limit(value as usize)
        }
    }

    pub fn limit(&self) -> Option<usize> {
        match self {
            MaxIdentifierLength::Unbounded => None,
            MaxIdentifierLength::Limit(n) => Some(*n),
        }
    }
}

/// Validate an identifier for security issues.
///
/// Rejects:
/// - Empty identifiers
/// - Identifiers containing null bytes (injection vector)
///
/// # Errors
///
/// Returns `SyncError::Config` for invalid identifiers with a descriptive message.
pub fn validate_identifier(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(SyncError::Config("Identifier cannot be empty".to_string()));
    }

    if name.contains('\0') {
        return Err(SyncError::Config(format!(
            "SECURITY: Identifier contains null byte (possible injection attempt): {:?}",
            name
        )));
    }

    Ok(())
}

/// Quote an identifier.
///
/// Escapes the closing quote character by doubling it and wraps the name in
/// the dialect's quote characters, unless the method is `Never`.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(quote_identifier("users", QuoteChars::DOUBLE_QUOTE, QuoteMethod::Always), "\"users\"");
/// assert_eq!(quote_identifier("a]b", QuoteChars::BRACKETS, QuoteMethod::Always), "[a]]b]");
/// ```
pub fn quote_identifier(name: &str, chars: QuoteChars, method: QuoteMethod) -> String {
    if !method.quotes() {
        return name.to_string();
    }
    let doubled = format!("{}{}", chars.close, chars.close);
    format!(
        "{}{}{}",
        chars.open,
        name.replace(chars.close, &doubled),
        chars.close
    )
}

/// Truncate an identifier to at most `max` characters.
pub fn truncate_identifier(name: &str, max: MaxIdentifierLength) -> String {
    match max.limit() {
        Some(limit) if name.chars().count() > limit => name.chars().take(limit).collect(),
        _ => name.to_string(),
    }
}

/// Structural identity of a table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TableId {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catalog: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
    pub table: String,
}

impl TableId {
    pub fn new(catalog: Option<String>, schema: Option<String>, table: impl Into<String>) -> Self {
        Self {
            catalog,
            schema,
            table: table.into(),
        }
    }

    /// Unqualified table.
    pub fn table(table: impl Into<String>) -> Self {
        Self::new(None, None, table)
    }

    /// Parse a dotted name (`table`, `schema.table` or `catalog.schema.table`).
    ///
    /// The name is split on its last separator; only the table segment is
    /// truncated to `max`. Parsing the display form of the result yields the
    /// same identity again.
    ///
    /// # Errors
    ///
    /// Returns `SyncError::Config` if any segment is empty or has a null byte,
    /// or if there are more than three segments.
    pub fn parse(fqn: &str, max: MaxIdentifierLength) -> Result<Self> {
        let (qualifier, table) = match fqn.rsplit_once('.') {
            Some((q, t)) => (Some(q), t),
            None => (None, fqn),
        };
        validate_identifier(table)?;

        let (catalog, schema) = match qualifier {
            None => (None, None),
            Some(q) => match q.split_once('.') {
                None => (None, Some(q)),
                Some((c, s)) => {
                    if s.contains('.') {
                        return Err(SyncError::Config(format!(
                            "Table name has too many segments: {:?}",
                            fqn
                        )));
                    }
                    (Some(c), Some(s))
                }
            },
        };
        for part in catalog.iter().chain(schema.iter()) {
            validate_identifier(part)?;
        }

        Ok(Self {
            catalog: catalog.map(str::to_string),
            schema: schema.map(str::to_string),
            table: truncate_identifier(table, max),
        })
    }

    /// Copy with the table segment truncated to `max`.
    pub fn truncated(&self, max: MaxIdentifierLength) -> Self {
        Self {
            table: truncate_identifier(&self.table, max),
            ..self.clone()
        }
    }

    /// Non-empty segments, outermost first.
    pub fn parts(&self) -> impl Iterator<Item = &str> {
        self.catalog
            .as_deref()
            .into_iter()
            .chain(self.schema.as_deref())
            .chain(std::iter::once(self.table.as_str()))
    }
}

impl std::fmt::Display for TableId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parts: Vec<&str> = self.parts().collect();
        f.write_str(&parts.join("."))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // =========================================================================
    // Validation tests
    // =========================================================================

    #[test]
    fn test_validate_identifier_normal() {
        assert!(validate_identifier("users").is_ok());
        assert!(validate_identifier("column with spaces").is_ok());
        assert!(validate_identifier("日本語").is_ok());
    }

    #[test]
    fn test_validate_identifier_rejects_empty() {
        let result = validate_identifier("");
        assert!(result.unwrap_err().to_string().contains("empty"));
    }

    #[test]
    fn test_validate_identifier_rejects_null_byte() {
        let result = validate_identifier("table\0name");
        assert!(result.unwrap_err().to_string().contains("null byte"));
    }

    // =========================================================================
    // Quoting tests
    // =========================================================================

    #[test]
    fn test_quote_always() {
        let q = |n| quote_identifier(n, QuoteChars::DOUBLE_QUOTE, QuoteMethod::Always);
        assert_eq!(q("users"), "\"users\"");
        assert_eq!(q("table\"name"), "\"table\"\"name\"");
        assert_eq!(
            q("Robert'); DROP TABLE Students;--"),
            "\"Robert'); DROP TABLE Students;--\""
        );
    }

    #[test]
    fn test_quote_never_is_verbatim() {
        assert_eq!(
            quote_identifier("myTable", QuoteChars::DOUBLE_QUOTE, QuoteMethod::Never),
            "myTable"
        );
    }

    #[test]
    fn test_quote_context_behaves_like_always() {
        assert_eq!(
            quote_identifier("id", QuoteChars::BACKTICK, QuoteMethod::Context),
            "`id`"
        );
    }

    #[test]
    fn test_quote_brackets_escape_close_only() {
        assert_eq!(
            quote_identifier("a]b[c", QuoteChars::BRACKETS, QuoteMethod::Always),
            "[a]]b[c]"
        );
    }

    #[test]
    fn test_quote_method_parse() {
        assert_eq!(QuoteMethod::parse("NEVER"), Some(QuoteMethod::Never));
        assert_eq!(QuoteMethod::parse("sometimes"), None);
    }

    // =========================================================================
    // Truncation tests
    // =========================================================================

    #[test]
    fn test_probe_interpretation() {
        assert_eq!(MaxIdentifierLength::from_probe(63), MaxIdentifierLength::Limit(63));
        assert_eq!(MaxIdentifierLength::from_probe(0), MaxIdentifierLength::Unbounded);
        assert_eq!(MaxIdentifierLength::from_probe(-1), MaxIdentifierLength::Unbounded);
        assert_eq!(
            MaxIdentifierLength::from_probe(i64::from(i32::MAX)),
            MaxIdentifierLength::Unbounded
        );
    }

    #[test]
    fn test_truncates_table_segment_only() {
        let id = TableId::parse("some.table", MaxIdentifierLength::Limit(4)).unwrap();
        assert_eq!(id, TableId::new(None, Some("some".into()), "tabl"));
    }

    #[test]
    fn test_exact_length_not_truncated() {
        let id = TableId::parse("some.table", MaxIdentifierLength::Limit(5)).unwrap();
        assert_eq!(id.table, "table");
    }

    #[test]
    fn test_unbounded_never_truncates() {
        let id = TableId::parse("some.table", MaxIdentifierLength::Unbounded).unwrap();
        assert_eq!(id.table, "table");
        let id = TableId::parse(
            "some.table",
            MaxIdentifierLength::from_probe(i64::from(i32::MAX)),
        )
        .unwrap();
        assert_eq!(id.table, "table");
    }

    #[test]
    fn test_truncation_is_idempotent() {
        let max = MaxIdentifierLength::Limit(6);
        let once = TableId::parse("cat.sch.a_rather_long_table", max).unwrap();
        let twice = TableId::parse(&once.to_string(), max).unwrap();
        assert_eq!(once.table.chars().count(), 6);
        assert_eq!(once, twice);
        assert_eq!(once.truncated(max), once);
    }

    #[test]
    fn test_truncation_counts_characters_not_bytes() {
        assert_eq!(
            truncate_identifier("日本語テーブル", MaxIdentifierLength::Limit(3)),
            "日本語"
        );
    }

    #[test]
    fn test_parse_catalog_schema_table() {
        let id = TableId::parse("db.public.users", MaxIdentifierLength::Unbounded).unwrap();
        assert_eq!(id.catalog.as_deref(), Some("db"));
        assert_eq!(id.schema.as_deref(), Some("public"));
        assert_eq!(id.to_string(), "db.public.users");

        assert!(TableId::parse("a.b.c.d", MaxIdentifierLength::Unbounded).is_err());
        assert!(TableId::parse("schema.", MaxIdentifierLength::Unbounded).is_err());
    }
}

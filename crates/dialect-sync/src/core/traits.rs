//! Core traits for dialect-aware SQL generation and live connections.
//!
//! - [`Dialect`]: SQL syntax and type-mapping strategy for one database family
//! - [`Connection`]: the live connection a dialect probes and a querier polls
//! - [`ResultCursor`]: an open result set with its column metadata
//!
//! # Design Patterns
//!
//! - **Strategy**: each dialect supplies its own type names and statement shapes
//! - **Template Method**: default `Dialect` methods assemble statements from
//!   the descriptor and a handful of per-dialect hooks

use async_trait::async_trait;

use crate::dialect::{ddl, dml, typemap, DialectDescriptor, DialectSettings, PlaceholderStyle};
use crate::error::{Result, SyncError};

use super::canonical::{ColumnType, LogicalType, PrimitiveKind};
use super::identifier::{quote_identifier, MaxIdentifierLength, TableId};
use super::query::{QueryMode, QuerySource};
use super::schema::{ColumnMetadata, ColumnSpec};
use super::value::SqlValue;

/// Whether an upsert statement keeps its uniqueness guarantee.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertKind {
    Upsert,
    /// No key columns were given, so the statement is a plain INSERT.
    InsertOnly,
}

/// Generated upsert text and the number of placeholders it binds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpsertStatement {
    pub sql: String,
    pub kind: UpsertKind,
    pub param_count: usize,
}

/// SQL syntax strategy for a database family.
///
/// Implementors supply the descriptor, the settings and the two type-mapping
/// hooks. Everything else has a default built on those.
pub trait Dialect: Send + Sync {
    /// Static facts about the database family.
    fn descriptor(&self) -> &'static DialectDescriptor;

    /// Per-connection settings (quoting policy, decimal fallback).
    fn settings(&self) -> &DialectSettings;

    /// Native type for a logical type, or `None` to fall through to the
    /// primitive kind.
    fn map_logical(&self, logical: &LogicalType) -> Option<String>;

    /// Native type for a primitive kind. Must cover every kind.
    fn map_primitive(&self, kind: PrimitiveKind) -> String;

    /// Get the dialect identifier (e.g., "postgres", "vertica").
    fn name(&self) -> &str {
        self.descriptor().name
    }

    /// Quote an identifier according to the configured quoting policy.
    fn quote_identifier(&self, name: &str) -> String {
        quote_identifier(
            name,
            self.descriptor().quote,
            self.settings().quote_identifiers,
        )
    }

    /// Quote every segment of a table identity and join with `.`.
    fn quote_table(&self, table: &TableId) -> String {
        table
            .parts()
            .map(|p| self.quote_identifier(p))
            .collect::<Vec<_>>()
            .join(".")
    }

    /// Get a parameter placeholder for the given 1-based index.
    ///
    /// - PostgreSQL: `$1`, `$2`, etc.
    /// - SQL Server: `@P1`, `@P2`, etc.
    /// - Others: `?`
    fn param_placeholder(&self, index: usize) -> String {
        match self.descriptor().placeholder {
            PlaceholderStyle::Question => "?".to_string(),
            PlaceholderStyle::Dollar => format!("${}", index),
            PlaceholderStyle::AtP => format!("@P{}", index),
        }
    }

    /// Native type for a canonical column type. Logical type wins.
    fn sql_type(&self, column_type: &ColumnType) -> String {
        column_type
            .logical
            .as_ref()
            .and_then(|l| self.map_logical(l))
            .unwrap_or_else(|| self.map_primitive(column_type.kind))
    }

    /// Native type from external type names.
    ///
    /// # Errors
    ///
    /// Returns `SyncError::UnsupportedType` for an unknown primitive kind.
    fn sql_type_for(
        &self,
        column: &str,
        logical_name: Option<&str>,
        precision: Option<u32>,
        scale: Option<i32>,
        kind_name: &str,
    ) -> Result<String> {
        let ty = ColumnType::from_names(column, kind_name, logical_name, precision, scale)?;
        Ok(self.sql_type(&ty))
    }

    /// Render a value as a SQL literal (used for column defaults).
    fn format_literal(&self, value: &SqlValue<'_>) -> String {
        typemap::format_literal(value, self.descriptor().boolean_literal)
    }

    /// Scale to use for a numeric result column.
    fn decimal_scale(&self, precision: i32, scale: Option<i32>) -> i32 {
        typemap::decimal_scale(precision, scale, self.settings().numeric_scale_high)
    }

    /// `"name" TYPE [DEFAULT x | NULL | NOT NULL]`.
    fn column_definition(&self, column: &ColumnSpec) -> String {
        ddl::column_definition(self, column)
    }

    /// CREATE TABLE with columns in the given order.
    ///
    /// # Errors
    ///
    /// Returns `SyncError::Precondition` for an empty column list.
    fn build_create_table(&self, table: &TableId, columns: &[ColumnSpec]) -> Result<String> {
        let sql = ddl::create_table(self, table, columns)?;
        Ok(match self.descriptor().create_table_keyword {
            Some(keyword) => sql.replacen("CREATE TABLE", keyword, 1),
            None => sql,
        })
    }

    /// ALTER TABLE ... ADD statements for new columns.
    ///
    /// # Errors
    ///
    /// Returns `SyncError::Precondition` for an empty column list.
    fn build_alter_table(&self, table: &TableId, columns: &[ColumnSpec]) -> Result<Vec<String>> {
        ddl::alter_table(self, table, columns, self.descriptor().alter)
    }

    /// Upsert keyed on `keys`. Placeholders bind keys first, then `non_keys`.
    ///
    /// With no keys the statement degrades to a plain INSERT and
    /// [`UpsertKind::InsertOnly`] says so.
    ///
    /// # Errors
    ///
    /// Returns `SyncError::Precondition` when no columns are given at all or
    /// a column is both key and non-key.
    fn build_upsert(
        &self,
        table: &TableId,
        keys: &[&ColumnSpec],
        non_keys: &[&ColumnSpec],
    ) -> Result<UpsertStatement> {
        dml::upsert(self, table, keys, non_keys, self.descriptor().upsert)
    }

    /// Plain INSERT of `columns` in order.
    fn build_insert(&self, table: &TableId, columns: &[&ColumnSpec]) -> String {
        dml::insert(self, table, columns)
    }

    /// Parameterized SELECT for a polling mode.
    fn build_select(&self, source: &QuerySource, mode: &QueryMode) -> String {
        dml::select(self, source, mode)
    }

    /// Whether an execution failure means a prepared plan went stale.
    fn is_stale_statement_error(&self, err: &SyncError) -> bool {
        match (err, self.descriptor().stale_statement_signature) {
            (SyncError::Database { message, .. }, Some(signature)) => message.contains(signature),
            _ => false,
        }
    }

    /// Interpret the answer to the identifier-length probe.
    fn interpret_max_identifier_length(&self, probed: Option<i64>) -> MaxIdentifierLength {
        match probed {
            Some(v) => MaxIdentifierLength::from_probe(v),
            None => self
                .descriptor()
                .known_max_identifier_length
                .map_or(MaxIdentifierLength::Unbounded, MaxIdentifierLength::Limit),
        }
    }
}

/// Name and version a connection reports for its database product.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProductInfo {
    pub name: String,
    pub version: String,
}

/// A live database connection.
///
/// One querier owns one connection; connections are never shared, so every
/// operation takes `&mut self`.
#[async_trait]
pub trait Connection: Send {
    /// Prepared statement handle.
    type Statement: Send + Sync;
    /// Open result set.
    type Cursor: ResultCursor;

    /// Stable key for caches (URL with credentials masked).
    fn connection_key(&self) -> &str;

    /// Database product name and version.
    async fn product_info(&mut self) -> Result<ProductInfo>;

    async fn prepare(&mut self, sql: &str) -> Result<Self::Statement>;

    /// Execute a prepared query and open a cursor over its rows.
    async fn query(
        &mut self,
        statement: &Self::Statement,
        params: &[SqlValue<'_>],
    ) -> Result<Self::Cursor>;

    /// Execute a prepared statement and return the affected row count.
    async fn execute(
        &mut self,
        statement: &Self::Statement,
        params: &[SqlValue<'_>],
    ) -> Result<u64>;

    /// Run an ad-hoc statement and read the first column of the first row as
    /// an integer.
    async fn query_scalar(&mut self, sql: &str) -> Result<Option<i64>>;

    /// Release a prepared statement.
    async fn close_statement(&mut self, statement: Self::Statement) -> Result<()> {
        drop(statement);
        Ok(())
    }
}

/// An open result set.
#[async_trait]
pub trait ResultCursor: Send {
    /// Metadata for each result column, in select order.
    fn columns(&self) -> &[ColumnMetadata];

    /// Next row, or `None` when exhausted.
    async fn next_row(&mut self) -> Result<Option<Vec<SqlValue<'static>>>>;

    /// Release server-side resources early.
    async fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

//! # dialect-sync
//!
//! Dialect-aware SQL generation and incremental table polling.
//!
//! This library maps a canonical record schema to the SQL of a relational
//! database and polls tables or queries for new rows:
//!
//! - **Dialect resolution** from the product name a connection reports
//! - **DDL** (`CREATE TABLE`, `ALTER TABLE ... ADD`) from ordered column lists
//! - **Upserts** via `ON CONFLICT`, `ON DUPLICATE KEY`, `MERGE` or native `UPSERT`
//! - **Incremental polling** in bulk, incrementing and timestamp modes, with
//!   stale prepared statements rebuilt transparently
//! - **Identifier handling**: quoting policies and length truncation
//!
//! ## Example
//!
//! ```rust,no_run
//! use dialect_sync::{
//!     DialectRegistry, DialectSettings, PgConnection, QueryMode, QuerySource,
//!     SourceOffset, TableId, TableQuerier,
//! };
//!
//! #[tokio::main]
//! async fn main() -> dialect_sync::Result<()> {
//!     let registry = DialectRegistry::with_builtins(DialectSettings::default());
//!     let conn = PgConnection::connect("postgres://app:pw@localhost/sales").await?;
//!     let mut querier = TableQuerier::connect(
//!         &registry,
//!         conn,
//!         QuerySource::Table(TableId::table("orders")),
//!         QueryMode::Incrementing { column: "id".into() },
//!         SourceOffset::default(),
//!     )
//!     .await?;
//!     for record in querier.poll(chrono::Utc::now(), 100).await? {
//!         println!("{}", record.to_json());
//!     }
//!     querier.shutdown().await
//! }
//! ```

pub mod config;
pub mod core;
pub mod dialect;
pub mod drivers;
pub mod error;
pub mod ingest;
pub mod querier;

// Re-exports for convenient access
pub use crate::config::{sanitize_url, Config, SchemaFile, SourceSettings};
pub use crate::core::{
    ColumnMetadata, ColumnSpec, ColumnType, Connection, Dialect, DialectRegistry, FieldSchema,
    LogicalType, MaxIdentifierLength, PrimitiveKind, QueryMode, QuerySource, Record,
    RecordSchema, ResolvedDialect, ResultCursor, SourceOffset, SqlValue, TableId, UpsertKind,
    UpsertStatement,
};
pub use crate::dialect::DialectSettings;
pub use crate::drivers::{DialectImpl, DialectKind, PgConnection};
pub use crate::error::{Result, SyncError};
pub use crate::ingest::{write_batch, BatchPlan, RowReduction, UpdateMode};
pub use crate::querier::{PollQueue, QuerierState, SourceRecord, TableQuerier};

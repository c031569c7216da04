//! Core abstractions for dialect-aware SQL generation.
//!
//! - [`canonical`]: database-independent column types
//! - [`value`]: SQL value representation
//! - [`identifier`]: quoting, validation and truncation of identifiers
//! - [`schema`]: column specs, record schemas and result metadata
//! - [`query`]: query sources, polling modes and offsets
//! - [`traits`]: the `Dialect`, `Connection` and `ResultCursor` contracts
//! - [`catalog`]: dialect registry with per-connection caches
//!
//! # Design Patterns
//!
//! - **Strategy**: `Dialect` implementations are interchangeable SQL generators
//! - **Template Method**: default trait methods assemble statements from a
//!   few per-dialect hooks
//! - **Dependency Injection**: `DialectRegistry` is built by the caller and
//!   passed to each querier

pub mod canonical;
pub mod catalog;
pub mod identifier;
pub mod query;
pub mod schema;
pub mod traits;
pub mod value;

pub use canonical::{ColumnType, LogicalType, PrimitiveKind};
pub use catalog::{DialectRegistry, ResolvedDialect};
pub use identifier::{MaxIdentifierLength, QuoteMethod, TableId};
pub use query::{QueryMode, QuerySource, SourceOffset};
pub use schema::{
    ColumnMetadata, ColumnSpec, FieldSchema, Nullability, Record, RecordSchema, SqlTypeCode,
};
pub use traits::{
    Connection, Dialect, ProductInfo, ResultCursor, UpsertKind, UpsertStatement,
};
pub use value::{SqlNullType, SqlValue};

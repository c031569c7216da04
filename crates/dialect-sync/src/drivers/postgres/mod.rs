//! PostgreSQL driver.
//!
//! This module provides PostgreSQL-specific implementations:
//!
//! - [`PostgresDialect`]: SQL syntax strategy for PostgreSQL
//! - [`PgConnection`]: live connection over `tokio-postgres`

mod connection;
mod dialect;

pub use connection::{PgConnection, PgCursor};
pub use dialect::PostgresDialect;
pub(crate) use dialect::DESCRIPTOR;

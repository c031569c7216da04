//! Fallback ANSI SQL dialect.
//!
//! Used when no registered dialect matches a connection's product name or
//! URL scheme.

mod dialect;

pub use dialect::GenericDialect;
pub(crate) use dialect::DESCRIPTOR;
